//! # flare-ddns
//!
//! A dynamic DNS updater for Cloudflare address records, meant to be run
//! periodically by cron or a systemd timer.
//!
//! ## Features
//!
//! - Public IP detection through a plaintext "what is my IP" service
//! - Append-only local history of observed IPs
//! - Cloudflare A record updates, only when the IP actually changed
//! - Per-site failure isolation: one rejected record never blocks the rest
//! - Best-effort ntfy push notifications
//!
//! ## Usage
//!
//! ```bash
//! # One sync pass (what cron should call)
//! flare-ddns run
//!
//! # Compare current IP with the stored baseline
//! flare-ddns status
//!
//! # Print a sample configuration
//! flare-ddns example
//! ```

pub mod app;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod notifier;
pub mod providers;
pub mod resolver;
pub mod store;

pub use app::App;
pub use config::{BaselinePolicy, Config, Site};
pub use engine::{RunReport, SiteOutcome, SyncEngine, SyncOutcome};
pub use error::{DdnsError, Result};
pub use resolver::IpResolver;
pub use store::{IpObservation, StateStore};
