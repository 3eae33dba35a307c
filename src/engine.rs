//! Change detection and DNS synchronization.
//!
//! A run is a single pass:
//!
//! 1. resolve the current public IP and read the baseline,
//! 2. stop if the two are string-equal (unless forced),
//! 3. record the new baseline (see [`BaselinePolicy`] for when),
//! 4. push the IP to every site, one at a time, notifying per site.
//!
//! A site that fails never stops the sites after it. Only resolution and
//! state store failures end a run early.

use crate::config::{BaselinePolicy, Site};
use crate::error::Result;
use crate::notifier::{Notification, Notifier};
use crate::providers::DnsProvider;
use crate::resolver::IpResolver;
use crate::store::StateStore;
use tracing::{info, warn};

/// Result of syncing one site during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The provider accepted the new address.
    Applied,
    /// The provider refused the update or could not be reached.
    Rejected {
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Raw provider body or transport error.
        detail: String,
    },
    /// No update was attempted because the IP did not change.
    Skipped,
}

/// Outcome for a single site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteOutcome {
    pub site: String,
    pub outcome: SyncOutcome,
}

/// Summary of one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub current_ip: String,
    pub previous_ip: Option<String>,
    /// Whether the resolved IP differed from the baseline.
    pub changed: bool,
    /// Whether a new baseline was written this run.
    pub recorded: bool,
    /// Per-site results in registry order.
    pub outcomes: Vec<SiteOutcome>,
}

impl RunReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Applied))
    }

    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Rejected { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Skipped))
    }

    fn count(&self, predicate: impl Fn(&SyncOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.outcome)).count()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        if !self.changed && self.applied() + self.rejected() == 0 {
            return format!("IP unchanged ({}), nothing to do", self.current_ip);
        }

        format!(
            "IP {} -> {}: {} applied, {} rejected, {} skipped",
            self.previous_ip.as_deref().unwrap_or("none"),
            self.current_ip,
            self.applied(),
            self.rejected(),
            self.skipped()
        )
    }
}

/// The sync engine borrows every collaborator for the duration of a run.
pub struct SyncEngine<'a> {
    resolver: &'a dyn IpResolver,
    store: &'a dyn StateStore,
    provider: &'a dyn DnsProvider,
    notifier: &'a dyn Notifier,
    sites: &'a [Site],
    baseline: BaselinePolicy,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        resolver: &'a dyn IpResolver,
        store: &'a dyn StateStore,
        provider: &'a dyn DnsProvider,
        notifier: &'a dyn Notifier,
        sites: &'a [Site],
    ) -> Self {
        Self {
            resolver,
            store,
            provider,
            notifier,
            sites,
            baseline: BaselinePolicy::default(),
        }
    }

    pub fn with_baseline(mut self, baseline: BaselinePolicy) -> Self {
        self.baseline = baseline;
        self
    }

    /// Run one detection and sync pass.
    ///
    /// With `force`, sites are updated even when the IP is unchanged; the
    /// baseline is still only written for a real change.
    pub async fn run(&self, force: bool) -> Result<RunReport> {
        let current_ip = self.resolver.resolve().await?;
        let previous_ip = self.store.latest().await?.map(|o| o.ip);

        // Exact text comparison: "1.2.3.04" and "1.2.3.4" differ.
        let changed = previous_ip.as_deref() != Some(current_ip.as_str());

        if !changed && !force {
            info!(ip = %current_ip, "IP unchanged, skipping update");
            return Ok(RunReport {
                outcomes: self.skip_all(),
                current_ip,
                previous_ip,
                changed,
                recorded: false,
            });
        }

        if changed {
            info!(
                previous = previous_ip.as_deref().unwrap_or("none"),
                current = %current_ip,
                sites = self.sites.len(),
                "IP changed"
            );
        } else {
            info!(ip = %current_ip, "IP unchanged, forcing update");
        }

        let mut recorded = false;
        if changed && self.baseline == BaselinePolicy::BeforeApply {
            self.store.record(&current_ip).await?;
            recorded = true;
        }

        let mut outcomes = Vec::with_capacity(self.sites.len());
        for site in self.sites {
            let outcome = self.apply(site, &current_ip, changed).await;
            outcomes.push(SiteOutcome {
                site: site.name.clone(),
                outcome,
            });
        }

        if changed && self.baseline == BaselinePolicy::AfterSuccess {
            let all_applied = outcomes
                .iter()
                .all(|o| o.outcome == SyncOutcome::Applied);

            if all_applied {
                self.store.record(&current_ip).await?;
                recorded = true;
            } else {
                warn!(ip = %current_ip, "Not every site was updated, baseline left unchanged");
            }
        }

        Ok(RunReport {
            current_ip,
            previous_ip,
            changed,
            recorded,
            outcomes,
        })
    }

    /// Update one site and emit exactly one notification for the result.
    async fn apply(&self, site: &Site, ip: &str, changed: bool) -> SyncOutcome {
        let rejection = match self.provider.update_record(site, ip).await {
            Ok(response) if response.is_success() => None,
            Ok(response) => Some((Some(response.status), response.body)),
            Err(e) => Some((None, e.to_string())),
        };

        let (outcome, notification) = match rejection {
            None => {
                info!(site = %site.name, ip, provider = self.provider.name(), "DNS record updated");
                let message = if changed {
                    format!("IP changed to {}, updated {}", ip, site.name)
                } else {
                    format!("Re-synced {} to {}", site.name, ip)
                };
                (SyncOutcome::Applied, Notification::info(message))
            }
            Some((status, detail)) => {
                warn!(site = %site.name, ip, status = ?status, detail = %detail, "DNS update rejected");
                let notification = Notification::error(format!(
                    "Failed to update {} to {}: {}",
                    site.name, ip, detail
                ));
                (SyncOutcome::Rejected { status, detail }, notification)
            }
        };

        self.notifier.notify(&notification).await;
        outcome
    }

    fn skip_all(&self) -> Vec<SiteOutcome> {
        self.sites
            .iter()
            .map(|site| SiteOutcome {
                site: site.name.clone(),
                outcome: SyncOutcome::Skipped,
            })
            .collect()
    }
}
