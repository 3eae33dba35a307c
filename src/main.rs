//! flare-ddns - Dynamic DNS updater for Cloudflare.

use clap::{Parser, Subcommand};
use flare_ddns::config::Config;
use flare_ddns::engine::SyncOutcome;
use flare_ddns::App;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flare-ddns")]
#[command(about = "Keep Cloudflare A records pointed at this machine's public IP")]
#[command(version)]
struct Cli {
    /// Path to config file (.json or .toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass (default)
    Run {
        /// Update every site even if the IP hasn't changed
        #[arg(short, long)]
        force: bool,
    },

    /// Show the current IP next to the stored baseline
    Status,

    /// Show recorded IP history, newest first
    History {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Validate configuration
    Validate {
        /// Also verify the Cloudflare API token
        #[arg(long)]
        online: bool,
    },

    /// Print an example configuration
    Example,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli_path: Option<PathBuf>) -> anyhow::Result<Config> {
    let config = match cli_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Run { force: false });
    let result = dispatch(command, cli.config).await;

    if let Err(e) = &result {
        tracing::error!(error = %e, "Run aborted");
    }

    result
}

async fn dispatch(command: Commands, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    match command {
        Commands::Example => cmd_example(),
        Commands::Run { force } => cmd_run(load_config(config_path)?, force).await,
        Commands::Status => cmd_status(load_config(config_path)?).await,
        Commands::History { limit } => cmd_history(load_config(config_path)?, limit).await,
        Commands::Validate { online } => cmd_validate(load_config(config_path)?, online).await,
    }
}

async fn cmd_run(config: Config, force: bool) -> anyhow::Result<()> {
    let app = App::from_config(config)?;
    let report = app.run(force).await?;

    for site in &report.outcomes {
        match &site.outcome {
            SyncOutcome::Applied => println!("  {}: updated", site.site),
            SyncOutcome::Rejected { detail, .. } => println!("  {}: FAILED - {}", site.site, detail),
            SyncOutcome::Skipped => println!("  {}: skipped (IP unchanged)", site.site),
        }
    }

    tracing::info!(
        applied = report.applied(),
        rejected = report.rejected(),
        recorded = report.recorded,
        "{}",
        report.summary()
    );

    Ok(())
}

async fn cmd_status(config: Config) -> anyhow::Result<()> {
    let app = App::from_config(config)?;
    let status = app.status().await?;

    println!("flare-ddns Status");
    println!("=================\n");
    println!("Current Public IP: {}", status.current_ip);

    match &status.baseline {
        Some(baseline) => println!(
            "Stored baseline:   {} (recorded {})",
            baseline.ip,
            baseline.recorded_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        None => println!("Stored baseline:   (none)"),
    }

    if status.changed() {
        println!("\nIP changed, next run will update:");
    } else {
        println!("\nIP unchanged, tracked sites:");
    }

    for site in &app.config().projects {
        let proxied = if site.proxied { " [proxied]" } else { "" };
        println!("  {}{}", site.name, proxied);
    }

    Ok(())
}

async fn cmd_history(config: Config, limit: usize) -> anyhow::Result<()> {
    let app = App::from_config(config)?;
    let history = app.history().await?;

    if history.is_empty() {
        println!("No IP observations recorded yet.");
        return Ok(());
    }

    for observation in history.iter().rev().take(limit) {
        println!(
            "{}  {}",
            observation.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            observation.ip
        );
    }

    Ok(())
}

async fn cmd_validate(config: Config, online: bool) -> anyhow::Result<()> {
    println!("Validating configuration...\n");

    let app = App::from_config(config)?;
    let config = app.config();

    println!("  Sites: {}", config.projects.len());
    for site in &config.projects {
        println!("    {} (zone {}, record {})", site.name, site.zone_id, site.dns_record_id);
    }
    println!(
        "  Notifications: {}",
        if config.notifications_enabled() { "enabled" } else { "disabled" }
    );
    println!("  State file: {}", config.state_path.display());

    if online {
        print!("  Cloudflare token: ");
        std::io::stdout().flush()?;
        match app.verify_credentials().await {
            Ok(()) => println!("OK"),
            Err(e) => {
                println!("FAILED - {}", e);
                anyhow::bail!("Cloudflare token verification failed");
            }
        }
    }

    println!("\nConfiguration is valid.");
    Ok(())
}

fn cmd_example() -> anyhow::Result<()> {
    print!("{}", Config::example().to_toml()?);
    Ok(())
}
