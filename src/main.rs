//! WolfSync - Configuration Replication for DNS-Filtering Nodes
//!
//! Replicates the configuration of a primary node to its replicas, once or
//! on a fixed interval.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolfsync::config::{LoggingConfig, WolfSyncConfig};
use wolfsync::error::Result;
use wolfsync::sync::SyncTarget;

/// WolfSync - Configuration Replication for DNS-Filtering Nodes
#[derive(Parser)]
#[command(name = "wolfsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wolfsync.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error), overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the replicas, repeating on the configured interval
    Run {
        /// Run a single sync even if an interval is configured
        #[arg(long)]
        once: bool,
    },

    /// Validate configuration file
    Validate,

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolfsync.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { output } = &cli.command {
        init_logging(cli.log_level.as_deref(), &LoggingConfig::default());
        return run_init(output);
    }

    let config = WolfSyncConfig::from_file(&cli.config);
    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_logging(cli.log_level.as_deref(), &logging);

    let config = match config {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load configuration from {:?}: {}", cli.config, e);
            return Err(e);
        }
    };

    match cli.command {
        Commands::Run { once } => run_sync(config, once).await,
        Commands::Validate => run_validate(&cli.config, &config),
        Commands::Init { .. } => Ok(()),
    }
}

/// Initialize logging
fn init_logging(level: Option<&str>, logging: &LoggingConfig) {
    let level = level.unwrap_or(&logging.level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());
    let json = logging.format == "json";

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

/// Run one sync, or keep syncing on the configured interval until Ctrl-C
async fn run_sync(config: WolfSyncConfig, once: bool) -> Result<()> {
    let target = SyncTarget::from_config(&config)?;
    tracing::info!(
        primary = %config.primary.url,
        replicas = target.replica_count(),
        mode = %config.sync.mode,
        "WolfSync starting"
    );

    let interval = match config.interval() {
        Some(interval) if !once => interval,
        _ => return target.run(&config.sync).await,
    };

    tracing::info!("Syncing every {:?}", interval);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    target.run_every(&config.sync, interval, shutdown).await;
    Ok(())
}

/// Validate configuration file
fn run_validate(path: &std::path::Path, config: &WolfSyncConfig) -> Result<()> {
    println!("Configuration {:?} is valid", path);
    println!("  Primary:  {}", config.primary.url);
    for replica in &config.replicas {
        println!("  Replica:  {}", replica.url);
    }
    println!("  Mode:     {}", config.sync.mode);
    match config.interval() {
        Some(interval) => println!("  Interval: {:?}", interval),
        None => println!("  Interval: run once"),
    }
    Ok(())
}

/// Initialize configuration file
fn run_init(output: &std::path::Path) -> Result<()> {
    if output.exists() {
        return Err(wolfsync::Error::Config(format!(
            "{} already exists, refusing to overwrite",
            output.display()
        )));
    }

    let config_content = r#"# WolfSync Configuration
# Generated configuration file

[primary]
url = "http://pihole1.lan"
password = "env:PRIMARY_PASSWORD"

[[replicas]]
url = "http://pihole2.lan"
password = "env:REPLICA_PASSWORD"

[client]
skip_tls_verification = false
timeout_secs = 20
retry_delay_secs = 1

[retry]
authenticate = 3
delete_session = 3
teleporter_push = 5
config_patch = 5
maintenance_job = 5

[sync]
# "full" imports the whole teleporter snapshot, "selective" patches sections
mode = "selective"
run_gravity = false
# interval_secs = 3600
exclude_dns_records = []

# Teleporter import selection (selective mode syncs it before the config patch)
# [sync.gravity]
# dhcp_leases = false
# group = true
# adlist = true
# adlist_by_group = true
# domainlist = true
# domainlist_by_group = true
# client = true
# client_by_group = true

[sync.config.dns]
enabled = true
# filter = { type = "exclude", keys = ["upstreams"] }

[sync.config.dhcp]
enabled = false

[sync.config.ntp]
enabled = false

[sync.config.resolver]
enabled = false

[sync.config.database]
enabled = false

[sync.config.misc]
enabled = false

[sync.config.debug]
enabled = false

[logging]
level = "info"
format = "pretty"
"#;

    std::fs::write(output, config_content)?;
    tracing::info!("Configuration written to {:?}", output);
    Ok(())
}
