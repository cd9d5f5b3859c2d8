//! Storage Pool Provisioner
//!
//! Control plane service creating replicated pools on Ceph clusters through
//! the REST control API served by their monitors.

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storage_pool_provisioner::{
    ApiServer, ApiServerConfig, BackendConfig, BackendFactory, CephApiConfig, Error,
    MemoryTopologyStore, PollPolicy, ProvisionMetrics, Provisioner, ProvisionerConfig, Result,
    TaskManager, TopologySnapshot,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Storage Pool Provisioner - replicated pool creation on Ceph clusters
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// REST API bind address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8090")]
    api_addr: String,

    /// Cluster backend adapter
    #[arg(long, env = "CLUSTER_BACKEND", default_value = "cephapi")]
    backend: String,

    /// Control API port on monitors
    #[arg(long, env = "CEPH_API_PORT", default_value = "8002")]
    ceph_api_port: u16,

    /// Control API path prefix
    #[arg(long, env = "CEPH_API_PREFIX", default_value = "api")]
    ceph_api_prefix: String,

    /// Control API scheme (http or https)
    #[arg(long, env = "CEPH_API_SCHEME", default_value = "http")]
    ceph_api_scheme: String,

    /// Timeout of a single control API request in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    request_timeout_secs: u64,

    /// Delay between status polls in seconds
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "2")]
    poll_interval_secs: u64,

    /// Give up polling after this many seconds (0 polls forever)
    #[arg(long, env = "POLL_TIMEOUT_SECS", default_value = "1800")]
    poll_timeout_secs: u64,

    /// Give up polling after this many status reads
    #[arg(long, env = "POLL_MAX_ATTEMPTS")]
    poll_max_attempts: Option<u32>,

    /// Completed tasks kept for inspection before the oldest are evicted
    #[arg(long, env = "TASK_RETENTION", default_value = "1000")]
    max_completed_tasks: usize,

    /// Topology snapshot (YAML or JSON) seeding the in-memory store
    #[arg(long, env = "TOPOLOGY_FILE")]
    topology_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn poll_policy(&self) -> PollPolicy {
        let interval = Duration::from_secs(self.poll_interval_secs);
        let deadline = match self.poll_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        PollPolicy {
            interval,
            max_attempts: self.poll_max_attempts,
            deadline,
        }
    }

    fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            cephapi: CephApiConfig {
                scheme: self.ceph_api_scheme.clone(),
                port: self.ceph_api_port,
                prefix: self.ceph_api_prefix.clone(),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
            },
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting Storage Pool Provisioner");
    info!("  Version: {}", storage_pool_provisioner::VERSION);
    info!("  REST API: {}", args.api_addr);
    info!("  Backend: {}", args.backend);

    let store = match &args.topology_file {
        Some(path) => {
            let snapshot = TopologySnapshot::load(path)?;
            info!(
                "Loaded topology from {}: {} clusters, {} nodes",
                path,
                snapshot.clusters.len(),
                snapshot.nodes.len()
            );
            MemoryTopologyStore::from_snapshot(snapshot)
        }
        None => {
            warn!("No topology file given, starting with an empty store");
            MemoryTopologyStore::new()
        }
    };
    let store = Arc::new(store);

    let policy = args.poll_policy();
    if policy.max_attempts.is_none() && policy.deadline.is_none() {
        warn!("Status polling is unbounded");
    }

    let backend = BackendFactory::create(&args.backend, args.backend_config(), store.clone())?;
    let tasks = TaskManager::with_retention(args.max_completed_tasks);
    let metrics = Arc::new(ProvisionMetrics::new()?);

    let provisioner = Arc::new(
        Provisioner::new(
            ProvisionerConfig {
                poll_policy: policy,
            },
            store,
            backend,
            tasks.clone(),
        )
        .with_metrics(metrics.clone()),
    );

    let api_config = ApiServerConfig {
        rest_addr: args.api_addr.parse().map_err(|e| {
            Error::Configuration(format!("Invalid REST API address: {}", e))
        })?,
    };

    let api_server = ApiServer::new(api_config, provisioner, tasks).with_metrics(metrics);

    let shutdown = api_server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, shutting down");
            let _ = shutdown.send(());
        }
    });

    api_server.run().await?;

    info!("Provisioner shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=info", "tower_http=info", "axum=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
