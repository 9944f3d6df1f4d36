use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use metrics::gauge;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ksm_builder::{Builder, KubeFactory, ListWatchFactory};
use ksm_core::labels::parse_allow_list;
use ksm_core::{AllowDenyList, ConfigError, ShardSelector};
use ksm_resources::ResourceKind;
use ksm_server::{metrics_router, serve, telemetry_router, MetricsHandler};

#[derive(Parser, Debug)]
#[command(name = "kruise-state-metrics", version, about = "Prometheus metrics for OpenKruise workloads")]
struct Cli {
    /// Comma-separated resources to expose (default: all)
    #[arg(long, env = "KSM_RESOURCES", value_delimiter = ',')]
    resources: Vec<String>,

    /// Comma-separated namespaces to watch (default: all)
    #[arg(long, env = "KSM_NAMESPACES", value_delimiter = ',')]
    namespaces: Vec<String>,

    /// Ordinal of this instance among the shards
    #[arg(long, env = "KSM_SHARD", default_value_t = 0)]
    shard: u32,

    #[arg(long = "total-shards", env = "KSM_TOTAL_SHARDS", default_value_t = 1)]
    total_shards: u32,

    /// Regexes of metric names to expose; empty allows all
    #[arg(long = "metric-allowlist", env = "KSM_METRIC_ALLOWLIST", value_delimiter = ',')]
    metric_allowlist: Vec<String>,

    /// Regexes of metric names to drop; wins over the allowlist
    #[arg(long = "metric-denylist", env = "KSM_METRIC_DENYLIST", value_delimiter = ',')]
    metric_denylist: Vec<String>,

    /// Annotation keys per resource, e.g. `clonesets=[team,owner],*=[app]`
    #[arg(long = "metric-annotations-allowlist", env = "KSM_METRIC_ANNOTATIONS_ALLOWLIST", default_value = "")]
    metric_annotations_allowlist: String,

    /// Label keys per resource, same format as the annotations allowlist
    #[arg(long = "metric-labels-allowlist", env = "KSM_METRIC_LABELS_ALLOWLIST", default_value = "")]
    metric_labels_allowlist: String,

    /// API server URL, overrides the kubeconfig cluster
    #[arg(long, env = "KSM_APISERVER")]
    apiserver: Option<String>,

    /// Kubeconfig file (default: KUBECONFIG, ~/.kube/config, then in-cluster)
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    #[arg(long, env = "KSM_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "KSM_PORT", default_value_t = 8080)]
    port: u16,

    #[arg(long = "telemetry-host", env = "KSM_TELEMETRY_HOST", default_value = "0.0.0.0")]
    telemetry_host: String,

    #[arg(long = "telemetry-port", env = "KSM_TELEMETRY_PORT", default_value_t = 8081)]
    telemetry_port: u16,

    /// gzip the scrape when the client accepts it
    #[arg(long = "enable-gzip-encoding", env = "KSM_ENABLE_GZIP_ENCODING", action = ArgAction::SetTrue)]
    enable_gzip_encoding: bool,

    /// LIST with resourceVersion=0 so the API server answers from its cache
    #[arg(long = "use-apiserver-cache", env = "KSM_USE_APISERVER_CACHE", action = ArgAction::SetTrue)]
    use_apiserver_cache: bool,
}

fn init_tracing() {
    let env = std::env::var("KSM_LOG").or_else(|_| std::env::var("RUST_LOG")).unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

fn non_empty(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Flag values after validation; everything here is checked before the
/// cluster is contacted.
#[derive(Debug)]
struct Settings {
    resources: Vec<ResourceKind>,
    namespaces: Vec<String>,
    shard: ShardSelector,
    allow_deny: AllowDenyList,
    annotations: HashMap<String, Vec<String>>,
    labels: HashMap<String, Vec<String>>,
}

impl Settings {
    fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let resources = non_empty(&cli.resources).iter().map(|r| r.parse()).collect::<Result<Vec<ResourceKind>, _>>()?;
        Ok(Self {
            resources,
            namespaces: non_empty(&cli.namespaces),
            shard: ShardSelector::new(cli.shard, cli.total_shards)?,
            allow_deny: AllowDenyList::new(&non_empty(&cli.metric_allowlist), &non_empty(&cli.metric_denylist))?,
            annotations: parse_allow_list(&cli.metric_annotations_allowlist)?,
            labels: parse_allow_list(&cli.metric_labels_allowlist)?,
        })
    }

    fn builder<F: ListWatchFactory>(self, factory: F, cancel: CancellationToken) -> Result<Builder<F>, ConfigError> {
        let mut builder = Builder::new(factory);
        if !self.resources.is_empty() {
            let names: Vec<&str> = self.resources.iter().map(|k| k.as_str()).collect();
            builder = builder.with_enabled_resources(&names)?;
        }
        Ok(builder
            .with_namespaces(&self.namespaces)
            .with_sharding(self.shard)
            .with_allow_annotations(self.annotations)
            .with_allow_labels(self.labels)
            .with_allow_deny_list(self.allow_deny)
            .with_cancellation(cancel))
    }
}

async fn kube_client(cli: &Cli) -> Result<Client> {
    let mut config = match &cli.kubeconfig {
        Some(path) => {
            let kc = Kubeconfig::read_from(path).with_context(|| format!("reading kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kc, &KubeConfigOptions::default()).await.context("loading kubeconfig")?
        }
        None => Config::infer().await.context("inferring kube config")?,
    };
    if let Some(url) = &cli.apiserver {
        config.cluster_url = url.parse().with_context(|| format!("invalid --apiserver {url}"))?;
    }
    Client::try_from(config).context("building kube client")
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("resolving {host}:{port}"))?
        .next()
        .with_context(|| format!("no address for {host}:{port}"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "starting kruise-state-metrics");

    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("installing telemetry recorder")?;
    gauge!("kruise_state_metrics_build_info", 1.0, "version" => env!("CARGO_PKG_VERSION"));
    gauge!("kruise_state_metrics_shard_ordinal", f64::from(cli.shard));
    gauge!("kruise_state_metrics_total_shards", f64::from(cli.total_shards));

    let settings = Settings::from_cli(&cli)?;

    let client = kube_client(&cli).await?;
    let version = client.apiserver_version().await.context("contacting the API server")?;
    info!(git_version = %version.git_version, platform = %version.platform, "connected to API server");

    let metrics_addr = resolve(&cli.host, cli.port).await?;
    let telemetry_addr = resolve(&cli.telemetry_host, cli.telemetry_port).await?;

    let cancel = CancellationToken::new();
    let built = settings.builder(KubeFactory::new(client, cli.use_apiserver_cache), cancel.clone())?.build();
    let handler = Arc::new(MetricsHandler::new(built.writers, cli.enable_gzip_encoding));

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            info!("shutdown signal received");
            cancel.cancel();
        }
    });

    let served = tokio::try_join!(
        serve("metrics", metrics_addr, metrics_router(handler), cancel.clone()),
        serve("telemetry", telemetry_addr, telemetry_router(handle), cancel.clone()),
    );
    cancel.cancel();
    for reflector in built.reflectors {
        if let Err(e) = reflector.await {
            warn!(error = %e, "reflector task failed");
        }
    }
    served.map(|_| ())
}
