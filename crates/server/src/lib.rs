//! HTTP surfaces: the metrics server (`/metrics`, `/healthz`, `/`) and the
//! self-telemetry server (`/metrics`, `/`).

#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod scrape;

pub use scrape::{metrics_handler, MetricsHandler, CONTENT_TYPE};

const METRICS_INDEX: &str = "<html>\n\
<head><title>Kruise Metrics Server</title></head>\n\
<body>\n\
<h1>Kruise Metrics</h1>\n\
<ul>\n\
<li><a href='/metrics'>metrics</a></li>\n\
<li><a href='/healthz'>healthz</a></li>\n\
</ul>\n\
</body>\n\
</html>\n";

const TELEMETRY_INDEX: &str = "<html>\n\
<head><title>Kruise-State-Metrics Metrics Server</title></head>\n\
<body>\n\
<h1>Kruise-State-Metrics Metrics</h1>\n\
<ul>\n\
<li><a href='/metrics'>metrics</a></li>\n\
</ul>\n\
</body>\n\
</html>\n";

/// Router for the object metrics port.
pub fn metrics_router(handler: Arc<MetricsHandler>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { "OK" }))
        .route("/", get(|| async { Html(METRICS_INDEX) }))
        .with_state(handler)
}

/// Router for the exporter's own metrics.
pub fn telemetry_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { ([(header::CONTENT_TYPE, CONTENT_TYPE)], handle.render()).into_response() }
            }),
        )
        .route("/", get(|| async { Html(TELEMETRY_INDEX) }))
}

/// Bind `addr` and serve `router` until `cancel` fires.
pub async fn serve(name: &'static str, addr: SocketAddr, router: Router, cancel: CancellationToken) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {name} server to {addr}"))?;
    info!(server = name, %addr, "listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .with_context(|| format!("{name} server"))?;
    info!(server = name, "stopped");
    Ok(())
}
