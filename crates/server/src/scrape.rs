//! Streaming `/metrics` handler.
//!
//! The stores are written on a blocking thread into a channel-backed writer;
//! the response body drains the channel. A client that goes away closes the
//! channel, which surfaces as `BrokenPipe` in the writer and aborts the scrape.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use metrics::histogram;
use tokio::sync::mpsc;
use tracing::debug;

use ksm_store::{write_all_writers, MetricsWriter};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const CHUNK_SIZE: usize = 64 * 1024;
const CHANNEL_DEPTH: usize = 8;

/// Everything a scrape needs: the ordered writers and the gzip switch.
pub struct MetricsHandler {
    writers: Vec<Arc<dyn MetricsWriter>>,
    enable_gzip: bool,
}

impl MetricsHandler {
    pub fn new(writers: Vec<Arc<dyn MetricsWriter>>, enable_gzip: bool) -> Self { Self { writers, enable_gzip } }

    /// Write the whole exposition into `w`.
    pub fn write_to(&self, w: &mut dyn Write) -> io::Result<()> { write_all_writers(&self.writers, w) }
}

/// `io::Write` that ships fixed-size chunks through a bounded channel.
struct ChannelWriter {
    tx: mpsc::Sender<Bytes>,
    buf: Vec<u8>,
}

impl ChannelWriter {
    fn new(tx: mpsc::Sender<Bytes>) -> Self { Self { tx, buf: Vec::with_capacity(CHUNK_SIZE) } }

    fn ship(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE)));
        self.tx.blocking_send(chunk).map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "scrape client went away"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_SIZE {
            self.ship()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> { self.ship() }
}

fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|enc| enc.split(';').next().is_some_and(|e| e.trim().eq_ignore_ascii_case("gzip")))
}

fn write_scrape(handler: &MetricsHandler, mut out: ChannelWriter, gzip: bool) -> io::Result<()> {
    if gzip {
        let mut enc = GzEncoder::new(out, Compression::default());
        handler.write_to(&mut enc)?;
        let mut out = enc.finish()?;
        out.flush()
    } else {
        handler.write_to(&mut out)?;
        out.flush()
    }
}

pub async fn metrics_handler(State(handler): State<Arc<MetricsHandler>>, headers: HeaderMap) -> Response {
    let gzip = handler.enable_gzip && accepts_gzip(&headers);
    let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_DEPTH);
    let started = Instant::now();

    tokio::task::spawn_blocking(move || {
        if let Err(e) = write_scrape(&handler, ChannelWriter::new(tx), gzip) {
            debug!(error = %e, "scrape aborted");
        }
        histogram!("http_request_duration_seconds", started.elapsed().as_secs_f64(), "handler" => "metrics", "method" => "GET");
    });

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok::<_, io::Error>(chunk), rx))
    });
    let mut resp = (StatusCode::OK, Body::from_stream(stream)).into_response();
    resp.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE));
    if gzip {
        resp.headers_mut().insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    }
    resp
}
