use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::Resource;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use ksm_core::Uid;

use crate::{object_uid, ListWatch, ObjectSink, WatchError, WatchEvent};

/// Exponential retry delay: doubles from `initial` up to `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self { Self::new(Duration::from_millis(800), Duration::from_secs(30)) }
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self { Self { initial, max, current: initial } }

    pub fn next_delay(&mut self) -> Duration {
        let d = self.current;
        self.current = (self.current * 2).min(self.max);
        d
    }

    pub fn reset(&mut self) { self.current = self.initial; }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectorState {
    Listing,
    Watching { resource_version: String },
    Backoff { delay: Duration },
    Stopped,
}

#[derive(Debug, Clone)]
pub enum Transition {
    ListOk { resource_version: String },
    ListError(WatchError),
    /// The server ended the watch cleanly (timeout); resume from the cursor.
    WatchClosed,
    WatchError(WatchError),
    Expired,
    BackoffElapsed,
    Cancel,
}

impl ReflectorState {
    pub fn on(self, t: Transition, backoff: &mut Backoff) -> ReflectorState {
        use ReflectorState as S;
        match (self, t) {
            (S::Stopped, _) | (_, Transition::Cancel) => S::Stopped,
            (S::Listing, Transition::ListOk { resource_version }) => S::Watching { resource_version },
            (_, Transition::Expired) => S::Listing,
            (_, Transition::ListError(e)) | (_, Transition::WatchError(e)) if e.is_expired() => S::Listing,
            (S::Listing, Transition::ListError(_)) | (S::Watching { .. }, Transition::WatchError(_)) => {
                S::Backoff { delay: backoff.next_delay() }
            }
            (S::Watching { resource_version }, Transition::WatchClosed) => S::Watching { resource_version },
            (S::Backoff { .. }, Transition::BackoffElapsed) => S::Listing,
            (state, _) => state,
        }
    }
}

/// Keeps one sink in step with one (kind, namespace, shard) scope.
pub struct Reflector<K, L> {
    lw: L,
    sink: Arc<dyn ObjectSink<K>>,
    resource: &'static str,
    namespace: String,
    backoff: Backoff,
}

impl<K, L> Reflector<K, L>
where
    K: Resource + Send + Sync + 'static,
    L: ListWatch<K>,
{
    pub fn new(lw: L, sink: Arc<dyn ObjectSink<K>>, resource: &'static str, namespace: &str) -> Self {
        Self { lw, sink, resource, namespace: namespace.to_string(), backoff: Backoff::default() }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Run until `cancel` fires. Never returns on cluster errors alone.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(resource = self.resource, namespace = %self.namespace, "reflector started");
        let mut state = ReflectorState::Listing;
        loop {
            let t = match &mut state {
                ReflectorState::Stopped => break,
                ReflectorState::Listing => self.list(&cancel).await,
                ReflectorState::Watching { resource_version } => {
                    let (t, delivered) = self.watch(resource_version, &cancel).await;
                    // Only a watch that actually streamed counts as recovery.
                    if delivered {
                        self.backoff.reset();
                    }
                    t
                }
                ReflectorState::Backoff { delay } => {
                    let delay = *delay;
                    tokio::select! {
                        _ = cancel.cancelled() => Transition::Cancel,
                        _ = tokio::time::sleep(delay) => Transition::BackoffElapsed,
                    }
                }
            };
            state = state.on(t, &mut self.backoff);
        }
        info!(resource = self.resource, namespace = %self.namespace, "reflector stopped");
    }

    async fn list(&self, cancel: &CancellationToken) -> Transition {
        let res = tokio::select! {
            _ = cancel.cancelled() => return Transition::Cancel,
            r = self.lw.list() => r,
        };
        match res {
            Ok(page) => {
                self.replace(&page.items);
                debug!(resource = self.resource, namespace = %self.namespace, items = page.items.len(), rv = %page.resource_version, "list complete");
                Transition::ListOk { resource_version: page.resource_version }
            }
            Err(e) => {
                self.log_error("list", &e);
                Transition::ListError(e)
            }
        }
    }

    /// Consume one watch stream, advancing `resource_version` as events arrive.
    /// The flag reports whether at least one event was delivered.
    async fn watch(&self, resource_version: &mut String, cancel: &CancellationToken) -> (Transition, bool) {
        let opened = tokio::select! {
            _ = cancel.cancelled() => return (Transition::Cancel, false),
            s = self.lw.watch(resource_version) => s,
        };
        let mut stream = match opened {
            Ok(s) => s,
            Err(e) => return (self.watch_failed(e), false),
        };
        let mut delivered = false;
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return (Transition::Cancel, delivered),
                n = stream.next() => n,
            };
            if matches!(next, Some(Ok(_))) {
                delivered = true;
            }
            match next {
                None => return (Transition::WatchClosed, delivered),
                Some(Err(e)) => return (self.watch_failed(e), delivered),
                Some(Ok(WatchEvent::Bookmark(rv))) => *resource_version = rv,
                Some(Ok(WatchEvent::Added(o))) | Some(Ok(WatchEvent::Modified(o))) => {
                    advance(resource_version, &o);
                    self.upsert(&o);
                }
                Some(Ok(WatchEvent::Deleted(o))) => {
                    advance(resource_version, &o);
                    if let Ok(uid) = object_uid(&o) {
                        self.sink.remove(&uid);
                    }
                }
            }
        }
    }

    fn watch_failed(&self, e: WatchError) -> Transition {
        if e.is_expired() {
            info!(resource = self.resource, namespace = %self.namespace, "watch expired, relisting");
            return Transition::Expired;
        }
        self.log_error("watch", &e);
        Transition::WatchError(e)
    }

    fn log_error(&self, op: &str, e: &WatchError) {
        match e {
            WatchError::Unauthorized(_) => {
                error!(resource = self.resource, namespace = %self.namespace, op, error = %e, "not authorized, will retry")
            }
            _ => warn!(resource = self.resource, namespace = %self.namespace, op, error = %e, "cluster request failed"),
        }
    }

    fn upsert(&self, obj: &K) {
        match object_uid(obj) {
            Ok(uid) => self.sink.upsert(uid, obj),
            Err(e) => warn!(resource = self.resource, error = %e, "skipping object without a usable uid"),
        }
    }

    /// Make the sink hold exactly the listed objects.
    fn replace(&self, items: &[K]) {
        let mut live: HashSet<Uid> = HashSet::with_capacity(items.len());
        for obj in items {
            if let Ok(uid) = object_uid(obj) {
                live.insert(uid);
            }
            self.upsert(obj);
        }
        for uid in self.sink.uids() {
            if !live.contains(&uid) {
                self.sink.remove(&uid);
            }
        }
    }
}

fn advance<K: Resource>(resource_version: &mut String, obj: &K) {
    if let Some(rv) = obj.meta().resource_version.as_deref() {
        if !rv.is_empty() {
            *resource_version = rv.to_string();
        }
    }
}
