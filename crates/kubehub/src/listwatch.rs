use std::fmt::Debug;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use kube::api::{Api, ListParams, WatchParams};
use kube::Resource;
use metrics::counter;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::WatchError;

/// Server-side watch timeout; the server closes the stream and we re-watch.
const WATCH_TIMEOUT_SECS: u32 = 290;

/// Result of a LIST: the resume cursor plus the current object set.
#[derive(Debug, Clone)]
pub struct ListPage<K> {
    pub resource_version: String,
    pub items: Vec<K>,
}

#[derive(Debug, Clone)]
pub enum WatchEvent<K> {
    Added(K),
    Modified(K),
    Deleted(K),
    /// Progress notification carrying only a newer resource version.
    Bookmark(String),
}

pub type EventStream<K> = BoxStream<'static, Result<WatchEvent<K>, WatchError>>;

/// LIST + WATCH over one (kind, namespace) scope.
#[async_trait]
pub trait ListWatch<K>: Send + Sync {
    async fn list(&self) -> Result<ListPage<K>, WatchError>;
    async fn watch(&self, resource_version: &str) -> Result<EventStream<K>, WatchError>;
}

#[async_trait]
impl<K: Send + 'static> ListWatch<K> for Box<dyn ListWatch<K>> {
    async fn list(&self) -> Result<ListPage<K>, WatchError> { (**self).list().await }
    async fn watch(&self, resource_version: &str) -> Result<EventStream<K>, WatchError> {
        (**self).watch(resource_version).await
    }
}

/// List-watch backed by a typed `kube::Api`.
pub struct KubeListWatch<K> {
    api: Api<K>,
    resource: &'static str,
    use_api_server_cache: bool,
}

impl<K> KubeListWatch<K> {
    pub fn new(api: Api<K>, resource: &'static str) -> Self { Self { api, resource, use_api_server_cache: false } }

    /// LIST with `resourceVersion=0` so the API server may answer from its watch cache.
    pub fn use_api_server_cache(mut self, yes: bool) -> Self {
        self.use_api_server_cache = yes;
        self
    }

    fn list_params(&self) -> ListParams {
        if self.use_api_server_cache { ListParams::default().match_any() } else { ListParams::default() }
    }
}

fn result_label<T, E>(r: &Result<T, E>) -> &'static str {
    if r.is_ok() { "success" } else { "error" }
}

#[async_trait]
impl<K> ListWatch<K> for KubeListWatch<K>
where
    K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    async fn list(&self) -> Result<ListPage<K>, WatchError> {
        let res = self.api.list(&self.list_params()).await;
        counter!("kruise_state_metrics_list_total", 1u64, "resource" => self.resource, "result" => result_label(&res));
        let list = res?;
        debug!(resource = self.resource, items = list.items.len(), "listed");
        Ok(ListPage { resource_version: list.metadata.resource_version.unwrap_or_default(), items: list.items })
    }

    async fn watch(&self, resource_version: &str) -> Result<EventStream<K>, WatchError> {
        let wp = WatchParams::default().timeout(WATCH_TIMEOUT_SECS);
        let res = self.api.watch(&wp, resource_version).await;
        counter!("kruise_state_metrics_watch_total", 1u64, "resource" => self.resource, "result" => result_label(&res));
        let stream = res?.map(|ev| match ev {
            Ok(kube::core::WatchEvent::Added(o)) => Ok(WatchEvent::Added(o)),
            Ok(kube::core::WatchEvent::Modified(o)) => Ok(WatchEvent::Modified(o)),
            Ok(kube::core::WatchEvent::Deleted(o)) => Ok(WatchEvent::Deleted(o)),
            Ok(kube::core::WatchEvent::Bookmark(b)) => Ok(WatchEvent::Bookmark(b.metadata.resource_version)),
            Ok(kube::core::WatchEvent::Error(e)) => Err(WatchError::from(e)),
            Err(e) => Err(WatchError::from(e)),
        });
        Ok(stream.boxed())
    }
}
