use async_trait::async_trait;
use futures::StreamExt;
use kube::Resource;

use ksm_core::ShardSelector;

use crate::{EventStream, ListPage, ListWatch, WatchError, WatchEvent};

fn uid_of<K: Resource>(obj: &K) -> &str { obj.meta().uid.as_deref().unwrap_or("") }

/// Wraps a list-watch so only objects owned by this shard are surfaced. The
/// same hash applies to LIST items and WATCH events; bookmarks always pass.
pub struct ShardedListWatch<L> {
    inner: L,
    selector: ShardSelector,
}

impl<L> ShardedListWatch<L> {
    pub fn new(inner: L, selector: ShardSelector) -> Self { Self { inner, selector } }
    pub fn selector(&self) -> ShardSelector { self.selector }
}

#[async_trait]
impl<K, L> ListWatch<K> for ShardedListWatch<L>
where
    K: Resource + Send + 'static,
    L: ListWatch<K>,
{
    async fn list(&self) -> Result<ListPage<K>, WatchError> {
        let mut page = self.inner.list().await?;
        if !self.selector.is_identity() {
            page.items.retain(|o| self.selector.owns(uid_of(o)));
        }
        Ok(page)
    }

    async fn watch(&self, resource_version: &str) -> Result<EventStream<K>, WatchError> {
        let stream = self.inner.watch(resource_version).await?;
        if self.selector.is_identity() {
            return Ok(stream);
        }
        let selector = self.selector;
        let filtered = stream.filter(move |ev| {
            let keep = match ev {
                Ok(WatchEvent::Added(o)) | Ok(WatchEvent::Modified(o)) | Ok(WatchEvent::Deleted(o)) => {
                    selector.owns(uid_of(o))
                }
                Ok(WatchEvent::Bookmark(_)) | Err(_) => true,
            };
            futures::future::ready(keep)
        });
        Ok(filtered.boxed())
    }
}
