#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use ksm_core::{ShardSelector, Uid};
use ksm_kubehub::{
    to_uid, Backoff, EventStream, ListPage, ListWatch, ObjectSink, Reflector, ShardedListWatch, WatchError, WatchEvent,
};

fn uid_str(n: u32) -> String { format!("00000000-0000-0000-0000-{:012}", n) }

fn cm(name: &str, n: u32, rv: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("ns".to_string()),
            uid: Some(uid_str(n)),
            resource_version: Some(rv.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

type WatchScript = Result<Vec<Result<WatchEvent<ConfigMap>, WatchError>>, WatchError>;

#[derive(Default)]
struct Script {
    lists: Mutex<VecDeque<Result<ListPage<ConfigMap>, WatchError>>>,
    watches: Mutex<VecDeque<WatchScript>>,
    list_calls: AtomicUsize,
    watch_rvs: Mutex<Vec<String>>,
}

#[derive(Clone)]
struct FakeListWatch(Arc<Script>);

#[async_trait]
impl ListWatch<ConfigMap> for FakeListWatch {
    async fn list(&self) -> Result<ListPage<ConfigMap>, WatchError> {
        self.0.list_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.0.lists.lock().pop_front();
        match next {
            Some(r) => r,
            None => futures::future::pending().await,
        }
    }

    async fn watch(&self, resource_version: &str) -> Result<EventStream<ConfigMap>, WatchError> {
        self.0.watch_rvs.lock().push(resource_version.to_string());
        let next = self.0.watches.lock().pop_front();
        match next {
            Some(Ok(events)) => Ok(futures::stream::iter(events).boxed()),
            Some(Err(e)) => Err(e),
            None => Ok(futures::stream::pending().boxed()),
        }
    }
}

#[derive(Default)]
struct RecordingSink {
    items: Mutex<Vec<(Uid, String)>>,
}

impl RecordingSink {
    fn names(&self) -> Vec<String> { self.items.lock().iter().map(|(_, n)| n.clone()).collect() }
}

impl ObjectSink<ConfigMap> for RecordingSink {
    fn upsert(&self, uid: Uid, obj: &ConfigMap) {
        let name = obj.metadata.name.clone().unwrap_or_default();
        let mut items = self.items.lock();
        match items.iter_mut().find(|(u, _)| *u == uid) {
            Some(entry) => entry.1 = name,
            None => items.push((uid, name)),
        }
    }

    fn remove(&self, uid: &Uid) { self.items.lock().retain(|(u, _)| u != uid); }

    fn uids(&self) -> Vec<Uid> { self.items.lock().iter().map(|(u, _)| *u).collect() }
}

fn page(rv: &str, items: Vec<ConfigMap>) -> Result<ListPage<ConfigMap>, WatchError> {
    Ok(ListPage { resource_version: rv.to_string(), items })
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

fn spawn<L: ListWatch<ConfigMap> + 'static>(
    lw: L,
    sink: Arc<RecordingSink>,
) -> (CancellationToken, tokio::task::JoinHandle<()>) {
    let cancel = CancellationToken::new();
    let reflector = Reflector::new(lw, sink, "configmaps", "ns")
        .with_backoff(Backoff::new(Duration::from_millis(1), Duration::from_millis(4)));
    let handle = tokio::spawn(reflector.run(cancel.clone()));
    (cancel, handle)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn relists_after_gone_and_reconciles() {
    let script = Arc::new(Script::default());
    script.lists.lock().extend([page("1", vec![cm("a", 1, "1"), cm("b", 2, "1")]), page("9", vec![cm("a", 1, "8"), cm("c", 3, "9")])]);
    script.watches.lock().extend([Ok(vec![
        Ok(WatchEvent::Added(cm("c", 3, "4"))),
        Err(WatchError::Gone("too old resource version".into())),
    ])]);

    let sink = Arc::new(RecordingSink::default());
    let (cancel, handle) = spawn(FakeListWatch(script.clone()), sink.clone());

    wait_until(|| script.list_calls.load(Ordering::SeqCst) >= 2 && script.watch_rvs.lock().len() >= 2).await;
    assert_eq!(sink.names(), vec!["a", "c"]);
    assert_eq!(*script.watch_rvs.lock(), vec!["1", "9"]);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delete_event_removes_object() {
    let script = Arc::new(Script::default());
    script.lists.lock().push_back(page("1", vec![cm("a", 1, "1"), cm("b", 2, "1")]));
    script.watches.lock().push_back(Ok(vec![
        Ok(WatchEvent::Modified(cm("a2", 1, "2"))),
        Ok(WatchEvent::Deleted(cm("b", 2, "3"))),
        Ok(WatchEvent::Bookmark("7".into())),
    ]));

    let sink = Arc::new(RecordingSink::default());
    let (cancel, handle) = spawn(FakeListWatch(script.clone()), sink.clone());

    // Stream end re-watches from the bookmark.
    wait_until(|| script.watch_rvs.lock().len() >= 2).await;
    assert_eq!(sink.names(), vec!["a2"]);
    assert_eq!(script.watch_rvs.lock()[1], "7");
    assert!(!sink.uids().contains(&to_uid(&uid_str(2)).unwrap()));

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transient_errors_back_off_and_recover() {
    let script = Arc::new(Script::default());
    script.lists.lock().extend([
        Err(WatchError::Transient("connection reset".into())),
        Err(WatchError::Unauthorized("forbidden".into())),
        page("3", vec![cm("a", 1, "3")]),
    ]);

    let sink = Arc::new(RecordingSink::default());
    let (cancel, handle) = spawn(FakeListWatch(script.clone()), sink.clone());

    wait_until(|| sink.names() == vec!["a"]).await;
    assert_eq!(script.list_calls.load(Ordering::SeqCst), 3);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shards_split_uids_disjointly() {
    let objects: Vec<ConfigMap> = (0..40).map(|n| cm(&format!("cm-{n}"), n, "1")).collect();
    let mut seen: Vec<Vec<String>> = Vec::new();
    for shard in 0..2 {
        let script = Arc::new(Script::default());
        script.lists.lock().push_back(page("1", objects.clone()));
        let lw = ShardedListWatch::new(FakeListWatch(script.clone()), ShardSelector::new(shard, 2).unwrap());
        let sink = Arc::new(RecordingSink::default());
        let (cancel, handle) = spawn(lw, sink.clone());
        wait_until(|| !script.watch_rvs.lock().is_empty()).await;
        seen.push(sink.names());
        cancel.cancel();
        handle.await.unwrap();
    }
    assert!(seen[0].iter().all(|n| !seen[1].contains(n)));
    assert_eq!(seen[0].len() + seen[1].len(), objects.len());
    assert!(!seen[0].is_empty() && !seen[1].is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sharded_watch_filters_events() {
    let script = Arc::new(Script::default());
    script.lists.lock().push_back(page("1", vec![]));
    let events: Vec<_> = (0..20).map(|n| Ok(WatchEvent::Added(cm(&format!("cm-{n}"), n, "2")))).collect();
    script.watches.lock().push_back(Ok(events));

    let selector = ShardSelector::new(1, 3).unwrap();
    let lw = ShardedListWatch::new(FakeListWatch(script.clone()), selector);
    let sink = Arc::new(RecordingSink::default());
    let (cancel, handle) = spawn(lw, sink.clone());

    wait_until(|| script.watch_rvs.lock().len() >= 2).await;
    let expected: Vec<String> =
        (0..20).filter(|n| selector.owns(&uid_str(*n))).map(|n| format!("cm-{n}")).collect();
    assert_eq!(sink.names(), expected);

    cancel.cancel();
    handle.await.unwrap();
}
