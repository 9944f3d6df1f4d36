//! Assembles one encoder + store + sharded list-watch + reflector stack per
//! enabled kind and namespace, and hands back the ordered scrape writers.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;

use kube::Client;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use ksm_core::family::filter_families;
use ksm_core::labels::WILDCARD;
use ksm_core::{AllowDenyList, ConfigError, Encoder, ShardSelector};
use ksm_kubehub::{KubeListWatch, ListWatch, ObjectSink, Reflector, ShardedListWatch};
use ksm_resources::{
    BroadcastJob, CloneSet, ContainerRecreateRequest, DaemonSet, KruiseResource, ResourceKind, SidecarSet,
    StatefulSet, WorkloadSpread,
};
use ksm_store::{MetricsStore, MetricsWriter, MultiStoreWriter};

/// Namespace value meaning "all namespaces".
pub const ALL_NAMESPACES: &str = "";

/// Source of list-watches for a kind in a namespace (`""` = cluster-wide).
pub trait ListWatchFactory: Send + Sync {
    fn list_watch<K: KruiseResource>(&self, namespace: &str) -> Box<dyn ListWatch<K>>;
}

/// List-watches against the API server.
#[derive(Clone)]
pub struct KubeFactory {
    client: Client,
    use_api_server_cache: bool,
}

impl KubeFactory {
    pub fn new(client: Client, use_api_server_cache: bool) -> Self { Self { client, use_api_server_cache } }
}

impl ListWatchFactory for KubeFactory {
    fn list_watch<K: KruiseResource>(&self, namespace: &str) -> Box<dyn ListWatch<K>> {
        let api = K::api(self.client.clone(), Some(namespace));
        Box::new(KubeListWatch::new(api, K::KIND.as_str()).use_api_server_cache(self.use_api_server_cache))
    }
}

/// Running pipeline: writers in scrape order plus the reflector tasks.
pub struct Built {
    pub writers: Vec<Arc<dyn MetricsWriter>>,
    pub reflectors: Vec<JoinHandle<()>>,
}

pub struct Builder<F> {
    factory: F,
    enabled: Vec<ResourceKind>,
    namespaces: Vec<String>,
    shard: ShardSelector,
    allow_annotations: HashMap<String, Vec<String>>,
    allow_labels: HashMap<String, Vec<String>>,
    allow_deny: AllowDenyList,
    cancel: CancellationToken,
}

impl<F: ListWatchFactory> Builder<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            enabled: ResourceKind::ALL.to_vec(),
            namespaces: vec![ALL_NAMESPACES.to_string()],
            shard: ShardSelector::default(),
            allow_annotations: HashMap::new(),
            allow_labels: HashMap::new(),
            allow_deny: AllowDenyList::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Validate and set the enabled kinds. Duplicates collapse; order becomes lexical.
    pub fn with_enabled_resources<S: AsRef<str>>(mut self, names: &[S]) -> Result<Self, ConfigError> {
        let mut kinds = names.iter().map(|n| n.as_ref().parse::<ResourceKind>()).collect::<Result<Vec<_>, _>>()?;
        kinds.sort_unstable();
        kinds.dedup();
        self.enabled = kinds;
        Ok(self)
    }

    /// Namespaces to watch. Empty, or any entry equal to `""`, means all namespaces.
    pub fn with_namespaces<S: AsRef<str>>(mut self, namespaces: &[S]) -> Self {
        let mut out: Vec<String> = Vec::new();
        for ns in namespaces.iter().map(|n| n.as_ref().trim()) {
            if ns.is_empty() {
                out = vec![ALL_NAMESPACES.to_string()];
                break;
            }
            if !out.iter().any(|o| o == ns) {
                out.push(ns.to_string());
            }
        }
        if out.is_empty() {
            out.push(ALL_NAMESPACES.to_string());
        }
        self.namespaces = out;
        self
    }

    pub fn with_sharding(mut self, shard: ShardSelector) -> Self {
        self.shard = shard;
        self
    }

    pub fn with_allow_annotations(mut self, allow: HashMap<String, Vec<String>>) -> Self {
        self.allow_annotations = allow;
        self
    }

    pub fn with_allow_labels(mut self, allow: HashMap<String, Vec<String>>) -> Self {
        self.allow_labels = allow;
        self
    }

    pub fn with_allow_deny_list(mut self, list: AllowDenyList) -> Self {
        self.allow_deny = list;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn enabled(&self) -> &[ResourceKind] { &self.enabled }
    pub fn namespaces(&self) -> &[String] { &self.namespaces }

    /// Spawn every reflector and return the writers in kind × namespace order.
    /// Must run inside a tokio runtime.
    pub fn build(self) -> Built {
        let names: Vec<&str> = self.enabled.iter().map(|k| k.as_str()).collect();
        info!(resources = %names.join(","), "Active resources");
        info!(namespaces = ?self.namespaces, "Active namespaces");
        info!(filter = %self.allow_deny, "Metric allow-deny list");
        if !self.shard.is_identity() {
            info!(shard = self.shard.shard(), total = self.shard.total(), "Sharding enabled");
        }

        let mut reflectors = Vec::new();
        let mut writers: Vec<Arc<dyn MetricsWriter>> = Vec::with_capacity(self.enabled.len());
        for kind in &self.enabled {
            let writer = match kind {
                ResourceKind::BroadcastJobs => self.build_kind::<BroadcastJob>(&mut reflectors),
                ResourceKind::CloneSets => self.build_kind::<CloneSet>(&mut reflectors),
                ResourceKind::ContainerRecreateRequests => self.build_kind::<ContainerRecreateRequest>(&mut reflectors),
                ResourceKind::DaemonSets => self.build_kind::<DaemonSet>(&mut reflectors),
                ResourceKind::SidecarSets => self.build_kind::<SidecarSet>(&mut reflectors),
                ResourceKind::StatefulSets => self.build_kind::<StatefulSet>(&mut reflectors),
                ResourceKind::WorkloadSpreads => self.build_kind::<WorkloadSpread>(&mut reflectors),
            };
            writers.push(writer);
        }
        Built { writers, reflectors }
    }

    fn allow_list<'a>(map: &'a HashMap<String, Vec<String>>, kind: ResourceKind) -> &'a [String] {
        map.get(kind.as_str()).or_else(|| map.get(WILDCARD)).map(Vec::as_slice).unwrap_or(&[])
    }

    fn build_kind<K: KruiseResource>(&self, reflectors: &mut Vec<JoinHandle<()>>) -> Arc<dyn MetricsWriter> {
        let kind = K::KIND;
        let families = K::families(
            Self::allow_list(&self.allow_annotations, kind),
            Self::allow_list(&self.allow_labels, kind),
        );
        let encoder = Encoder::new(kind.identity_label(), filter_families(families, &self.allow_deny));

        let namespaces: &[String] = if kind.namespaced() { &self.namespaces } else { &[] };
        let scopes: Vec<&str> = if namespaces.is_empty() {
            vec![ALL_NAMESPACES]
        } else {
            namespaces.iter().map(String::as_str).collect()
        };

        let mut stores = Vec::with_capacity(scopes.len());
        for ns in scopes {
            let store = Arc::new(MetricsStore::new(kind.as_str(), encoder.clone()));
            let lw = ShardedListWatch::new(self.factory.list_watch::<K>(ns), self.shard);
            let sink: Arc<dyn ObjectSink<K>> = store.clone();
            let reflector = Reflector::new(lw, sink, kind.as_str(), ns);
            reflectors.push(tokio::spawn(reflector.run(self.cancel.clone())));
            stores.push(store);
        }
        Arc::new(MultiStoreWriter::new(stores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoFactory;

    impl ListWatchFactory for NoFactory {
        fn list_watch<K: KruiseResource>(&self, _namespace: &str) -> Box<dyn ListWatch<K>> {
            unreachable!("not built in these tests")
        }
    }

    #[test]
    fn enabled_resources_are_validated_and_sorted() {
        let b = Builder::new(NoFactory).with_enabled_resources(&["statefulsets", "clonesets", "clonesets"]).unwrap();
        assert_eq!(b.enabled(), &[ResourceKind::CloneSets, ResourceKind::StatefulSets]);

        let err = Builder::new(NoFactory).with_enabled_resources(&["clonesets", "pods"]).err().unwrap();
        assert!(matches!(err, ConfigError::UnknownResource { ref name, .. } if name == "pods"));
    }

    #[test]
    fn namespaces_collapse_to_all() {
        assert_eq!(Builder::new(NoFactory).namespaces(), &[""]);
        let b = Builder::new(NoFactory).with_namespaces(&["b", "a", "b"]);
        assert_eq!(b.namespaces(), &["b", "a"]);
        let b = Builder::new(NoFactory).with_namespaces(&["a", ""]);
        assert_eq!(b.namespaces(), &[""]);
        let empty: [&str; 0] = [];
        assert_eq!(Builder::new(NoFactory).with_namespaces(&empty).namespaces(), &[""]);
    }

    #[test]
    fn allow_list_falls_back_to_wildcard_key() {
        let mut m = HashMap::new();
        m.insert("*".to_string(), vec!["app".to_string()]);
        m.insert("clonesets".to_string(), vec!["team".to_string()]);
        assert_eq!(Builder::<NoFactory>::allow_list(&m, ResourceKind::CloneSets), &["team".to_string()]);
        assert_eq!(Builder::<NoFactory>::allow_list(&m, ResourceKind::DaemonSets), &["app".to_string()]);
        assert!(Builder::<NoFactory>::allow_list(&HashMap::new(), ResourceKind::DaemonSets).is_empty());
    }
}
