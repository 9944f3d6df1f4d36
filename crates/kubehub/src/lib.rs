//! Cluster side of the exporter: typed list/watch sources, the UID shard
//! filter and the reflector loop that keeps a store in step with the cluster.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use kube::Resource;
use uuid::Uuid;

mod error;
mod listwatch;
mod reflector;
mod shard;

pub use error::WatchError;
pub use listwatch::{EventStream, KubeListWatch, ListPage, ListWatch, WatchEvent};
pub use reflector::{Backoff, Reflector, ReflectorState, Transition};
pub use shard::ShardedListWatch;

use ksm_core::Uid;

/// Receiver of reflected objects, keyed by UID. Implemented by metrics stores.
pub trait ObjectSink<K>: Send + Sync {
    fn upsert(&self, uid: Uid, obj: &K);
    fn remove(&self, uid: &Uid);
    /// UIDs currently held, used to reconcile after a relist.
    fn uids(&self) -> Vec<Uid>;
}

pub fn to_uid(uid_str: &str) -> Result<Uid> {
    let u = Uuid::parse_str(uid_str).context("parsing metadata.uid as uuid")?;
    Ok(*u.as_bytes())
}

/// Parsed `metadata.uid` of any typed object.
pub fn object_uid<K: Resource>(obj: &K) -> Result<Uid> {
    let uid = obj.meta().uid.as_deref().context("object missing metadata.uid")?;
    to_uid(uid)
}
