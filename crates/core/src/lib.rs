//! Kruise state metrics core types.
//!
//! Family descriptors, the per-object text encoder, label allow-lists,
//! metric-name allow/deny filtering and the UID shard selector. Nothing in
//! here talks to the cluster.

#![forbid(unsafe_code)]

pub mod allowdeny;
pub mod encode;
pub mod error;
pub mod family;
pub mod labels;
pub mod shard;

pub use allowdeny::AllowDenyList;
pub use encode::{Encoded, Encoder};
pub use error::ConfigError;
pub use family::{FamilyGenerator, Metric, MetricType};
pub use shard::ShardSelector;

/// Stable object identity (parsed `metadata.uid`).
pub type Uid = [u8; 16];

/// Namespace/name accessors the encoder needs to build identity labels.
pub trait ObjectIdentity {
    fn namespace(&self) -> &str;
    fn name(&self) -> &str;
}

pub mod prelude {
    pub use super::{
        AllowDenyList, ConfigError, Encoded, Encoder, FamilyGenerator, Metric, MetricType, ObjectIdentity,
        ShardSelector, Uid,
    };
}
