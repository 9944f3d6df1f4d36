//! OpenKruise workload kinds and the metric families generated for them.
//!
//! Every kind is a plain serde struct typed against its own spec/status and
//! implements [`kube::Resource`] by hand, so list/watch can run through a typed
//! `Api<K>` and generators never see an untyped object.

#![forbid(unsafe_code)]

use std::fmt::Debug;

use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;

use ksm_core::{FamilyGenerator, ObjectIdentity};

#[macro_use]
mod macros;
mod common;
mod registry;

pub mod broadcastjob;
pub mod cloneset;
pub mod containerrecreaterequest;
pub mod daemonset;
pub mod sidecarset;
pub mod statefulset;
pub mod workloadspread;

pub use broadcastjob::BroadcastJob;
pub use cloneset::CloneSet;
pub use common::{reserve_ordinals, scaled_value, Condition, CONDITION_STATUSES};
pub use containerrecreaterequest::ContainerRecreateRequest;
pub use daemonset::DaemonSet;
pub use registry::ResourceKind;
pub use sidecarset::SidecarSet;
pub use statefulset::StatefulSet;
pub use workloadspread::WorkloadSpread;

/// API group shared by every exported kind.
pub const GROUP: &str = "apps.kruise.io";

/// A Kruise kind the exporter knows how to watch and encode.
pub trait KruiseResource:
    Resource<DynamicType = ()> + ObjectIdentity + Clone + DeserializeOwned + Debug + Send + Sync + 'static
{
    const KIND: ResourceKind;

    /// Ordered family table, parameterised by the kind's allow lists.
    fn families(allow_annotations: &[String], allow_labels: &[String]) -> Vec<FamilyGenerator<Self>>;

    /// Typed API handle scoped to `namespace` (cluster-wide for `None` or for
    /// cluster-scoped kinds).
    fn api(client: Client, namespace: Option<&str>) -> Api<Self>;
}
