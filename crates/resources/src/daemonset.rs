//! Advanced `DaemonSet` (apps.kruise.io/v1alpha1).

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};

use ksm_core::{FamilyGenerator, Metric};

use crate::common::{self, gauge, info, scaled_value, Condition};
use crate::ResourceKind;

const PREFIX: &str = "kruise_daemonset";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonSet {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: DaemonSetSpec,
    #[serde(default)]
    pub status: DaemonSetStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DaemonSetSpec {
    pub update_strategy: DaemonSetUpdateStrategy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DaemonSetUpdateStrategy {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub rolling_update: Option<RollingUpdateDaemonSet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollingUpdateDaemonSet {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub max_unavailable: Option<IntOrString>,
    pub max_surge: Option<IntOrString>,
    pub partition: Option<i32>,
    pub paused: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DaemonSetStatus {
    pub current_number_scheduled: i32,
    pub number_misscheduled: i32,
    pub desired_number_scheduled: i32,
    pub number_ready: i32,
    pub observed_generation: i64,
    pub updated_number_scheduled: i32,
    pub number_available: i32,
    pub number_unavailable: i32,
    pub conditions: Vec<Condition>,
}

kruise_resource!(DaemonSet, "DaemonSet", "v1alpha1", "daemonsets", ResourceKind::DaemonSets, namespaced);

fn rolling(ds: &DaemonSet) -> Option<&RollingUpdateDaemonSet> { ds.spec.update_strategy.rolling_update.as_ref() }

pub fn families(allow_annotations: &[String], allow_labels: &[String]) -> Vec<FamilyGenerator<DaemonSet>> {
    vec![
        common::created(PREFIX),
        FamilyGenerator::gauge(
            "kruise_daemonset_status_condition",
            "The current status conditions of a daemonset.",
            |ds: &DaemonSet| common::condition_metrics(&ds.status.conditions),
        ),
        FamilyGenerator::gauge(
            "kruise_daemonset_spec_strategy_rollingupdate_max_surge",
            "Maximum number of replicas that can be scheduled above the desired number of replicas during a rolling update of a daemonset.",
            |ds: &DaemonSet| {
                let surge = rolling(ds).and_then(|r| r.max_surge.as_ref());
                gauge(scaled_value(surge, ds.status.desired_number_scheduled, true))
            },
        ),
        FamilyGenerator::gauge(
            "kruise_daemonset_spec_strategy_partition",
            "Desired number of Pods in old revisions.",
            |ds: &DaemonSet| match rolling(ds).and_then(|r| r.partition) {
                Some(p) => vec![Metric::labeled("partition", p.to_string(), p as f64)],
                None => Vec::new(),
            },
        ),
        FamilyGenerator::gauge("kruise_daemonset_spec_strategy_type", "The type of updateStrategy.", |ds: &DaemonSet| {
            info("strategy_type", ds.spec.update_strategy.type_.as_deref().unwrap_or("RollingUpdate"))
        }),
        FamilyGenerator::gauge(
            "kruise_daemonset_status_current_number_scheduled",
            "The number of nodes running at least one daemon pod and are supposed to.",
            |ds: &DaemonSet| gauge(ds.status.current_number_scheduled),
        ),
        FamilyGenerator::gauge(
            "kruise_daemonset_status_desired_number_scheduled",
            "The number of nodes that should be running the daemon pod.",
            |ds: &DaemonSet| gauge(ds.status.desired_number_scheduled),
        ),
        FamilyGenerator::gauge(
            "kruise_daemonset_status_number_available",
            "The number of nodes that should be running the daemon pod and have one or more of the daemon pod running and available.",
            |ds: &DaemonSet| gauge(ds.status.number_available),
        ),
        FamilyGenerator::gauge(
            "kruise_daemonset_status_number_misscheduled",
            "The number of nodes running a daemon pod but are not supposed to.",
            |ds: &DaemonSet| gauge(ds.status.number_misscheduled),
        ),
        FamilyGenerator::gauge(
            "kruise_daemonset_status_number_ready",
            "The number of nodes that should be running the daemon pod and have one or more of the daemon pod running and ready.",
            |ds: &DaemonSet| gauge(ds.status.number_ready),
        ),
        FamilyGenerator::gauge(
            "kruise_daemonset_status_number_unavailable",
            "The number of nodes that should be running the daemon pod and have none of the daemon pod running and available.",
            |ds: &DaemonSet| gauge(ds.status.number_unavailable),
        ),
        FamilyGenerator::gauge(
            "kruise_daemonset_status_observed_generation",
            "The most recent generation observed by the daemon set controller.",
            |ds: &DaemonSet| gauge(ds.status.observed_generation as f64),
        ),
        FamilyGenerator::gauge(
            "kruise_daemonset_status_updated_number_scheduled",
            "The total number of nodes that are running updated daemon pod.",
            |ds: &DaemonSet| gauge(ds.status.updated_number_scheduled),
        ),
        common::metadata_generation(
            "kruise_daemonset_metadata_generation",
            "Sequence number representing a specific generation of the desired state.",
        ),
        common::annotations(PREFIX, allow_annotations),
        common::labels(PREFIX, allow_labels),
    ]
}
