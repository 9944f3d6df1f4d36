//! `CloneSet` (apps.kruise.io/v1alpha1).

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};

use ksm_core::{FamilyGenerator, Metric};

use crate::common::{self, gauge, scaled_value, Condition};
use crate::ResourceKind;

const PREFIX: &str = "kruise_cloneset";

/// Update strategies a CloneSet can carry; one `spec_strategy_type` sample each.
pub const UPDATE_STRATEGY_TYPES: [&str; 3] = ["ReCreate", "InPlaceIfPossible", "InPlaceOnly"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneSet {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: CloneSetSpec,
    #[serde(default)]
    pub status: CloneSetStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloneSetSpec {
    pub replicas: Option<i32>,
    pub update_strategy: CloneSetUpdateStrategy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloneSetUpdateStrategy {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub partition: Option<IntOrString>,
    pub max_unavailable: Option<IntOrString>,
    pub max_surge: Option<IntOrString>,
    pub paused: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloneSetStatus {
    pub observed_generation: i64,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub available_replicas: i32,
    pub updated_replicas: i32,
    pub updated_ready_replicas: i32,
    pub conditions: Vec<Condition>,
}

impl CloneSet {
    /// Desired replicas, defaulted the way the API server does.
    pub fn desired_replicas(&self) -> i32 { self.spec.replicas.unwrap_or(1) }
}

kruise_resource!(CloneSet, "CloneSet", "v1alpha1", "clonesets", ResourceKind::CloneSets, namespaced);

pub fn families(allow_annotations: &[String], allow_labels: &[String]) -> Vec<FamilyGenerator<CloneSet>> {
    vec![
        common::created(PREFIX),
        FamilyGenerator::gauge("kruise_cloneset_status_replicas", "The number of replicas per cloneset.", |cs: &CloneSet| {
            gauge(cs.status.replicas)
        }),
        FamilyGenerator::gauge(
            "kruise_cloneset_status_replicas_available",
            "The number of available replicas per cloneset.",
            |cs: &CloneSet| gauge(cs.status.available_replicas),
        ),
        FamilyGenerator::gauge(
            "kruise_cloneset_status_replicas_updated",
            "The number of updated replicas per cloneset.",
            |cs: &CloneSet| gauge(cs.status.updated_replicas),
        ),
        FamilyGenerator::gauge(
            "kruise_cloneset_status_observed_generation",
            "The generation observed by the cloneset controller.",
            |cs: &CloneSet| gauge(cs.status.observed_generation as f64),
        ),
        FamilyGenerator::gauge(
            "kruise_cloneset_status_condition",
            "The current status conditions of a cloneset.",
            |cs: &CloneSet| common::condition_metrics(&cs.status.conditions),
        ),
        FamilyGenerator::gauge("kruise_cloneset_spec_replicas", "Number of desired pods for a cloneset.", |cs: &CloneSet| {
            gauge(cs.desired_replicas())
        }),
        FamilyGenerator::gauge(
            "kruise_cloneset_spec_strategy_rollingupdate_max_unavailable",
            "Maximum number of unavailable replicas during a rolling update of a cloneset.",
            |cs: &CloneSet| {
                let s = &cs.spec.update_strategy;
                gauge(scaled_value(s.max_unavailable.as_ref(), cs.desired_replicas(), false))
            },
        ),
        FamilyGenerator::gauge(
            "kruise_cloneset_spec_strategy_rollingupdate_max_surge",
            "Maximum number of replicas that can be scheduled above the desired number of replicas during a rolling update of a cloneset.",
            |cs: &CloneSet| {
                let s = &cs.spec.update_strategy;
                gauge(scaled_value(s.max_surge.as_ref(), cs.desired_replicas(), true))
            },
        ),
        common::metadata_generation(
            "kruise_cloneset_metadata_generation",
            "Sequence number representing a specific generation of the desired state.",
        ),
        common::annotations(PREFIX, allow_annotations),
        common::labels(PREFIX, allow_labels),
        FamilyGenerator::gauge(
            "kruise_cloneset_status_replicas_ready",
            "The number of ready replicas per cloneset.",
            |cs: &CloneSet| gauge(cs.status.ready_replicas),
        ),
        FamilyGenerator::gauge(
            "kruise_cloneset_status_replicas_updated_ready",
            "The number of update and ready replicas per cloneset.",
            |cs: &CloneSet| gauge(cs.status.updated_ready_replicas),
        ),
        FamilyGenerator::gauge(
            "kruise_cloneset_spec_strategy_partition",
            "Desired number or percent of Pods in old revisions.",
            |cs: &CloneSet| match cs.spec.update_strategy.partition.as_ref() {
                Some(p) => vec![Metric::labeled(
                    "partition",
                    common::int_or_string_label(p),
                    scaled_value(Some(p), cs.desired_replicas(), true) as f64,
                )],
                None => Vec::new(),
            },
        ),
        FamilyGenerator::gauge("kruise_cloneset_spec_strategy_type", "The type of updateStrategy.", |cs: &CloneSet| {
            // The API server defaults an absent type to ReCreate.
            let current = cs.spec.update_strategy.type_.as_deref().unwrap_or("ReCreate");
            common::one_of("strategy_type", &UPDATE_STRATEGY_TYPES, current)
        }),
    ]
}
