//! Advanced `StatefulSet` (apps.kruise.io/v1beta1).

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};

use ksm_core::{FamilyGenerator, Metric};

use crate::common::{self, gauge, info, scaled_value, Condition};
use crate::ResourceKind;

const PREFIX: &str = "kruise_statefulset";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatefulSet {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: StatefulSetSpec,
    #[serde(default)]
    pub status: StatefulSetStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatefulSetSpec {
    pub replicas: Option<i32>,
    pub reserve_ordinals: Vec<IntOrString>,
    pub update_strategy: StatefulSetUpdateStrategy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatefulSetUpdateStrategy {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub rolling_update: Option<RollingUpdateStatefulSetStrategy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RollingUpdateStatefulSetStrategy {
    pub partition: Option<i32>,
    pub max_unavailable: Option<IntOrString>,
    pub pod_update_policy: Option<String>,
    pub paused: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatefulSetStatus {
    pub observed_generation: i64,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub available_replicas: i32,
    pub current_replicas: i32,
    pub updated_replicas: i32,
    pub current_revision: String,
    pub update_revision: String,
    pub conditions: Vec<Condition>,
}

kruise_resource!(StatefulSet, "StatefulSet", "v1beta1", "statefulsets", ResourceKind::StatefulSets, namespaced);

fn desired(s: &StatefulSet) -> i32 { s.spec.replicas.unwrap_or(1) }

pub fn families(allow_annotations: &[String], allow_labels: &[String]) -> Vec<FamilyGenerator<StatefulSet>> {
    vec![
        common::created(PREFIX),
        FamilyGenerator::gauge(
            "kruise_statefulset_status_replicas",
            "The number of replicas per statefulset.",
            |s: &StatefulSet| gauge(s.status.replicas),
        ),
        FamilyGenerator::gauge(
            "kruise_statefulset_status_replicas_available",
            "The number of available replicas per statefulset.",
            |s: &StatefulSet| gauge(s.status.available_replicas),
        ),
        FamilyGenerator::gauge(
            "kruise_statefulset_status_replicas_current",
            "The number of current replicas per statefulset.",
            |s: &StatefulSet| gauge(s.status.current_replicas),
        ),
        FamilyGenerator::gauge(
            "kruise_statefulset_status_replicas_ready",
            "The number of ready replicas per statefulset.",
            |s: &StatefulSet| gauge(s.status.ready_replicas),
        ),
        FamilyGenerator::gauge(
            "kruise_statefulset_status_replicas_updated",
            "The number of updated replicas per statefulset.",
            |s: &StatefulSet| gauge(s.status.updated_replicas),
        ),
        FamilyGenerator::gauge(
            "kruise_statefulset_status_observed_generation",
            "The generation observed by the statefulset controller.",
            |s: &StatefulSet| gauge(s.status.observed_generation as f64),
        ),
        FamilyGenerator::gauge(
            "kruise_statefulset_status_condition",
            "The current status conditions of a statefulset.",
            |s: &StatefulSet| common::condition_metrics(&s.status.conditions),
        ),
        FamilyGenerator::gauge("kruise_statefulset_replicas", "Number of desired pods for a statefulset.", |s: &StatefulSet| {
            s.spec.replicas.map(gauge).unwrap_or_default()
        }),
        common::metadata_generation(
            "kruise_statefulset_metadata_generation",
            "Sequence number representing a specific generation of the desired state for the statefulset.",
        ),
        FamilyGenerator::gauge(
            "kruise_statefulset_spec_replicas",
            "Number of desired pods for a statefulset.",
            |s: &StatefulSet| gauge(desired(s)),
        ),
        FamilyGenerator::gauge(
            "kruise_statefulset_spec_strategy_rollingupdate_max_unavailable",
            "Maximum number of unavailable replicas during a rolling update of a statefulset.",
            |s: &StatefulSet| {
                let max = s.spec.update_strategy.rolling_update.as_ref().and_then(|r| r.max_unavailable.as_ref());
                gauge(scaled_value(max, desired(s), false))
            },
        ),
        FamilyGenerator::gauge(
            "kruise_statefulset_spec_reserveordinals",
            "Ordinals the statefulset skips when creating pods.",
            |s: &StatefulSet| {
                common::reserve_ordinals(&s.spec.reserve_ordinals)
                    .into_iter()
                    .map(|o| Metric::labeled("ordinal", o.to_string(), 1.0))
                    .collect()
            },
        ),
        common::annotations(PREFIX, allow_annotations),
        common::labels(PREFIX, allow_labels),
        FamilyGenerator::gauge(
            "kruise_statefulset_status_current_revision",
            "Indicates the version of the statefulset used to generate Pods in the sequence [0,currentReplicas).",
            |s: &StatefulSet| info("revision", s.status.current_revision.as_str()),
        ),
        FamilyGenerator::gauge(
            "kruise_statefulset_status_update_revision",
            "Indicates the version of the statefulset used to generate Pods in the sequence [replicas-updatedReplicas,replicas)",
            |s: &StatefulSet| info("revision", s.status.update_revision.as_str()),
        ),
        FamilyGenerator::gauge("kruise_statefulset_spec_strategy_type", "The type of updateStrategy.", |s: &StatefulSet| {
            info("strategy_type", s.spec.update_strategy.type_.as_deref().unwrap_or("RollingUpdate"))
        }),
    ]
}
