//! `BroadcastJob` (apps.kruise.io/v1alpha1).

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};

use ksm_core::FamilyGenerator;

use crate::common::{self, gauge, info, scaled_value, Condition};
use crate::ResourceKind;

const PREFIX: &str = "kruise_broadcastjob";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastJob {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: BroadcastJobSpec,
    #[serde(default)]
    pub status: BroadcastJobStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BroadcastJobSpec {
    pub parallelism: Option<IntOrString>,
    pub completion_policy: CompletionPolicy,
    pub paused: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionPolicy {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub active_deadline_seconds: Option<i64>,
    pub ttl_seconds_after_finished: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BroadcastJobStatus {
    pub conditions: Vec<Condition>,
    pub active: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub desired: i32,
    pub phase: Option<String>,
}

kruise_resource!(BroadcastJob, "BroadcastJob", "v1alpha1", "broadcastjobs", ResourceKind::BroadcastJobs, namespaced);

pub fn families(allow_annotations: &[String], allow_labels: &[String]) -> Vec<FamilyGenerator<BroadcastJob>> {
    vec![
        common::created(PREFIX),
        FamilyGenerator::gauge("kruise_broadcastjob_status_active", "The number of actively running pods.", |bj: &BroadcastJob| {
            gauge(bj.status.active)
        }),
        FamilyGenerator::gauge(
            "kruise_broadcastjob_status_succeeded",
            "The number of pods which reached phase Succeeded.",
            |bj: &BroadcastJob| gauge(bj.status.succeeded),
        ),
        FamilyGenerator::gauge(
            "kruise_broadcastjob_status_failed",
            "The number of pods which reached phase Failed.",
            |bj: &BroadcastJob| gauge(bj.status.failed),
        ),
        FamilyGenerator::gauge(
            "kruise_broadcastjob_status_desired",
            "The desired number of pods, this is typically equal to the number of nodes satisfied to run pods.",
            |bj: &BroadcastJob| gauge(bj.status.desired),
        ),
        FamilyGenerator::gauge(
            "kruise_broadcastjob_status_condition",
            "The current status conditions of a broadcastjob.",
            |bj: &BroadcastJob| common::condition_metrics(&bj.status.conditions),
        ),
        FamilyGenerator::gauge(
            "kruise_broadcastjob_spec_parallelism",
            "The maximum desired number of pods the job should run at any given time.",
            |bj: &BroadcastJob| gauge(scaled_value(bj.spec.parallelism.as_ref(), bj.status.desired, true)),
        ),
        common::metadata_generation(
            "kruise_broadcastjob_metadata_generation",
            "Sequence number representing a specific generation of the desired state.",
        ),
        common::annotations(PREFIX, allow_annotations),
        common::labels(PREFIX, allow_labels),
        FamilyGenerator::gauge(
            "kruise_broadcastjob_spec_strategy_activedeadline_seconds",
            "The duration in seconds relative to the startTime that the job may be active.",
            |bj: &BroadcastJob| gauge(bj.spec.completion_policy.active_deadline_seconds.unwrap_or(0) as f64),
        ),
        FamilyGenerator::gauge(
            "kruise_broadcastjob_spec_strategy_ttl_seconds",
            "The lifetime of a Job that has finished.",
            |bj: &BroadcastJob| gauge(bj.spec.completion_policy.ttl_seconds_after_finished.unwrap_or(0)),
        ),
        FamilyGenerator::gauge("kruise_broadcastjob_spec_strategy_type", "The type of completionpolicy.", |bj: &BroadcastJob| {
            info("strategy_type", bj.spec.completion_policy.type_.as_deref().unwrap_or("Always"))
        }),
    ]
}
