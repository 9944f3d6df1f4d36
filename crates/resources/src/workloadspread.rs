//! `WorkloadSpread` (apps.kruise.io/v1alpha1).

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use ksm_core::{FamilyGenerator, Metric};

use crate::common::{self, info, Condition};
use crate::ResourceKind;

const PREFIX: &str = "kruise_workloadspread";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSpread {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: WorkloadSpreadSpec,
    #[serde(default)]
    pub status: WorkloadSpreadStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadSpreadSpec {
    pub schedule_strategy: ScheduleStrategy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleStrategy {
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadSpreadStatus {
    pub observed_generation: i64,
    pub subset_statuses: Vec<SubsetStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubsetStatus {
    pub name: String,
    pub replicas: i32,
    pub missing_replicas: i32,
    pub conditions: Vec<Condition>,
}

kruise_resource!(WorkloadSpread, "WorkloadSpread", "v1alpha1", "workloadspreads", ResourceKind::WorkloadSpreads, namespaced);

fn per_subset(ws: &WorkloadSpread, value: fn(&SubsetStatus) -> i32) -> Vec<Metric> {
    ws.status.subset_statuses.iter().map(|s| Metric::labeled("subset", s.name.as_str(), value(s) as f64)).collect()
}

pub fn families(allow_annotations: &[String], allow_labels: &[String]) -> Vec<FamilyGenerator<WorkloadSpread>> {
    vec![
        common::created(PREFIX),
        FamilyGenerator::gauge(
            "kruise_workloadspread_status_subset_replicas",
            "The most recently observed number of replicas for subset.",
            |ws: &WorkloadSpread| per_subset(ws, |s| s.replicas),
        ),
        FamilyGenerator::gauge(
            "kruise_workloadspread_status_subset_replicas_missing",
            "The number of replicas belong to this subset not be found.",
            |ws: &WorkloadSpread| per_subset(ws, |s| s.missing_replicas),
        ),
        common::metadata_generation(
            "kruise_workloadspread_metadata_generation",
            "Sequence number representing a specific generation of the desired state for the workloadspread.",
        ),
        common::annotations(PREFIX, allow_annotations),
        common::labels(PREFIX, allow_labels),
        FamilyGenerator::gauge(
            "kruise_workloadspread_spec_strategy_type",
            "The type of scheduleStrategy.",
            |ws: &WorkloadSpread| info("strategy_type", ws.spec.schedule_strategy.type_.as_deref().unwrap_or("Fixed")),
        ),
    ]
}
