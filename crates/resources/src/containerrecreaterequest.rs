//! `ContainerRecreateRequest` (apps.kruise.io/v1alpha1).

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use ksm_core::FamilyGenerator;

use crate::common::{self, bool_f64, gauge};
use crate::ResourceKind;

const PREFIX: &str = "kruise_containerrecreaterequest";

pub const PHASE_PENDING: &str = "Pending";
pub const PHASE_RECREATING: &str = "Recreating";
pub const PHASE_SUCCEEDED: &str = "Succeeded";
pub const PHASE_FAILED: &str = "Failed";
pub const PHASE_COMPLETED: &str = "Completed";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecreateRequest {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ContainerRecreateRequestSpec,
    #[serde(default)]
    pub status: ContainerRecreateRequestStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerRecreateRequestSpec {
    pub pod_name: String,
    pub containers: Vec<RecreateContainer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecreateContainer {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerRecreateRequestStatus {
    pub phase: Option<String>,
    pub message: Option<String>,
    pub container_recreate_states: Vec<ContainerRecreateState>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerRecreateState {
    pub name: String,
    pub phase: Option<String>,
    pub message: Option<String>,
}

kruise_resource!(
    ContainerRecreateRequest,
    "ContainerRecreateRequest",
    "v1alpha1",
    "containerrecreaterequests",
    ResourceKind::ContainerRecreateRequests,
    namespaced
);

impl ContainerRecreateRequest {
    /// Containers whose recreate state is in `phase`.
    pub fn containers_in(&self, phase: &str) -> usize {
        self.status.container_recreate_states.iter().filter(|s| s.phase.as_deref() == Some(phase)).count()
    }

    pub fn is_phase(&self, phase: &str) -> bool { self.status.phase.as_deref() == Some(phase) }
}

pub fn families(allow_annotations: &[String], allow_labels: &[String]) -> Vec<FamilyGenerator<ContainerRecreateRequest>> {
    vec![
        common::annotations(PREFIX, allow_annotations),
        common::labels(PREFIX, allow_labels),
        common::created(PREFIX),
        FamilyGenerator::gauge(
            "kruise_containerrecreaterequest_containers_pending",
            "The number of containers which reached Phase Pending.",
            |crr: &ContainerRecreateRequest| gauge(crr.containers_in(PHASE_PENDING) as f64),
        ),
        FamilyGenerator::gauge(
            "kruise_containerrecreaterequest_containers_recreating",
            "The number of containers which reached Phase Recreating.",
            |crr: &ContainerRecreateRequest| gauge(crr.containers_in(PHASE_RECREATING) as f64),
        ),
        FamilyGenerator::gauge(
            "kruise_containerrecreaterequest_containers_succeeded",
            "The number of containers which reached Phase Succeeded.",
            |crr: &ContainerRecreateRequest| gauge(crr.containers_in(PHASE_SUCCEEDED) as f64),
        ),
        FamilyGenerator::gauge(
            "kruise_containerrecreaterequest_containers_failed",
            "The number of containers which reached Phase Failed.",
            |crr: &ContainerRecreateRequest| gauge(crr.containers_in(PHASE_FAILED) as f64),
        ),
        FamilyGenerator::gauge(
            "kruise_containerrecreaterequest_pending",
            "Whether the request is in Phase Pending.",
            |crr: &ContainerRecreateRequest| gauge(bool_f64(crr.is_phase(PHASE_PENDING))),
        ),
        FamilyGenerator::gauge(
            "kruise_containerrecreaterequest_recreating",
            "Whether the request is in Phase Recreating.",
            |crr: &ContainerRecreateRequest| gauge(bool_f64(crr.is_phase(PHASE_RECREATING))),
        ),
        FamilyGenerator::gauge(
            "kruise_containerrecreaterequest_completed",
            "Whether the request is in Phase Completed.",
            |crr: &ContainerRecreateRequest| gauge(bool_f64(crr.is_phase(PHASE_COMPLETED))),
        ),
    ]
}
