//! `SidecarSet` (apps.kruise.io/v1alpha1). Cluster-scoped, so the identity
//! namespace label is always empty.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};

use ksm_core::{FamilyGenerator, Metric};

use crate::common::{self, gauge, info, scaled_value};
use crate::ResourceKind;

const PREFIX: &str = "kruise_sidecarset";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarSet {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: SidecarSetSpec,
    #[serde(default)]
    pub status: SidecarSetStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SidecarSetSpec {
    /// Deprecated single-namespace selector.
    pub namespace: Option<String>,
    pub containers: Vec<SidecarContainer>,
    pub update_strategy: SidecarSetUpdateStrategy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SidecarContainer {
    pub name: String,
    pub pod_inject_policy: Option<String>,
    pub upgrade_strategy: SidecarContainerUpgradeStrategy,
    pub share_volume_policy: ShareVolumePolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SidecarContainerUpgradeStrategy {
    pub upgrade_type: Option<String>,
    pub hot_upgrade_empty_image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShareVolumePolicy {
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SidecarSetUpdateStrategy {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub partition: Option<IntOrString>,
    pub max_unavailable: Option<IntOrString>,
    pub paused: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SidecarSetStatus {
    pub observed_generation: i64,
    pub matched_pods: i32,
    pub updated_pods: i32,
    pub ready_pods: i32,
    pub updated_ready_pods: i32,
}

kruise_resource!(SidecarSet, "SidecarSet", "v1alpha1", "sidecarsets", ResourceKind::SidecarSets, cluster);

/// One sample per sidecar container, `container` label first.
fn per_container<F>(sc: &SidecarSet, key: &str, value: F) -> Vec<Metric>
where
    F: Fn(&SidecarContainer) -> String,
{
    sc.spec
        .containers
        .iter()
        .map(|c| Metric::with_labels(["container".to_string(), key.to_string()], [c.name.clone(), value(c)], 1.0))
        .collect()
}

pub fn families(allow_annotations: &[String], allow_labels: &[String]) -> Vec<FamilyGenerator<SidecarSet>> {
    vec![
        common::created(PREFIX),
        FamilyGenerator::gauge(
            "kruise_sidecarset_status_replicas_matched",
            "The number of matched replicas per sidecarset.",
            |sc: &SidecarSet| gauge(sc.status.matched_pods),
        ),
        FamilyGenerator::gauge(
            "kruise_sidecarset_status_replicas_updated",
            "The number of updated replicas per sidecarset.",
            |sc: &SidecarSet| gauge(sc.status.updated_pods),
        ),
        FamilyGenerator::gauge(
            "kruise_sidecarset_status_replicas_ready",
            "The number of ready replicas per sidecarset.",
            |sc: &SidecarSet| gauge(sc.status.ready_pods),
        ),
        FamilyGenerator::gauge(
            "kruise_sidecarset_status_observed_generation",
            "The generation observed by the sidecarset controller.",
            |sc: &SidecarSet| gauge(sc.status.observed_generation as f64),
        ),
        FamilyGenerator::gauge(
            "kruise_sidecarset_status_replicas_updated_ready",
            "The number of update and ready replicas per sidecarset.",
            |sc: &SidecarSet| gauge(sc.status.updated_ready_pods),
        ),
        FamilyGenerator::gauge("kruise_sidecarset_spec_namespace", "The namespace matched pods in.", |sc: &SidecarSet| {
            match sc.spec.namespace.as_deref() {
                Some(ns) if !ns.is_empty() => info("selector_namespace", ns),
                _ => Vec::new(),
            }
        }),
        FamilyGenerator::gauge(
            "kruise_sidecarset_spec_strategy_rollingupdate_max_unavailable",
            "Maximum number of unavailable replicas during a rolling update of a sidecarset.",
            |sc: &SidecarSet| {
                let s = &sc.spec.update_strategy;
                gauge(scaled_value(s.max_unavailable.as_ref(), sc.status.matched_pods, false))
            },
        ),
        FamilyGenerator::gauge(
            "kruise_sidecarset_spec_strategy_partition",
            "Desired number or percent of Pods in old revisions.",
            |sc: &SidecarSet| match sc.spec.update_strategy.partition.as_ref() {
                Some(p) => vec![Metric::labeled(
                    "partition",
                    common::int_or_string_label(p),
                    scaled_value(Some(p), sc.status.matched_pods, true) as f64,
                )],
                None => Vec::new(),
            },
        ),
        FamilyGenerator::gauge("kruise_sidecarset_spec_strategy_type", "The type of updateStrategy.", |sc: &SidecarSet| {
            info("strategy_type", sc.spec.update_strategy.type_.as_deref().unwrap_or("RollingUpdate"))
        }),
        common::metadata_generation(
            "kruise_sidecarset_spec_metadata_generation",
            "Sequence number representing a specific generation of the desired state.",
        ),
        common::annotations(PREFIX, allow_annotations),
        common::labels(PREFIX, allow_labels),
        FamilyGenerator::gauge(
            "kruise_sidecarset_spec_containers_injectpolicy",
            "The rules that injected SidecarContainer into Pod.spec.containers.",
            |sc: &SidecarSet| {
                per_container(sc, "injectpolicy", |c| c.pod_inject_policy.clone().unwrap_or_else(|| "BeforeAppContainer".into()))
            },
        ),
        FamilyGenerator::gauge(
            "kruise_sidecarset_spec_containers_strategy_type",
            "The type of containers' upgradeStrategy.",
            |sc: &SidecarSet| {
                per_container(sc, "strategy_type", |c| {
                    c.upgrade_strategy.upgrade_type.clone().unwrap_or_else(|| "ColdUpgrade".into())
                })
            },
        ),
        FamilyGenerator::gauge(
            "kruise_sidecarset_spec_containers_strategy_hotupgradeemptyimage",
            "The empty image used to hot-upgrade a sidecar container.",
            |sc: &SidecarSet| {
                per_container(sc, "hotupgradeemptyimage", |c| {
                    c.upgrade_strategy.hot_upgrade_empty_image.clone().unwrap_or_default()
                })
            },
        ),
        FamilyGenerator::gauge(
            "kruise_sidecarset_spec_containers_volumepolicy",
            "Whether the sidecar container shares the other containers' VolumeMounts.",
            |sc: &SidecarSet| {
                per_container(sc, "volumepolicy", |c| c.share_volume_policy.type_.clone().unwrap_or_else(|| "disabled".into()))
            },
        ),
    ]
}
