//! Generators and field helpers shared by every kind.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::Resource;
use serde::{Deserialize, Serialize};

use ksm_core::labels::allowed_prometheus_labels;
use ksm_core::{FamilyGenerator, Metric};

/// Closed set of condition statuses, in emission order.
pub const CONDITION_STATUSES: [&str; 3] = ["True", "False", "Unknown"];

const ANNOTATIONS_HELP: &str = "Kruise annotations converted to Prometheus labels.";
const LABELS_HELP: &str = "Kruise labels converted to Prometheus labels.";

/// A status condition as carried by every Kruise workload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub(crate) fn bool_f64(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

/// Three samples per condition, `condition`/`status` labels, 1 on the observed status.
pub(crate) fn condition_metrics(conditions: &[Condition]) -> Vec<Metric> {
    let mut out = Vec::with_capacity(conditions.len() * CONDITION_STATUSES.len());
    for c in conditions {
        for status in CONDITION_STATUSES {
            out.push(Metric::with_labels(
                ["condition".to_string(), "status".to_string()],
                [c.type_.clone(), status.to_lowercase()],
                bool_f64(c.status == status),
            ));
        }
    }
    out
}

/// Resolve an int-or-percent against `total`. Absent or malformed values are 0.
pub fn scaled_value(v: Option<&IntOrString>, total: i32, round_up: bool) -> i32 {
    match v {
        None => 0,
        Some(IntOrString::Int(i)) => *i,
        Some(IntOrString::String(s)) => {
            let Some(pct) = s.trim().strip_suffix('%').and_then(|p| p.parse::<i32>().ok()) else {
                tracing::debug!(value = %s, "int-or-percent is neither an int nor a percentage");
                return 0;
            };
            let scaled = pct as f64 * total as f64 / 100.0;
            if round_up { scaled.ceil() as i32 } else { scaled.floor() as i32 }
        }
    }
}

/// Raw textual form of an int-or-percent, as written by the user.
pub(crate) fn int_or_string_label(v: &IntOrString) -> String {
    match v {
        IntOrString::Int(i) => i.to_string(),
        IntOrString::String(s) => s.clone(),
    }
}

/// One sample carrying a single descriptive label, valued 1.
pub(crate) fn info(key: &str, value: impl Into<String>) -> Vec<Metric> {
    vec![Metric::labeled(key, value, 1.0)]
}

pub(crate) fn gauge(v: impl Into<f64>) -> Vec<Metric> {
    vec![Metric::value(v.into())]
}

/// One sample per listed value, labelled `key`, valued 1 on `current`.
pub(crate) fn one_of(key: &str, values: &[&str], current: &str) -> Vec<Metric> {
    values.iter().map(|v| Metric::labeled(key, *v, bool_f64(*v == current))).collect()
}

pub(crate) fn created<K: Resource + 'static>(prefix: &str) -> FamilyGenerator<K> {
    FamilyGenerator::gauge(&format!("{prefix}_created"), "Unix creation timestamp", |o: &K| {
        match o.meta().creation_timestamp.as_ref() {
            Some(t) => gauge(t.0.timestamp() as f64),
            None => Vec::new(),
        }
    })
}

pub(crate) fn metadata_generation<K: Resource + 'static>(name: &str, help: &str) -> FamilyGenerator<K> {
    FamilyGenerator::gauge(name, help, |o: &K| gauge(o.meta().generation.unwrap_or(0) as f64))
}

pub(crate) fn annotations<K: Resource + 'static>(prefix: &str, allow: &[String]) -> FamilyGenerator<K> {
    map_family(format!("{prefix}_annotations"), ANNOTATIONS_HELP, "annotation", allow, |o: &K| {
        o.meta().annotations.as_ref()
    })
}

pub(crate) fn labels<K: Resource + 'static>(prefix: &str, allow: &[String]) -> FamilyGenerator<K> {
    map_family(format!("{prefix}_labels"), LABELS_HELP, "label", allow, |o: &K| o.meta().labels.as_ref())
}

fn map_family<K, F>(name: String, help: &str, label_prefix: &'static str, allow: &[String], map: F) -> FamilyGenerator<K>
where
    K: 'static,
    F: Fn(&K) -> Option<&BTreeMap<String, String>> + Send + Sync + 'static,
{
    let allow = allow.to_vec();
    FamilyGenerator::gauge(&name, help, move |o: &K| {
        if allow.is_empty() {
            return Vec::new();
        }
        let (keys, values) = match map(o) {
            Some(m) => allowed_prometheus_labels(label_prefix, m, &allow),
            None => (Vec::new(), Vec::new()),
        };
        vec![Metric::with_labels(keys, values, 1.0)]
    })
}

/// Upper bound on expanded reserved ordinals per object.
pub const MAX_RESERVED_ORDINALS: usize = 10_000;

/// Expand reserved ordinals (`3` or `"1-3"`) into a sorted, deduplicated set.
/// Any malformed range, or an expansion past [`MAX_RESERVED_ORDINALS`], yields nothing.
pub fn reserve_ordinals(items: &[IntOrString]) -> Vec<i32> {
    let mut out = Vec::new();
    for item in items {
        let width = match item {
            IntOrString::Int(_) => 1,
            IntOrString::String(s) => parse_range(s).map_or(0, |(start, end)| i64::from(end) - i64::from(start) + 1),
        };
        if out.len() as i64 + width > MAX_RESERVED_ORDINALS as i64 {
            tracing::warn!(limit = MAX_RESERVED_ORDINALS, "too many reserveOrdinals, ignoring all reserved ordinals");
            return Vec::new();
        }
        match item {
            IntOrString::Int(i) => out.push(*i),
            IntOrString::String(s) => match parse_range(s) {
                Some((start, end)) => out.extend(start..=end),
                None => {
                    tracing::warn!(range = %s, "invalid reserveOrdinals range, ignoring all reserved ordinals");
                    return Vec::new();
                }
            },
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}

fn parse_range(s: &str) -> Option<(i32, i32)> {
    let (a, b) = s.split_once('-')?;
    let (start, end) = (a.trim().parse::<i32>().ok()?, b.trim().parse::<i32>().ok()?);
    (start <= end).then_some((start, end))
}
