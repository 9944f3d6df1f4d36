//! Metric family descriptors.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

/// Exposition type of a family. Everything this exporter produces is a gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Gauge,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
        }
    }
}

pub type LabelVec = SmallVec<[String; 4]>;

/// One sample produced by a generator: extra labels (identity labels are added
/// by the encoder) and a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub label_keys: LabelVec,
    pub label_values: LabelVec,
    pub value: f64,
}

impl Metric {
    /// Sample without extra labels.
    pub fn value(value: f64) -> Self {
        Self { label_keys: LabelVec::new(), label_values: LabelVec::new(), value }
    }

    /// Sample with a single extra label.
    pub fn labeled(key: &str, label_value: impl Into<String>, value: f64) -> Self {
        let mut label_keys = LabelVec::new();
        label_keys.push(key.to_string());
        let mut label_values = LabelVec::new();
        label_values.push(label_value.into());
        Self { label_keys, label_values, value }
    }

    /// Sample with parallel key/value vectors. Extra values are ignored if the
    /// lengths differ.
    pub fn with_labels<I, J>(keys: I, values: J, value: f64) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        let mut label_keys: LabelVec = keys.into_iter().collect();
        let mut label_values: LabelVec = values.into_iter().collect();
        let n = label_keys.len().min(label_values.len());
        label_keys.truncate(n);
        label_values.truncate(n);
        Self { label_keys, label_values, value }
    }
}

pub type GenerateFn<K> = Arc<dyn Fn(&K) -> Vec<Metric> + Send + Sync>;

/// Immutable family descriptor: name, help, type and a pure generator over `K`.
pub struct FamilyGenerator<K> {
    name: String,
    help: String,
    kind: MetricType,
    generate: GenerateFn<K>,
}

impl<K> FamilyGenerator<K> {
    pub fn new<F>(name: &str, help: &str, kind: MetricType, generate: F) -> Self
    where
        F: Fn(&K) -> Vec<Metric> + Send + Sync + 'static,
    {
        Self { name: name.to_string(), help: help.to_string(), kind, generate: Arc::new(generate) }
    }

    pub fn gauge<F>(name: &str, help: &str, generate: F) -> Self
    where
        F: Fn(&K) -> Vec<Metric> + Send + Sync + 'static,
    {
        Self::new(name, help, MetricType::Gauge, generate)
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn help(&self) -> &str { &self.help }
    pub fn kind(&self) -> MetricType { self.kind }

    pub fn generate(&self, obj: &K) -> Vec<Metric> { (self.generate)(obj) }

    /// `# HELP` and `# TYPE` lines, without a trailing newline.
    pub fn header(&self) -> String {
        format!("# HELP {} {}\n# TYPE {} {}", self.name, escape_help(&self.help), self.name, self.kind.as_str())
    }
}

impl<K> Clone for FamilyGenerator<K> {
    fn clone(&self) -> Self {
        Self { name: self.name.clone(), help: self.help.clone(), kind: self.kind, generate: Arc::clone(&self.generate) }
    }
}

impl<K> fmt::Debug for FamilyGenerator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FamilyGenerator").field("name", &self.name).field("kind", &self.kind).finish()
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Retain only the families whose names the list admits.
pub fn filter_families<K>(families: Vec<FamilyGenerator<K>>, list: &crate::AllowDenyList) -> Vec<FamilyGenerator<K>> {
    families.into_iter().filter(|f| list.is_included(f.name())).collect()
}
