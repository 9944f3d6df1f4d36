use std::fmt;
use std::str::FromStr;

use ksm_core::ConfigError;

/// Every kind the exporter can serve, keyed by its plural resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    BroadcastJobs,
    CloneSets,
    ContainerRecreateRequests,
    DaemonSets,
    SidecarSets,
    StatefulSets,
    WorkloadSpreads,
}

impl ResourceKind {
    /// Lexical order of the plural names.
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::BroadcastJobs,
        ResourceKind::CloneSets,
        ResourceKind::ContainerRecreateRequests,
        ResourceKind::DaemonSets,
        ResourceKind::SidecarSets,
        ResourceKind::StatefulSets,
        ResourceKind::WorkloadSpreads,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::BroadcastJobs => "broadcastjobs",
            ResourceKind::CloneSets => "clonesets",
            ResourceKind::ContainerRecreateRequests => "containerrecreaterequests",
            ResourceKind::DaemonSets => "daemonsets",
            ResourceKind::SidecarSets => "sidecarsets",
            ResourceKind::StatefulSets => "statefulsets",
            ResourceKind::WorkloadSpreads => "workloadspreads",
        }
    }

    /// Identity label key, also the family-name infix.
    pub fn identity_label(&self) -> &'static str {
        let plural = self.as_str();
        &plural[..plural.len() - 1]
    }

    pub fn namespaced(&self) -> bool { !matches!(self, ResourceKind::SidecarSets) }

    pub fn names() -> Vec<&'static str> { Self::ALL.iter().map(|k| k.as_str()).collect() }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ResourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL.iter().copied().find(|k| k.as_str() == s).ok_or_else(|| ConfigError::UnknownResource {
            name: s.to_string(),
            available: Self::names().join(","),
        })
    }
}
