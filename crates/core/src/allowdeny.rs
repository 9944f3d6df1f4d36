//! Metric-name allow/deny filtering.

use std::fmt;

use regex::RegexSet;

use crate::ConfigError;

/// Family-name filter. A name is kept iff it matches some allow pattern (when
/// any are configured) and no deny pattern. Deny wins on overlap.
#[derive(Debug, Clone)]
pub struct AllowDenyList {
    allow: Option<RegexSet>,
    deny: Option<RegexSet>,
    allow_patterns: Vec<String>,
    deny_patterns: Vec<String>,
}

impl Default for AllowDenyList {
    fn default() -> Self {
        Self { allow: None, deny: None, allow_patterns: Vec::new(), deny_patterns: Vec::new() }
    }
}

fn compile(patterns: &[String]) -> Result<Option<RegexSet>, ConfigError> {
    let patterns: Vec<&str> = patterns.iter().map(|p| p.trim()).filter(|p| !p.is_empty()).collect();
    if patterns.is_empty() {
        return Ok(None);
    }
    // Compile one by one first so the error names the offending pattern.
    for p in &patterns {
        regex::Regex::new(p).map_err(|source| ConfigError::InvalidRegex { pattern: p.to_string(), source })?;
    }
    RegexSet::new(&patterns)
        .map(Some)
        .map_err(|source| ConfigError::InvalidRegex { pattern: patterns.join("|"), source })
}

impl AllowDenyList {
    pub fn new(allow: &[String], deny: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            allow: compile(allow)?,
            deny: compile(deny)?,
            allow_patterns: allow.to_vec(),
            deny_patterns: deny.to_vec(),
        })
    }

    pub fn is_included(&self, name: &str) -> bool {
        if self.deny.as_ref().is_some_and(|d| d.is_match(name)) {
            return false;
        }
        self.allow.as_ref().map_or(true, |a| a.is_match(name))
    }

    pub fn is_excluded(&self, name: &str) -> bool { !self.is_included(name) }
}

impl fmt::Display for AllowDenyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.allow.is_some(), self.deny.is_some()) {
            (false, false) => write!(f, "Including all metrics"),
            (true, false) => write!(f, "Including {}", self.allow_patterns.join(", ")),
            (false, true) => write!(f, "Excluding {}", self.deny_patterns.join(", ")),
            (true, true) => write!(
                f,
                "Including {}; excluding {}",
                self.allow_patterns.join(", "),
                self.deny_patterns.join(", ")
            ),
        }
    }
}
