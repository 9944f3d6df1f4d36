//! Kubernetes label/annotation maps to Prometheus label pairs.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ConfigError;

/// Allow-list token admitting every key.
pub const WILDCARD: &str = "*";

static INVALID_LABEL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new("[^a-zA-Z0-9_]").expect("static regex"));
static MATCH_ALL_CAP: Lazy<Regex> = Lazy::new(|| Regex::new("([a-z0-9])([A-Z])").expect("static regex"));

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize_label_name(s: &str) -> String {
    INVALID_LABEL_CHARS.replace_all(s, "_").into_owned()
}

pub fn to_snake_case(s: &str) -> String {
    MATCH_ALL_CAP.replace_all(s, "${1}_${2}").to_lowercase()
}

/// `<prefix>_<snake(sanitized(key))>`
pub fn label_name(prefix: &str, key: &str) -> String {
    format!("{}_{}", prefix, to_snake_case(&sanitize_label_name(key)))
}

fn conflict_suffix(label: &str, count: usize) -> String {
    format!("{}_conflict{}", label, count)
}

/// Convert a key/value map into label keys and values sorted by original key.
///
/// Keys that collide after conversion are renamed `<name>_conflictN`; once a
/// collision exists the first key is renamed too.
pub fn map_to_prometheus_labels<'a, I>(prefix: &str, pairs: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let sorted: BTreeMap<&str, &str> = pairs.into_iter().collect();
    let mut keys: Vec<String> = Vec::with_capacity(sorted.len());
    let mut values: Vec<String> = Vec::with_capacity(sorted.len());

    // converted name -> (count seen, index of the first occurrence)
    let mut conflicts: HashMap<String, (usize, usize)> = HashMap::new();
    for (k, v) in sorted {
        let mut key = label_name(prefix, k);
        match conflicts.get_mut(&key) {
            Some((count, initial)) => {
                if *count == 1 {
                    keys[*initial] = conflict_suffix(&keys[*initial], 1);
                }
                *count += 1;
                key = conflict_suffix(&key, *count);
            }
            None => {
                conflicts.insert(key.clone(), (1, keys.len()));
            }
        }
        keys.push(key);
        values.push(v.to_string());
    }
    (keys, values)
}

/// Apply an allow list to a label/annotation map and convert the survivors.
///
/// `["*"]` admits every key; an empty list admits none.
pub fn allowed_prometheus_labels<'a, I>(prefix: &str, all: I, allow: &[String]) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    if allow.iter().any(|k| k == WILDCARD) {
        return map_to_prometheus_labels(prefix, all.into_iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    let allowed = all
        .into_iter()
        .filter(|(k, _)| allow.iter().any(|a| a == *k))
        .map(|(k, v)| (k.as_str(), v.as_str()));
    map_to_prometheus_labels(prefix, allowed)
}

/// Parse `res=[k1,k2],res2=[*]` into a resource-keyed allow list.
pub fn parse_allow_list(input: &str) -> Result<HashMap<String, Vec<String>>, ConfigError> {
    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    let mut rest = input.trim();
    while !rest.is_empty() {
        let (resource, after) = rest.split_once('=').ok_or_else(|| ConfigError::InvalidAllowList(input.to_string()))?;
        let after = after.trim_start();
        let body = after.strip_prefix('[').ok_or_else(|| ConfigError::InvalidAllowList(input.to_string()))?;
        let (inner, tail) = body.split_once(']').ok_or_else(|| ConfigError::InvalidAllowList(input.to_string()))?;
        let resource = resource.trim().trim_start_matches(',').trim();
        if resource.is_empty() {
            return Err(ConfigError::InvalidAllowList(input.to_string()));
        }
        let keys = out.entry(resource.to_string()).or_default();
        keys.extend(inner.split(',').map(str::trim).filter(|k| !k.is_empty()).map(str::to_string));
        rest = tail.trim_start().trim_start_matches(',').trim_start();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn snake_cases_and_sanitizes() {
        assert_eq!(label_name("label", "app.kubernetes.io/name"), "label_app_kubernetes_io_name");
        assert_eq!(label_name("annotation", "fooBar"), "annotation_foo_bar");
        assert_eq!(label_name("label", "HTTPServer"), "label_httpserver");
    }

    #[test]
    fn conflicting_keys_get_suffixes_in_sorted_order() {
        let m = map(&[("foo/bar", "b"), ("foo.bar", "a")]);
        let (keys, values) = allowed_prometheus_labels("annotation", &m, &["*".to_string()]);
        assert_eq!(keys, vec!["annotation_foo_bar_conflict1", "annotation_foo_bar_conflict2"]);
        assert_eq!(values, vec!["a", "b"]);
    }

    #[test]
    fn map_conversion_keeps_owned_keys_and_values() {
        let (keys, values) = map_to_prometheus_labels("label", [("zone", "a"), ("appName", "web"), ("app_name", "api")]);
        assert_eq!(keys, vec!["label_app_name_conflict1", "label_app_name_conflict2", "label_zone"]);
        assert_eq!(values, vec!["web", "api", "a"]);
    }

    #[test]
    fn third_conflict_keeps_counting() {
        let m = map(&[("a-b", "1"), ("a.b", "2"), ("a/b", "3"), ("c", "4")]);
        let (keys, _) = allowed_prometheus_labels("label", &m, &["*".to_string()]);
        assert_eq!(keys, vec!["label_a_b_conflict1", "label_a_b_conflict2", "label_a_b_conflict3", "label_c"]);
    }

    #[test]
    fn allow_list_filters_keys() {
        let m = map(&[("app", "web"), ("team", "infra")]);
        let (keys, values) = allowed_prometheus_labels("label", &m, &["app".to_string(), "missing".to_string()]);
        assert_eq!(keys, vec!["label_app"]);
        assert_eq!(values, vec!["web"]);

        let (keys, _) = allowed_prometheus_labels("label", &m, &[]);
        assert!(keys.is_empty());
    }

    #[test]
    fn parses_allow_list_grammar() {
        let parsed = parse_allow_list("clonesets=[app,team], daemonsets=[*],sidecarsets=[]").unwrap();
        assert_eq!(parsed["clonesets"], vec!["app", "team"]);
        assert_eq!(parsed["daemonsets"], vec!["*"]);
        assert!(parsed["sidecarsets"].is_empty());
        assert!(parse_allow_list("").unwrap().is_empty());
        assert!(parse_allow_list("clonesets=app").is_err());
        assert!(parse_allow_list("clonesets=[app").is_err());
    }
}
