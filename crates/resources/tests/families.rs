#![forbid(unsafe_code)]

use ksm_core::{Encoder, ObjectIdentity};
use ksm_resources::{
    BroadcastJob, CloneSet, ContainerRecreateRequest, DaemonSet, KruiseResource, SidecarSet, StatefulSet, WorkloadSpread,
};

fn s(v: &[&str]) -> Vec<String> { v.iter().map(|x| x.to_string()).collect() }

fn meta(name: &str, ns: Option<&str>) -> serde_json::Value {
    let mut meta = serde_json::json!({
        "name": name,
        "uid": format!("00000000-0000-0000-0000-{:012}", 1),
        "creationTimestamp": "2020-01-01T00:00:00Z",
        "generation": 4,
    });
    if let Some(ns) = ns { meta["namespace"] = serde_json::Value::String(ns.to_string()); }
    meta
}

fn encode<K: KruiseResource>(obj: &K, annotations: &[String], labels: &[String]) -> String {
    let enc = Encoder::new(K::KIND.identity_label(), K::families(annotations, labels));
    String::from_utf8(enc.encode(obj).as_bytes().to_vec()).unwrap()
}

fn cloneset() -> CloneSet {
    let mut m = meta("cs", Some("ns"));
    m["labels"] = serde_json::json!({ "app": "web", "team": "infra" });
    serde_json::from_value(serde_json::json!({
        "metadata": m,
        "spec": { "replicas": 3, "updateStrategy": { "type": "InPlaceIfPossible", "maxSurge": "50%", "partition": "34%" } },
        "status": { "replicas": 2, "readyReplicas": 1 },
    }))
    .unwrap()
}

#[test]
fn cloneset_scenario_lines() {
    let out = encode(&cloneset(), &[], &s(&["app"]));
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines.contains(&r#"kruise_cloneset_spec_replicas{namespace="ns",cloneset="cs"} 3"#));
    assert!(lines.contains(&r#"kruise_cloneset_status_replicas{namespace="ns",cloneset="cs"} 2"#));
    assert!(lines.contains(&r#"kruise_cloneset_labels{namespace="ns",cloneset="cs",label_app="web"} 1"#));
    assert!(lines.contains(&r#"kruise_cloneset_created{namespace="ns",cloneset="cs"} 1577836800"#));
    assert!(lines.contains(&r#"kruise_cloneset_metadata_generation{namespace="ns",cloneset="cs"} 4"#));
    // 50% of 3 rounds up, unavailable defaults to 0.
    assert!(lines.contains(&r#"kruise_cloneset_spec_strategy_rollingupdate_max_surge{namespace="ns",cloneset="cs"} 2"#));
    assert!(lines.contains(&r#"kruise_cloneset_spec_strategy_rollingupdate_max_unavailable{namespace="ns",cloneset="cs"} 0"#));
    assert!(lines.contains(&r#"kruise_cloneset_spec_strategy_partition{namespace="ns",cloneset="cs",partition="34%"} 2"#));
    assert!(lines.contains(&r#"kruise_cloneset_spec_strategy_type{namespace="ns",cloneset="cs",strategy_type="InPlaceIfPossible"} 1"#));
    assert!(lines.contains(&r#"kruise_cloneset_spec_strategy_type{namespace="ns",cloneset="cs",strategy_type="ReCreate"} 0"#));
    // No annotation allow list: nothing emitted for annotations.
    assert!(!out.contains("kruise_cloneset_annotations"));
    assert!(out.ends_with('\n'));
    assert!(!out.contains("\n\n"));
}

#[test]
fn encoding_is_deterministic() {
    let a = encode(&cloneset(), &s(&["*"]), &s(&["*"]));
    let b = encode(&cloneset(), &s(&["*"]), &s(&["*"]));
    assert_eq!(a, b);
    assert!(a.contains(r#"kruise_cloneset_labels{namespace="ns",cloneset="cs",label_app="web",label_team="infra"} 1"#));
}

#[test]
fn absent_replicas_default_to_one() {
    let cs: CloneSet = serde_json::from_value(serde_json::json!({ "metadata": meta("cs", Some("ns")) })).unwrap();
    let out = encode(&cs, &[], &[]);
    assert!(out.contains(r#"kruise_cloneset_spec_replicas{namespace="ns",cloneset="cs"} 1"#));
    assert!(!out.contains("kruise_cloneset_spec_strategy_partition"));
    assert!(!out.contains("kruise_cloneset_status_condition"));
}

#[test]
fn broadcastjob_condition_scenario() {
    let bj: BroadcastJob = serde_json::from_value(serde_json::json!({
        "metadata": meta("bj", Some("ns")),
        "spec": { "parallelism": "50%" },
        "status": { "desired": 5, "conditions": [{ "type": "Complete", "status": "True" }] },
    }))
    .unwrap();
    let out = encode(&bj, &[], &[]);
    let cond: Vec<&str> = out.lines().filter(|l| l.starts_with("kruise_broadcastjob_status_condition")).collect();
    assert_eq!(
        cond,
        vec![
            r#"kruise_broadcastjob_status_condition{namespace="ns",broadcastjob="bj",condition="Complete",status="true"} 1"#,
            r#"kruise_broadcastjob_status_condition{namespace="ns",broadcastjob="bj",condition="Complete",status="false"} 0"#,
            r#"kruise_broadcastjob_status_condition{namespace="ns",broadcastjob="bj",condition="Complete",status="unknown"} 0"#,
        ]
    );
    assert!(out.contains(r#"kruise_broadcastjob_spec_parallelism{namespace="ns",broadcastjob="bj"} 3"#));
}

#[test]
fn statefulset_reserve_ordinals_and_revisions() {
    let sts: StatefulSet = serde_json::from_value(serde_json::json!({
        "metadata": meta("db", Some("ns")),
        "spec": { "replicas": 4, "reserveOrdinals": [1, "3-4"], "updateStrategy": { "rollingUpdate": { "maxUnavailable": "50%" } } },
        "status": { "currentRevision": "db-1", "updateRevision": "db-2" },
    }))
    .unwrap();
    let out = encode(&sts, &[], &[]);
    let ordinals: Vec<&str> = out.lines().filter(|l| l.starts_with("kruise_statefulset_spec_reserveordinals")).collect();
    assert_eq!(ordinals.len(), 3);
    assert!(ordinals[2].contains(r#"ordinal="4""#));
    assert!(out.contains(r#"kruise_statefulset_status_update_revision{namespace="ns",statefulset="db",revision="db-2"} 1"#));
    assert!(out.contains(r#"kruise_statefulset_spec_strategy_rollingupdate_max_unavailable{namespace="ns",statefulset="db"} 2"#));
    assert!(out.contains(r#"kruise_statefulset_replicas{namespace="ns",statefulset="db"} 4"#));
}

#[test]
fn sidecarset_is_cluster_scoped() {
    let sc: SidecarSet = serde_json::from_value(serde_json::json!({
        "metadata": meta("log-agent", None),
        "spec": { "containers": [
            { "name": "agent", "podInjectPolicy": "AfterAppContainer" },
            { "name": "proxy", "upgradeStrategy": { "upgradeType": "HotUpgrade", "hotUpgradeEmptyImage": "empty:1" } },
        ] },
        "status": { "matchedPods": 10 },
    }))
    .unwrap();
    assert_eq!(sc.namespace(), "");
    let out = encode(&sc, &[], &[]);
    assert!(out.contains(r#"kruise_sidecarset_status_replicas_matched{namespace="",sidecarset="log-agent"} 10"#));
    assert!(out.contains(
        r#"kruise_sidecarset_spec_containers_injectpolicy{namespace="",sidecarset="log-agent",container="agent",injectpolicy="AfterAppContainer"} 1"#
    ));
    assert!(out.contains(
        r#"kruise_sidecarset_spec_containers_strategy_type{namespace="",sidecarset="log-agent",container="proxy",strategy_type="HotUpgrade"} 1"#
    ));
    assert!(!out.contains("kruise_sidecarset_spec_namespace"));
}

#[test]
fn workloadspread_subsets_in_source_order() {
    let ws: WorkloadSpread = serde_json::from_value(serde_json::json!({
        "metadata": meta("spread", Some("ns")),
        "status": { "subsetStatuses": [
            { "name": "zone-b", "replicas": 2, "missingReplicas": 1 },
            { "name": "zone-a", "replicas": 5 },
        ] },
    }))
    .unwrap();
    let out = encode(&ws, &[], &[]);
    let subsets: Vec<&str> =
        out.lines().filter(|l| l.starts_with("kruise_workloadspread_status_subset_replicas{")).collect();
    assert_eq!(
        subsets,
        vec![
            r#"kruise_workloadspread_status_subset_replicas{namespace="ns",workloadspread="spread",subset="zone-b"} 2"#,
            r#"kruise_workloadspread_status_subset_replicas{namespace="ns",workloadspread="spread",subset="zone-a"} 5"#,
        ]
    );
    assert!(out.contains(r#"kruise_workloadspread_status_subset_replicas_missing{namespace="ns",workloadspread="spread",subset="zone-a"} 0"#));
}

#[test]
fn annotation_conflicts_are_suffixed() {
    let mut m = meta("cs", Some("ns"));
    m["annotations"] = serde_json::json!({ "foo.bar": "a", "foo/bar": "b" });
    let cs: CloneSet = serde_json::from_value(serde_json::json!({ "metadata": m })).unwrap();
    let out = encode(&cs, &s(&["*"]), &[]);
    assert!(out.contains(
        r#"kruise_cloneset_annotations{namespace="ns",cloneset="cs",annotation_foo_bar_conflict1="a",annotation_foo_bar_conflict2="b"} 1"#
    ));
}

#[test]
fn percent_max_unavailable_rounds_down_and_surge_rounds_up() {
    let cs: CloneSet = serde_json::from_value(serde_json::json!({
        "metadata": meta("cs", Some("ns")),
        "spec": { "replicas": 5, "updateStrategy": { "maxUnavailable": "30%", "maxSurge": "30%" } },
    }))
    .unwrap();
    let out = encode(&cs, &[], &[]);
    assert!(out.contains(r#"kruise_cloneset_spec_strategy_rollingupdate_max_unavailable{namespace="ns",cloneset="cs"} 1"#));
    assert!(out.contains(r#"kruise_cloneset_spec_strategy_rollingupdate_max_surge{namespace="ns",cloneset="cs"} 2"#));

    let sc: SidecarSet = serde_json::from_value(serde_json::json!({
        "metadata": meta("agent", None),
        "spec": { "updateStrategy": { "maxUnavailable": "25%" } },
        "status": { "matchedPods": 10 },
    }))
    .unwrap();
    let out = encode(&sc, &[], &[]);
    assert!(out.contains(r#"kruise_sidecarset_spec_strategy_rollingupdate_max_unavailable{namespace="",sidecarset="agent"} 2"#));
}

#[test]
fn daemonset_surge_against_desired_scheduled() {
    let ds: DaemonSet = serde_json::from_value(serde_json::json!({
        "metadata": meta("node-agent", Some("kube-system")),
        "spec": { "updateStrategy": { "rollingUpdate": { "maxSurge": "25%", "partition": 3 } } },
        "status": { "desiredNumberScheduled": 5, "numberReady": 4, "numberUnavailable": 1 },
    }))
    .unwrap();
    let out = encode(&ds, &[], &[]);
    let id = r#"namespace="kube-system",daemonset="node-agent""#;
    assert!(out.contains(&format!("kruise_daemonset_spec_strategy_rollingupdate_max_surge{{{id}}} 2\n")));
    assert!(out.contains(&format!("kruise_daemonset_spec_strategy_partition{{{id},partition=\"3\"}} 3\n")));
    assert!(out.contains(&format!("kruise_daemonset_spec_strategy_type{{{id},strategy_type=\"RollingUpdate\"}} 1\n")));
    assert!(out.contains(&format!("kruise_daemonset_status_desired_number_scheduled{{{id}}} 5\n")));
    assert!(out.contains(&format!("kruise_daemonset_status_number_ready{{{id}}} 4\n")));
    assert!(out.contains(&format!("kruise_daemonset_status_number_unavailable{{{id}}} 1\n")));

    // No surge configured resolves to 0; no partition emits nothing.
    let bare: DaemonSet = serde_json::from_value(serde_json::json!({
        "metadata": meta("node-agent", Some("kube-system")),
        "status": { "desiredNumberScheduled": 5 },
    }))
    .unwrap();
    let out = encode(&bare, &[], &[]);
    assert!(out.contains(&format!("kruise_daemonset_spec_strategy_rollingupdate_max_surge{{{id}}} 0\n")));
    assert!(!out.contains("kruise_daemonset_spec_strategy_partition"));
}

#[test]
fn containerrecreaterequest_phase_counts() {
    let crr: ContainerRecreateRequest = serde_json::from_value(serde_json::json!({
        "metadata": meta("restart-web", Some("ns")),
        "spec": { "podName": "web-0", "containers": [{ "name": "a" }, { "name": "b" }, { "name": "c" }, { "name": "d" }] },
        "status": {
            "phase": "Completed",
            "containerRecreateStates": [
                { "name": "a", "phase": "Succeeded" },
                { "name": "b", "phase": "Succeeded" },
                { "name": "c", "phase": "Failed" },
                { "name": "d", "phase": "Recreating" },
            ],
        },
    }))
    .unwrap();
    let out = encode(&crr, &[], &[]);
    let samples: Vec<(&str, &str)> = out
        .lines()
        .filter_map(|l| {
            let (series, value) = l.rsplit_once(' ')?;
            Some((series.split('{').next()?, value))
        })
        .collect();
    let value = |name: &str| samples.iter().find(|(n, _)| *n == name).map(|(_, v)| *v);
    assert_eq!(value("kruise_containerrecreaterequest_containers_pending"), Some("0"));
    assert_eq!(value("kruise_containerrecreaterequest_containers_recreating"), Some("1"));
    assert_eq!(value("kruise_containerrecreaterequest_containers_succeeded"), Some("2"));
    assert_eq!(value("kruise_containerrecreaterequest_containers_failed"), Some("1"));
    assert_eq!(value("kruise_containerrecreaterequest_pending"), Some("0"));
    assert_eq!(value("kruise_containerrecreaterequest_recreating"), Some("0"));
    assert_eq!(value("kruise_containerrecreaterequest_completed"), Some("1"));
    assert!(out.contains(
        r#"kruise_containerrecreaterequest_completed{namespace="ns",containerrecreaterequest="restart-web"} 1"#
    ));
}

#[test]
fn unbounded_reserve_ordinal_range_emits_nothing() {
    let sts: StatefulSet = serde_json::from_value(serde_json::json!({
        "metadata": meta("db", Some("ns")),
        "spec": { "replicas": 3, "reserveOrdinals": ["0-2147483647"] },
    }))
    .unwrap();
    let out = encode(&sts, &[], &[]);
    assert!(!out.contains("kruise_statefulset_spec_reserveordinals{"));
    assert!(out.contains(r#"kruise_statefulset_spec_replicas{namespace="ns",statefulset="db"} 3"#));
}
