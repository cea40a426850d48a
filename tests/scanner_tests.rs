mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use common::{hosts, ScriptedProbe};
use mc_scan_rs::error::ProbeError;
use mc_scan_rs::probe::ProbeClient;
use mc_scan_rs::query::{self, FilterCriteria, PageRequest, SortKey};
use mc_scan_rs::scanner::{scan_targets, scan_targets_with_cancel};
use mc_scan_rs::session::Lifecycle;
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn identities(records: &[mc_scan_rs::types::StatusRecord]) -> BTreeSet<String> {
    records
        .iter()
        .filter_map(|r| r.identity().map(str::to_owned))
        .collect()
}

#[tokio::test]
async fn three_hosts_scenario() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .online("A", 5, 20)
            .offline("B")
            .online("C", 0, 20),
    );
    let targets = hosts(&["A", "B", "C"]);
    let res = scan_targets(&targets, probe.clone(), 10).await;

    assert_eq!(res.summary.state, Lifecycle::Completed);
    assert_eq!(res.summary.workers, 3);
    assert_eq!(res.summary.total, 3);
    assert_eq!(res.summary.checked, 3);
    assert_eq!(res.summary.reachable, 2);
    assert_eq!(res.summary.unreachable, 1);

    // Each worker handled one distinct target.
    let mut calls = probe.calls();
    calls.sort();
    assert_eq!(calls, targets);

    let hide_empty = FilterCriteria {
        hide_empty: true,
        ..Default::default()
    };
    let page = query::run(&res.records, &hide_empty, SortKey::PlayersDesc, PageRequest::default());
    let ids: Vec<_> = page.items.iter().map(|r| r.display_identity()).collect();
    assert_eq!(ids, vec!["A"]);
    assert_eq!(page.items[0].version_label(), "1.20.4");

    let page = query::run(
        &res.records,
        &FilterCriteria::default(),
        SortKey::default(),
        PageRequest::default(),
    );
    let ids: Vec<_> = page.items.iter().map(|r| r.display_identity()).collect();
    assert_eq!(ids, vec!["A", "C"]);
}

#[tokio::test]
async fn concurrency_does_not_change_recorded_set() {
    let names: Vec<String> = (0..12).map(|i| format!("host-{i:02}")).collect();
    let build = || {
        let mut p = ScriptedProbe::new().with_delay(Duration::from_millis(2));
        for (i, n) in names.iter().enumerate() {
            p = match i % 3 {
                0 => p.online(n, i as u32, 50),
                1 => p.offline(n),
                _ => p.fail(n, ProbeError::Request("connection reset".into())),
            };
        }
        Arc::new(p)
    };

    let baseline = identities(&scan_targets(&names, build(), 1).await.records);
    assert_eq!(baseline.len(), 4);
    for c in 2..=names.len() {
        let res = scan_targets(&names, build(), c).await;
        assert_eq!(res.summary.checked, names.len() as u64);
        assert_eq!(identities(&res.records), baseline, "concurrency {c}");
    }
}

#[tokio::test]
async fn in_flight_probes_never_exceed_cap() {
    let names: Vec<String> = (0..30).map(|i| format!("10.0.0.{i}")).collect();
    let probe = Arc::new(ScriptedProbe::new().with_delay(Duration::from_millis(5)));
    let res = scan_targets(&names, probe.clone(), 4).await;
    assert_eq!(res.summary.workers, 4);
    assert_eq!(res.summary.checked, 30);
    assert!(probe.max_in_flight() <= 4);
    assert_eq!(probe.calls().len(), 30);
}

#[tokio::test]
async fn failures_are_absorbed_and_counted() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .fail("a", ProbeError::Status(500))
            .fail("b", ProbeError::Decode("eof".into()))
            .online("c", 1, 2),
    );
    let res = scan_targets(&hosts(&["a", "b", "c"]), probe, 2).await;
    assert_eq!(res.summary.state, Lifecycle::Completed);
    assert_eq!(res.summary.checked, 3);
    assert_eq!(res.summary.failed, 2);
    assert_eq!(identities(&res.records), BTreeSet::from(["c".to_string()]));
}

#[tokio::test]
async fn canonical_address_becomes_identity() {
    let probe = Arc::new(ScriptedProbe::new().doc(
        "X",
        json!({"online": true, "ip_address": "Y", "players": {"online": 3, "max": 10}}),
    ));
    let res = scan_targets(&hosts(&["X"]), probe, 10).await;
    assert_eq!(res.records.len(), 1);
    let rec = &res.records[0];
    assert_eq!(rec.identity(), Some("Y"));
    assert_eq!(rec.ip.as_deref(), Some("X"));
    assert_eq!(rec.detail_path().as_deref(), Some("/server/Y"));
}

#[tokio::test]
async fn two_targets_resolving_to_one_identity_merge() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .doc("alias-1", json!({"online": true, "ip_address": "canon", "players": {"online": 1}}))
            .doc("alias-2", json!({"online": true, "ip_address": "canon", "players": {"online": 1}})),
    );
    let res = scan_targets(&hosts(&["alias-1", "alias-2"]), probe, 2).await;
    assert_eq!(res.summary.reachable, 2);
    assert_eq!(res.records.len(), 1);
    assert_eq!(res.records[0].identity(), Some("canon"));
}

#[tokio::test]
async fn cancellation_stops_claiming() {
    let token = CancellationToken::new();
    let probe = Arc::new(ScriptedProbe::new().cancel_on_call(token.clone()).online("t0", 1, 1));
    let names: Vec<String> = (0..5).map(|i| format!("t{i}")).collect();
    let res = scan_targets_with_cancel(&names, probe.clone(), 1, token).await;

    assert_eq!(res.summary.state, Lifecycle::Cancelled);
    assert_eq!(probe.calls(), vec!["t0"]);
    assert_eq!(res.summary.checked, 1);
    assert_eq!(res.summary.total, 5);
    // The in-flight probe still lands after the stop.
    assert_eq!(res.records.len(), 1);
}

#[tokio::test]
async fn pre_cancelled_scan_claims_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let probe = Arc::new(ScriptedProbe::new());
    let res = scan_targets_with_cancel(&hosts(&["a", "b"]), probe.clone(), 4, token).await;
    assert_eq!(res.summary.state, Lifecycle::Cancelled);
    assert_eq!(res.summary.checked, 0);
    assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn empty_target_list_completes_immediately() {
    let probe: Arc<dyn ProbeClient> = Arc::new(ScriptedProbe::new());
    let res = scan_targets(&[], probe, 10).await;
    assert_eq!(res.summary.state, Lifecycle::Completed);
    assert_eq!(res.summary.workers, 0);
    assert_eq!(res.summary.checked, 0);
}
