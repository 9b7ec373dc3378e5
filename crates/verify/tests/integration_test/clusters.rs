use std::collections::HashSet;

use daqdiag_core::ClusterLike;
use daqdiag_verify::{
    CauseKind, ClassifierSettings, ClusterFailureClassifier, ClusterMatcher, ClusterPair,
    DeadtimeEvidence, EventOutcome, FailureCause, MatchStatus, MatchTolerances,
};

use crate::helpers::{cluster, config, event, hw, run, SEED_THRESHOLD};

fn tolerances(energy: f64) -> MatchTolerances {
    MatchTolerances {
        energy,
        hit_count: 0,
        hardware_hit_cap: None,
        window_width: 400.0,
    }
}

fn processed(outcome: EventOutcome) -> daqdiag_verify::EventReport {
    match outcome {
        EventOutcome::Processed(report) => report,
        EventOutcome::Skipped(reason) => panic!("event unexpectedly skipped: {reason}"),
    }
}

#[test]
fn test_identical_clusters_match() {
    let mut c = config();
    c.energy_tolerance = 0.0;
    let mut run = run(c);

    let sim = cluster(3, 2, 50.0, &[0.5, 0.25, 0.25]);
    assert_eq!(sim.energy(), 1.0);
    let report = processed(
        run.process_event(&event(1, 0, vec![sim], vec![hw(3, 2, 50.0, 1.0, 3)], vec![]))
            .unwrap(),
    );

    assert_eq!(report.clusters.len(), 1);
    assert_eq!(report.clusters[0].status, MatchStatus::Matched);
    assert_eq!(report.clusters[0].cause, None);
    assert_eq!(run.statistics().clusters.matched(), 1);
}

#[test]
fn test_energy_outside_tolerance_fails_energy() {
    let mut run = run(config());
    let sim = cluster(3, 2, 50.0, &[0.5, 0.25, 0.25]);
    let report = processed(
        run.process_event(&event(1, 0, vec![sim], vec![hw(3, 2, 50.0, 1.05, 3)], vec![]))
            .unwrap(),
    );

    assert_eq!(report.clusters[0].status, MatchStatus::FailEnergy);
    assert_eq!(report.clusters[0].cause, Some(FailureCause::Unclassified));
    let stats = &run.statistics().clusters;
    assert_eq!(stats.status(MatchStatus::FailEnergy), 1);
    assert_eq!(stats.cause(MatchStatus::FailEnergy, CauseKind::Unclassified), 1);
}

#[test]
fn test_early_single_hit_cluster_is_deadtime() {
    let mut run = run(config());
    let sim = cluster(5, 1, 10.0, &[0.8]);
    let report = processed(run.process_event(&event(1, 0, vec![sim], vec![], vec![])).unwrap());

    assert_eq!(report.clusters[0].status, MatchStatus::FailPosition);
    assert_eq!(
        report.clusters[0].cause,
        Some(FailureCause::PositionDeadtime(DeadtimeEvidence::SingleHitEarlyCluster))
    );
    assert_eq!(
        run.statistics().clusters.cause(MatchStatus::FailPosition, CauseKind::PositionDeadtime),
        1
    );
}

#[test]
fn test_clone_bug_on_constructed_pair() {
    // Two hardware clusters at (7,-2): t = 60 unmatched, t = 75 matched
    // elsewhere. The simulated cluster at (7,-2), t = 60 failed position.
    let sim = cluster(7, -2, 60.0, &[0.8]);
    let other = cluster(7, -2, 75.0, &[0.9]);
    let hardware = [hw(7, -2, 60.0, 0.8, 1), hw(7, -2, 75.0, 0.9, 1)];

    let failed = ClusterPair {
        simulated: &sim,
        hardware: None,
        hardware_index: None,
        status: MatchStatus::FailPosition,
    };
    let matched = ClusterPair {
        simulated: &other,
        hardware: Some(&hardware[1]),
        hardware_index: Some(1),
        status: MatchStatus::Matched,
    };

    let classifier = ClusterFailureClassifier::new(ClassifierSettings {
        energy_tolerance: 0.001,
        deadtime_window_ns: 32.0,
        window_before_ns: 16.0,
        seed_energy_threshold: SEED_THRESHOLD,
    });
    assert_eq!(
        classifier.classify(&failed, &[failed, matched], &[], &hardware),
        Some(FailureCause::CloneBug)
    );
}

#[test]
fn test_clone_bug_end_to_end() {
    let mut run = run(config());
    let e = event(
        1,
        0,
        vec![cluster(7, -2, 75.0, &[0.9]), cluster(8, -2, 60.0, &[0.8])],
        vec![hw(7, -2, 60.0, 0.8, 1), hw(7, -2, 75.0, 0.9, 1)],
        vec![],
    );
    let report = processed(run.process_event(&e).unwrap());

    assert_eq!(report.clusters[0].status, MatchStatus::Matched);
    assert_eq!(report.clusters[1].status, MatchStatus::FailPosition);
    assert_eq!(report.clusters[1].cause, Some(FailureCause::CloneBug));
}

#[test]
fn test_energy_tolerance_is_inclusive_to_the_ulp() {
    let tolerance = 0.125;
    let matcher = ClusterMatcher::new(tolerances(tolerance));
    let sim = [cluster(3, 2, 50.0, &[1.0])];

    let at_bound = [hw(3, 2, 50.0, 1.125, 1)];
    assert_eq!(
        matcher.match_clusters(&sim, &at_bound)[0].status,
        MatchStatus::Matched
    );

    let above = [hw(3, 2, 50.0, f64::from_bits(1.125f64.to_bits() + 1), 1)];
    assert_eq!(
        matcher.match_clusters(&sim, &above)[0].status,
        MatchStatus::FailEnergy
    );
}

fn busy_event() -> (Vec<daqdiag_core::Cluster>, Vec<daqdiag_core::HardwareCluster>) {
    let simulated = vec![
        cluster(3, 2, 50.0, &[0.5, 0.25]),
        cluster(3, 2, 50.0, &[0.5, 0.25]),
        cluster(-4, -3, 80.0, &[0.9, 0.1, 0.1]),
        cluster(10, 4, 120.0, &[0.7]),
        cluster(-20, 1, 64.0, &[0.3, 0.2]),
        cluster(1, -5, 200.0, &[1.2, 0.3]),
    ];
    let hardware = vec![
        hw(3, 2, 50.0, 0.75, 2),
        hw(-4, -3, 80.0, 1.1, 2),
        hw(10, 4, 124.0, 0.7, 1),
        hw(11, 4, 120.0, 0.7, 1),
        hw(-20, 1, 0.0, 0.5, 2),
        hw(1, -5, 200.0, 1.3, 2),
        hw(1, -5, 200.0, 1.5, 2),
        hw(2, 2, 420.0, 0.4, 1),
    ];
    (simulated, hardware)
}

#[test]
fn test_every_simulated_cluster_gets_one_status() {
    let (simulated, hardware) = busy_event();
    let pairs = ClusterMatcher::new(tolerances(0.001)).match_clusters(&simulated, &hardware);

    assert_eq!(pairs.len(), simulated.len());
    let total: usize = MatchStatus::ALL
        .iter()
        .map(|s| pairs.iter().filter(|p| p.status == *s).count())
        .sum();
    assert_eq!(total, simulated.len());

    let statuses: Vec<MatchStatus> = pairs.iter().map(|p| p.status).collect();
    assert_eq!(
        statuses,
        vec![
            MatchStatus::Matched,
            MatchStatus::FailPosition,
            MatchStatus::FailHitCount,
            MatchStatus::FailPosition,
            MatchStatus::FailTime,
            MatchStatus::FailEnergy,
        ]
    );
}

#[test]
fn test_hardware_clusters_pair_at_most_once() {
    let (simulated, hardware) = busy_event();
    let pairs = ClusterMatcher::new(tolerances(0.001)).match_clusters(&simulated, &hardware);

    let mut seen = HashSet::new();
    for index in pairs.iter().filter_map(|p| p.hardware_index) {
        assert!(seen.insert(index), "hardware cluster {index} paired twice");
    }
}

#[test]
fn test_matching_is_deterministic() {
    let (simulated, hardware) = busy_event();
    let matcher = ClusterMatcher::new(tolerances(0.001));

    let first: Vec<_> = matcher
        .match_clusters(&simulated, &hardware)
        .iter()
        .map(|p| (p.status, p.hardware_index))
        .collect();
    for _ in 0..5 {
        let again: Vec<_> = matcher
            .match_clusters(&simulated, &hardware)
            .iter()
            .map(|p| (p.status, p.hardware_index))
            .collect();
        assert_eq!(first, again);
    }
}

#[test]
fn test_clipped_clusters_are_not_verified() {
    let mut run = run(config());
    // nsb = 4 and window - nsa = 340
    let e = event(
        1,
        0,
        vec![cluster(3, 2, 2.0, &[0.5]), cluster(6, 2, 360.0, &[0.5]), cluster(9, 2, 100.0, &[0.5])],
        vec![hw(9, 2, 100.0, 0.5, 1)],
        vec![],
    );
    let report = processed(run.process_event(&e).unwrap());

    assert_eq!(report.clusters.len(), 1);
    let stats = &run.statistics().clusters;
    assert_eq!(stats.simulated, 3);
    assert_eq!(stats.verifiable, 1);
    assert_eq!(stats.hardware, 1);
    assert_eq!(stats.matched(), 1);
}
