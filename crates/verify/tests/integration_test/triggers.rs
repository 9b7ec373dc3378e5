use daqdiag_core::{
    Cluster, Cut, CutResults, HardwareCluster, HardwareTrigger, Half, Trigger, TriggerData, TriggerType, TsBit,
};
use daqdiag_verify::{EventOutcome, SkipReason, TriggerFailure, TriggerSource};

use crate::helpers::{cluster, config, event, hw, run, with_triggers};

const SINGLES_TOP_0: TriggerType = TriggerType::Singles { half: Half::Top, slot: 0 };
const PAIR_1: TriggerType = TriggerType::Pair { slot: 1 };

fn singles_cuts() -> CutResults {
    CutResults::new()
        .with(Cut::ClusterEnergyLow, true)
        .with(Cut::ClusterHitCount, true)
}

fn pair_cuts(coplanar: bool) -> CutResults {
    CutResults::new()
        .with(Cut::PairEnergySum, true)
        .with(Cut::PairCoplanarity, coplanar)
}

fn trigger_config() -> daqdiag_core::DiagnosticsConfig {
    let mut c = config();
    c.trigger_types = vec![TsBit::Trigger(SINGLES_TOP_0), TsBit::Trigger(PAIR_1)];
    c
}

fn singles<C>(source: C) -> Trigger<C> {
    Trigger::Singles {
        slot: 0,
        source,
        cuts: singles_cuts(),
    }
}

fn pair<C>(a: C, b: C) -> Trigger<C> {
    Trigger::Pair {
        slot: 1,
        source: [a, b],
        cuts: pair_cuts(true),
    }
}

/// A top and a bottom cluster, triggered as two singles and one pair. The
/// hardware agrees on the top singles trigger but vetoes the pair on
/// coplanarity.
fn triggered_event(active_ts_bits: Vec<TsBit>) -> daqdiag_core::EventData {
    let top: Cluster = cluster(3, 2, 50.0, &[0.5, 0.25]);
    let bottom: Cluster = cluster(-6, -3, 52.0, &[0.6]);
    let hw_top: HardwareCluster = hw(3, 2, 50.0, 0.75, 2);
    let hw_bottom: HardwareCluster = hw(-6, -3, 52.0, 0.6, 1);

    let triggers = TriggerData {
        software_cluster_triggers: Some(vec![
            singles(top.clone()),
            singles(bottom.clone()),
            pair(top.clone(), bottom.clone()),
        ]),
        hardware_cluster_triggers: Some(vec![
            singles(hw_top),
            singles(hw_bottom),
            pair(hw_top, hw_bottom),
        ]),
        hardware_triggers: Some(vec![
            HardwareTrigger::Singles {
                slot: 0,
                time: 50.0,
                cuts: singles_cuts(),
            },
            HardwareTrigger::Singles {
                slot: 0,
                time: 52.0,
                cuts: singles_cuts(),
            },
            HardwareTrigger::Pair {
                slot: 1,
                time: 50.0,
                cuts: pair_cuts(false),
            },
        ]),
        active_ts_bits,
    };

    with_triggers(event(7, 0, vec![top, bottom], vec![hw_top, hw_bottom], vec![]), triggers)
}

#[test]
fn test_triggers_verified_per_type_and_source() {
    let mut run = run(trigger_config());
    let outcome = run
        .process_event(&triggered_event(vec![TsBit::Trigger(SINGLES_TOP_0), TsBit::Trigger(PAIR_1)]))
        .unwrap();

    let report = match outcome {
        EventOutcome::Processed(report) => report,
        other => panic!("unexpected outcome: {other:?}"),
    };
    // One top singles and one pair trigger per source.
    assert_eq!(report.triggers.len(), 4);

    let stats = run.statistics();
    for source in [TriggerSource::SoftwareClusters, TriggerSource::HardwareClusters] {
        let singles = stats.trigger(SINGLES_TOP_0, source).unwrap();
        assert_eq!(singles.counts.simulated, 1, "{source}");
        assert_eq!(singles.counts.matched, 1, "{source}");
        assert_eq!(singles.counts.hardware, 2, "{source}");
        assert_eq!(singles.by_ts_bit[&TsBit::Trigger(PAIR_1)].matched, 1);

        let pair = stats.trigger(PAIR_1, source).unwrap();
        assert_eq!(pair.counts.simulated, 1, "{source}");
        assert_eq!(pair.counts.matched, 0, "{source}");
        assert_eq!(pair.counts.hardware, 1, "{source}");
        assert_eq!(pair.cut_mismatch, 1);
        assert_eq!(pair.no_time_match, 0);
        assert_eq!(pair.failed_cuts.get(&Cut::PairCoplanarity), Some(&1));
    }

    let pair_failure = report
        .triggers
        .iter()
        .find(|t| t.trigger_type == PAIR_1 && t.source == TriggerSource::SoftwareClusters)
        .and_then(|t| t.failure.clone());
    assert_eq!(
        pair_failure,
        Some(TriggerFailure::CutMismatch(vec![Cut::PairCoplanarity]))
    );
}

#[test]
fn test_missing_trigger_collections_skip_event() {
    let mut run = run(trigger_config());
    let plain = event(8, 0, vec![cluster(3, 2, 50.0, &[0.5])], vec![hw(3, 2, 50.0, 0.5, 1)], vec![]);
    assert_eq!(
        run.process_event(&plain).unwrap(),
        EventOutcome::Skipped(SkipReason::MissingCollection("triggers".to_string()))
    );

    let mut partial = triggered_event(vec![]);
    if let Some(t) = partial.triggers.as_mut() {
        t.hardware_triggers = None;
    }
    assert_eq!(
        run.process_event(&partial).unwrap(),
        EventOutcome::Skipped(SkipReason::MissingCollection("hardware_triggers".to_string()))
    );

    let stats = run.statistics();
    assert_eq!(stats.events.skipped_missing_collection, 2);
    assert_eq!(stats.clusters.simulated, 0);
}

#[test]
fn test_event_without_active_ts_bit_skips_only_triggers() {
    let mut c = trigger_config();
    c.require_active_ts_bit = true;
    let mut run = run(c);

    let report = match run.process_event(&triggered_event(vec![])).unwrap() {
        EventOutcome::Processed(report) => report,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(report.trigger_skip, Some(SkipReason::NoActiveTsBit));
    assert!(report.triggers.is_empty());
    assert_eq!(report.clusters.len(), 2);
    assert!(report.clusters.iter().all(|p| p.status.is_matched()));

    let stats = run.statistics();
    assert_eq!(stats.events.skipped_no_ts_bit, 1);
    assert_eq!(stats.events.processed, 1);
    assert_eq!(stats.events.skipped(), 0);
    assert_eq!(stats.clusters.verifiable, 2);
    assert_eq!(stats.clusters.matched(), 2);
    let singles = stats.trigger(SINGLES_TOP_0, TriggerSource::SoftwareClusters).unwrap();
    assert_eq!(singles.counts.simulated, 0);

    let report = match run.process_event(&triggered_event(vec![TsBit::Pulser])).unwrap() {
        EventOutcome::Processed(report) => report,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_eq!(report.trigger_skip, None);
    assert_eq!(report.triggers.len(), 4);

    let stats = run.statistics();
    assert_eq!(stats.events.skipped_no_ts_bit, 1);
    assert_eq!(stats.events.processed, 2);
    assert_eq!(stats.clusters.matched(), 4);
    let singles = stats.trigger(SINGLES_TOP_0, TriggerSource::SoftwareClusters).unwrap();
    assert_eq!(singles.counts.simulated, 1);
    assert_eq!(singles.by_ts_bit[&TsBit::Pulser].simulated, 1);
}

#[test]
fn test_clipped_software_trigger_is_not_verified() {
    let mut c = config();
    c.trigger_types = vec![TsBit::Trigger(SINGLES_TOP_0)];
    let mut run = run(c);

    let early = cluster(4, 1, 2.0, &[0.7]);
    let hw_early = hw(4, 1, 2.0, 0.7, 1);
    let triggers = TriggerData {
        software_cluster_triggers: Some(vec![singles(early.clone())]),
        hardware_cluster_triggers: Some(vec![singles(hw_early)]),
        hardware_triggers: Some(vec![HardwareTrigger::Singles {
            slot: 0,
            time: 2.0,
            cuts: singles_cuts(),
        }]),
        active_ts_bits: vec![],
    };
    run.process_event(&with_triggers(event(9, 0, vec![early], vec![hw_early], vec![]), triggers))
        .unwrap();

    let stats = run.statistics();
    let software = stats.trigger(SINGLES_TOP_0, TriggerSource::SoftwareClusters).unwrap();
    assert_eq!(software.counts.simulated, 0);
    let hardware = stats.trigger(SINGLES_TOP_0, TriggerSource::HardwareClusters).unwrap();
    assert_eq!(hardware.counts.simulated, 1);
    assert_eq!(hardware.counts.matched, 1);
}
