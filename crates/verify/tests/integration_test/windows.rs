use daqdiag_verify::EventOutcome;

use crate::helpers::{cluster, config, event, hw, run};

fn matched_event(number: u64, timestamp: i64) -> daqdiag_core::EventData {
    event(
        number,
        timestamp,
        vec![cluster(3, 2, 50.0, &[0.5])],
        vec![hw(3, 2, 50.0, 0.5, 1)],
        vec![],
    )
}

#[test]
fn test_single_sample_after_window_elapses() {
    let mut run = run(config());
    for (n, ts) in [(1, 0), (2, 2_000_000), (3, 6_000_000)] {
        run.process_event(&matched_event(n, ts)).unwrap();
    }

    let window = &run.statistics().clusters.window;
    assert_eq!(window.samples().len(), 1);
    let sample = window.samples()[0];
    assert_eq!(sample.midpoint_ns, 3_000_000);
    assert_eq!(sample.total, 3);
    assert_eq!(sample.matched, 3);
    assert_eq!(sample.efficiency(), Some(1.0));
}

#[test]
fn test_window_counts_sum_to_run_total() {
    let mut c = config();
    c.local_window_size_ns = 1_000_000;
    c.skip_noise_events = true;
    c.noise_event_threshold = 3;
    let mut run = run(c);

    let mut skipped = 0;
    for n in 0..40u64 {
        let ts = n as i64 * 310_000;
        let e = if n % 7 == 3 {
            // Four hits: a noise event.
            event(n, ts, vec![cluster(3, 2, 50.0, &[0.5, 0.1, 0.1, 0.1])], vec![], vec![])
        } else if n % 5 == 0 {
            event(n, ts, vec![cluster(3, 2, 50.0, &[0.5]), cluster(-8, -1, 90.0, &[0.4])], vec![hw(3, 2, 50.0, 0.5, 1)], vec![])
        } else {
            matched_event(n, ts)
        };
        if let EventOutcome::Skipped(_) = run.process_event(&e).unwrap() {
            skipped += 1;
        }
    }

    let stats = run.statistics();
    assert!(skipped > 0);
    assert_eq!(stats.events.skipped_noise, skipped);
    assert!(stats.clusters.window.samples().len() > 1);

    let sampled: u64 = stats.clusters.window.samples().iter().map(|s| s.total).sum();
    let (pending, _) = stats.clusters.window.pending();
    assert_eq!(sampled + pending, stats.clusters.verifiable);
}
