use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use daqdiag_core::numeric::{digits, ratio_error};

use super::{EfficiencyWindowTracker, RunStatistics, TriggerStatistics};
use crate::cluster::{CauseKind, MatchStatus};

/// Causes reported under each failure status, in report order.
const CAUSES: [(MatchStatus, &[CauseKind]); 4] = [
    (
        MatchStatus::FailPosition,
        &[
            CauseKind::NearSeedThreshold,
            CauseKind::PositionDeadtime,
            CauseKind::CloneBug,
            CauseKind::Unclassified,
        ],
    ),
    (
        MatchStatus::FailTime,
        &[CauseKind::TimeDeadtime, CauseKind::Unclassified],
    ),
    (MatchStatus::FailEnergy, &[CauseKind::Unclassified]),
    (
        MatchStatus::FailHitCount,
        &[
            CauseKind::NegativeEnergyHit,
            CauseKind::HitCountDeadtime,
            CauseKind::Unclassified,
        ],
    ),
];

/// End-of-run report. `Display` renders the operator text table; the
/// serde form carries the full statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub statistics: RunStatistics,
}

impl RunSummary {
    pub fn new(statistics: RunStatistics) -> Self {
        Self {
            finished_at: Utc::now(),
            statistics,
        }
    }
}

/// Efficiency-vs-time points `(ms, efficiency)`, undefined samples omitted.
pub fn efficiency_series(tracker: &EfficiencyWindowTracker) -> Vec<(f64, f64)> {
    tracker
        .samples()
        .iter()
        .filter_map(|s| s.efficiency().map(|e| (s.midpoint_ns as f64 / 1.0e6, e)))
        .collect()
}

fn write_count(f: &mut fmt::Formatter<'_>, label: &str, count: u64, width: usize) -> fmt::Result {
    writeln!(f, "\t{:<26} :: {:>width$}", label, count, width = width)
}

fn write_ratio(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    count: u64,
    denominator: u64,
    width: usize,
) -> fmt::Result {
    write!(f, "\t{:<26} :: {:>width$}", label, count, width = width)?;
    match ratio_error(count, denominator) {
        Some(err) => writeln!(
            f,
            "   ({:7.3}% \u{00b1} {:7.3}%)",
            100.0 * count as f64 / denominator as f64,
            100.0 * err
        ),
        None => writeln!(f, "   (    N/A   )"),
    }
}

fn write_series(f: &mut fmt::Formatter<'_>, tracker: &EfficiencyWindowTracker) -> fmt::Result {
    let series = efficiency_series(tracker);
    if series.is_empty() {
        return Ok(());
    }
    writeln!(f, "\tEfficiency vs time (ms):")?;
    for (ms, efficiency) in series {
        writeln!(f, "\t\t{:>12.3}  {:7.3}%", ms, 100.0 * efficiency)?;
    }
    Ok(())
}

fn write_trigger(f: &mut fmt::Formatter<'_>, stats: &TriggerStatistics) -> fmt::Result {
    let c = &stats.counts;
    let width = [c.simulated, c.hardware]
        .into_iter()
        .chain(stats.by_ts_bit.values().map(|b| b.simulated))
        .map(|n| digits(n as i64))
        .max()
        .unwrap_or(1);

    write_count(f, "Simulated Triggers", c.simulated, width)?;
    write_count(f, "Hardware Triggers", c.hardware, width)?;
    write_ratio(f, "Matched Triggers", c.matched, c.simulated, width)?;
    write_ratio(f, "Failed (No Time Match)", stats.no_time_match, c.simulated, width)?;
    write_ratio(f, "Failed (Cut Mismatch)", stats.cut_mismatch, c.simulated, width)?;
    for (cut, count) in &stats.failed_cuts {
        write_ratio(f, &format!("  > {}", cut), *count, c.simulated, width)?;
    }
    for (bit, counts) in &stats.by_ts_bit {
        write_ratio(f, &format!("TS bit {}", bit), counts.matched, counts.simulated, width)?;
    }
    write_series(f, &stats.window)
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.statistics;
        writeln!(f, "Run {} ({} to {})", s.run_id, s.started_at.to_rfc3339(), self.finished_at.to_rfc3339())?;

        let e = &s.events;
        let width = digits(e.processed.max(e.skipped()) as i64);
        writeln!(f, "Events")?;
        write_count(f, "Processed", e.processed, width)?;
        write_count(f, "Skipped (Missing Data)", e.skipped_missing_collection, width)?;
        write_count(f, "Skipped (Noise)", e.skipped_noise, width)?;
        write_count(f, "Skipped (Not Configured)", e.skipped_not_configured, width)?;
        write_count(f, "Trigger Skips (No TS Bit)", e.skipped_no_ts_bit, width)?;

        let c = &s.clusters;
        let denominator = c.verifiable;
        let largest = [c.simulated, c.verifiable, c.hardware]
            .into_iter()
            .chain(c.statuses.values().copied())
            .max()
            .unwrap_or(0);
        let width = digits(largest as i64);

        writeln!(f, "Cluster Verification")?;
        write_count(f, "Simulated Clusters", c.simulated, width)?;
        write_count(f, "Verifiable Clusters", c.verifiable, width)?;
        write_count(f, "Hardware Clusters", c.hardware, width)?;
        write_ratio(f, "Matched", c.matched(), denominator, width)?;
        for (status, causes) in CAUSES {
            write_ratio(f, &capitalize(&status.to_string()), c.status(status), denominator, width)?;
            for &kind in causes {
                let label = format!("  > {}", capitalize(&kind.to_string()));
                write_ratio(f, &label, c.cause(status, kind), denominator, width)?;
            }
        }
        write_series(f, &c.window)?;

        if !s.triggers.is_empty() {
            writeln!(f, "Trigger Verification")?;
        }
        for (trigger_type, sources) in &s.triggers {
            for (source, stats) in sources {
                writeln!(f, "  {} (from {})", trigger_type, source)?;
                write_trigger(f, stats)?;
            }
        }
        Ok(())
    }
}

fn capitalize(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
