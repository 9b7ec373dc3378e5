//! Run-long counters and sliding-window efficiency series.

mod report;
mod window;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use daqdiag_core::{ClusterLike, Cut, TriggerType, TsBit};

use crate::cluster::{CauseKind, MatchStatus};
use crate::trigger::{TriggerFailure, TriggerSource, TriggerVerification};

pub use report::RunSummary;
pub use window::{EfficiencyWindowTracker, TimeWindowSample};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounters {
    pub processed: u64,
    pub skipped_missing_collection: u64,
    pub skipped_noise: u64,
    pub skipped_not_configured: u64,
    /// Processed events whose trigger stage was skipped. Not part of
    /// `skipped()`.
    pub skipped_no_ts_bit: u64,
}

impl EventCounters {
    pub fn skipped(&self) -> u64 {
        self.skipped_missing_collection + self.skipped_noise + self.skipped_not_configured
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatistics {
    pub simulated: u64,
    /// Simulated clusters safe from pulse-clipping; efficiencies are
    /// relative to this.
    pub verifiable: u64,
    pub hardware: u64,
    pub statuses: BTreeMap<MatchStatus, u64>,
    pub causes: BTreeMap<MatchStatus, BTreeMap<CauseKind, u64>>,
    pub window: EfficiencyWindowTracker,
}

impl ClusterStatistics {
    pub fn new(window_size_ns: i64) -> Self {
        Self {
            simulated: 0,
            verifiable: 0,
            hardware: 0,
            statuses: BTreeMap::new(),
            causes: BTreeMap::new(),
            window: EfficiencyWindowTracker::new(window_size_ns),
        }
    }

    pub fn matched(&self) -> u64 {
        self.status(MatchStatus::Matched)
    }

    pub fn status(&self, status: MatchStatus) -> u64 {
        self.statuses.get(&status).copied().unwrap_or(0)
    }

    pub fn cause(&self, status: MatchStatus, kind: CauseKind) -> u64 {
        self.causes
            .get(&status)
            .and_then(|causes| causes.get(&kind))
            .copied()
            .unwrap_or(0)
    }

    /// Fold one event's pair outcomes into the counters.
    pub fn record<I>(&mut self, timestamp: i64, simulated: usize, hardware: usize, outcomes: I)
    where
        I: IntoIterator<Item = (MatchStatus, Option<CauseKind>)>,
    {
        let mut verifiable = 0;
        let mut matched = 0;
        for (status, cause) in outcomes {
            verifiable += 1;
            if status.is_matched() {
                matched += 1;
            }
            *self.statuses.entry(status).or_insert(0) += 1;
            if let Some(kind) = cause {
                *self.causes.entry(status).or_default().entry(kind).or_insert(0) += 1;
            }
        }

        self.simulated += simulated as u64;
        self.hardware += hardware as u64;
        self.verifiable += verifiable;
        self.window.record(timestamp, verifiable, matched);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerCounts {
    pub simulated: u64,
    pub hardware: u64,
    pub matched: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerStatistics {
    pub counts: TriggerCounts,
    pub by_ts_bit: BTreeMap<TsBit, TriggerCounts>,
    pub no_time_match: u64,
    pub cut_mismatch: u64,
    pub failed_cuts: BTreeMap<Cut, u64>,
    pub window: EfficiencyWindowTracker,
}

impl TriggerStatistics {
    pub fn new(window_size_ns: i64) -> Self {
        Self {
            counts: TriggerCounts::default(),
            by_ts_bit: BTreeMap::new(),
            no_time_match: 0,
            cut_mismatch: 0,
            failed_cuts: BTreeMap::new(),
            window: EfficiencyWindowTracker::new(window_size_ns),
        }
    }

    /// Only triggers inside the counting window contribute.
    pub fn record<C, F>(
        &mut self,
        timestamp: i64,
        verification: &TriggerVerification<'_, C>,
        in_window: F,
        active_bits: &[TsBit],
    ) where
        C: ClusterLike,
        F: Fn(f64) -> bool,
    {
        for result in &verification.results {
            if !in_window(result.simulated.time()) {
                continue;
            }
            match &result.failure {
                None => {}
                Some(TriggerFailure::NoTimeMatch) => self.no_time_match += 1,
                Some(TriggerFailure::CutMismatch(cuts)) => {
                    self.cut_mismatch += 1;
                    for cut in cuts {
                        *self.failed_cuts.entry(*cut).or_insert(0) += 1;
                    }
                }
            }
        }

        let simulated = verification.simulated_in_window;
        let matched = verification.matched_in_window;
        let hardware = verification.hardware;
        self.counts.simulated += simulated;
        self.counts.hardware += hardware;
        self.counts.matched += matched;
        for bit in active_bits {
            let counts = self.by_ts_bit.entry(*bit).or_default();
            counts.simulated += simulated;
            counts.hardware += hardware;
            counts.matched += matched;
        }
        self.window.record(timestamp, simulated, matched);
    }
}

/// Everything accumulated over a run. Mutated once per processed event
/// and read at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub events: EventCounters,
    pub clusters: ClusterStatistics,
    pub triggers: BTreeMap<TriggerType, BTreeMap<TriggerSource, TriggerStatistics>>,
}

impl RunStatistics {
    pub fn new(window_size_ns: i64, trigger_types: &[TriggerType]) -> Self {
        let triggers = trigger_types
            .iter()
            .map(|&t| {
                let per_source = [TriggerSource::SoftwareClusters, TriggerSource::HardwareClusters]
                    .into_iter()
                    .map(|source| (source, TriggerStatistics::new(window_size_ns)))
                    .collect();
                (t, per_source)
            })
            .collect();

        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            events: EventCounters::default(),
            clusters: ClusterStatistics::new(window_size_ns),
            triggers,
        }
    }

    pub fn trigger(&self, trigger_type: TriggerType, source: TriggerSource) -> Option<&TriggerStatistics> {
        self.triggers.get(&trigger_type).and_then(|m| m.get(&source))
    }

    pub fn trigger_mut(&mut self, trigger_type: TriggerType, source: TriggerSource) -> &mut TriggerStatistics {
        let size = self.clusters.window.size_ns();
        self.triggers
            .entry(trigger_type)
            .or_default()
            .entry(source)
            .or_insert_with(|| TriggerStatistics::new(size))
    }
}
