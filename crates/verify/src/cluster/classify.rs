//! Attribution of cluster verification failures to physical causes.
//!
//! The heuristics here encode known behaviour of the trigger electronics
//! and are calibrated against real hardware. Each check is a guard that
//! either names a cause or falls through to the next one.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use daqdiag_core::numeric::within;
use daqdiag_core::{CellIndex, ClusterHits, ClusterLike, Hit};

use super::matcher::{ClusterPair, MatchStatus};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierSettings {
    /// GeV.
    pub energy_tolerance: f64,
    /// Readout-start deadtime region, ns.
    pub deadtime_window_ns: f64,
    /// Clusterer look-back window, ns.
    pub window_before_ns: f64,
    /// GeV.
    pub seed_energy_threshold: f64,
}

impl ClassifierSettings {
    fn late_bound(&self) -> f64 {
        self.deadtime_window_ns + self.window_before_ns
    }
}

/// What pointed to deadtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadtimeEvidence {
    /// An early single-hit cluster, which nothing else could replace.
    SingleHitEarlyCluster,
    /// A non-seed hit above seed threshold sits where the hardware
    /// reported a cluster.
    AlternateSeedReported,
    /// A non-seed hit above seed threshold is itself early.
    AlternateSeedEarly,
    /// An early cluster with no alternate seed candidate.
    NoAlternateSeed,
    /// A hit at t = 0 in the 3×3 footprint.
    ZeroTimeNeighbor,
    /// The cluster itself is in the deadtime region.
    EarlyCluster,
    /// An early hit shortly before the cluster on a channel it did not use.
    EarlyNeighborHit,
    /// Removing one early hit reconciles the two energies.
    EnergyReconciled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "cause", content = "evidence", rename_all = "snake_case")]
pub enum FailureCause {
    NearSeedThreshold,
    PositionDeadtime(DeadtimeEvidence),
    CloneBug,
    TimeDeadtime,
    NegativeEnergyHit,
    HitCountDeadtime(DeadtimeEvidence),
    Unclassified,
}

impl FailureCause {
    pub fn kind(&self) -> CauseKind {
        match self {
            FailureCause::NearSeedThreshold => CauseKind::NearSeedThreshold,
            FailureCause::PositionDeadtime(_) => CauseKind::PositionDeadtime,
            FailureCause::CloneBug => CauseKind::CloneBug,
            FailureCause::TimeDeadtime => CauseKind::TimeDeadtime,
            FailureCause::NegativeEnergyHit => CauseKind::NegativeEnergyHit,
            FailureCause::HitCountDeadtime(_) => CauseKind::HitCountDeadtime,
            FailureCause::Unclassified => CauseKind::Unclassified,
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::PositionDeadtime(e) | FailureCause::HitCountDeadtime(e) => {
                write!(f, "{} ({:?})", self.kind(), e)
            }
            _ => write!(f, "{}", self.kind()),
        }
    }
}

/// Counter key for a cause, without its evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CauseKind {
    NearSeedThreshold,
    PositionDeadtime,
    CloneBug,
    TimeDeadtime,
    NegativeEnergyHit,
    HitCountDeadtime,
    Unclassified,
}

impl fmt::Display for CauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CauseKind::NearSeedThreshold => "near seed threshold",
            CauseKind::PositionDeadtime => "deadtime",
            CauseKind::CloneBug => "clone bug",
            CauseKind::TimeDeadtime => "deadtime",
            CauseKind::NegativeEnergyHit => "negative energy hit",
            CauseKind::HitCountDeadtime => "deadtime",
            CauseKind::Unclassified => "unclassified",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct ClusterFailureClassifier {
    settings: ClassifierSettings,
}

impl ClusterFailureClassifier {
    pub fn new(settings: ClassifierSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    /// Attribute a failed pair. Matched pairs have no cause.
    ///
    /// `pairs` is the full pair list for the event and `hardware` every
    /// hardware cluster the event reported, stale ones included.
    pub fn classify<S, H>(
        &self,
        pair: &ClusterPair<'_, S, H>,
        pairs: &[ClusterPair<'_, S, H>],
        hits: &[Hit],
        hardware: &[H],
    ) -> Option<FailureCause>
    where
        S: ClusterHits,
        H: ClusterLike,
    {
        let cause = match pair.status {
            MatchStatus::Matched => return None,
            MatchStatus::FailPosition => self.position_cause(pair.simulated, pairs, hits, hardware),
            MatchStatus::FailTime => self.time_cause(pair.simulated, hits),
            MatchStatus::FailHitCount => match pair.hardware {
                Some(hw) => self.hit_count_cause(pair.simulated, hw, hits),
                None => FailureCause::Unclassified,
            },
            MatchStatus::FailEnergy => FailureCause::Unclassified,
        };
        debug!("{} [{}] attributed to {}", pair.simulated.describe(), pair.status, cause);
        Some(cause)
    }

    fn position_cause<S, H>(
        &self,
        sim: &S,
        pairs: &[ClusterPair<'_, S, H>],
        hits: &[Hit],
        hardware: &[H],
    ) -> FailureCause
    where
        S: ClusterHits,
        H: ClusterLike,
    {
        let s = &self.settings;
        if within(sim.energy(), s.seed_energy_threshold, s.energy_tolerance) {
            return FailureCause::NearSeedThreshold;
        }

        let time = sim.time();
        if time < s.late_bound() {
            if time < s.deadtime_window_ns {
                return FailureCause::PositionDeadtime(self.early_position_evidence(sim, hardware));
            }
            if has_zero_time_hit(hits, &sim.seed().footprint(), None) {
                return FailureCause::PositionDeadtime(DeadtimeEvidence::ZeroTimeNeighbor);
            }
            return FailureCause::Unclassified;
        }

        if is_clone_bug(time, pairs, hardware) {
            return FailureCause::CloneBug;
        }
        FailureCause::Unclassified
    }

    /// An early cluster always fails to deadtime; this only records why.
    fn early_position_evidence<S, H>(&self, sim: &S, hardware: &[H]) -> DeadtimeEvidence
    where
        S: ClusterHits,
        H: ClusterLike,
    {
        if sim.hit_count() == 1 {
            return DeadtimeEvidence::SingleHitEarlyCluster;
        }

        let threshold = self.settings.seed_energy_threshold;
        for hit in sim.hits().iter().skip(1) {
            if hit.raw_energy < threshold {
                continue;
            }
            if hardware.iter().any(|hw| hw.seed() == hit.cell) {
                return DeadtimeEvidence::AlternateSeedReported;
            }
            if hit.time < self.settings.deadtime_window_ns {
                return DeadtimeEvidence::AlternateSeedEarly;
            }
        }
        DeadtimeEvidence::NoAlternateSeed
    }

    fn time_cause<S: ClusterHits>(&self, sim: &S, hits: &[Hit]) -> FailureCause {
        if sim.time() < self.settings.late_bound()
            && has_zero_time_hit(hits, &sim.seed().footprint(), None)
        {
            return FailureCause::TimeDeadtime;
        }
        FailureCause::Unclassified
    }

    fn hit_count_cause<S, H>(&self, sim: &S, hw: &H, hits: &[Hit]) -> FailureCause
    where
        S: ClusterHits,
        H: ClusterLike,
    {
        let s = &self.settings;
        let sim_energy = sim.energy();
        let hw_energy = hw.energy();

        // Same energy with a different hit count: a near-zero hit the
        // simulation saw as negative and dropped.
        if within(sim_energy, hw_energy, s.energy_tolerance) {
            return FailureCause::NegativeEnergyHit;
        }

        let time = sim.time();
        let deadtime = s.deadtime_window_ns;
        if time < deadtime {
            return FailureCause::HitCountDeadtime(DeadtimeEvidence::EarlyCluster);
        }

        let footprint = sim.seed().footprint();
        let used: BTreeSet<CellIndex> = sim.hits().iter().skip(1).map(|h| h.cell).collect();

        let early_neighbor = hits.iter().any(|hit| {
            let lead = time - hit.time;
            hit.time < deadtime
                && (0.0..deadtime).contains(&lead)
                && footprint.contains(&hit.cell)
                && !used.contains(&hit.cell)
        });
        if early_neighbor {
            return FailureCause::HitCountDeadtime(DeadtimeEvidence::EarlyNeighborHit);
        }

        let reconciled = hits.iter().any(|hit| {
            hit.time < deadtime && (sim_energy - hit.raw_energy - hw_energy).abs() < s.energy_tolerance
        });
        if reconciled {
            return FailureCause::HitCountDeadtime(DeadtimeEvidence::EnergyReconciled);
        }

        if has_zero_time_hit(hits, &footprint, Some(&used)) {
            return FailureCause::HitCountDeadtime(DeadtimeEvidence::ZeroTimeNeighbor);
        }

        FailureCause::Unclassified
    }
}

/// A hit at exactly t = 0 inside `cells`, optionally not at an `excluded` cell.
fn has_zero_time_hit(hits: &[Hit], cells: &BTreeSet<CellIndex>, excluded: Option<&BTreeSet<CellIndex>>) -> bool {
    hits.iter().any(|hit| {
        hit.time == 0.0
            && cells.contains(&hit.cell)
            && excluded.map_or(true, |ex| !ex.contains(&hit.cell))
    })
}

/// At least two hardware clusters at one position, one of them at `time`
/// and absent from every pair.
fn is_clone_bug<S, H>(time: f64, pairs: &[ClusterPair<'_, S, H>], hardware: &[H]) -> bool
where
    H: ClusterLike,
{
    let mut by_position: IndexMap<CellIndex, Vec<usize>> = IndexMap::new();
    for (index, hw) in hardware.iter().enumerate() {
        by_position.entry(hw.seed()).or_default().push(index);
    }

    by_position.values().filter(|group| group.len() >= 2).any(|group| {
        group.iter().any(|&index| {
            hardware[index].time() == time && !pairs.iter().any(|p| p.hardware_index == Some(index))
        })
    })
}
