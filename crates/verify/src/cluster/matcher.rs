use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use daqdiag_core::numeric::within;
use daqdiag_core::ClusterLike;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Matched,
    FailPosition,
    FailTime,
    FailEnergy,
    FailHitCount,
}

impl MatchStatus {
    pub const ALL: [MatchStatus; 5] = [
        MatchStatus::Matched,
        MatchStatus::FailPosition,
        MatchStatus::FailTime,
        MatchStatus::FailEnergy,
        MatchStatus::FailHitCount,
    ];

    pub fn is_matched(&self) -> bool {
        *self == MatchStatus::Matched
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStatus::Matched => "matched",
            MatchStatus::FailPosition => "failed position",
            MatchStatus::FailTime => "failed time",
            MatchStatus::FailEnergy => "failed energy",
            MatchStatus::FailHitCount => "failed hit count",
        };
        f.write_str(s)
    }
}

/// The outcome for one simulated cluster. `hardware` is set whenever a
/// structural (same cell, same time) match was found, including the
/// energy and hit-count failures.
#[derive(Debug)]
pub struct ClusterPair<'a, S, H> {
    pub simulated: &'a S,
    pub hardware: Option<&'a H>,
    /// Index of `hardware` in the event's hardware cluster list.
    pub hardware_index: Option<usize>,
    pub status: MatchStatus,
}

impl<S, H> Clone for ClusterPair<'_, S, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, H> Copy for ClusterPair<'_, S, H> {}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchTolerances {
    /// GeV, inclusive.
    pub energy: f64,
    /// Inclusive.
    pub hit_count: u32,
    /// Simulated hit counts are clamped to this before comparison.
    pub hardware_hit_cap: Option<u32>,
    /// Hardware clusters later than this (ns) are stale reports.
    pub window_width: f64,
}

/// Why a hardware cluster was or was not taken by a simulated cluster.
enum Candidate {
    Consumed,
    Stale,
    WrongPosition,
    WrongTime,
    Structural,
}

/// Greedy one-to-one matcher. Simulated clusters are visited in input
/// order and each takes the first suitable hardware cluster.
#[derive(Debug, Clone)]
pub struct ClusterMatcher {
    tolerances: MatchTolerances,
}

impl ClusterMatcher {
    pub fn new(tolerances: MatchTolerances) -> Self {
        Self { tolerances }
    }

    pub fn tolerances(&self) -> &MatchTolerances {
        &self.tolerances
    }

    /// Produce exactly one pair per simulated cluster.
    pub fn match_clusters<'a, S, H, I>(&self, simulated: I, hardware: &'a [H]) -> Vec<ClusterPair<'a, S, H>>
    where
        S: ClusterLike + 'a,
        H: ClusterLike,
        I: IntoIterator<Item = &'a S>,
    {
        let mut consumed = vec![false; hardware.len()];
        simulated
            .into_iter()
            .map(|sim| self.match_one(sim, hardware, &mut consumed))
            .collect()
    }

    fn match_one<'a, S, H>(&self, sim: &'a S, hardware: &'a [H], consumed: &mut [bool]) -> ClusterPair<'a, S, H>
    where
        S: ClusterLike,
        H: ClusterLike,
    {
        let mut position_candidate = false;

        for (index, hw) in hardware.iter().enumerate() {
            match self.assess(sim, hw, consumed[index]) {
                Candidate::Consumed | Candidate::Stale | Candidate::WrongPosition => continue,
                Candidate::WrongTime => position_candidate = true,
                Candidate::Structural => {
                    consumed[index] = true;
                    let status = self.verify_values(sim, hw);
                    debug!(
                        "{} -> {} [{}]",
                        sim.describe(),
                        hw.describe(),
                        status
                    );
                    return ClusterPair {
                        simulated: sim,
                        hardware: Some(hw),
                        hardware_index: Some(index),
                        status,
                    };
                }
            }
        }

        let status = if !position_candidate {
            MatchStatus::FailPosition
        } else if hardware
            .iter()
            .zip(consumed.iter())
            .any(|(hw, &used)| !used && hw.time() == sim.time())
        {
            // The time slot is taken by a cluster elsewhere.
            MatchStatus::FailPosition
        } else {
            MatchStatus::FailTime
        };
        debug!("{} -> none [{}]", sim.describe(), status);

        ClusterPair {
            simulated: sim,
            hardware: None,
            hardware_index: None,
            status,
        }
    }

    fn assess<S: ClusterLike, H: ClusterLike>(&self, sim: &S, hw: &H, consumed: bool) -> Candidate {
        if consumed {
            return Candidate::Consumed;
        }
        if hw.time() > self.tolerances.window_width {
            return Candidate::Stale;
        }
        if sim.seed() != hw.seed() {
            return Candidate::WrongPosition;
        }
        if sim.time() != hw.time() {
            return Candidate::WrongTime;
        }
        Candidate::Structural
    }

    /// Hit count is checked before energy.
    fn verify_values<S: ClusterLike, H: ClusterLike>(&self, sim: &S, hw: &H) -> MatchStatus {
        let sim_hits = match self.tolerances.hardware_hit_cap {
            Some(cap) => sim.hit_count().min(cap),
            None => sim.hit_count(),
        };
        if sim_hits.abs_diff(hw.hit_count()) > self.tolerances.hit_count {
            return MatchStatus::FailHitCount;
        }
        if !within(sim.energy(), hw.energy(), self.tolerances.energy) {
            return MatchStatus::FailEnergy;
        }
        MatchStatus::Matched
    }
}
