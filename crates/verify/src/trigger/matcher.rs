use serde::{Deserialize, Serialize};
use tracing::debug;

use daqdiag_core::{ClusterLike, Cut, DiagError, HardwareTrigger, Result, Trigger};

/// Why a simulated trigger found no hardware counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "failure", content = "cuts", rename_all = "snake_case")]
pub enum TriggerFailure {
    /// No unconsumed hardware trigger at the same time.
    NoTimeMatch,
    /// The first unconsumed hardware trigger at the same time disagreed
    /// on these cuts.
    CutMismatch(Vec<Cut>),
}

#[derive(Debug)]
pub struct TriggerMatchResult<'a, C> {
    pub simulated: &'a Trigger<C>,
    pub hardware: Option<&'a HardwareTrigger>,
    pub hardware_index: Option<usize>,
    pub failure: Option<TriggerFailure>,
}

impl<C> TriggerMatchResult<'_, C> {
    pub fn is_matched(&self) -> bool {
        self.hardware.is_some()
    }
}

pub fn matched_count<C>(results: &[TriggerMatchResult<'_, C>]) -> usize {
    results.iter().filter(|r| r.is_matched()).count()
}

/// One-to-one trigger matcher: equal time and agreeing cuts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerMatcher;

impl TriggerMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Every simulated and hardware trigger must be of the same kind; the
    /// whole input is checked before any matching starts.
    /// `hardware_index` in the results counts positions in `hardware`.
    pub fn match_triggers<'a, C, S, H>(&self, simulated: S, hardware: H) -> Result<Vec<TriggerMatchResult<'a, C>>>
    where
        C: ClusterLike + 'a,
        S: IntoIterator<Item = &'a Trigger<C>>,
        H: IntoIterator<Item = &'a HardwareTrigger>,
    {
        let simulated: Vec<&'a Trigger<C>> = simulated.into_iter().collect();
        let hardware: Vec<&'a HardwareTrigger> = hardware.into_iter().collect();
        check_kinds(&simulated, &hardware)?;

        let mut consumed = vec![false; hardware.len()];
        Ok(simulated
            .into_iter()
            .map(|sim| self.match_one(sim, &hardware, &mut consumed))
            .collect())
    }

    fn match_one<'a, C: ClusterLike>(
        &self,
        sim: &'a Trigger<C>,
        hardware: &[&'a HardwareTrigger],
        consumed: &mut [bool],
    ) -> TriggerMatchResult<'a, C> {
        let time = sim.time();

        for (index, &hw) in hardware.iter().enumerate() {
            if consumed[index] || hw.time() != time {
                continue;
            }
            if !sim.cuts().agrees_with(hw.cuts()) {
                continue;
            }

            consumed[index] = true;
            debug!("{} trigger at t = {} ns verified", sim.kind(), time);
            return TriggerMatchResult {
                simulated: sim,
                hardware: Some(hw),
                hardware_index: Some(index),
                failure: None,
            };
        }

        let failure = hardware
            .iter()
            .zip(consumed.iter())
            .find(|(hw, used)| !**used && hw.time() == time)
            .map(|(hw, _)| TriggerFailure::CutMismatch(sim.cuts().disagreements(hw.cuts())))
            .unwrap_or(TriggerFailure::NoTimeMatch);
        debug!("{} trigger at t = {} ns failed: {:?}", sim.kind(), time, failure);

        TriggerMatchResult {
            simulated: sim,
            hardware: None,
            hardware_index: None,
            failure: Some(failure),
        }
    }
}

/// The first trigger seen, simulated before hardware, fixes the kind.
fn check_kinds<C: ClusterLike>(simulated: &[&Trigger<C>], hardware: &[&HardwareTrigger]) -> Result<()> {
    let mut kinds = simulated
        .iter()
        .map(|t| t.kind())
        .chain(hardware.iter().map(|t| t.kind()));
    let Some(expected) = kinds.next() else {
        return Ok(());
    };
    match kinds.find(|&found| found != expected) {
        Some(found) => Err(DiagError::MismatchedTriggerKind { expected, found }),
        None => Ok(()),
    }
}
