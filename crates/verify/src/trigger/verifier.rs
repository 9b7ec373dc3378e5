use std::fmt;

use serde::{Deserialize, Serialize};

use daqdiag_core::{ClusterLike, HardwareTrigger, Result, Trigger, TriggerType};

use super::matcher::{TriggerMatchResult, TriggerMatcher};

/// Which clusters a simulated trigger was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    SoftwareClusters,
    HardwareClusters,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSource::SoftwareClusters => write!(f, "software clusters"),
            TriggerSource::HardwareClusters => write!(f, "hardware clusters"),
        }
    }
}

#[derive(Debug)]
pub struct TriggerVerification<'a, C> {
    pub trigger_type: TriggerType,
    pub results: Vec<TriggerMatchResult<'a, C>>,
    /// Verifiable simulated triggers inside the counting window.
    pub simulated_in_window: u64,
    /// Hardware triggers of this type, whatever their time.
    pub hardware: u64,
    pub matched_in_window: u64,
}

/// Verifies one trigger type: selects its triggers, filters out the
/// unverifiable ones, and matches the rest.
#[derive(Debug, Clone, Copy)]
pub struct TriggerVerifier {
    trigger_type: TriggerType,
    window_start_ns: f64,
    window_end_ns: f64,
}

impl TriggerVerifier {
    pub fn new(trigger_type: TriggerType, window_start_ns: f64, window_end_ns: f64) -> Self {
        Self {
            trigger_type,
            window_start_ns,
            window_end_ns,
        }
    }

    pub fn trigger_type(&self) -> TriggerType {
        self.trigger_type
    }

    /// Inclusive at both ends.
    pub fn in_window(&self, time: f64) -> bool {
        time >= self.window_start_ns && time <= self.window_end_ns
    }

    /// Triggers outside the counting window still take part in matching,
    /// they are just not counted.
    pub fn verify<'a, C, F>(
        &self,
        simulated: &'a [Trigger<C>],
        hardware: &'a [HardwareTrigger],
        verifiable: F,
    ) -> Result<TriggerVerification<'a, C>>
    where
        C: ClusterLike,
        F: Fn(&Trigger<C>) -> bool,
    {
        let t = self.trigger_type;
        let selected = simulated
            .iter()
            .filter(|trigger| t.selects_simulated(trigger) && verifiable(*trigger));
        let hardware: Vec<&HardwareTrigger> = hardware
            .iter()
            .filter(|trigger| t.selects_hardware(trigger))
            .collect();
        let hardware_count = hardware.len() as u64;

        let results = TriggerMatcher.match_triggers(selected, hardware)?;

        let mut simulated_in_window = 0;
        let mut matched_in_window = 0;
        for result in &results {
            if self.in_window(result.simulated.time()) {
                simulated_in_window += 1;
                if result.is_matched() {
                    matched_in_window += 1;
                }
            }
        }

        Ok(TriggerVerification {
            trigger_type: t,
            results,
            simulated_in_window,
            hardware: hardware_count,
            matched_in_window,
        })
    }
}
