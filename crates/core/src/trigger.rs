//! Trigger representations, trigger types and trigger-supervisor bits.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::ClusterLike;
use crate::error::{DiagError, Result};
use crate::geometry::Half;

/// Number of independent trigger instances per kind.
pub const TRIGGER_SLOTS: u8 = 4;

// ── Cuts ──────────────────────────────────────────────────────

/// A named trigger cut. Later detector generations add the hodoscope and
/// position-dependent cuts; earlier ones simply never report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cut {
    ClusterEnergyLow,
    ClusterEnergyHigh,
    ClusterHitCount,
    ClusterXMin,
    ClusterPde,
    HodoL1Matching,
    HodoL2Matching,
    HodoL1L2Geometry,
    HodoEcalMatching,
    PairEnergySum,
    PairEnergyDifference,
    PairEnergySlope,
    PairCoplanarity,
    PairTimeCoincidence,
}

impl Cut {
    pub fn name(&self) -> &'static str {
        match self {
            Cut::ClusterEnergyLow => "cluster energy low",
            Cut::ClusterEnergyHigh => "cluster energy high",
            Cut::ClusterHitCount => "cluster hit count",
            Cut::ClusterXMin => "cluster x min",
            Cut::ClusterPde => "cluster PDE",
            Cut::HodoL1Matching => "hodoscope L1 matching",
            Cut::HodoL2Matching => "hodoscope L2 matching",
            Cut::HodoL1L2Geometry => "hodoscope L1/L2 geometry",
            Cut::HodoEcalMatching => "hodoscope/calorimeter matching",
            Cut::PairEnergySum => "pair energy sum",
            Cut::PairEnergyDifference => "pair energy difference",
            Cut::PairEnergySlope => "pair energy slope",
            Cut::PairCoplanarity => "pair coplanarity",
            Cut::PairTimeCoincidence => "pair time coincidence",
        }
    }
}

impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pass/fail flags for the cuts a trigger reports. Cuts absent from the
/// map are treated as passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CutResults(pub BTreeMap<Cut, bool>);

impl CutResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, cut: Cut, passed: bool) -> Self {
        self.0.insert(cut, passed);
        self
    }

    pub fn passed(&self, cut: Cut) -> bool {
        self.0.get(&cut).copied().unwrap_or(true)
    }

    /// Cuts, over the union of both key sets, whose outcome differs.
    pub fn disagreements(&self, other: &CutResults) -> Vec<Cut> {
        let mut cuts: Vec<Cut> = self.0.keys().chain(other.0.keys()).copied().collect();
        cuts.sort();
        cuts.dedup();
        cuts.retain(|&cut| self.passed(cut) != other.passed(cut));
        cuts
    }

    pub fn agrees_with(&self, other: &CutResults) -> bool {
        self.disagreements(other).is_empty()
    }
}

// ── Trigger kinds ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Singles,
    Pair,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Singles => write!(f, "singles"),
            TriggerKind::Pair => write!(f, "pair"),
        }
    }
}

/// A trigger simulated in software from one cluster (singles) or a
/// two-cluster pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger<C> {
    Singles {
        slot: u8,
        source: C,
        cuts: CutResults,
    },
    Pair {
        slot: u8,
        source: [C; 2],
        cuts: CutResults,
    },
}

impl<C: ClusterLike> Trigger<C> {
    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::Singles { .. } => TriggerKind::Singles,
            Trigger::Pair { .. } => TriggerKind::Pair,
        }
    }

    pub fn slot(&self) -> u8 {
        match self {
            Trigger::Singles { slot, .. } | Trigger::Pair { slot, .. } => *slot,
        }
    }

    pub fn cuts(&self) -> &CutResults {
        match self {
            Trigger::Singles { cuts, .. } | Trigger::Pair { cuts, .. } => cuts,
        }
    }

    /// Seed time for singles, earliest member time for pairs.
    pub fn time(&self) -> f64 {
        match self {
            Trigger::Singles { source, .. } => source.time(),
            Trigger::Pair { source: [a, b], .. } => a.time().min(b.time()),
        }
    }

    /// Detector half of a singles trigger's seed; pairs span both.
    pub fn half(&self) -> Option<Half> {
        match self {
            Trigger::Singles { source, .. } => Some(Half::of(source.seed())),
            Trigger::Pair { .. } => None,
        }
    }

    pub fn clusters(&self) -> Vec<&C> {
        match self {
            Trigger::Singles { source, .. } => vec![source],
            Trigger::Pair { source: [a, b], .. } => vec![a, b],
        }
    }
}

/// A trigger reported by the hardware trigger electronics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HardwareTrigger {
    Singles { slot: u8, time: f64, cuts: CutResults },
    Pair { slot: u8, time: f64, cuts: CutResults },
}

impl HardwareTrigger {
    pub fn kind(&self) -> TriggerKind {
        match self {
            HardwareTrigger::Singles { .. } => TriggerKind::Singles,
            HardwareTrigger::Pair { .. } => TriggerKind::Pair,
        }
    }

    pub fn slot(&self) -> u8 {
        match self {
            HardwareTrigger::Singles { slot, .. } | HardwareTrigger::Pair { slot, .. } => *slot,
        }
    }

    pub fn time(&self) -> f64 {
        match self {
            HardwareTrigger::Singles { time, .. } | HardwareTrigger::Pair { time, .. } => *time,
        }
    }

    pub fn cuts(&self) -> &CutResults {
        match self {
            HardwareTrigger::Singles { cuts, .. } | HardwareTrigger::Pair { cuts, .. } => cuts,
        }
    }
}

// ── Trigger types ─────────────────────────────────────────────

/// A verifiable trigger configuration, e.g. `singles-top-0` or `pair-3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TriggerType {
    Singles { half: Half, slot: u8 },
    Pair { slot: u8 },
}

impl TriggerType {
    pub fn kind(&self) -> TriggerKind {
        match self {
            TriggerType::Singles { .. } => TriggerKind::Singles,
            TriggerType::Pair { .. } => TriggerKind::Pair,
        }
    }

    pub fn slot(&self) -> u8 {
        match self {
            TriggerType::Singles { slot, .. } | TriggerType::Pair { slot } => *slot,
        }
    }

    pub fn half(&self) -> Option<Half> {
        match self {
            TriggerType::Singles { half, .. } => Some(*half),
            TriggerType::Pair { .. } => None,
        }
    }

    /// Hardware triggers carry no half, so only kind and slot are compared.
    pub fn selects_hardware(&self, trigger: &HardwareTrigger) -> bool {
        trigger.kind() == self.kind() && trigger.slot() == self.slot()
    }

    pub fn selects_simulated<C: ClusterLike>(&self, trigger: &Trigger<C>) -> bool {
        trigger.kind() == self.kind()
            && trigger.slot() == self.slot()
            && (self.half().is_none() || trigger.half() == self.half())
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerType::Singles { half, slot } => write!(f, "singles-{}-{}", half, slot),
            TriggerType::Pair { slot } => write!(f, "pair-{}", slot),
        }
    }
}

impl FromStr for TriggerType {
    type Err = DiagError;

    fn from_str(s: &str) -> Result<Self> {
        let unknown = || DiagError::UnknownTriggerType(s.to_string());
        let lower = s.trim().to_ascii_lowercase();

        let (prefix, slot) = lower.rsplit_once('-').ok_or_else(unknown)?;
        let slot: u8 = slot.parse().map_err(|_| unknown())?;
        if slot >= TRIGGER_SLOTS {
            return Err(unknown());
        }

        match prefix {
            "singles-top" => Ok(TriggerType::Singles { half: Half::Top, slot }),
            "singles-bottom" => Ok(TriggerType::Singles { half: Half::Bottom, slot }),
            "pair" => Ok(TriggerType::Pair { slot }),
            _ => Err(unknown()),
        }
    }
}

impl TryFrom<String> for TriggerType {
    type Error = DiagError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<TriggerType> for String {
    fn from(t: TriggerType) -> Self {
        t.to_string()
    }
}

// ── Trigger-supervisor bits ───────────────────────────────────

/// One bit of the trigger supervisor's active-trigger word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TsBit {
    Trigger(TriggerType),
    Led,
    Cosmic,
    Hodoscope,
    Pulser,
    Multiplicity0,
    Multiplicity1,
    FeeTop,
    FeeBottom,
}

impl TsBit {
    /// Every bit, in supervisor order.
    pub fn all() -> Vec<TsBit> {
        let mut bits = Vec::new();
        for half in [Half::Top, Half::Bottom] {
            for slot in 0..TRIGGER_SLOTS {
                bits.push(TsBit::Trigger(TriggerType::Singles { half, slot }));
            }
        }
        for slot in 0..TRIGGER_SLOTS {
            bits.push(TsBit::Trigger(TriggerType::Pair { slot }));
        }
        bits.extend([
            TsBit::Led,
            TsBit::Cosmic,
            TsBit::Hodoscope,
            TsBit::Pulser,
            TsBit::Multiplicity0,
            TsBit::Multiplicity1,
            TsBit::FeeTop,
            TsBit::FeeBottom,
        ]);
        bits
    }

    pub fn trigger_type(&self) -> Option<TriggerType> {
        match self {
            TsBit::Trigger(t) => Some(*t),
            _ => None,
        }
    }

    /// Resolve to a verifiable trigger type or fail.
    pub fn verifiable(&self) -> Result<TriggerType> {
        self.trigger_type()
            .ok_or(DiagError::UnsupportedTriggerType(*self))
    }
}

impl fmt::Display for TsBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TsBit::Trigger(t) => write!(f, "{}", t),
            TsBit::Led => write!(f, "led"),
            TsBit::Cosmic => write!(f, "cosmic"),
            TsBit::Hodoscope => write!(f, "hodoscope"),
            TsBit::Pulser => write!(f, "pulser"),
            TsBit::Multiplicity0 => write!(f, "multiplicity-0"),
            TsBit::Multiplicity1 => write!(f, "multiplicity-1"),
            TsBit::FeeTop => write!(f, "fee-top"),
            TsBit::FeeBottom => write!(f, "fee-bottom"),
        }
    }
}

impl FromStr for TsBit {
    type Err = DiagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "led" => Ok(TsBit::Led),
            "cosmic" => Ok(TsBit::Cosmic),
            "hodoscope" => Ok(TsBit::Hodoscope),
            "pulser" => Ok(TsBit::Pulser),
            "multiplicity-0" => Ok(TsBit::Multiplicity0),
            "multiplicity-1" => Ok(TsBit::Multiplicity1),
            "fee-top" => Ok(TsBit::FeeTop),
            "fee-bottom" => Ok(TsBit::FeeBottom),
            _ => s.parse().map(TsBit::Trigger),
        }
    }
}

impl TryFrom<String> for TsBit {
    type Error = DiagError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<TsBit> for String {
    fn from(bit: TsBit) -> Self {
        bit.to_string()
    }
}
