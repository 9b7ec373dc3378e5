pub mod clipping;
pub mod cluster;
pub mod run;
pub mod stats;
pub mod trigger;

pub use cluster::{
    CauseKind, ClassifierSettings, ClusterFailureClassifier, ClusterMatcher, ClusterPair,
    DeadtimeEvidence, FailureCause, MatchStatus, MatchTolerances,
};
pub use run::{ClusterSummary, DiagnosticsRun, EventOutcome, EventReport, PairRecord, SkipReason, TriggerRecord};
pub use stats::{EfficiencyWindowTracker, RunStatistics, RunSummary, TimeWindowSample};
pub use trigger::{TriggerFailure, TriggerMatchResult, TriggerMatcher, TriggerSource, TriggerVerifier};
