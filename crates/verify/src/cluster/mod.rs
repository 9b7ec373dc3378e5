mod classify;
mod matcher;

pub use classify::{CauseKind, ClassifierSettings, ClusterFailureClassifier, DeadtimeEvidence, FailureCause};
pub use matcher::{ClusterMatcher, ClusterPair, MatchStatus, MatchTolerances};
