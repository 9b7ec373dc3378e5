mod matcher;
mod verifier;

pub use matcher::{matched_count, TriggerFailure, TriggerMatchResult, TriggerMatcher};
pub use verifier::{TriggerSource, TriggerVerification, TriggerVerifier};
