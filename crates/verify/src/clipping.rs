//! Pulse-clipping filter.
//!
//! A hit whose integration window runs past either edge of the readout
//! window has its energy underestimated by the hardware, so clusters
//! containing one are not expected to verify.

use daqdiag_core::config::FadcConfig;
use daqdiag_core::{Cluster, ClusterHits, Hit, Trigger};

pub fn hit_is_verifiable(hit: &Hit, fadc: &FadcConfig) -> bool {
    hit.time > fadc.nsb && hit.time < fadc.window_width - fadc.nsa && hit.corrected_energy >= 0.0
}

pub fn is_verifiable<C: ClusterHits>(cluster: &C, fadc: &FadcConfig) -> bool {
    cluster.hits().iter().all(|hit| hit_is_verifiable(hit, fadc))
}

/// A software trigger is verifiable iff every source cluster is.
pub fn trigger_is_verifiable(trigger: &Trigger<Cluster>, fadc: &FadcConfig) -> bool {
    trigger.clusters().into_iter().all(|c| is_verifiable(c, fadc))
}
