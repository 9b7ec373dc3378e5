use serde::{Deserialize, Serialize};

use crate::entity::{Cluster, HardwareCluster, Hit};
use crate::trigger::{HardwareTrigger, Trigger, TsBit};

/// Everything the diagnostics read from one event. A `None` collection was
/// absent from the event store, which is distinct from an empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub number: u64,
    /// Detector time, ns.
    pub timestamp: i64,
    pub hits: Option<Vec<Hit>>,
    pub simulated_clusters: Option<Vec<Cluster>>,
    pub hardware_clusters: Option<Vec<HardwareCluster>>,
    pub triggers: Option<TriggerData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerData {
    /// Triggers simulated from software clusters.
    pub software_cluster_triggers: Option<Vec<Trigger<Cluster>>>,
    /// Triggers simulated from hardware-reported clusters.
    pub hardware_cluster_triggers: Option<Vec<Trigger<HardwareCluster>>>,
    pub hardware_triggers: Option<Vec<HardwareTrigger>>,
    #[serde(default)]
    pub active_ts_bits: Vec<TsBit>,
}
