use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::CellIndex;

/// A single calorimeter crystal readout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(flatten)]
    pub cell: CellIndex,
    /// GeV, before gain correction.
    pub raw_energy: f64,
    /// GeV.
    pub corrected_energy: f64,
    /// ns.
    pub time: f64,
}

impl Hit {
    pub fn new(ix: i32, iy: i32, energy: f64, time: f64) -> Self {
        Self {
            cell: CellIndex::new(ix, iy),
            raw_energy: energy,
            corrected_energy: energy,
            time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterSource {
    Simulated,
    Hardware,
}

impl fmt::Display for ClusterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterSource::Simulated => write!(f, "simulated"),
            ClusterSource::Hardware => write!(f, "hardware"),
        }
    }
}

/// The capabilities the matcher and classifier rely on. Every cluster
/// representation, whatever produced it, is reduced to these.
pub trait ClusterLike {
    fn source(&self) -> ClusterSource;
    fn seed(&self) -> CellIndex;
    fn time(&self) -> f64;
    fn energy(&self) -> f64;
    fn hit_count(&self) -> u32;

    /// One-line description used in pair tables.
    fn describe(&self) -> String {
        format!(
            "{} t = {:3.0} ns, E = {:.3} GeV, N = {}",
            self.seed(),
            self.time(),
            self.energy(),
            self.hit_count()
        )
    }
}

/// A cluster that also knows its constituent hits.
pub trait ClusterHits: ClusterLike {
    /// Constituent hits, seed first.
    fn hits(&self) -> &[Hit];

    fn seed_hit(&self) -> &Hit {
        &self.hits()[0]
    }
}

/// A cluster formed in software from calorimeter hits.
///
/// Never empty. The seed (highest corrected energy, first wins on ties) is
/// stored at index zero and fixes the cluster's position and time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCluster", into = "RawCluster")]
pub struct Cluster {
    hits: Vec<Hit>,
    energy: f64,
}

#[derive(Serialize, Deserialize)]
struct RawCluster {
    hits: Vec<Hit>,
}

impl TryFrom<RawCluster> for Cluster {
    type Error = String;

    fn try_from(raw: RawCluster) -> Result<Self, Self::Error> {
        Cluster::from_hits(raw.hits).ok_or_else(|| "cluster has no hits".to_string())
    }
}

impl From<Cluster> for RawCluster {
    fn from(cluster: Cluster) -> Self {
        RawCluster { hits: cluster.hits }
    }
}

impl Cluster {
    /// Returns `None` for an empty hit list.
    pub fn from_hits(mut hits: Vec<Hit>) -> Option<Self> {
        if hits.is_empty() {
            return None;
        }

        let mut seed = 0;
        for (i, hit) in hits.iter().enumerate() {
            if hit.corrected_energy > hits[seed].corrected_energy {
                seed = i;
            }
        }
        let seed_hit = hits.remove(seed);
        hits.insert(0, seed_hit);

        let energy = hits.iter().map(|h| h.corrected_energy).sum();
        Some(Self { hits, energy })
    }
}

impl ClusterLike for Cluster {
    fn source(&self) -> ClusterSource {
        ClusterSource::Simulated
    }

    fn seed(&self) -> CellIndex {
        self.hits[0].cell
    }

    fn time(&self) -> f64 {
        self.hits[0].time
    }

    fn energy(&self) -> f64 {
        self.energy
    }

    fn hit_count(&self) -> u32 {
        self.hits.len() as u32
    }
}

impl ClusterHits for Cluster {
    fn hits(&self) -> &[Hit] {
        &self.hits
    }
}

/// A cluster as reported by the trigger electronics: position, time,
/// energy and hit count only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardwareCluster {
    #[serde(flatten)]
    pub cell: CellIndex,
    pub time: f64,
    pub energy: f64,
    pub hit_count: u32,
}

impl HardwareCluster {
    pub fn new(ix: i32, iy: i32, time: f64, energy: f64, hit_count: u32) -> Self {
        Self {
            cell: CellIndex::new(ix, iy),
            time,
            energy,
            hit_count,
        }
    }
}

impl ClusterLike for HardwareCluster {
    fn source(&self) -> ClusterSource {
        ClusterSource::Hardware
    }

    fn seed(&self) -> CellIndex {
        self.cell
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn energy(&self) -> f64 {
        self.energy
    }

    fn hit_count(&self) -> u32 {
        self.hit_count
    }
}
