use daqdiag_core::config::{ClustererConfig, DaqConfig, DiagnosticsConfig, FadcConfig};
use daqdiag_core::{Cluster, ClusterHits, EventData, HardwareCluster, Hit, TriggerData};
use daqdiag_verify::DiagnosticsRun;

pub const SEED_THRESHOLD: f64 = 0.05;

/// Integration window wide enough for the 10 ns early-cluster scenarios.
pub fn daq() -> DaqConfig {
    DaqConfig {
        fadc: FadcConfig {
            nsa: 60.0,
            nsb: 4.0,
            window_width: 400.0,
        },
        clusterer: ClustererConfig {
            seed_energy_threshold: SEED_THRESHOLD,
        },
    }
}

pub fn config() -> DiagnosticsConfig {
    DiagnosticsConfig::default()
}

/// A run that has already received `daq()`.
pub fn run(config: DiagnosticsConfig) -> DiagnosticsRun {
    let mut run = DiagnosticsRun::new(config).unwrap();
    run.on_daq_config(daq()).unwrap();
    run
}

/// A simulated cluster seeded at `(ix, iy)`. The first energy goes to the
/// seed; the rest fill neighbouring crystals in index order. All hits share
/// the seed time.
pub fn cluster(ix: i32, iy: i32, time: f64, energies: &[f64]) -> Cluster {
    let seed = Hit::new(ix, iy, energies[0], time);
    let mut hits = vec![seed];
    for (cell, &energy) in seed.cell.neighbors().into_iter().zip(&energies[1..]) {
        hits.push(Hit::new(cell.ix, cell.iy, energy, time));
    }
    Cluster::from_hits(hits).unwrap()
}

pub fn hw(ix: i32, iy: i32, time: f64, energy: f64, hits: u32) -> HardwareCluster {
    HardwareCluster::new(ix, iy, time, energy, hits)
}

/// An event whose hit list is exactly the simulated clusters' hits plus
/// `extra_hits`.
pub fn event(
    number: u64,
    timestamp: i64,
    simulated: Vec<Cluster>,
    hardware: Vec<HardwareCluster>,
    extra_hits: Vec<Hit>,
) -> EventData {
    let mut hits: Vec<Hit> = simulated.iter().flat_map(|c| c.hits().to_vec()).collect();
    hits.extend(extra_hits);
    EventData {
        number,
        timestamp,
        hits: Some(hits),
        simulated_clusters: Some(simulated),
        hardware_clusters: Some(hardware),
        triggers: None,
    }
}

pub fn with_triggers(mut event: EventData, triggers: TriggerData) -> EventData {
    event.triggers = Some(triggers);
    event
}
