use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use daqdiag_core::config::{DaqConfig, DiagnosticsConfig};
use daqdiag_core::{
    CellIndex, Cluster, ClusterLike, EventData, HardwareCluster, HardwareTrigger, Hit, Result, Trigger,
    TriggerType, TsBit,
};

use crate::clipping;
use crate::cluster::{
    ClassifierSettings, ClusterFailureClassifier, ClusterMatcher, FailureCause, MatchStatus, MatchTolerances,
};
use crate::stats::{RunStatistics, RunSummary};
use crate::trigger::{TriggerFailure, TriggerMatchResult, TriggerSource, TriggerVerifier};

/// Why an event, or its trigger stage, was not verified. Skipped events
/// leave every counter except their own skip tally untouched.
/// `NoActiveTsBit` only ever skips the trigger stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    MissingCollection(String),
    NoiseEvent { hits: usize, threshold: usize },
    NotConfigured,
    NoActiveTsBit,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingCollection(name) => write!(f, "collection \"{}\" is missing", name),
            SkipReason::NoiseEvent { hits, threshold } => {
                write!(f, "{} hits reaches the noise threshold of {}", hits, threshold)
            }
            SkipReason::NotConfigured => write!(f, "no DAQ configuration received yet"),
            SkipReason::NoActiveTsBit => write!(f, "no active TS bit"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub seed: CellIndex,
    pub time: f64,
    pub energy: f64,
    pub hit_count: u32,
}

impl ClusterSummary {
    pub fn of<C: ClusterLike>(cluster: &C) -> Self {
        Self {
            seed: cluster.seed(),
            time: cluster.time(),
            energy: cluster.energy(),
            hit_count: cluster.hit_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRecord {
    pub simulated: ClusterSummary,
    pub hardware: Option<ClusterSummary>,
    pub status: MatchStatus,
    pub cause: Option<FailureCause>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub trigger_type: TriggerType,
    pub source: TriggerSource,
    pub time: f64,
    pub matched: bool,
    pub failure: Option<TriggerFailure>,
}

impl TriggerRecord {
    fn of<C: ClusterLike>(trigger_type: TriggerType, source: TriggerSource, result: &TriggerMatchResult<'_, C>) -> Self {
        Self {
            trigger_type,
            source,
            time: result.simulated.time(),
            matched: result.is_matched(),
            failure: result.failure.clone(),
        }
    }
}

/// Per-event output, owned so it can outlive the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventReport {
    pub number: u64,
    pub timestamp: i64,
    pub clusters: Vec<PairRecord>,
    pub triggers: Vec<TriggerRecord>,
    /// Set when the clusters were verified but the triggers were not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_skip: Option<SkipReason>,
}

impl EventReport {
    pub fn has_cluster_failure(&self) -> bool {
        self.clusters.iter().any(|p| !p.status.is_matched())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum EventOutcome {
    Processed(EventReport),
    Skipped(SkipReason),
}

struct EventInputs<'e> {
    daq: DaqConfig,
    hits: &'e [Hit],
    simulated: &'e [Cluster],
    hardware: &'e [HardwareCluster],
    triggers: Option<TriggerInputs<'e>>,
    trigger_skip: Option<SkipReason>,
}

struct TriggerInputs<'e> {
    software: &'e [Trigger<Cluster>],
    hardware_clusters: &'e [Trigger<HardwareCluster>],
    hardware: &'e [HardwareTrigger],
    active_bits: &'e [TsBit],
}

fn require<'e, T>(collection: &'e Option<Vec<T>>, name: &str) -> std::result::Result<&'e [T], SkipReason> {
    collection
        .as_deref()
        .ok_or_else(|| SkipReason::MissingCollection(name.to_string()))
}

/// Drives cluster and trigger verification over an event stream and owns
/// the run statistics.
#[derive(Debug)]
pub struct DiagnosticsRun {
    config: DiagnosticsConfig,
    trigger_types: Vec<TriggerType>,
    daq: Option<DaqConfig>,
    print_on_fail: bool,
    statistics: RunStatistics,
}

impl DiagnosticsRun {
    /// Fails if a requested trigger type cannot be verified.
    pub fn new(config: DiagnosticsConfig) -> Result<Self> {
        config.validate()?;
        let trigger_types = config
            .trigger_types
            .iter()
            .map(TsBit::verifiable)
            .collect::<Result<Vec<_>>>()?;

        let statistics = RunStatistics::new(config.local_window_size_ns, &trigger_types);
        info!(run_id = %statistics.run_id, "Diagnostics run started");

        Ok(Self {
            config,
            trigger_types,
            daq: None,
            print_on_fail: false,
            statistics,
        })
    }

    pub fn with_print_on_fail(mut self, enabled: bool) -> Self {
        self.print_on_fail = enabled;
        self
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    /// Apply a DAQ configuration to all following events.
    pub fn on_daq_config(&mut self, daq: DaqConfig) -> Result<()> {
        daq.validate()?;
        info!(
            "DAQ config: nsa={} ns, nsb={} ns, window={} ns, seed threshold={} GeV",
            daq.fadc.nsa, daq.fadc.nsb, daq.fadc.window_width, daq.clusterer.seed_energy_threshold
        );
        self.daq = Some(daq);
        Ok(())
    }

    pub fn statistics(&self) -> &RunStatistics {
        &self.statistics
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::new(self.statistics.clone())
    }

    /// Errors are fatal to the run; data problems come back as
    /// `EventOutcome::Skipped`.
    pub fn process_event(&mut self, event: &EventData) -> Result<EventOutcome> {
        let inputs = match self.inputs(event) {
            Ok(inputs) => inputs,
            Err(reason) => return Ok(self.skip(event, reason)),
        };

        let clusters = self.verify_clusters(event.timestamp, &inputs);
        let triggers = match &inputs.triggers {
            Some(triggers) => self.verify_triggers(event.timestamp, &inputs.daq, triggers)?,
            None => Vec::new(),
        };
        self.statistics.events.processed += 1;
        if let Some(reason) = &inputs.trigger_skip {
            self.statistics.events.skipped_no_ts_bit += 1;
            warn!("Event {} trigger verification skipped: {}", event.number, reason);
        }

        let report = EventReport {
            number: event.number,
            timestamp: event.timestamp,
            clusters,
            triggers,
            trigger_skip: inputs.trigger_skip.clone(),
        };
        if self.print_on_fail && report.has_cluster_failure() {
            log_pair_table(&report);
        }
        Ok(EventOutcome::Processed(report))
    }

    fn inputs<'e>(&self, event: &'e EventData) -> std::result::Result<EventInputs<'e>, SkipReason> {
        let daq = self.daq.ok_or(SkipReason::NotConfigured)?;
        let hits = require(&event.hits, "hits")?;
        let simulated = require(&event.simulated_clusters, "simulated_clusters")?;
        let hardware = require(&event.hardware_clusters, "hardware_clusters")?;

        let triggers = if self.trigger_types.is_empty() {
            None
        } else {
            let data = event
                .triggers
                .as_ref()
                .ok_or_else(|| SkipReason::MissingCollection("triggers".to_string()))?;
            Some(TriggerInputs {
                software: require(&data.software_cluster_triggers, "software_cluster_triggers")?,
                hardware_clusters: require(&data.hardware_cluster_triggers, "hardware_cluster_triggers")?,
                hardware: require(&data.hardware_triggers, "hardware_triggers")?,
                active_bits: &data.active_ts_bits,
            })
        };

        let threshold = self.config.noise_event_threshold;
        if self.config.skip_noise_events && hits.len() >= threshold {
            return Err(SkipReason::NoiseEvent {
                hits: hits.len(),
                threshold,
            });
        }

        let no_active_bit = triggers.as_ref().is_some_and(|t| t.active_bits.is_empty());
        let (triggers, trigger_skip) = if self.config.require_active_ts_bit && no_active_bit {
            (None, Some(SkipReason::NoActiveTsBit))
        } else {
            (triggers, None)
        };

        Ok(EventInputs {
            daq,
            hits,
            simulated,
            hardware,
            triggers,
            trigger_skip,
        })
    }

    fn skip(&mut self, event: &EventData, reason: SkipReason) -> EventOutcome {
        let events = &mut self.statistics.events;
        match &reason {
            SkipReason::MissingCollection(_) => events.skipped_missing_collection += 1,
            SkipReason::NoiseEvent { .. } => events.skipped_noise += 1,
            SkipReason::NotConfigured => events.skipped_not_configured += 1,
            SkipReason::NoActiveTsBit => events.skipped_no_ts_bit += 1,
        }
        warn!("Event {} skipped: {}", event.number, reason);
        EventOutcome::Skipped(reason)
    }

    fn verify_clusters(&mut self, timestamp: i64, inputs: &EventInputs<'_>) -> Vec<PairRecord> {
        let cfg = &self.config;
        let daq = &inputs.daq;

        let matcher = ClusterMatcher::new(MatchTolerances {
            energy: cfg.energy_tolerance,
            hit_count: cfg.hit_count_tolerance,
            hardware_hit_cap: cfg.hardware_hit_count_cap,
            window_width: daq.fadc.window_width,
        });
        let classifier = ClusterFailureClassifier::new(ClassifierSettings {
            energy_tolerance: cfg.energy_tolerance,
            deadtime_window_ns: cfg.deadtime_window_ns,
            window_before_ns: cfg.window_before_ns,
            seed_energy_threshold: daq.clusterer.seed_energy_threshold,
        });

        let verifiable = inputs
            .simulated
            .iter()
            .filter(|cluster| clipping::is_verifiable(*cluster, &daq.fadc));
        let pairs = matcher.match_clusters(verifiable, inputs.hardware);

        let records: Vec<PairRecord> = pairs
            .iter()
            .map(|pair| PairRecord {
                simulated: ClusterSummary::of(pair.simulated),
                hardware: pair.hardware.map(ClusterSummary::of),
                status: pair.status,
                cause: classifier.classify(pair, &pairs, inputs.hits, inputs.hardware),
            })
            .collect();

        debug!(
            "{} of {} verifiable clusters matched",
            records.iter().filter(|r| r.status.is_matched()).count(),
            records.len()
        );
        self.statistics.clusters.record(
            timestamp,
            inputs.simulated.len(),
            inputs.hardware.len(),
            records.iter().map(|r| (r.status, r.cause.map(|c| c.kind()))),
        );
        records
    }

    fn verify_triggers(
        &mut self,
        timestamp: i64,
        daq: &DaqConfig,
        triggers: &TriggerInputs<'_>,
    ) -> Result<Vec<TriggerRecord>> {
        let (start, end) = (self.config.trigger_window_start_ns, self.config.trigger_window_end_ns);
        let mut records = Vec::new();

        for t in self.trigger_types.clone() {
            let verifier = TriggerVerifier::new(t, start, end);

            let software = verifier.verify(triggers.software, triggers.hardware, |trigger| {
                clipping::trigger_is_verifiable(trigger, &daq.fadc)
            })?;
            self.statistics.trigger_mut(t, TriggerSource::SoftwareClusters).record(
                timestamp,
                &software,
                |time| verifier.in_window(time),
                triggers.active_bits,
            );
            records.extend(
                software
                    .results
                    .iter()
                    .map(|r| TriggerRecord::of(t, TriggerSource::SoftwareClusters, r)),
            );

            // Hardware clusters are not subject to pulse-clipping.
            let hardware = verifier.verify(triggers.hardware_clusters, triggers.hardware, |_| true)?;
            self.statistics.trigger_mut(t, TriggerSource::HardwareClusters).record(
                timestamp,
                &hardware,
                |time| verifier.in_window(time),
                triggers.active_bits,
            );
            records.extend(
                hardware
                    .results
                    .iter()
                    .map(|r| TriggerRecord::of(t, TriggerSource::HardwareClusters, r)),
            );

            debug!(
                "{}: {}/{} software, {}/{} hardware-cluster triggers verified",
                t,
                software.matched_in_window,
                software.simulated_in_window,
                hardware.matched_in_window,
                hardware.simulated_in_window
            );
        }

        Ok(records)
    }
}

fn describe(summary: &ClusterSummary) -> String {
    format!(
        "{} t = {:3.0} ns, E = {:.3} GeV, N = {}",
        summary.seed, summary.time, summary.energy, summary.hit_count
    )
}

fn log_pair_table(report: &EventReport) {
    info!("Event {} (t = {} ns) cluster pairs:", report.number, report.timestamp);
    for pair in &report.clusters {
        let hardware = pair
            .hardware
            .as_ref()
            .map(describe)
            .unwrap_or_else(|| "none".to_string());
        let cause = pair.cause.map(|c| c.to_string()).unwrap_or_default();
        info!(
            "  {} -> {} [{}] {}",
            describe(&pair.simulated),
            hardware,
            pair.status,
            cause
        );
    }
}
