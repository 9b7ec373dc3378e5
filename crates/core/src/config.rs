use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DiagError, Result};
use crate::trigger::TsBit;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_f64(profile: &str, key: &str, default: f64) -> f64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

/// Parse a comma-separated list of trigger type names.
pub fn parse_trigger_types(list: &str) -> Result<Vec<TsBit>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

// ── Diagnostics (operator settings) ──────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    pub energy_tolerance: f64,
    pub hit_count_tolerance: u32,
    pub skip_noise_events: bool,
    pub noise_event_threshold: usize,
    pub local_window_size_ns: i64,
    /// Clusters earlier than this are exposed to electronics deadtime.
    pub deadtime_window_ns: f64,
    pub window_before_ns: f64,
    /// Legacy hardware reports at most this many hits per cluster.
    pub hardware_hit_count_cap: Option<u32>,
    pub trigger_types: Vec<TsBit>,
    pub trigger_window_start_ns: f64,
    pub trigger_window_end_ns: f64,
    pub require_active_ts_bit: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            profile: String::new(),
            energy_tolerance: 0.001,
            hit_count_tolerance: 0,
            skip_noise_events: false,
            noise_event_threshold: 100,
            local_window_size_ns: 5_000_000,
            deadtime_window_ns: 32.0,
            window_before_ns: 16.0,
            hardware_hit_count_cap: None,
            trigger_types: Vec::new(),
            trigger_window_start_ns: 0.0,
            trigger_window_end_ns: 400.0,
            require_active_ts_bit: false,
        }
    }
}

impl DiagnosticsConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DAQDIAG_PROFILE`. When set (e.g. `RUN2019`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self> {
        let profile = env_or("DAQDIAG_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self> {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let d = Self::default();

        let config = Self {
            profile: p.to_string(),
            energy_tolerance: profiled_env_f64(p, "ENERGY_TOLERANCE_GEV", d.energy_tolerance),
            hit_count_tolerance: profiled_env_u32(p, "HIT_COUNT_TOLERANCE", d.hit_count_tolerance),
            skip_noise_events: profiled_env_bool(p, "SKIP_NOISE_EVENTS", d.skip_noise_events),
            noise_event_threshold: profiled_env_u32(p, "NOISE_EVENT_THRESHOLD", 100) as usize,
            local_window_size_ns: profiled_env_opt(p, "LOCAL_WINDOW_SIZE_NS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.local_window_size_ns),
            deadtime_window_ns: profiled_env_f64(p, "DEADTIME_WINDOW_NS", d.deadtime_window_ns),
            window_before_ns: profiled_env_f64(p, "WINDOW_BEFORE_NS", d.window_before_ns),
            hardware_hit_count_cap: profiled_env_opt(p, "HARDWARE_HIT_COUNT_CAP")
                .and_then(|v| v.parse().ok()),
            trigger_types: parse_trigger_types(&profiled_env_or(p, "TRIGGER_TYPES", ""))?,
            trigger_window_start_ns: profiled_env_f64(
                p,
                "TRIGGER_WINDOW_START_NS",
                d.trigger_window_start_ns,
            ),
            trigger_window_end_ns: profiled_env_f64(p, "TRIGGER_WINDOW_END_NS", d.trigger_window_end_ns),
            require_active_ts_bit: profiled_env_bool(p, "REQUIRE_ACTIVE_TS_BIT", d.require_active_ts_bit),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.energy_tolerance >= 0.0) {
            return Err(DiagError::InvalidConfig(format!(
                "energy tolerance must be non-negative, got {}",
                self.energy_tolerance
            )));
        }
        if self.local_window_size_ns <= 0 {
            return Err(DiagError::InvalidConfig(format!(
                "local window size must be positive, got {} ns",
                self.local_window_size_ns
            )));
        }
        if self.trigger_window_end_ns < self.trigger_window_start_ns {
            return Err(DiagError::InvalidConfig(format!(
                "trigger window [{}, {}] is empty",
                self.trigger_window_start_ns, self.trigger_window_end_ns
            )));
        }
        Ok(())
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        let types: Vec<String> = self.trigger_types.iter().map(|t| t.to_string()).collect();
        tracing::info!("Diagnostics config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  tolerances:  energy={} GeV, hits={}, hit_cap={}",
            self.energy_tolerance,
            self.hit_count_tolerance,
            self.hardware_hit_count_cap
                .map(|c| c.to_string())
                .unwrap_or_else(|| "(none)".to_string())
        );
        tracing::info!(
            "  noise:       skip={}, threshold={} hits",
            self.skip_noise_events,
            self.noise_event_threshold
        );
        tracing::info!(
            "  deadtime:    bound={} ns, before={} ns",
            self.deadtime_window_ns,
            self.window_before_ns
        );
        tracing::info!("  windows:     local={} ns", self.local_window_size_ns);
        tracing::info!(
            "  triggers:    types=[{}], window=[{}, {}] ns, require_ts_bit={}",
            types.join(", "),
            self.trigger_window_start_ns,
            self.trigger_window_end_ns,
            self.require_active_ts_bit
        );
    }
}

// ── DAQ (hardware settings) ──────────────────────────────────

/// Flash ADC integration settings, all in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FadcConfig {
    /// Integration samples after threshold crossing.
    pub nsa: f64,
    /// Integration samples before threshold crossing.
    pub nsb: f64,
    pub window_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClustererConfig {
    /// GeV.
    pub seed_energy_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaqConfig {
    pub fadc: FadcConfig,
    pub clusterer: ClustererConfig,
}

impl DaqConfig {
    /// Load and validate from a YAML file. JSON documents are valid YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: DaqConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let f = &self.fadc;
        if !(f.window_width > 0.0) {
            return Err(DiagError::InvalidConfig(format!(
                "fadc.window_width must be positive, got {}",
                f.window_width
            )));
        }
        if f.nsa < 0.0 || f.nsb < 0.0 {
            return Err(DiagError::InvalidConfig(format!(
                "fadc.nsa and fadc.nsb must be non-negative, got nsa={} nsb={}",
                f.nsa, f.nsb
            )));
        }
        if f.nsa + f.nsb >= f.window_width {
            return Err(DiagError::InvalidConfig(format!(
                "fadc.nsa + fadc.nsb ({}) must be less than window_width ({})",
                f.nsa + f.nsb,
                f.window_width
            )));
        }
        Ok(())
    }
}
