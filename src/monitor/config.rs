use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::monitor::MonitorError;

/// Per-sample probabilities and jump size of the intermittent morphology drift.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    pub start_probability: f64,
    pub end_probability: f64,
    /// Phase jumps are drawn from `[-max_jump, -min_jump]`.
    pub min_jump: f64,
    pub max_jump: f64,
}
impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            start_probability: 0.003,
            end_probability: 0.001,
            min_jump: 0.15,
            max_jump: 0.35,
        }
    }
}

/// Structural constants of the engine. Fixed for the lifetime of a `Monitor`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate_hz: f64,
    pub frame_rate_hz: f64,
    pub channel_count: usize,
    pub buffer_seconds: f64,
    pub rhythm_window_seconds: f64,
    pub evaluations_per_second: f64,
    pub baseline_offset_seconds: f64,
    pub st_offset_seconds: f64,
    pub quality_window_seconds: f64,
    pub r_peak_capacity: usize,
    pub rr_capacity: usize,
    pub st_event_capacity: usize,
    pub mark_capacity: usize,
    pub channel_alert_capacity: usize,
    pub shared_alert_capacity: usize,
    pub event_capacity: usize,
    pub drift: DriftConfig,
    /// Fixed seed for reproducible runs; each channel derives its own stream from it.
    pub seed: Option<u64>,
}
impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 200.0,
            frame_rate_hz: 60.0,
            channel_count: 4,
            buffer_seconds: 60.0,
            rhythm_window_seconds: 10.0,
            evaluations_per_second: 5.0,
            baseline_offset_seconds: 0.20,
            st_offset_seconds: 0.08,
            quality_window_seconds: 2.0,
            r_peak_capacity: 300,
            rr_capacity: 50,
            st_event_capacity: 80,
            mark_capacity: 300,
            channel_alert_capacity: 30,
            shared_alert_capacity: 100,
            event_capacity: 10_000,
            drift: DriftConfig::default(),
            seed: None,
        }
    }
}
impl EngineConfig {
    pub fn validate(&self) -> Result<(), MonitorError> {
        if !(self.sample_rate_hz > 0.0) {
            return Err(MonitorError::InvalidSampleRate);
        }
        if !(self.frame_rate_hz > 0.0) {
            return Err(MonitorError::InvalidFrameRate);
        }
        if self.channel_count == 0 {
            return Err(MonitorError::NoChannels);
        }
        for (name, value) in [
            ("buffer_seconds", self.buffer_seconds),
            ("rhythm_window_seconds", self.rhythm_window_seconds),
            ("evaluations_per_second", self.evaluations_per_second),
            ("quality_window_seconds", self.quality_window_seconds),
        ] {
            if !(value > 0.0) {
                return Err(MonitorError::InvalidWindow { name, value });
            }
        }
        for (name, value) in [
            ("baseline_offset_seconds", self.baseline_offset_seconds),
            ("st_offset_seconds", self.st_offset_seconds),
        ] {
            if !(value >= 0.0) {
                return Err(MonitorError::InvalidWindow { name, value });
            }
        }
        for (name, value) in [
            ("sample buffer", self.buffer_capacity()),
            ("R-peak", self.r_peak_capacity),
            ("R-R interval", self.rr_capacity),
            ("ST event", self.st_event_capacity),
            ("mark", self.mark_capacity),
            ("channel alert", self.channel_alert_capacity),
            ("shared alert", self.shared_alert_capacity),
            ("event", self.event_capacity),
        ] {
            if value == 0 {
                return Err(MonitorError::InvalidCapacity { name });
            }
        }
        let drift = &self.drift;
        for (name, value) in [
            ("start", drift.start_probability),
            ("end", drift.end_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MonitorError::InvalidProbability { name, value });
            }
        }
        if !(drift.min_jump >= 0.0 && drift.min_jump <= drift.max_jump) {
            return Err(MonitorError::InvalidJumpRange {
                min: drift.min_jump,
                max: drift.max_jump,
            });
        }
        Ok(())
    }
    pub fn dt(&self) -> f64 {
        1.0 / self.sample_rate_hz
    }
    /// Whole samples covered by `seconds` (truncating).
    pub fn samples_in(&self, seconds: f64) -> u64 {
        // Guard against 0.2 * 200.0 landing a hair under 40.
        (seconds * self.sample_rate_hz + 1e-9).floor().max(0.0) as u64
    }
    pub fn buffer_capacity(&self) -> usize {
        self.samples_in(self.buffer_seconds) as usize
    }
    pub fn samples_per_frame(&self) -> usize {
        ((self.sample_rate_hz / self.frame_rate_hz).round() as usize).max(1)
    }
    pub fn evaluation_period_frames(&self) -> u64 {
        ((self.frame_rate_hz / self.evaluations_per_second).floor() as u64).max(1)
    }
}

/// How rhythm alerts repeat while a condition persists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPolicy {
    /// Re-alert on every evaluation while the condition holds.
    #[default]
    EveryCycle,
    /// Alert only on the evaluation where the condition becomes true.
    OnOnset,
}

/// The user-adjustable parameters shared by every channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub heart_rate_bpm: f64,
    pub hrv_gain: f64,
    pub noise_gain: f64,
    pub amplitude_gain: f64,
    pub window_seconds: f64,
    pub brady_bpm: f64,
    pub tachy_bpm: f64,
    pub cv_threshold: f64,
    pub st_threshold: f64,
    pub noise_sensitivity: f64,
    pub alert_policy: AlertPolicy,
}
impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            heart_rate_bpm: 70.0,
            hrv_gain: 0.05,
            noise_gain: 0.01,
            amplitude_gain: 1.0,
            window_seconds: 6.0,
            brady_bpm: 50.0,
            tachy_bpm: 120.0,
            cv_threshold: 0.12,
            st_threshold: 0.12,
            noise_sensitivity: 0.60,
            alert_policy: AlertPolicy::EveryCycle,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFlags {
    pub running: bool,
    pub drift_enabled: bool,
    pub lead_off: bool,
}

/// Settings and flags as seen by one tick. Never mutated while a tick runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigSnapshot {
    pub settings: MonitorSettings,
    pub flags: RunFlags,
}

/// Holder for the current snapshot. Readers take a cheap `Arc` clone; writers
/// replace the value between ticks.
#[derive(Clone, Debug, Default)]
pub struct SharedConfig {
    current: Arc<ConfigSnapshot>,
}
impl SharedConfig {
    pub fn new(settings: MonitorSettings, flags: RunFlags) -> Self {
        Self {
            current: Arc::new(ConfigSnapshot { settings, flags }),
        }
    }
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.current)
    }
    pub fn settings(&self) -> &MonitorSettings {
        &self.current.settings
    }
    pub fn flags(&self) -> RunFlags {
        self.current.flags
    }
    /// Copy-on-write update: snapshots handed out earlier keep their values.
    pub fn update(&mut self, f: impl FnOnce(&mut ConfigSnapshot)) {
        f(Arc::make_mut(&mut self.current));
    }
}

/// Everything the binary can load from a JSON file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub engine: EngineConfig,
    pub settings: MonitorSettings,
    pub flags: RunFlags,
    /// Simulated seconds covered by a headless run.
    pub run_seconds: Option<f64>,
}
impl MonitorConfig {
    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let config: MonitorConfig =
            serde_json::from_str(text).context("invalid monitor configuration JSON")?;
        config.engine.validate()?;
        Ok(config)
    }
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn default_engine_matches_reference_cadence() {
        let engine = EngineConfig::default();
        assert!(engine.validate().is_ok());
        assert_eq!(engine.buffer_capacity(), 12_000);
        assert_eq!(engine.samples_per_frame(), 3);
        assert_eq!(engine.evaluation_period_frames(), 12);
        assert_eq!(engine.samples_in(0.20), 40);
        assert_eq!(engine.samples_in(0.08), 16);
    }
    #[test]
    fn validation_rejects_bad_values() {
        let mut engine = EngineConfig::default();
        engine.sample_rate_hz = 0.0;
        assert_eq!(engine.validate(), Err(MonitorError::InvalidSampleRate));
        let mut engine = EngineConfig::default();
        engine.rr_capacity = 0;
        assert_eq!(
            engine.validate(),
            Err(MonitorError::InvalidCapacity {
                name: "R-R interval"
            })
        );
        let mut engine = EngineConfig::default();
        engine.drift.start_probability = 1.5;
        assert!(matches!(
            engine.validate(),
            Err(MonitorError::InvalidProbability { name: "start", .. })
        ));
        let mut engine = EngineConfig::default();
        engine.drift.min_jump = 0.5;
        assert!(matches!(
            engine.validate(),
            Err(MonitorError::InvalidJumpRange { .. })
        ));
    }
    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = MonitorConfig::from_json_str(
            r#"{ "settings": { "heart_rate_bpm": 42, "alert_policy": "on_onset" },
                 "engine": { "seed": 7 } }"#,
        )
        .unwrap();
        assert_eq!(config.settings.heart_rate_bpm, 42.0);
        assert_eq!(config.settings.alert_policy, AlertPolicy::OnOnset);
        assert_eq!(config.settings.brady_bpm, 50.0);
        assert_eq!(config.engine.seed, Some(7));
        assert_eq!(config.engine.sample_rate_hz, 200.0);
        assert!(!config.flags.running);
    }
    #[test]
    fn json_with_invalid_engine_is_rejected() {
        let err = MonitorConfig::from_json_str(r#"{ "engine": { "frame_rate_hz": 0 } }"#);
        assert!(err.is_err());
    }
    #[test]
    fn shared_config_updates_do_not_touch_handed_out_snapshots() {
        let mut shared = SharedConfig::default();
        let before = shared.snapshot();
        shared.update(|snap| {
            snap.settings.heart_rate_bpm = 120.0;
            snap.flags.lead_off = true;
        });
        assert_eq!(before.settings.heart_rate_bpm, 70.0);
        assert!(!before.flags.lead_off);
        assert_eq!(shared.settings().heart_rate_bpm, 120.0);
        assert!(shared.flags().lead_off);
    }
}
