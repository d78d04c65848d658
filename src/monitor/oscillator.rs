use serde::{Deserialize, Serialize};

use crate::monitor::config::{DriftConfig, MonitorSettings};
use crate::monitor::noise::NoiseSource;
use crate::monitor::waveform::R_WAVE_PHASE;

const HRV_STEP: f64 = 0.02;
const HRV_DEPTH: f64 = 0.2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriftState {
    #[default]
    Idle,
    Drifting,
}

/// A drift episode boundary. Only flips are reported, never the steady state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "edge", rename_all = "snake_case")]
pub enum DriftEdge {
    Started { phase_shift: f64 },
    Ended,
}

/// Outcome of one oscillator advance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhaseStep {
    pub phase: f64,
    /// The phase crossed the R-wave anchor on this step.
    pub r_wave: bool,
    pub drift_edge: Option<DriftEdge>,
}

/// Wrapping cardiac-cycle phase with HRV modulation and intermittent drift.
#[derive(Clone, Debug, Default)]
pub struct PhaseOscillator {
    phase: f64,
    hrv_state: f64,
    drift: DriftState,
}

impl PhaseOscillator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn hrv_state(&self) -> f64 {
        self.hrv_state
    }

    pub fn drift_state(&self) -> DriftState {
        self.drift
    }

    /// Beat frequency in Hz for the given HRV state. Never negative.
    pub fn frequency(settings: &MonitorSettings, hrv_state: f64) -> f64 {
        let base = settings.heart_rate_bpm / 60.0;
        (base * (1.0 + settings.hrv_gain * hrv_state * HRV_DEPTH)).max(0.0)
    }

    pub fn advance(
        &mut self,
        settings: &MonitorSettings,
        drift_enabled: bool,
        drift: &DriftConfig,
        dt: f64,
        noise: &mut NoiseSource,
    ) -> PhaseStep {
        self.hrv_state = (self.hrv_state + HRV_STEP * noise.gaussian()).clamp(-1.0, 1.0);
        let frequency = Self::frequency(settings, self.hrv_state);
        let drift_edge = self.roll_drift(drift_enabled, drift, noise);

        let previous = self.phase;
        self.phase = wrap_phase(self.phase + frequency * dt);
        PhaseStep {
            phase: self.phase,
            r_wave: previous < R_WAVE_PHASE && self.phase >= R_WAVE_PHASE,
            drift_edge,
        }
    }

    fn roll_drift(
        &mut self,
        enabled: bool,
        config: &DriftConfig,
        noise: &mut NoiseSource,
    ) -> Option<DriftEdge> {
        if enabled && noise.chance(config.start_probability) {
            let phase_shift = -noise.uniform(config.min_jump, config.max_jump);
            // Wrapped before the crossing test so a jump alone never reads as a beat.
            self.phase = wrap_phase(self.phase + phase_shift);
            if self.drift == DriftState::Idle {
                self.drift = DriftState::Drifting;
                return Some(DriftEdge::Started { phase_shift });
            }
            return None;
        }
        if self.drift == DriftState::Drifting && noise.chance(config.end_probability) {
            self.drift = DriftState::Idle;
            return Some(DriftEdge::Ended);
        }
        None
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn wrap_phase(phase: f64) -> f64 {
    let wrapped = phase.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn steady(hr: f64) -> MonitorSettings {
        MonitorSettings {
            heart_rate_bpm: hr,
            hrv_gain: 0.0,
            ..MonitorSettings::default()
        }
    }
    #[test]
    fn crosses_once_per_cycle_at_fixed_rate() {
        let settings = steady(60.0);
        let mut osc = PhaseOscillator::new();
        let mut noise = NoiseSource::from_seed(1);
        let mut crossings = Vec::new();
        for i in 0..1000u32 {
            let step = osc.advance(&settings, false, &DriftConfig::default(), 0.005, &mut noise);
            assert!((0.0..1.0).contains(&step.phase));
            if step.r_wave {
                crossings.push(i);
            }
        }
        // 1 Hz at 200 Hz: phase reaches 0.40 on the 80th step, then every 200
        assert_eq!(crossings.len(), 5);
        assert!((78..=80).contains(&crossings[0]));
        for pair in crossings.windows(2) {
            assert!((199..=201).contains(&(pair[1] - pair[0])));
        }
    }
    #[test]
    fn hrv_state_stays_bounded() {
        let settings = MonitorSettings::default();
        let mut osc = PhaseOscillator::new();
        let mut noise = NoiseSource::from_seed(9);
        for _ in 0..50_000 {
            osc.advance(&settings, false, &DriftConfig::default(), 0.005, &mut noise);
            assert!((-1.0..=1.0).contains(&osc.hrv_state()));
        }
    }
    #[test]
    fn frequency_follows_hrv_and_never_goes_negative() {
        let mut settings = steady(60.0);
        assert_eq!(PhaseOscillator::frequency(&settings, 0.7), 1.0);
        settings.hrv_gain = 1.0;
        assert!((PhaseOscillator::frequency(&settings, 1.0) - 1.2).abs() < 1e-12);
        assert!((PhaseOscillator::frequency(&settings, -1.0) - 0.8).abs() < 1e-12);
        settings.heart_rate_bpm = -30.0;
        assert_eq!(PhaseOscillator::frequency(&settings, 0.0), 0.0);
    }
    #[test]
    fn drift_reports_edges_only() {
        let settings = steady(70.0);
        let drift = DriftConfig {
            start_probability: 0.2,
            end_probability: 0.05,
            ..DriftConfig::default()
        };
        let mut osc = PhaseOscillator::new();
        let mut noise = NoiseSource::from_seed(4);
        let mut state = DriftState::Idle;
        let mut started = 0;
        let mut ended = 0;
        for _ in 0..20_000 {
            let step = osc.advance(&settings, true, &drift, 0.005, &mut noise);
            assert!((0.0..1.0).contains(&step.phase));
            match step.drift_edge {
                Some(DriftEdge::Started { phase_shift }) => {
                    assert_eq!(state, DriftState::Idle);
                    assert!((-0.35..=-0.15).contains(&phase_shift));
                    state = DriftState::Drifting;
                    started += 1;
                }
                Some(DriftEdge::Ended) => {
                    assert_eq!(state, DriftState::Drifting);
                    state = DriftState::Idle;
                    ended += 1;
                }
                None => {}
            }
            assert_eq!(osc.drift_state(), state);
        }
        assert!(started > 0);
        assert!(started - ended <= 1);
    }
    #[test]
    fn drift_episode_can_end_after_injection_is_disabled() {
        let settings = steady(70.0);
        let drift = DriftConfig {
            start_probability: 1.0,
            end_probability: 1.0,
            ..DriftConfig::default()
        };
        let mut osc = PhaseOscillator::new();
        let mut noise = NoiseSource::from_seed(2);
        let step = osc.advance(&settings, true, &drift, 0.005, &mut noise);
        assert!(matches!(step.drift_edge, Some(DriftEdge::Started { .. })));
        let step = osc.advance(&settings, false, &drift, 0.005, &mut noise);
        assert_eq!(step.drift_edge, Some(DriftEdge::Ended));
        assert_eq!(osc.drift_state(), DriftState::Idle);
    }
    #[test]
    fn wrap_phase_stays_half_open() {
        assert_eq!(wrap_phase(1.0), 0.0);
        assert!((wrap_phase(-0.1) - 0.9).abs() < 1e-12);
        assert_eq!(wrap_phase(-1e-18), 0.0);
        assert!((wrap_phase(1.25) - 0.25).abs() < 1e-12);
    }
}
