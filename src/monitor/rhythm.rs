use serde::{Deserialize, Serialize};

use crate::monitor::alert::AlertLevel;
use crate::monitor::beat::{StEvent, StKind};
use crate::monitor::config::{ConfigSnapshot, EngineConfig};
use crate::monitor::{BoundedHistory, SampleStream};

const SMOOTHING_WIDTH: usize = 5;
const MIN_QUALITY_SAMPLES: usize = 10;
const MIN_RR_FOR_CV: usize = 3;
const MIN_RR_FOR_IRREGULAR: usize = 5;
const POOR_QUALITY_FACTOR: f64 = 1.2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Normal,
    Warning,
    Danger,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Normal => "NORMAL",
            Severity::Warning => "WARNING",
            Severity::Danger => "DANGER",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StState {
    #[default]
    Normal,
    Elevation,
    Depression,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalQuality {
    /// Not enough buffered samples to judge.
    #[default]
    Unknown,
    Good,
    Fair,
    Poor,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityEstimate {
    pub quality: SignalQuality,
    /// High-frequency residual energy relative to the raw signal, in [0, 2].
    pub score: f64,
}

/// Rhythm conditions that raise their own alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RhythmCondition {
    Bradycardia,
    Tachycardia,
    Irregular,
}

impl RhythmCondition {
    pub const ALL: [RhythmCondition; 3] = [
        RhythmCondition::Bradycardia,
        RhythmCondition::Tachycardia,
        RhythmCondition::Irregular,
    ];

    pub fn level(self) -> AlertLevel {
        match self {
            RhythmCondition::Bradycardia | RhythmCondition::Tachycardia => AlertLevel::Warning,
            RhythmCondition::Irregular => AlertLevel::Danger,
        }
    }
}

/// Result of one rhythm evaluation over the lookback window.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RhythmReport {
    pub avg_hr_bpm: f64,
    pub mean_rr_s: f64,
    /// Coefficient of variation of the windowed R-R intervals.
    pub rr_cv: f64,
    pub rr_count: usize,
    pub bradycardia: bool,
    pub tachycardia: bool,
    pub irregular: bool,
    pub st_state: StState,
    pub quality: QualityEstimate,
    pub lead_off: bool,
    pub severity: Severity,
}

impl RhythmReport {
    pub fn holds(&self, condition: RhythmCondition) -> bool {
        match condition {
            RhythmCondition::Bradycardia => self.bradycardia,
            RhythmCondition::Tachycardia => self.tachycardia,
            RhythmCondition::Irregular => self.irregular,
        }
    }

    pub fn describe(&self, condition: RhythmCondition) -> String {
        match condition {
            RhythmCondition::Bradycardia => {
                format!("Bradycardia (avg ~{:.0} bpm)", self.avg_hr_bpm)
            }
            RhythmCondition::Tachycardia => {
                format!("Tachycardia (avg ~{:.0} bpm)", self.avg_hr_bpm)
            }
            RhythmCondition::Irregular => {
                format!("Irregular rhythm, AFib suspected (CV {:.2})", self.rr_cv)
            }
        }
    }

    /// Anything worth surfacing beyond the severity level itself.
    pub fn is_abnormal(&self) -> bool {
        self.bradycardia
            || self.tachycardia
            || self.irregular
            || self.st_state != StState::Normal
            || self.quality.quality == SignalQuality::Poor
    }
}

/// Periodic rate / variability / ST / quality classification of one channel.
#[derive(Clone, Debug)]
pub struct RhythmEvaluator {
    window_samples: u64,
    quality_samples: usize,
    sample_rate_hz: f64,
}

impl RhythmEvaluator {
    pub fn new(engine: &EngineConfig) -> Self {
        Self {
            window_samples: engine.samples_in(engine.rhythm_window_seconds),
            quality_samples: engine.samples_in(engine.quality_window_seconds) as usize,
            sample_rate_hz: engine.sample_rate_hz,
        }
    }

    pub fn evaluate(
        &self,
        r_peaks: &BoundedHistory<u64>,
        st_events: &BoundedHistory<StEvent>,
        stream: &SampleStream,
        snapshot: &ConfigSnapshot,
    ) -> RhythmReport {
        let settings = &snapshot.settings;
        let min_index = stream.end_index().saturating_sub(self.window_samples);

        let recent: Vec<u64> = r_peaks.iter().copied().filter(|&i| i >= min_index).collect();
        let rr: Vec<f64> = recent
            .windows(2)
            .map(|pair| (pair[1] - pair[0]) as f64 / self.sample_rate_hz)
            .collect();
        let mean_rr = mean(&rr);
        let avg_hr_bpm = if mean_rr > 0.0 { 60.0 / mean_rr } else { 0.0 };
        let rr_cv = if mean_rr > 0.0 && rr.len() >= MIN_RR_FOR_CV {
            std_dev(&rr) / mean_rr
        } else {
            0.0
        };

        let bradycardia = avg_hr_bpm > 0.0 && avg_hr_bpm < settings.brady_bpm;
        let tachycardia = avg_hr_bpm > 0.0 && avg_hr_bpm > settings.tachy_bpm;
        let irregular = rr_cv > settings.cv_threshold && rr.len() >= MIN_RR_FOR_IRREGULAR;

        let windowed = || st_events.iter().filter(|e| e.index >= min_index);
        let st_state = if windowed().any(|e| e.kind == StKind::Elevation) {
            StState::Elevation
        } else if windowed().any(|e| e.kind == StKind::Depression) {
            StState::Depression
        } else {
            StState::Normal
        };

        let quality =
            estimate_signal_quality(&stream.tail(self.quality_samples), settings.noise_sensitivity);
        let lead_off = snapshot.flags.lead_off;
        let severity = derive_severity(st_state, irregular, bradycardia, tachycardia, lead_off);

        RhythmReport {
            avg_hr_bpm,
            mean_rr_s: mean_rr,
            rr_cv,
            rr_count: rr.len(),
            bradycardia,
            tachycardia,
            irregular,
            st_state,
            quality,
            lead_off,
            severity,
        }
    }
}

/// Morphology or irregular rhythm is Danger, a rate excursion is Warning, and
/// a disconnected lead is always at least Danger.
pub fn derive_severity(
    st_state: StState,
    irregular: bool,
    bradycardia: bool,
    tachycardia: bool,
    lead_off: bool,
) -> Severity {
    let mut severity = Severity::Normal;
    if st_state != StState::Normal || irregular {
        severity = Severity::Danger;
    } else if bradycardia || tachycardia {
        severity = Severity::Warning;
    }
    if lead_off {
        severity = severity.max(Severity::Danger);
    }
    severity
}

/// Scores how much of the segment is high-frequency residual after a centred
/// moving-average smoothing.
pub fn estimate_signal_quality(segment: &[f64], sensitivity: f64) -> QualityEstimate {
    if segment.len() < MIN_QUALITY_SAMPLES {
        return QualityEstimate::default();
    }
    let smooth = moving_average(segment, SMOOTHING_WIDTH);
    let residual: Vec<f64> = segment.iter().zip(&smooth).map(|(v, s)| v - s).collect();
    let score = (std_dev(&residual) / (std_dev(segment) + 1e-6)).clamp(0.0, 2.0);
    let quality = if score > sensitivity * POOR_QUALITY_FACTOR {
        SignalQuality::Poor
    } else if score > sensitivity {
        SignalQuality::Fair
    } else {
        SignalQuality::Good
    };
    QualityEstimate { quality, score }
}

/// Centred moving average; the window shrinks at the edges instead of padding.
pub fn moving_average(values: &[f64], width: usize) -> Vec<f64> {
    let half = width / 2;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(values.len());
            let window = &values[lo..hi];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; zero for fewer than two values.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
