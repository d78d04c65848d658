use std::collections::HashSet;

use log::{debug, info};
use serde::Serialize;

use crate::monitor::alert::{Alert, AlertLevel, AlertLog, AlertSink};
use crate::monitor::beat::{BeatDetector, BeatEvaluator, StEvent, StKind};
use crate::monitor::config::{AlertPolicy, ConfigSnapshot, DriftConfig, EngineConfig};
use crate::monitor::event::MonitorEvent;
use crate::monitor::noise::NoiseSource;
use crate::monitor::oscillator::{DriftState, PhaseOscillator};
use crate::monitor::rhythm::{RhythmCondition, RhythmEvaluator, RhythmReport, Severity};
use crate::monitor::waveform::{baseline_wander, template};
use crate::monitor::{BoundedHistory, MonitorError, SampleStream};

/// Noise scale applied on top of `noise_gain` for a connected lead.
const SIGNAL_NOISE_SCALE: f64 = 0.1;
/// Noise scale for the near-flat disconnected-lead trace.
const LEAD_OFF_NOISE_SCALE: f64 = 0.2;
/// The render window never shrinks below this many samples.
const MIN_VIEW_SAMPLES: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleOutput {
    pub index: u64,
    pub amplitude: f64,
    pub r_peak: bool,
}

/// Render-ready copy of the recent part of one channel.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelSnapshot {
    pub channel_id: usize,
    pub sample_index: u64,
    pub window_start: u64,
    /// `[seconds relative to the newest sample, amplitude * gain]`.
    pub samples: Vec<[f64; 2]>,
    pub r_peaks: Vec<[f64; 2]>,
    pub st_events: Vec<(f64, StKind)>,
    pub marks: Vec<f64>,
    pub severity: Severity,
    pub drift: DriftState,
    pub report: Option<RhythmReport>,
}

/// One independent generator + analysis unit.
pub struct Channel {
    id: usize,
    sample_rate_hz: f64,
    dt: f64,
    drift: DriftConfig,
    oscillator: PhaseOscillator,
    noise: NoiseSource,
    stream: SampleStream,
    beats: BeatDetector,
    st: BeatEvaluator,
    rhythm: RhythmEvaluator,
    marks: BoundedHistory<u64>,
    alerts: AlertLog,
    severity: Severity,
    last_report: Option<RhythmReport>,
    active_conditions: HashSet<RhythmCondition>,
    elapsed_s: f64,
}

impl Channel {
    pub fn new(id: usize, engine: &EngineConfig) -> Result<Self, MonitorError> {
        engine.validate()?;
        Ok(Self {
            id,
            sample_rate_hz: engine.sample_rate_hz,
            dt: engine.dt(),
            drift: engine.drift,
            oscillator: PhaseOscillator::new(),
            noise: NoiseSource::for_channel(engine.seed, id),
            stream: SampleStream::with_capacity(engine.buffer_capacity()),
            beats: BeatDetector::new(
                engine.r_peak_capacity,
                engine.rr_capacity,
                engine.sample_rate_hz,
            ),
            st: BeatEvaluator::new(
                engine.st_event_capacity,
                engine.samples_in(engine.baseline_offset_seconds),
                engine.samples_in(engine.st_offset_seconds),
            ),
            rhythm: RhythmEvaluator::new(engine),
            marks: BoundedHistory::new(engine.mark_capacity),
            alerts: AlertLog::new(engine.channel_alert_capacity),
            severity: Severity::Normal,
            last_report: None,
            active_conditions: HashSet::new(),
            elapsed_s: 0.0,
        })
    }

    /// Generates one sample and runs beat detection on it. Detected ST
    /// abnormalities and drift edges are appended to `events`.
    pub fn generate_sample(
        &mut self,
        snapshot: &ConfigSnapshot,
        events: &mut Vec<MonitorEvent>,
    ) -> SampleOutput {
        let settings = &snapshot.settings;
        if snapshot.flags.lead_off {
            self.st.discard_pending();
            let amplitude = settings.noise_gain * self.noise.gaussian() * LEAD_OFF_NOISE_SCALE;
            let index = self.stream.push(amplitude);
            self.elapsed_s += self.dt;
            return SampleOutput {
                index,
                amplitude,
                r_peak: false,
            };
        }

        let step = self.oscillator.advance(
            settings,
            snapshot.flags.drift_enabled,
            &self.drift,
            self.dt,
            &mut self.noise,
        );
        if let Some(edge) = step.drift_edge {
            info!("ECG {}: drift {:?} at {:.2}s", self.id + 1, edge, self.elapsed_s);
            events.push(MonitorEvent::Drift {
                channel_id: self.id,
                edge,
                phase: step.phase,
                sim_time_s: self.elapsed_s,
            });
        }

        let amplitude = template(step.phase)
            + baseline_wander(self.elapsed_s)
            + settings.noise_gain * self.noise.gaussian() * SIGNAL_NOISE_SCALE;
        let index = self.stream.push(amplitude);
        self.elapsed_s += self.dt;

        let r_peak = step.r_wave && self.beats.record(index);
        if r_peak {
            self.st.queue(index);
        }
        let findings =
            self.st
                .evaluate_ready(&self.stream, settings.amplitude_gain, settings.st_threshold);
        for finding in findings {
            let message = format!(
                "{} detected (deviation {:+.2})",
                finding.event.kind.label(),
                finding.deviation
            );
            self.raise(AlertLevel::Danger, message, events);
            events.push(MonitorEvent::StAbnormal {
                channel_id: self.id,
                event: finding.event,
                deviation: finding.deviation,
                sim_time_s: self.elapsed_s,
            });
        }

        SampleOutput {
            index,
            amplitude,
            r_peak,
        }
    }

    /// Generates up to `count` samples; nothing while the simulation is paused.
    pub fn generate_batch(
        &mut self,
        snapshot: &ConfigSnapshot,
        count: usize,
        events: &mut Vec<MonitorEvent>,
    ) -> usize {
        if !snapshot.flags.running {
            return 0;
        }
        for _ in 0..count {
            self.generate_sample(snapshot, events);
        }
        count
    }

    /// Recomputes the rhythm report and severity from the current windows.
    pub fn evaluate_rhythm(
        &mut self,
        snapshot: &ConfigSnapshot,
        events: &mut Vec<MonitorEvent>,
    ) -> &RhythmReport {
        let report = self.rhythm.evaluate(
            self.beats.r_peaks(),
            self.st.st_events(),
            &self.stream,
            snapshot,
        );

        for condition in RhythmCondition::ALL {
            let holds = report.holds(condition);
            let onset = if holds {
                self.active_conditions.insert(condition)
            } else {
                self.active_conditions.remove(&condition);
                false
            };
            let alert = match snapshot.settings.alert_policy {
                AlertPolicy::EveryCycle => holds,
                AlertPolicy::OnOnset => onset,
            };
            if alert {
                self.raise(condition.level(), report.describe(condition), events);
            }
        }
        if report.is_abnormal() {
            events.push(MonitorEvent::RhythmAbnormal {
                channel_id: self.id,
                report: report.clone(),
                sim_time_s: self.elapsed_s,
            });
        }
        if report.severity != self.severity {
            debug!(
                "ECG {}: severity {} -> {}",
                self.id + 1,
                self.severity.label(),
                report.severity.label()
            );
        }
        self.severity = report.severity;
        self.last_report.insert(report)
    }

    fn raise(&mut self, level: AlertLevel, message: String, events: &mut Vec<MonitorEvent>) {
        let alert = Alert {
            message,
            level,
            channel_id: self.id,
            sim_time_s: self.elapsed_s,
        };
        self.alerts.publish(alert.clone());
        events.push(MonitorEvent::Alert(alert));
    }

    /// Back to the freshly created state; identity and entropy stream are kept.
    pub fn reset(&mut self) {
        self.oscillator.reset();
        self.stream.clear();
        self.beats.clear();
        self.st.clear();
        self.marks.clear();
        self.alerts.clear();
        self.severity = Severity::Normal;
        self.last_report = None;
        self.active_conditions.clear();
        self.elapsed_s = 0.0;
    }

    /// Annotates the current sample index and returns it.
    pub fn mark(&mut self) -> u64 {
        let index = self.sample_index();
        self.marks.push(index);
        index
    }

    pub fn snapshot(&self, window_seconds: f64, amplitude_gain: f64) -> ChannelSnapshot {
        let sample_index = self.sample_index();
        let window = ((window_seconds * self.sample_rate_hz).floor().max(0.0) as u64)
            .max(MIN_VIEW_SAMPLES);
        let window_start = sample_index
            .saturating_sub(window)
            .max(self.stream.start_index());
        let newest = sample_index.saturating_sub(1);
        let rel = |index: u64| (index as f64 - newest as f64) / self.sample_rate_hz;
        let visible = |index: u64| index >= window_start && index < sample_index;

        let samples = self
            .stream
            .iter_from(window_start)
            .map(|(i, v)| [rel(i), v * amplitude_gain])
            .collect();
        let r_peaks = self
            .beats
            .r_peaks()
            .iter()
            .filter(|&&i| visible(i))
            .map(|&i| [rel(i), self.stream.get(i).unwrap_or(0.0) * amplitude_gain])
            .collect();
        let st_events = self
            .st
            .st_events()
            .iter()
            .filter(|e| visible(e.index))
            .map(|e| (rel(e.index), e.kind))
            .collect();
        let marks = self
            .marks
            .iter()
            .filter(|&&i| visible(i))
            .map(|&i| rel(i))
            .collect();

        ChannelSnapshot {
            channel_id: self.id,
            sample_index,
            window_start,
            samples,
            r_peaks,
            st_events,
            marks,
            severity: self.severity,
            drift: self.oscillator.drift_state(),
            report: self.last_report.clone(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Samples generated since creation or the last reset.
    pub fn sample_index(&self) -> u64 {
        self.stream.end_index()
    }

    pub fn buffer_start_index(&self) -> u64 {
        self.stream.start_index()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_s
    }

    pub fn phase(&self) -> f64 {
        self.oscillator.phase()
    }

    pub fn hrv_state(&self) -> f64 {
        self.oscillator.hrv_state()
    }

    pub fn drift_state(&self) -> DriftState {
        self.oscillator.drift_state()
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn last_report(&self) -> Option<&RhythmReport> {
        self.last_report.as_ref()
    }

    pub fn stream(&self) -> &SampleStream {
        &self.stream
    }

    pub fn sample_at(&self, index: u64) -> Option<f64> {
        self.stream.get(index)
    }

    pub fn r_peaks(&self) -> &BoundedHistory<u64> {
        self.beats.r_peaks()
    }

    pub fn rr_intervals(&self) -> &BoundedHistory<f64> {
        self.beats.rr_intervals()
    }

    pub fn st_events(&self) -> &BoundedHistory<StEvent> {
        self.st.st_events()
    }

    pub fn marks(&self) -> &BoundedHistory<u64> {
        &self.marks
    }

    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }
}
