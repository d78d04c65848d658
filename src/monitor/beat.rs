use std::collections::VecDeque;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::monitor::{BoundedHistory, SampleStream};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StKind {
    Elevation,
    Depression,
}

impl StKind {
    pub fn label(self) -> &'static str {
        match self {
            StKind::Elevation => "ST elevation",
            StKind::Depression => "ST depression",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StEvent {
    /// Absolute sample index of the R-peak the measurement belongs to.
    pub index: u64,
    pub kind: StKind,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StFinding {
    pub event: StEvent,
    pub deviation: f64,
}

/// R-peak and R-R interval history of one channel.
#[derive(Clone, Debug)]
pub struct BeatDetector {
    r_peaks: BoundedHistory<u64>,
    rr_intervals: BoundedHistory<f64>,
    sample_rate_hz: f64,
}

impl BeatDetector {
    pub fn new(peak_capacity: usize, rr_capacity: usize, sample_rate_hz: f64) -> Self {
        Self {
            r_peaks: BoundedHistory::new(peak_capacity),
            rr_intervals: BoundedHistory::new(rr_capacity),
            sample_rate_hz,
        }
    }

    /// Records an R-peak. Indices not strictly after the previous peak are
    /// rejected so the history stays strictly increasing.
    pub fn record(&mut self, index: u64) -> bool {
        if let Some(&previous) = self.r_peaks.last() {
            if index <= previous {
                debug!("ignoring out-of-order R-peak {index} (last {previous})");
                return false;
            }
            self.rr_intervals
                .push((index - previous) as f64 / self.sample_rate_hz);
        }
        self.r_peaks.push(index);
        true
    }

    pub fn r_peaks(&self) -> &BoundedHistory<u64> {
        &self.r_peaks
    }

    pub fn rr_intervals(&self) -> &BoundedHistory<f64> {
        &self.rr_intervals
    }

    pub fn last_peak(&self) -> Option<u64> {
        self.r_peaks.last().copied()
    }

    pub fn clear(&mut self) {
        self.r_peaks.clear();
        self.rr_intervals.clear();
    }
}

/// ST-segment measurement for detected beats.
///
/// The ST reference lies after the peak, so beats are queued and measured
/// once that sample exists in the stream.
#[derive(Clone, Debug)]
pub struct BeatEvaluator {
    st_events: BoundedHistory<StEvent>,
    pending: VecDeque<u64>,
    baseline_offset: u64,
    st_offset: u64,
}

impl BeatEvaluator {
    pub fn new(capacity: usize, baseline_offset: u64, st_offset: u64) -> Self {
        Self {
            st_events: BoundedHistory::new(capacity),
            pending: VecDeque::new(),
            baseline_offset,
            st_offset,
        }
    }

    pub fn queue(&mut self, r_peak: u64) {
        self.pending.push_back(r_peak);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    /// `(st - baseline) * gain`, or `None` if either reference sample is unavailable.
    pub fn deviation(&self, stream: &SampleStream, r_peak: u64, amplitude_gain: f64) -> Option<f64> {
        let baseline = stream.get(r_peak.checked_sub(self.baseline_offset)?)?;
        let st = stream.get(r_peak + self.st_offset)?;
        Some((st - baseline) * amplitude_gain)
    }

    pub fn classify(deviation: f64, threshold: f64) -> Option<StKind> {
        if deviation > threshold {
            Some(StKind::Elevation)
        } else if deviation < -threshold {
            Some(StKind::Depression)
        } else {
            None
        }
    }

    /// Measures every queued beat whose ST reference has been generated.
    /// Beats whose baseline was already evicted are dropped silently.
    pub fn evaluate_ready(
        &mut self,
        stream: &SampleStream,
        amplitude_gain: f64,
        threshold: f64,
    ) -> Vec<StFinding> {
        let mut findings = Vec::new();
        while let Some(&r_peak) = self.pending.front() {
            if r_peak + self.st_offset >= stream.end_index() {
                break;
            }
            self.pending.pop_front();
            let Some(deviation) = self.deviation(stream, r_peak, amplitude_gain) else {
                debug!("skipping ST check for beat {r_peak}: reference samples unavailable");
                continue;
            };
            if let Some(kind) = Self::classify(deviation, threshold) {
                let event = StEvent { index: r_peak, kind };
                self.st_events.push(event);
                findings.push(StFinding { event, deviation });
            }
        }
        findings
    }

    pub fn st_events(&self) -> &BoundedHistory<StEvent> {
        &self.st_events
    }

    pub fn clear(&mut self) {
        self.st_events.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn stream_of(values: &[f64], capacity: usize) -> SampleStream {
        let mut stream = SampleStream::with_capacity(capacity);
        for &v in values {
            stream.push(v);
        }
        stream
    }
    #[test]
    fn rr_intervals_follow_peaks() {
        let mut beats = BeatDetector::new(300, 50, 200.0);
        assert!(beats.record(100));
        assert!(beats.rr_intervals().is_empty());
        assert!(beats.record(300));
        assert!(beats.record(460));
        assert_eq!(beats.rr_intervals().to_vec(), vec![1.0, 0.8]);
        assert!(!beats.record(460));
        assert!(!beats.record(10));
        assert_eq!(beats.r_peaks().to_vec(), vec![100, 300, 460]);
    }
    #[test]
    fn rr_length_is_peaks_minus_one_capped() {
        let mut beats = BeatDetector::new(300, 50, 200.0);
        for k in 0..120u64 {
            beats.record(k * 170);
            let expected = beats.r_peaks().len().saturating_sub(1).min(50);
            assert_eq!(beats.rr_intervals().len(), expected);
            assert!(beats.rr_intervals().iter().all(|&rr| rr >= 0.0));
        }
    }
    #[test]
    fn elevation_and_depression_are_classified() {
        // baseline at index 0, ST reference at index 6 for a peak at 4
        let mut values = vec![0.0; 12];
        values[6] = 0.5;
        let stream = stream_of(&values, 64);
        let mut eval = BeatEvaluator::new(80, 4, 2);
        eval.queue(4);
        let findings = eval.evaluate_ready(&stream, 1.0, 0.12);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].event, StEvent { index: 4, kind: StKind::Elevation });
        assert!((findings[0].deviation - 0.5).abs() < 1e-12);

        values[6] = -0.05;
        let stream = stream_of(&values, 64);
        eval.queue(4);
        // gain scales the deviation past the threshold
        let findings = eval.evaluate_ready(&stream, 3.0, 0.12);
        assert_eq!(findings[0].event.kind, StKind::Depression);
        assert_eq!(eval.st_events().len(), 2);
    }
    #[test]
    fn small_deviation_records_nothing() {
        let stream = stream_of(&[0.0, 0.0, 0.0, 0.1, 0.0, 0.05, 0.0], 64);
        let mut eval = BeatEvaluator::new(80, 2, 2);
        eval.queue(3);
        assert!(eval.evaluate_ready(&stream, 1.0, 0.12).is_empty());
        assert!(eval.st_events().is_empty());
        assert_eq!(eval.pending(), 0);
    }
    #[test]
    fn waits_for_st_reference_then_evaluates() {
        let mut stream = stream_of(&[0.0; 10], 64);
        let mut eval = BeatEvaluator::new(80, 5, 3);
        eval.queue(8);
        assert!(eval.evaluate_ready(&stream, 1.0, 0.1).is_empty());
        assert_eq!(eval.pending(), 1);
        stream.push(0.0);
        stream.push(1.0); // index 11 == 8 + 3
        let findings = eval.evaluate_ready(&stream, 1.0, 0.1);
        assert_eq!(findings.len(), 1);
        assert_eq!(eval.pending(), 0);
    }
    #[test]
    fn evicted_or_negative_baseline_skips_silently() {
        let stream = stream_of(&[0.0; 20], 8); // live range 12..20
        let eval = BeatEvaluator::new(80, 6, 2);
        assert_eq!(eval.deviation(&stream, 15, 1.0), None);
        assert!(eval.deviation(&stream, 18, 1.0).is_none()); // ST at 20 not generated
        let short = stream_of(&[0.0; 5], 8);
        assert_eq!(eval.deviation(&short, 2, 1.0), None);

        let mut eval = BeatEvaluator::new(80, 6, 2);
        eval.queue(15);
        assert!(eval.evaluate_ready(&stream, 1.0, 0.0).is_empty());
        assert_eq!(eval.pending(), 0);
        assert!(eval.st_events().is_empty());
    }
}
