use serde::{Deserialize, Serialize};

use crate::monitor::alert::Alert;
use crate::monitor::beat::StEvent;
use crate::monitor::config::{MonitorSettings, RunFlags};
use crate::monitor::oscillator::DriftEdge;
use crate::monitor::rhythm::RhythmReport;

/// Significant happenings, in the order they occurred. Consumers (log
/// writers, exporters, the viewer) drain these from the `Monitor`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    Alert(Alert),
    Drift {
        channel_id: usize,
        edge: DriftEdge,
        phase: f64,
        sim_time_s: f64,
    },
    StAbnormal {
        channel_id: usize,
        event: StEvent,
        deviation: f64,
        sim_time_s: f64,
    },
    RhythmAbnormal {
        channel_id: usize,
        report: RhythmReport,
        sim_time_s: f64,
    },
    Reset {
        channel_id: usize,
    },
    Marked {
        channel_id: usize,
        index: u64,
        sim_time_s: f64,
    },
    Control {
        flags: RunFlags,
    },
    SettingsChanged {
        settings: MonitorSettings,
    },
}

impl MonitorEvent {
    pub fn channel_id(&self) -> Option<usize> {
        match self {
            MonitorEvent::Alert(alert) => Some(alert.channel_id),
            MonitorEvent::Drift { channel_id, .. }
            | MonitorEvent::StAbnormal { channel_id, .. }
            | MonitorEvent::RhythmAbnormal { channel_id, .. }
            | MonitorEvent::Reset { channel_id }
            | MonitorEvent::Marked { channel_id, .. } => Some(*channel_id),
            MonitorEvent::Control { .. } | MonitorEvent::SettingsChanged { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = MonitorEvent::Drift {
            channel_id: 1,
            edge: DriftEdge::Started { phase_shift: -0.2 },
            phase: 0.5,
            sim_time_s: 3.0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "drift");
        assert_eq!(json["edge"]["edge"], "started");
        assert_eq!(event.channel_id(), Some(1));
        assert_eq!(
            MonitorEvent::Control {
                flags: RunFlags::default()
            }
            .channel_id(),
            None
        );
    }
}
