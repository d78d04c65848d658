// src/monitor/session.rs
use log::info;

use crate::monitor::alert::{AlertLog, AlertSink};
use crate::monitor::channel::{Channel, ChannelSnapshot};
use crate::monitor::config::{
    ConfigSnapshot, EngineConfig, MonitorConfig, MonitorSettings, RunFlags, SharedConfig,
};
use crate::monitor::event::MonitorEvent;
use crate::monitor::{BoundedHistory, MonitorError};

/// Control-surface mutations. Applied between ticks only.
#[derive(Clone, Debug, PartialEq)]
pub enum MonitorCommand {
    SetRunning(bool),
    ToggleRunning,
    SetDrift(bool),
    SetLeadOff(bool),
    UpdateSettings(MonitorSettings),
    ResetAll,
    Reset(usize),
    MarkAll,
    Mark(usize),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub frame: u64,
    pub samples_generated: usize,
    pub evaluated: bool,
    pub alerts_raised: usize,
}

/// All channels plus the shared configuration, shared alert history and
/// event feed. One `tick` is one display frame.
pub struct Monitor {
    engine: EngineConfig,
    config: SharedConfig,
    channels: Vec<Channel>,
    alerts: AlertLog,
    events: BoundedHistory<MonitorEvent>,
    frame: u64,
    scratch: Vec<MonitorEvent>,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        let MonitorConfig {
            engine,
            settings,
            flags,
            ..
        } = config;
        engine.validate()?;
        let channels = (0..engine.channel_count)
            .map(|id| Channel::new(id, &engine))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            "monitor ready: {} channels at {} Hz, {} samples per frame",
            channels.len(),
            engine.sample_rate_hz,
            engine.samples_per_frame()
        );
        Ok(Self {
            alerts: AlertLog::new(engine.shared_alert_capacity),
            events: BoundedHistory::new(engine.event_capacity),
            config: SharedConfig::new(settings, flags),
            channels,
            engine,
            frame: 0,
            scratch: Vec::new(),
        })
    }

    pub fn apply(&mut self, command: MonitorCommand) -> Result<(), MonitorError> {
        match command {
            MonitorCommand::SetRunning(running) => self.set_flags(|f| f.running = running),
            MonitorCommand::ToggleRunning => self.set_flags(|f| f.running = !f.running),
            MonitorCommand::SetDrift(enabled) => self.set_flags(|f| f.drift_enabled = enabled),
            MonitorCommand::SetLeadOff(lead_off) => self.set_flags(|f| f.lead_off = lead_off),
            MonitorCommand::UpdateSettings(settings) => {
                info!(
                    "settings updated: {:.0} bpm, HRV {:.2}, noise {:.3}, ST threshold {:.2}",
                    settings.heart_rate_bpm,
                    settings.hrv_gain,
                    settings.noise_gain,
                    settings.st_threshold
                );
                let applied = settings.clone();
                self.config.update(|snap| snap.settings = applied);
                self.record(MonitorEvent::SettingsChanged { settings });
            }
            MonitorCommand::ResetAll => {
                info!("resetting all {} channels", self.channels.len());
                for channel in &mut self.channels {
                    channel.reset();
                }
                self.alerts.clear();
                for channel_id in 0..self.channels.len() {
                    self.record(MonitorEvent::Reset { channel_id });
                }
            }
            MonitorCommand::Reset(channel_id) => {
                self.channel_mut(channel_id)?.reset();
                info!("ECG {} reset", channel_id + 1);
                self.record(MonitorEvent::Reset { channel_id });
            }
            MonitorCommand::MarkAll => {
                for channel_id in 0..self.channels.len() {
                    self.mark(channel_id)?;
                }
            }
            MonitorCommand::Mark(channel_id) => self.mark(channel_id)?,
        }
        Ok(())
    }

    fn set_flags(&mut self, f: impl FnOnce(&mut RunFlags)) {
        let before = self.config.flags();
        self.config.update(|snap| f(&mut snap.flags));
        let flags = self.config.flags();
        if flags != before {
            info!(
                "run state: running={} drift={} lead_off={}",
                flags.running, flags.drift_enabled, flags.lead_off
            );
            self.record(MonitorEvent::Control { flags });
        }
    }

    fn mark(&mut self, channel_id: usize) -> Result<(), MonitorError> {
        let channel = self.channel_mut(channel_id)?;
        let index = channel.mark();
        let sim_time_s = channel.elapsed_seconds();
        self.record(MonitorEvent::Marked {
            channel_id,
            index,
            sim_time_s,
        });
        Ok(())
    }

    fn record(&mut self, event: MonitorEvent) {
        if let MonitorEvent::Alert(alert) = &event {
            self.alerts.publish(alert.clone());
        }
        self.events.push(event);
    }

    /// Generates one frame's batch on every channel and runs the rhythm
    /// evaluation on its cadence. Evaluation continues while paused.
    pub fn tick(&mut self) -> TickSummary {
        let snapshot = self.config.snapshot();
        let batch = self.engine.samples_per_frame();
        let mut pending = std::mem::take(&mut self.scratch);

        let mut samples_generated = 0;
        for channel in &mut self.channels {
            samples_generated += channel.generate_batch(&snapshot, batch, &mut pending);
        }

        self.frame += 1;
        let evaluated = self.frame % self.engine.evaluation_period_frames() == 0;
        if evaluated {
            for channel in &mut self.channels {
                channel.evaluate_rhythm(&snapshot, &mut pending);
            }
        }

        let alerts_raised = pending
            .iter()
            .filter(|e| matches!(e, MonitorEvent::Alert(_)))
            .count();
        for event in pending.drain(..) {
            self.record(event);
        }
        self.scratch = pending;

        TickSummary {
            frame: self.frame,
            samples_generated,
            evaluated,
            alerts_raised,
        }
    }

    pub fn run_ticks(&mut self, ticks: u64) -> TickSummary {
        let mut total = TickSummary {
            frame: self.frame,
            ..TickSummary::default()
        };
        for _ in 0..ticks {
            let summary = self.tick();
            total.frame = summary.frame;
            total.samples_generated += summary.samples_generated;
            total.alerts_raised += summary.alerts_raised;
            total.evaluated |= summary.evaluated;
        }
        total
    }

    /// Runs as many frames as cover `seconds` of simulated time.
    pub fn run_for_seconds(&mut self, seconds: f64) -> TickSummary {
        let ticks = (seconds.max(0.0) * self.engine.frame_rate_hz).round() as u64;
        self.run_ticks(ticks)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Result<&Channel, MonitorError> {
        let count = self.channels.len();
        self.channels
            .get(index)
            .ok_or(MonitorError::ChannelOutOfRange { index, count })
    }

    fn channel_mut(&mut self, index: usize) -> Result<&mut Channel, MonitorError> {
        let count = self.channels.len();
        self.channels
            .get_mut(index)
            .ok_or(MonitorError::ChannelOutOfRange { index, count })
    }

    /// Shared alert history across all channels.
    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }

    pub fn events(&self) -> &BoundedHistory<MonitorEvent> {
        &self.events
    }

    /// Drains the event feed, oldest first.
    pub fn take_events(&mut self) -> Vec<MonitorEvent> {
        self.events.drain().collect()
    }

    pub fn snapshots(&self) -> Vec<ChannelSnapshot> {
        let settings = self.config.settings();
        self.channels
            .iter()
            .map(|c| c.snapshot(settings.window_seconds, settings.amplitude_gain))
            .collect()
    }

    pub fn config(&self) -> std::sync::Arc<ConfigSnapshot> {
        self.config.snapshot()
    }

    pub fn settings(&self) -> &MonitorSettings {
        self.config.settings()
    }

    pub fn flags(&self) -> RunFlags {
        self.config.flags()
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }
}
