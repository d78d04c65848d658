// src/gui.rs
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::JoinHandle;

use eframe::egui;
use egui::{Color32, RichText, Stroke};
use egui_plot::{Line, Plot, PlotPoints, Points, VLine};

use pulsewatch::engine;
use pulsewatch::monitor::{
    AlertLevel, AlertPolicy, ChannelSnapshot, DriftState, Monitor, MonitorCommand, MonitorEvent,
    MonitorSettings, RunFlags, Severity, SignalQuality, StKind,
};
use pulsewatch::types::*;

const ALERT_FEED_LEN: usize = 100;
const LOG_LEN: usize = 8;
const TRACE: Color32 = Color32::from_rgb(0, 255, 140);

pub struct PulseWatchApp {
    flags: RunFlags,
    settings: MonitorSettings,
    snapshots: Vec<ChannelSnapshot>,
    alert_feed: Vec<(AlertLevel, String)>,
    log_messages: Vec<String>,
    rx: Receiver<EngineMessage>,
    tx_cmd: Sender<EngineCommand>,
    engine: Option<JoinHandle<()>>,
}

impl PulseWatchApp {
    pub fn new(monitor: Monitor) -> Self {
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let settings = monitor.settings().clone();
        let flags = monitor.flags();
        let engine = engine::spawn_engine(monitor, tx, rx_cmd);
        Self {
            flags,
            settings,
            snapshots: Vec::new(),
            alert_feed: Vec::new(),
            log_messages: vec!["PulseWatch ready.".to_owned()],
            rx,
            tx_cmd,
            engine: Some(engine),
        }
    }

    fn send(&mut self, command: MonitorCommand) {
        if self.tx_cmd.send(command.into()).is_err() {
            self.log("Engine is not running.");
        }
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > LOG_LEN {
            self.log_messages.remove(0);
        }
    }

    fn on_event(&mut self, event: MonitorEvent) {
        match event {
            MonitorEvent::Alert(alert) => {
                self.alert_feed.insert(0, (alert.level, alert.to_string()));
                self.alert_feed.truncate(ALERT_FEED_LEN);
            }
            MonitorEvent::Drift { channel_id, edge, .. } => {
                self.log(&format!("ECG {} drift: {:?}", channel_id + 1, edge));
            }
            MonitorEvent::Reset { channel_id } => self.log(&format!("ECG {} reset", channel_id + 1)),
            MonitorEvent::Marked {
                channel_id, index, ..
            } => self.log(&format!("ECG {} marked at sample {}", channel_id + 1, index)),
            MonitorEvent::StAbnormal { .. }
            | MonitorEvent::RhythmAbnormal { .. }
            | MonitorEvent::Control { .. }
            | MonitorEvent::SettingsChanged { .. } => {}
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let run_txt = if self.flags.running { "⏸ PAUSE" } else { "▶ START" };
            if ui.button(run_txt).clicked() {
                self.send(MonitorCommand::ToggleRunning);
            }
            if ui.button("🔄 RESET ALL").clicked() {
                self.alert_feed.clear();
                self.send(MonitorCommand::ResetAll);
            }
            if ui.button("📍 MARK ALL").clicked() {
                self.send(MonitorCommand::MarkAll);
            }
        });
        let mut drift = self.flags.drift_enabled;
        if ui.checkbox(&mut drift, "Intermittent drift").changed() {
            self.send(MonitorCommand::SetDrift(drift));
        }
        let mut lead_off = self.flags.lead_off;
        if ui.checkbox(&mut lead_off, "Lead off").changed() {
            self.send(MonitorCommand::SetLeadOff(lead_off));
        }

        ui.separator();
        ui.label("SIGNAL");
        let s = &mut self.settings;
        let mut changed = false;
        changed |= ui.add(egui::Slider::new(&mut s.heart_rate_bpm, 30.0..=200.0).text("HR (bpm)")).changed();
        changed |= ui.add(egui::Slider::new(&mut s.hrv_gain, 0.0..=1.0).text("HRV gain")).changed();
        changed |= ui.add(egui::Slider::new(&mut s.noise_gain, 0.0..=0.3).text("Noise gain")).changed();
        changed |= ui.add(egui::Slider::new(&mut s.amplitude_gain, 0.2..=3.0).text("Amplitude")).changed();
        changed |= ui.add(egui::Slider::new(&mut s.window_seconds, 2.0..=20.0).text("Window (s)")).changed();

        ui.label("THRESHOLDS");
        changed |= ui.add(egui::Slider::new(&mut s.brady_bpm, 20.0..=80.0).text("Brady (bpm)")).changed();
        changed |= ui.add(egui::Slider::new(&mut s.tachy_bpm, 90.0..=220.0).text("Tachy (bpm)")).changed();
        changed |= ui.add(egui::Slider::new(&mut s.cv_threshold, 0.01..=0.5).text("R-R CV")).changed();
        changed |= ui.add(egui::Slider::new(&mut s.st_threshold, 0.01..=0.5).text("ST deviation")).changed();
        changed |= ui.add(egui::Slider::new(&mut s.noise_sensitivity, 0.1..=1.5).text("Noise sensitivity")).changed();
        ui.horizontal(|ui| {
            changed |= ui.radio_value(&mut s.alert_policy, AlertPolicy::EveryCycle, "Re-alert").changed();
            changed |= ui.radio_value(&mut s.alert_policy, AlertPolicy::OnOnset, "On onset").changed();
        });
        if changed {
            let settings = self.settings.clone();
            self.send(MonitorCommand::UpdateSettings(settings));
        }
    }

    fn channel_strip(&mut self, ui: &mut egui::Ui, snapshot: &ChannelSnapshot) {
        let colour = severity_colour(snapshot.severity);
        egui::Frame::group(ui.style())
            .stroke(Stroke::new(2.0, colour))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(format!("ECG {}", snapshot.channel_id + 1)).strong());
                    ui.label(RichText::new(snapshot.severity.label()).color(colour).strong());
                    if let Some(report) = &snapshot.report {
                        ui.label(format!(
                            "HR {:.0} bpm | CV {:.2} | quality {}",
                            report.avg_hr_bpm,
                            report.rr_cv,
                            quality_label(report.quality.quality)
                        ));
                    }
                    if snapshot.drift == DriftState::Drifting {
                        ui.label(RichText::new("drift").color(Color32::YELLOW));
                    }
                    if ui.small_button("Mark").clicked() {
                        self.send(MonitorCommand::Mark(snapshot.channel_id));
                    }
                    if ui.small_button("Reset").clicked() {
                        self.send(MonitorCommand::Reset(snapshot.channel_id));
                    }
                });

                let window = self.settings.window_seconds;
                Plot::new(format!("ecg_{}", snapshot.channel_id))
                    .height(140.0)
                    .include_x(-window)
                    .include_x(0.0)
                    .include_y(-0.6 * self.settings.amplitude_gain)
                    .include_y(1.4 * self.settings.amplitude_gain)
                    .allow_drag(false)
                    .allow_zoom(false)
                    .allow_scroll(false)
                    .show(ui, |plot_ui| {
                        plot_ui.line(Line::new(PlotPoints::new(snapshot.samples.clone())).color(TRACE));
                        plot_ui.points(
                            Points::new(PlotPoints::new(snapshot.r_peaks.clone()))
                                .radius(3.0)
                                .color(Color32::RED),
                        );
                        for &(t, kind) in &snapshot.st_events {
                            let c = match kind {
                                StKind::Elevation => Color32::from_rgb(255, 140, 0),
                                StKind::Depression => Color32::from_rgb(80, 160, 255),
                            };
                            plot_ui.vline(VLine::new(t).color(c));
                        }
                        for &t in &snapshot.marks {
                            plot_ui.vline(VLine::new(t).color(Color32::WHITE));
                        }
                    });
            });
    }
}

fn severity_colour(severity: Severity) -> Color32 {
    match severity {
        Severity::Normal => Color32::from_rgb(60, 60, 60),
        Severity::Warning => Color32::YELLOW,
        Severity::Danger => Color32::RED,
    }
}

fn quality_label(quality: SignalQuality) -> &'static str {
    match quality {
        SignalQuality::Unknown => "-",
        SignalQuality::Good => "good",
        SignalQuality::Fair => "fair",
        SignalQuality::Poor => "poor",
    }
}

impl eframe::App for PulseWatchApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. engine messages; only the newest frame matters
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                EngineMessage::Log(s) => self.log(&s),
                EngineMessage::Status(flags) => self.flags = flags,
                EngineMessage::Frame(snapshots) => self.snapshots = snapshots,
                EngineMessage::Event(event) => self.on_event(event),
            }
        }
        ctx.request_repaint();

        // 2. layout
        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);

        egui::SidePanel::left("controls").min_width(300.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("PulseWatch");
            ui.label("Synthetic ECG monitor");
            ui.separator();
            self.controls(ui);

            ui.separator();
            ui.label("ALERTS");
            egui::ScrollArea::vertical()
                .id_source("alerts")
                .max_height(260.0)
                .show(ui, |ui| {
                    for (level, text) in &self.alert_feed {
                        let c = match level {
                            AlertLevel::Warning => Color32::YELLOW,
                            AlertLevel::Danger => Color32::RED,
                        };
                        ui.label(RichText::new(text).color(c).small());
                    }
                });
            ui.separator();
            for m in &self.log_messages {
                ui.monospace(m);
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.snapshots.is_empty() {
                ui.label("Waiting for the engine...");
                return;
            }
            let snapshots = std::mem::take(&mut self.snapshots);
            egui::ScrollArea::vertical().show(ui, |ui| {
                for snapshot in &snapshots {
                    self.channel_strip(ui, snapshot);
                }
            });
            self.snapshots = snapshots;
        });
    }
}

impl Drop for PulseWatchApp {
    fn drop(&mut self) {
        self.tx_cmd.send(EngineCommand::Shutdown).ok();
        if let Some(handle) = self.engine.take() {
            handle.join().ok();
        }
    }
}
