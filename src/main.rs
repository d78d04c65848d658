// src/main.rs
#[cfg(feature = "gui")]
mod gui;

use anyhow::Context;
use pulsewatch::monitor::{Monitor, MonitorCommand, MonitorConfig};

#[cfg(not(feature = "gui"))]
const DEFAULT_RUN_SECONDS: f64 = 30.0;

// optional JSON config as the first argument
fn load_config() -> anyhow::Result<MonitorConfig> {
    match std::env::args().nth(1) {
        Some(path) => MonitorConfig::from_json_file(path),
        None => Ok(MonitorConfig::default()),
    }
}

fn build_monitor(config: MonitorConfig) -> anyhow::Result<Monitor> {
    let mut monitor = Monitor::new(config).context("invalid engine configuration")?;
    monitor.apply(MonitorCommand::SetRunning(true))?;
    Ok(monitor)
}

#[cfg(feature = "gui")]
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let monitor = build_monitor(load_config()?)?;
    let viewport = eframe::egui::ViewportBuilder::default()
        .with_inner_size([1280.0, 860.0])
        .with_min_inner_size([900.0, 600.0])
        .with_title("PulseWatch");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "PulseWatch",
        options,
        Box::new(|_cc| Box::new(gui::PulseWatchApp::new(monitor))),
    )
    .map_err(|err| anyhow::anyhow!("viewer failed: {err}"))
}

#[cfg(not(feature = "gui"))]
fn main() -> anyhow::Result<()> {
    use log::{debug, info, warn};
    use pulsewatch::monitor::MonitorEvent;

    env_logger::init();
    let config = load_config()?;
    let seconds = config.run_seconds.unwrap_or(DEFAULT_RUN_SECONDS);
    let mut monitor = build_monitor(config)?;
    info!("headless run: {seconds:.1}s of simulated time");

    let frames = (seconds.max(0.0) * monitor.engine().frame_rate_hz).round() as u64;
    let mut alerts = 0usize;
    for _ in 0..frames {
        monitor.tick();
        for event in monitor.take_events() {
            match &event {
                MonitorEvent::Alert(alert) => {
                    alerts += 1;
                    warn!("{alert}");
                }
                MonitorEvent::Drift { .. } => info!("{event:?}"),
                _ => debug!("{event:?}"),
            }
        }
    }

    let summary: Vec<_> = monitor
        .channels()
        .iter()
        .map(|channel| {
            serde_json::json!({
                "channel": channel.id() + 1,
                "samples": channel.sample_index(),
                "beats": channel.r_peaks().len(),
                "st_events": channel.st_events().len(),
                "severity": channel.severity(),
                "report": channel.last_report(),
            })
        })
        .collect();
    info!("{} frames, {} alerts", monitor.frame_count(), alerts);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
