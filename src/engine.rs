// src/engine.rs
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::monitor::Monitor;
use crate::types::*;

/// Drives `monitor` at its frame rate on a background thread. Commands are
/// applied between ticks; the thread exits on `Shutdown` or once either end
/// of the channel pair is dropped.
pub fn spawn_engine(
    mut monitor: Monitor,
    tx: Sender<EngineMessage>,
    rx_cmd: Receiver<EngineCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let frame_period = Duration::from_secs_f64(1.0 / monitor.engine().frame_rate_hz);
        info!("engine started, frame period {:?}", frame_period);
        tx.send(EngineMessage::Log("Engine ready.".to_owned())).ok();
        tx.send(EngineMessage::Status(monitor.flags())).ok();

        let mut next_frame = Instant::now();
        'run: loop {
            // 1. commands queued since the last frame
            loop {
                match rx_cmd.try_recv() {
                    Ok(EngineCommand::Shutdown) => break 'run,
                    Ok(EngineCommand::Monitor(command)) => {
                        let before = monitor.flags();
                        if let Err(err) = monitor.apply(command) {
                            warn!("command rejected: {err}");
                            tx.send(EngineMessage::Log(format!("Command rejected: {err}")))
                                .ok();
                        }
                        if monitor.flags() != before {
                            tx.send(EngineMessage::Status(monitor.flags())).ok();
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => break 'run,
                }
            }

            // 2. one frame of generation + evaluation
            monitor.tick();
            for event in monitor.take_events() {
                if tx.send(EngineMessage::Event(event)).is_err() {
                    break 'run;
                }
            }
            if tx.send(EngineMessage::Frame(monitor.snapshots())).is_err() {
                break 'run;
            }

            // 3. pace to the frame clock; drop missed frames instead of bursting
            next_frame += frame_period;
            let now = Instant::now();
            if next_frame > now {
                thread::sleep(next_frame - now);
            } else {
                next_frame = now;
            }
        }
        info!("engine stopped after {} frames", monitor.frame_count());
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{EngineConfig, MonitorCommand, MonitorConfig, MonitorEvent, RunFlags};
    use std::sync::mpsc;

    fn fast_monitor() -> Monitor {
        Monitor::new(MonitorConfig {
            engine: EngineConfig {
                channel_count: 2,
                frame_rate_hz: 1000.0,
                seed: Some(3),
                ..EngineConfig::default()
            },
            flags: RunFlags {
                running: true,
                ..RunFlags::default()
            },
            ..MonitorConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn streams_frames_and_stops_on_shutdown() {
        let (tx, rx) = mpsc::channel();
        let (tx_cmd, rx_cmd) = mpsc::channel();
        let handle = spawn_engine(fast_monitor(), tx, rx_cmd);

        let mut frames = 0;
        while frames < 5 {
            if let EngineMessage::Frame(snapshots) = rx.recv_timeout(Duration::from_secs(5)).unwrap() {
                assert_eq!(snapshots.len(), 2);
                frames += 1;
            }
        }
        tx_cmd.send(MonitorCommand::Mark(0).into()).unwrap();
        let marked = loop {
            let msg = rx.recv_timeout(Duration::from_secs(5)).unwrap();
            if let EngineMessage::Event(MonitorEvent::Marked { channel_id, index, .. }) = msg {
                break (channel_id, index);
            }
        };
        assert_eq!(marked.0, 0);
        assert!(marked.1 >= 5);
        tx_cmd.send(EngineCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn reports_status_and_rejected_commands() {
        let (tx, rx) = mpsc::channel();
        let (tx_cmd, rx_cmd) = mpsc::channel();
        tx_cmd.send(MonitorCommand::SetLeadOff(true).into()).unwrap();
        tx_cmd.send(MonitorCommand::Reset(9).into()).unwrap();
        tx_cmd.send(EngineCommand::Shutdown).unwrap();
        spawn_engine(fast_monitor(), tx, rx_cmd).join().unwrap();

        let messages: Vec<_> = rx.try_iter().collect();
        assert!(messages
            .iter()
            .any(|m| matches!(m, EngineMessage::Status(flags) if flags.lead_off)));
        assert!(messages
            .iter()
            .any(|m| matches!(m, EngineMessage::Log(text) if text.contains("out of range"))));
    }

    #[test]
    fn exits_when_the_command_side_disconnects() {
        let (tx, _rx) = mpsc::channel();
        let (tx_cmd, rx_cmd) = mpsc::channel::<EngineCommand>();
        drop(tx_cmd);
        spawn_engine(fast_monitor(), tx, rx_cmd).join().unwrap();
    }
}
