// src/monitor/mod.rs
pub mod alert;
pub mod beat;
pub mod channel;
pub mod config;
pub mod error;
pub mod event;
pub mod history;
pub mod noise;
pub mod oscillator;
pub mod rhythm;
pub mod session;
pub mod stream;
pub mod waveform;
// re-exports for callers outside the monitor tree
pub use alert::{Alert, AlertLevel, AlertLog, AlertSink};
pub use beat::{BeatDetector, BeatEvaluator, StEvent, StFinding, StKind};
pub use channel::{Channel, ChannelSnapshot, SampleOutput};
pub use config::{
    AlertPolicy, ConfigSnapshot, DriftConfig, EngineConfig, MonitorConfig, MonitorSettings,
    RunFlags, SharedConfig,
};
pub use error::MonitorError;
pub use event::MonitorEvent;
pub use history::BoundedHistory;
pub use noise::NoiseSource;
pub use oscillator::{DriftEdge, DriftState, PhaseOscillator, PhaseStep};
pub use rhythm::{
    QualityEstimate, RhythmCondition, RhythmEvaluator, RhythmReport, Severity, SignalQuality,
    StState,
};
pub use session::{Monitor, MonitorCommand, TickSummary};
pub use stream::SampleStream;
pub use waveform::{baseline_wander, template, Deflection, PQRST, R_WAVE_PHASE};
