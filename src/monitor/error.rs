use thiserror::Error;
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MonitorError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("frame rate must be greater than zero")]
    InvalidFrameRate,
    #[error("{name} capacity must be greater than zero")]
    InvalidCapacity { name: &'static str },
    #[error("{name} must be positive, got {value}")]
    InvalidWindow { name: &'static str, value: f64 },
    #[error("drift {name} probability must lie in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("drift jump range is inverted or negative: [{min}, {max}]")]
    InvalidJumpRange { min: f64, max: f64 },
    #[error("monitor needs at least one channel")]
    NoChannels,
    #[error("channel {index} out of range: monitor has {count} channels")]
    ChannelOutOfRange { index: usize, count: usize },
}
