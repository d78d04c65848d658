// src/types.rs
use crate::monitor::{ChannelSnapshot, MonitorCommand, MonitorEvent, RunFlags};

// front end -> engine thread
#[derive(Clone, Debug, PartialEq)]
pub enum EngineCommand {
    Monitor(MonitorCommand),
    Shutdown,
}

impl From<MonitorCommand> for EngineCommand {
    fn from(command: MonitorCommand) -> Self {
        EngineCommand::Monitor(command)
    }
}

// engine thread -> front end
#[derive(Clone, Debug)]
pub enum EngineMessage {
    Log(String),
    Status(RunFlags),
    /// One render copy per channel, sent once per frame.
    Frame(Vec<ChannelSnapshot>),
    Event(MonitorEvent),
}
