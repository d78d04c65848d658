use std::fmt;

use serde::{Deserialize, Serialize};

use crate::monitor::rhythm::Severity;
use crate::monitor::BoundedHistory;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertLevel {
    Warning,
    Danger,
}

impl From<AlertLevel> for Severity {
    fn from(level: AlertLevel) -> Self {
        match level {
            AlertLevel::Warning => Severity::Warning,
            AlertLevel::Danger => Severity::Danger,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub message: String,
    pub level: AlertLevel,
    pub channel_id: usize,
    /// Simulated seconds since the channel was created or reset.
    pub sim_time_s: f64,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ECG {}] [{:.1}s] {}",
            self.channel_id + 1,
            self.sim_time_s,
            self.message
        )
    }
}

/// Anything that accepts alerts. Publishing never feeds back into detection.
pub trait AlertSink {
    fn publish(&mut self, alert: Alert);
}

/// Bounded FIFO of alerts; the oldest entry goes first once full.
#[derive(Clone, Debug)]
pub struct AlertLog {
    entries: BoundedHistory<Alert>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BoundedHistory::new(capacity),
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Alert> + '_ {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Alert> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl AlertSink for AlertLog {
    fn publish(&mut self, alert: Alert) {
        self.entries.push(alert);
    }
}

impl AlertSink for Vec<Alert> {
    fn publish(&mut self, alert: Alert) {
        self.push(alert);
    }
}
