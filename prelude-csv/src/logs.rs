//! Pipeline progress logs.
//!
//! Every entry goes through the global [`LOG_BROADCASTER`]. It is echoed to
//! stderr as a human-readable line (stdout is left to CSV and JSON output)
//! unless the echo is switched off, and delivered to every
//! [`LogCollector`], e.g. the CLI's `--log-json` output.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Entries buffered per collector before the oldest are dropped.
const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn marker(self) -> &'static str {
        match self {
            LogLevel::Info => "",
            LogLevel::Success => "✓ ",
            LogLevel::Warning => "⚠️ ",
            LogLevel::Error => "❌ ",
        }
    }
}

/// One progress message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth under the previous top-level entry.
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Renders the entry the way it is echoed to stderr.
impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = usize::from(self.indent) + 1;
        write!(f, "{:width$}{}{}", "", self.level.marker(), self.message, width = depth * 3)
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Fans entries out to the stderr echo and to collectors.
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
    echo: AtomicBool,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            echo: AtomicBool::new(true),
        }
    }

    pub fn log(&self, entry: LogEntry) {
        if self.echo.load(Ordering::Relaxed) {
            eprintln!("{}", entry);
        }
        // no collector is fine
        let _ = self.sender.send(entry);
    }

    /// Raw receiver, for async consumers.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }

    /// Collector receiving every entry logged from now on.
    pub fn collect(&self) -> LogCollector {
        LogCollector {
            receiver: self.subscribe(),
            missed: 0,
        }
    }

    /// Turn the stderr echo on or off.
    pub fn set_echo(&self, echo: bool) {
        self.echo.store(echo, Ordering::Relaxed);
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronous consumer of broadcast entries.
#[derive(Debug)]
pub struct LogCollector {
    receiver: broadcast::Receiver<LogEntry>,
    missed: u64,
}

impl LogCollector {
    /// Every entry received since the last drain, oldest first.
    ///
    /// Entries dropped because the collector fell behind are counted in
    /// [`LogCollector::missed`].
    pub fn drain(&mut self) -> Vec<LogEntry> {
        let mut entries = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(entry) => entries.push(entry),
                Err(TryRecvError::Lagged(n)) => self.missed += n,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return entries,
            }
        }
    }

    pub fn missed(&self) -> u64 {
        self.missed
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Error, msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> LogBroadcaster {
        let broadcaster = LogBroadcaster::new();
        broadcaster.set_echo(false);
        broadcaster
    }

    #[test]
    fn test_collector_drains_in_order() {
        let broadcaster = quiet();
        let mut collector = broadcaster.collect();

        broadcaster.log(LogEntry::new(LogLevel::Info, "Writing CSV to stream"));
        broadcaster.log(LogEntry::new(LogLevel::Success, "Wrote 3 lines").with_indent(1));

        let entries = collector.drain();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].level, LogLevel::Success);
        assert_eq!(entries[1].indent, 1);
        assert!(collector.drain().is_empty());
    }

    #[test]
    fn test_collector_counts_missed_entries() {
        let broadcaster = quiet();
        let mut collector = broadcaster.collect();

        for n in 0..CHANNEL_CAPACITY + 10 {
            broadcaster.log(LogEntry::new(LogLevel::Info, format!("entry {}", n)));
        }

        let entries = collector.drain();
        assert_eq!(entries.len(), CHANNEL_CAPACITY);
        assert_eq!(collector.missed(), 10);
        assert_eq!(entries[0].message, "entry 10");
    }

    #[test]
    fn test_log_without_collectors() {
        quiet().log(LogEntry::new(LogLevel::Warning, "nobody listens"));
    }

    #[test]
    fn test_display_matches_echo() {
        assert_eq!(LogEntry::new(LogLevel::Info, "Reading").to_string(), "   Reading");
        assert_eq!(
            LogEntry::new(LogLevel::Error, "bad line").with_indent(1).to_string(),
            "      ❌ bad line"
        );
    }

    #[test]
    fn test_entry_serialization() {
        let json = serde_json::to_value(LogEntry::new(LogLevel::Error, "bad line")).unwrap();
        assert_eq!(json["level"], "error");
        assert_eq!(json["message"], "bad line");
        assert_eq!(json["indent"], 0);
    }
}
