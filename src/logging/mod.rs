// Logging module - In-memory log capture for the interactive session
//
// The session prints chain events on stdout, so tracing output is kept off
// the prompt: this layer records events into a bounded buffer and the
// `logs` command prints the most recent ones on demand.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{Level, Metadata, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Maximum number of log entries to keep in memory
const MAX_LOG_ENTRIES: usize = 1000;

/// A single log entry captured from tracing
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// The tracing target (module path)
    pub target: String,
    pub message: String,
    /// Structured fields other than the message, as `key=value`
    pub fields: Vec<String>,
}

impl LogEntry {
    /// One line for terminal output
    pub fn render(&self) -> String {
        let mut line = format!(
            "{} {:5} {}: {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.level.as_str(),
            self.target,
            self.message
        );
        for field in &self.fields {
            line.push(' ');
            line.push_str(field);
        }
        line
    }
}

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<&Level> for LogLevel {
    fn from(level: &Level) -> Self {
        match *level {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            Level::INFO => LogLevel::Info,
            Level::DEBUG => LogLevel::Debug,
            Level::TRACE => LogLevel::Trace,
        }
    }
}

impl LogLevel {
    /// Get the display string for this log level
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

/// In-memory log buffer with bounded size (ring buffer)
#[derive(Clone)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOG_ENTRIES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    // A panic while holding the lock leaves the deque intact, so keep using it
    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a log entry, dropping the oldest when full
    pub fn add(&self, entry: LogEntry) {
        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The last `n` entries at `min_level` or more severe (most recent last)
    pub fn recent(&self, n: usize, min_level: LogLevel) -> Vec<LogEntry> {
        let entries = self.lock();
        let mut matching: Vec<LogEntry> = entries
            .iter()
            .rev()
            .filter(|e| e.level <= min_level)
            .take(n)
            .cloned()
            .collect();
        matching.reverse();
        matching
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracing layer that captures events into a `LogBuffer`
pub struct CaptureLayer {
    buffer: LogBuffer,
}

impl CaptureLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);

        self.buffer.add(LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::from(metadata.level()),
            target: metadata.target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }

    fn enabled(&self, _metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        // Filtering happens at subscriber level
        true
    }
}

/// Visitor splitting the message from the structured fields
#[derive(Default)]
struct EntryVisitor {
    message: String,
    fields: Vec<String>,
}

impl tracing::field::Visit for EntryVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
            // Remove the quotes that Debug adds
            if self.message.len() >= 2 && self.message.starts_with('"') && self.message.ends_with('"')
            {
                self.message = self.message[1..self.message.len() - 1].to_string();
            }
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(buffer: &LogBuffer, f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(CaptureLayer::new(buffer.clone()));
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn test_captures_message_and_fields() {
        let buffer = LogBuffer::new();
        capture(&buffer, || {
            tracing::warn!(field = "resource_group", sequence = 3, "Option fetch failed: {}", "boom");
        });

        let entries = buffer.recent(10, LogLevel::Trace);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.message, "Option fetch failed: boom");
        assert!(entry.fields.contains(&"field=resource_group".to_string()));
        assert!(entry.fields.contains(&"sequence=3".to_string()));
        assert!(entry.render().contains("WARN"));
    }

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let buffer = LogBuffer::with_capacity(2);
        capture(&buffer, || {
            tracing::info!("one");
            tracing::info!("two");
            tracing::info!("three");
        });

        let messages: Vec<_> = buffer
            .recent(10, LogLevel::Trace)
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn test_recent_filters_by_level() {
        let buffer = LogBuffer::new();
        capture(&buffer, || {
            tracing::debug!("noise");
            tracing::warn!("careful");
            tracing::error!("broken");
        });

        let warnings = buffer.recent(10, LogLevel::Warn);
        assert_eq!(warnings.len(), 2);
        assert_eq!(buffer.recent(1, LogLevel::Trace)[0].message, "broken");

        buffer.clear();
        assert!(buffer.recent(10, LogLevel::Trace).is_empty());
    }
}
