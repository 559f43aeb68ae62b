use crate::LogRecord;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// Physical destination of a rendered line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// INFO, WARNING and ERROR
    Primary,
    /// FATAL
    Alternate,
}

/// Destination for rendered records.
///
/// Only the logger's consumer task writes to a sink.
pub trait LogSink: Send + Sync {
    fn write(&self, stream: Stream, line: &str);

    fn flush(&self) {}
}

/// Writes the primary stream to stdout and the alternate stream to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioSink;

impl LogSink for StdioSink {
    fn write(&self, stream: Stream, line: &str) {
        // A closed stdout/stderr has nowhere to report to.
        let _ = match stream {
            Stream::Primary => writeln!(std::io::stdout().lock(), "{}", line),
            Stream::Alternate => writeln!(std::io::stderr().lock(), "{}", line),
        };
    }

    fn flush(&self) {
        let _ = std::io::stdout().lock().flush();
        let _ = std::io::stderr().lock().flush();
    }
}

/// Keeps rendered lines in memory, for tests and diagnostics
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<(Stream, String)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line written so far, in render order
    pub fn lines(&self) -> Vec<(Stream, String)> {
        self.lines.lock().clone()
    }

    /// Lines written to one stream
    pub fn stream_lines(&self, stream: Stream) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(s, _)| *s == stream)
            .map(|(_, line)| line.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|(_, line)| line.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl LogSink for MemorySink {
    fn write(&self, stream: Stream, line: &str) {
        self.lines.lock().push((stream, line.to_string()));
    }
}

/// Render a record onto its level's stream
pub(crate) fn emit(sink: &dyn LogSink, record: &LogRecord) {
    sink.write(record.level.stream(), &record.render());
}
