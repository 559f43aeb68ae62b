use crate::Level;
use chrono::{DateTime, Local};
use std::panic::Location;
use std::path::Path;

/// One log call, captured at the call site
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: Level,
    pub fragments: Vec<String>,
    pub location: &'static Location<'static>,
    pub timestamp: DateTime<Local>,
}

impl LogRecord {
    pub fn new(level: Level, fragments: Vec<String>, location: &'static Location<'static>) -> Self {
        LogRecord {
            level,
            fragments,
            location,
            timestamp: Local::now(),
        }
    }

    /// Fragments joined into the message text
    pub fn message(&self) -> String {
        self.fragments.concat()
    }

    /// `file.rs:LINE` of the call site
    pub fn short_location(&self) -> String {
        let file = Path::new(self.location.file())
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_else(|| self.location.file());
        format!("{}:{}", file, self.location.line())
    }

    /// Full line as written to the sink
    pub fn render(&self) -> String {
        format!(
            "{}: {} {}: {}",
            self.level,
            self.timestamp.format("%Y/%m/%d %H:%M:%S"),
            self.short_location(),
            self.message()
        )
    }
}
