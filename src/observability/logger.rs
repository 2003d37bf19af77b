//! Diagnostic sinks
//!
//! - Structured JSON lines
//! - Deterministic key ordering: `event`, `severity`, then fields sorted
//! - One line per event
//! - Synchronous, no buffering
//!
//! There is no process-wide logger. The engine holds an
//! `Arc<dyn DiagnosticSink>` handed to it at construction.

use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::events::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Info
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Receives diagnostics from the engine
pub trait DiagnosticSink: Send + Sync {
    /// Records one event. Implementations drop events below their threshold.
    fn emit(&self, severity: Severity, event: &str, fields: &[(&str, &str)]);

    /// Whether an event at `severity` would be recorded. Lets callers skip
    /// building expensive fields.
    fn enabled(&self, _severity: Severity) -> bool {
        true
    }

    /// Records a typed event at its fixed severity
    fn event(&self, event: Event, fields: &[(&str, &str)]) {
        if self.enabled(event.severity()) {
            self.emit(event.severity(), event.as_str(), fields);
        }
    }
}

/// Formats one JSON log line, newline included
pub fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(256);

    output.push('{');

    output.push_str("\"event\":\"");
    escape_json_string(&mut output, event);
    output.push('"');

    output.push_str(",\"severity\":\"");
    output.push_str(severity.as_str());
    output.push('"');

    let mut sorted_fields: Vec<_> = fields.iter().collect();
    sorted_fields.sort_by_key(|(k, _)| *k);

    for (key, value) in sorted_fields {
        output.push_str(",\"");
        escape_json_string(&mut output, key);
        output.push_str("\":\"");
        escape_json_string(&mut output, value);
        output.push('"');
    }

    output.push('}');
    output.push('\n');
    output
}

fn escape_json_string(output: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c.is_control() => {
                output.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => output.push(c),
        }
    }
}

/// Writes JSON lines to any writer
pub struct JsonLogger<W: Write + Send> {
    writer: Mutex<W>,
    min_severity: Severity,
}

impl JsonLogger<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl JsonLogger<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> JsonLogger<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            min_severity: Severity::default(),
        }
    }

    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    /// Returns the writer, recovering it even if a writer panicked
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> DiagnosticSink for JsonLogger<W> {
    fn emit(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !self.enabled(severity) {
            return;
        }
        let line = format_line(severity, event, fields);
        let mut writer = match self.writer.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Write atomically (one call per line); a failed diagnostic write
        // must not fail the query
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    fn enabled(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }
}

/// A captured diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub event: String,
    pub fields: Vec<(String, String)>,
}

impl Diagnostic {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Keeps diagnostics in memory
#[derive(Debug)]
pub struct MemorySink {
    records: Mutex<Vec<Diagnostic>>,
    min_severity: Severity,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySink {
    /// Captures everything, trace included
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            min_severity: Severity::Trace,
        }
    }

    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    pub fn records(&self) -> Vec<Diagnostic> {
        match self.records.lock() {
            Ok(r) => r.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Captured diagnostics for one event name
    pub fn events(&self, event: &str) -> Vec<Diagnostic> {
        self.records().into_iter().filter(|d| d.event == event).collect()
    }

    pub fn clear(&self) {
        match self.records.lock() {
            Ok(mut r) => r.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !self.enabled(severity) {
            return;
        }
        let record = Diagnostic {
            severity,
            event: event.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        match self.records.lock() {
            Ok(mut r) => r.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }

    fn enabled(&self, severity: Severity) -> bool {
        severity >= self.min_severity
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn emit(&self, _severity: Severity, _event: &str, _fields: &[(&str, &str)]) {}

    fn enabled(&self, _severity: Severity) -> bool {
        false
    }
}
