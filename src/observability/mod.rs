//! Observability for the query pipeline
//!
//! # Principles
//!
//! 1. Observability is read-only: no side effects on results
//! 2. No ambient global state; sinks are injected
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use geocursor::observability::{DiagnosticSink, Event, MemorySink};
//!
//! let sink = Arc::new(MemorySink::new());
//! sink.event(Event::QueryOptionIgnored, &[("option", "SORT")]);
//! assert_eq!(sink.events("QUERY_OPTION_IGNORED").len(), 1);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{format_line, Diagnostic, DiagnosticSink, JsonLogger, MemorySink, NoopSink, Severity};
