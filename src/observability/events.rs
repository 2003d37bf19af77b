//! Diagnostic events emitted by the query engine
//!
//! Events are explicit and typed. Each carries a fixed severity so a sink's
//! threshold filters them consistently.

use std::fmt;

use super::logger::Severity;

/// Observable events in the query pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// An option was left in the query bag: no backend and no engine step
    /// honored it
    QueryOptionIgnored,
    /// A decorator was added to the result chain
    QueryApplyStep,
    /// The sort fallback materialized a cursor
    QuerySortMaterialized,
    /// The bounds fallback wrapped the raw cursor
    QueryBoundsEnforced,
}

impl Event {
    /// Returns the stable event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::QueryOptionIgnored => "QUERY_OPTION_IGNORED",
            Event::QueryApplyStep => "QUERY_APPLY_STEP",
            Event::QuerySortMaterialized => "QUERY_SORT_MATERIALIZED",
            Event::QueryBoundsEnforced => "QUERY_BOUNDS_ENFORCED",
        }
    }

    /// Severity the event is always logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryApplyStep => Severity::Trace,
            Event::QueryOptionIgnored | Event::QuerySortMaterialized | Event::QueryBoundsEnforced => {
                Severity::Info
            }
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::QueryOptionIgnored.as_str(), "QUERY_OPTION_IGNORED");
        assert_eq!(Event::QueryApplyStep.to_string(), "QUERY_APPLY_STEP");
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(Event::QueryOptionIgnored.severity(), Severity::Info);
        assert_eq!(Event::QueryApplyStep.severity(), Severity::Trace);
    }
}
