//! Apply plan output
//!
//! Produces deterministic, human-readable previews of what
//! [`QueryEngine::apply`](super::QueryEngine::apply) would do with a query.

use std::fmt;

use serde::Serialize;

/// A decorator the engine adds to the result chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyStep {
    Bounds,
    Filter,
    Sort,
    Offset,
    Limit,
    Reproject,
}

impl ApplyStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyStep::Bounds => "BOUNDS",
            ApplyStep::Filter => "FILTER",
            ApplyStep::Sort => "SORT",
            ApplyStep::Offset => "OFFSET",
            ApplyStep::Limit => "LIMIT",
            ApplyStep::Reproject => "REPROJECT",
        }
    }
}

impl fmt::Display for ApplyStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned step and the option value driving it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub step: ApplyStep,
    pub detail: String,
}

/// An option the engine would leave in the bag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IgnoredOption {
    pub option: String,
    pub value: String,
}

/// Explain output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyPlan {
    /// Steps in the order they wrap the raw cursor, innermost first
    pub steps: Vec<PlannedStep>,
    /// Options nothing would honor
    pub ignored: Vec<IgnoredOption>,
}

impl ApplyPlan {
    pub fn step_kinds(&self) -> Vec<ApplyStep> {
        self.steps.iter().map(|s| s.step).collect()
    }

    /// Whether the raw cursor would come back unwrapped
    pub fn is_passthrough(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for ApplyPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== APPLY PLAN ===")?;

        if self.steps.is_empty() {
            writeln!(f, "Steps: none (raw cursor)")?;
        } else {
            writeln!(f, "Steps:")?;
            for (i, step) in self.steps.iter().enumerate() {
                writeln!(f, "  {}. {} {}", i + 1, step.step, step.detail)?;
            }
        }

        if !self.ignored.is_empty() {
            writeln!(f, "Ignored:")?;
            for option in &self.ignored {
                writeln!(f, "  - {} = {}", option.option, option.value)?;
            }
        }

        Ok(())
    }
}
