//! Feature sorting
//!
//! Sorting needs the whole input, so [`SortCursor`] materializes its inner
//! cursor on the first pull. Nothing applies it implicitly: a backend sorts
//! natively, or the engine's opt-in fallback wraps the stream.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ensure_open, Cursor, CursorError, CursorResult, Mode};
use crate::feature::{Feature, Record, Value};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort key: one property and a direction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub property: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parses `name`, `+name` (ascending) or `-name` (descending)
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some(name) = text.strip_prefix('-') {
            Self::desc(name.trim())
        } else {
            Self::asc(text.strip_prefix('+').unwrap_or(text).trim())
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Asc => write!(f, "{}", self.property),
            SortDirection::Desc => write!(f, "-{}", self.property),
        }
    }
}

/// Total order over attribute values for sorting.
///
/// Ordering rules:
/// - null < bool < number < string < geometry
/// - ints and floats compare numerically
/// - geometries are all equal to each other
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let rank = |v: &Value| -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::Geometry(_) => 4,
        }
    };

    let a_rank = rank(a);
    let b_rank = rank(b);
    if a_rank != b_rank {
        return a_rank.cmp(&b_rank);
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

/// Sorts features by each spec in turn. Stable, so ties keep their input
/// order. Missing attributes sort as null.
pub fn sort_features(features: &mut [Feature], specs: &[SortSpec]) {
    static NULL: Value = Value::Null;

    features.sort_by(|a, b| {
        for spec in specs {
            let a_val = a.get(&spec.property).unwrap_or(&NULL);
            let b_val = b.get(&spec.property).unwrap_or(&NULL);
            let ordering = match spec.direction {
                SortDirection::Asc => compare_values(a_val, b_val),
                SortDirection::Desc => compare_values(a_val, b_val).reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Materializes the inner cursor on first pull and yields it sorted
pub struct SortCursor<C: Cursor<Item = Feature>> {
    inner: C,
    specs: Vec<SortSpec>,
    buffer: Option<VecDeque<Feature>>,
    closed: bool,
}

impl<C: Cursor<Item = Feature>> SortCursor<C> {
    pub fn new(inner: C, specs: Vec<SortSpec>) -> Self {
        Self {
            inner,
            specs,
            buffer: None,
            closed: false,
        }
    }

    fn materialize(&mut self) -> CursorResult<&mut VecDeque<Feature>> {
        if self.buffer.is_none() {
            let mut items = Vec::new();
            while let Some(f) = self.inner.next()? {
                items.push(f);
            }
            sort_features(&mut items, &self.specs);
            self.buffer = Some(items.into());
        }
        self.buffer.as_mut().ok_or(CursorError::Closed)
    }
}

impl<C: Cursor<Item = Feature>> Cursor for SortCursor<C> {
    type Item = Feature;

    fn mode(&self) -> Mode {
        self.inner.mode()
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        ensure_open(self.closed)?;
        Ok(!self.materialize()?.is_empty())
    }

    fn next(&mut self) -> CursorResult<Option<Feature>> {
        ensure_open(self.closed)?;
        Ok(self.materialize()?.pop_front())
    }

    fn write(&mut self, _item: Feature) -> CursorResult<()> {
        Err(CursorError::unsupported("write through sort", self.mode()))
    }

    fn remove(&mut self, _item: &Feature) -> CursorResult<()> {
        Err(CursorError::unsupported("remove through sort", self.mode()))
    }

    fn close(&mut self) -> CursorResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.buffer = None;
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{collect, Cursors};
    use crate::feature::{FieldType, Schema};
    use std::sync::Arc;

    fn make(id: &str, name: &str, age: Value) -> Feature {
        let schema = Arc::new(
            Schema::new("people")
                .field("name", FieldType::String)
                .field("age", FieldType::Int),
        );
        Feature::from_values(id, schema, vec![Value::from(name), age])
    }

    fn ids(features: &[Feature]) -> Vec<&str> {
        features.iter().map(|f| f.id()).collect()
    }

    #[test]
    fn test_sort_ascending() {
        let mut docs = vec![
            make("c", "x", Value::Int(30)),
            make("a", "x", Value::Int(20)),
            make("b", "x", Value::Float(25.5)),
        ];
        sort_features(&mut docs, &[SortSpec::asc("age")]);
        assert_eq!(ids(&docs), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sort_descending() {
        let mut docs = vec![
            make("c", "x", Value::Int(30)),
            make("a", "x", Value::Int(20)),
            make("b", "x", Value::Int(25)),
        ];
        sort_features(&mut docs, &[SortSpec::desc("age")]);
        assert_eq!(ids(&docs), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_sort_stable() {
        let mut docs = vec![
            make("a", "x", Value::Int(25)),
            make("b", "x", Value::Int(25)),
            make("c", "x", Value::Int(25)),
        ];
        sort_features(&mut docs, &[SortSpec::asc("age")]);
        assert_eq!(ids(&docs), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sort_multi_key() {
        let mut docs = vec![
            make("1", "bob", Value::Int(30)),
            make("2", "alice", Value::Int(30)),
            make("3", "carol", Value::Int(20)),
        ];
        sort_features(&mut docs, &[SortSpec::desc("age"), SortSpec::asc("name")]);
        assert_eq!(ids(&docs), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_nulls_first() {
        let mut docs = vec![make("a", "x", Value::Int(1)), make("b", "x", Value::Null)];
        sort_features(&mut docs, &[SortSpec::asc("age")]);
        assert_eq!(ids(&docs), vec!["b", "a"]);
    }

    #[test]
    fn test_type_ranking() {
        assert_eq!(compare_values(&Value::Null, &Value::Bool(false)), Ordering::Less);
        assert_eq!(compare_values(&Value::Bool(true), &Value::Int(0)), Ordering::Less);
        assert_eq!(compare_values(&Value::Int(100), &Value::from("a")), Ordering::Less);
        assert_eq!(compare_values(&Value::Int(2), &Value::Float(1.5)), Ordering::Greater);
    }

    #[test]
    fn test_parse_spec() {
        assert_eq!(SortSpec::parse("-name"), SortSpec::desc("name"));
        assert_eq!(SortSpec::parse("+name"), SortSpec::asc("name"));
        assert_eq!(SortSpec::parse(" name "), SortSpec::asc("name"));
        assert_eq!(SortSpec::desc("pop").to_string(), "-pop");
    }

    #[test]
    fn test_sort_cursor() {
        let docs = vec![
            make("c", "x", Value::Int(30)),
            make("a", "x", Value::Int(20)),
            make("b", "x", Value::Int(25)),
        ];
        let c = Cursors::sort(Cursors::from_vec(docs), vec![SortSpec::asc("age")]);
        assert_eq!(ids(&collect(c).unwrap()), vec!["a", "b", "c"]);
    }
}
