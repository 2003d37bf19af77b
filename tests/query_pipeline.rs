//! Query Pipeline Tests
//!
//! End-to-end behavior of the pushdown protocol:
//! - Options are honored exactly once, in a fixed order
//! - Offset counts filtered results; limit caps the final count
//! - Unhandled options are reported, never raised
//! - Release reaches the raw cursor exactly once
//! - Reprojection to the source CRS is the identity

use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::sync::Arc;

use geocursor::cursor::{collect, Cursor, CursorError, CursorIter, CursorResult, Cursors, MemCursor, Mode};
use geocursor::feature::{Feature, FieldType, Record, Schema, Value};
use geocursor::filter::{compile, Expression};
use geocursor::geom::{approx_equal, Geometry, Point};
use geocursor::observability::MemorySink;
use geocursor::proj::Crs;
use geocursor::query::{Query, QueryEngine, LIMIT, SORT};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

/// 20 towns; the 12 with `i % 5 < 3` have more than 1000 inhabitants
fn towns() -> Vec<Feature> {
    let schema = Arc::new(
        Schema::new("towns")
            .field("name", FieldType::String)
            .field("pop", FieldType::Int)
            .geometry("geom", Some(Crs::epsg(4326))),
    );
    (0..20)
        .map(|i| {
            let pop = if i % 5 < 3 { 2000 + i } else { 500 };
            let mut f = Feature::from_json(
                format!("town-{}", i),
                schema.clone(),
                json!({"name": format!("Town {:02}", 19 - i), "pop": pop}),
            );
            f.set_geometry(Geometry::Point(Point::new(i as f64, i as f64 / 2.0)));
            f
        })
        .collect()
}

fn ids(features: &[Feature]) -> Vec<String> {
    features.iter().map(|f| f.id().to_string()).collect()
}

/// Raw cursor that counts how often it is released, and optionally fails
/// with an I/O error on a given pull
struct CountingCursor {
    inner: MemCursor<Feature>,
    closes: Rc<Cell<usize>>,
    pulls: usize,
    fail_on: Option<usize>,
}

impl CountingCursor {
    fn new(features: Vec<Feature>) -> (Self, Rc<Cell<usize>>) {
        let closes = Rc::new(Cell::new(0));
        let cursor = Self {
            inner: MemCursor::new(features),
            closes: closes.clone(),
            pulls: 0,
            fail_on: None,
        };
        (cursor, closes)
    }

    fn failing_on(features: Vec<Feature>, pull: usize) -> (Self, Rc<Cell<usize>>) {
        let (mut cursor, closes) = Self::new(features);
        cursor.fail_on = Some(pull);
        (cursor, closes)
    }
}

impl Cursor for CountingCursor {
    type Item = Feature;

    fn mode(&self) -> Mode {
        Mode::Read
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        self.inner.has_next()
    }

    fn next(&mut self) -> CursorResult<Option<Feature>> {
        self.pulls += 1;
        if self.fail_on == Some(self.pulls) {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "store went away").into());
        }
        self.inner.next()
    }

    fn close(&mut self) -> CursorResult<()> {
        self.closes.set(self.closes.get() + 1);
        self.inner.close()
    }
}

// =============================================================================
// Query Descriptor Tests
// =============================================================================

#[test]
fn test_fresh_query_is_all() {
    assert!(Query::new().is_all());
    assert!(Query::new().with_fields(["name", "pop"]).is_all());
    assert!(!Query::new().with_limit(1).is_all());
    assert!(!Query::new().with_bounds(geocursor::geom::rect(0.0, 0.0, 1.0, 1.0)).is_all());
}

#[test]
fn test_consume_is_destructive() {
    let mut q = Query::new().with_limit(10);
    assert_eq!(q.consume(&LIMIT, 0), 10);
    assert_eq!(q.consume(&LIMIT, 99), 99);
}

#[test]
fn test_syntax_error_fails_at_construction() {
    let err = Query::cql("pop >>> 1000").unwrap_err();
    assert_eq!(err.position, 5);
}

// =============================================================================
// Filter / Offset / Limit Tests
// =============================================================================

#[test]
fn test_filter_limit_is_prefix_of_matches() {
    let filter = compile("pop > 1000").unwrap();
    let matching: Vec<String> = towns()
        .into_iter()
        .filter(|f| filter.matches(f))
        .map(|f| f.id().to_string())
        .collect();
    assert_eq!(matching.len(), 12);

    for limit in 0..15 {
        let mut q = Query::new().with_filter(filter.clone()).with_limit(limit);
        let out = collect(QueryEngine::new().apply(&mut q, Cursors::from_vec(towns()))).unwrap();
        let expected: Vec<String> = matching.iter().take(limit).cloned().collect();
        assert_eq!(ids(&out), expected, "limit {}", limit);
    }
}

#[test]
fn test_offset_then_limit_count() {
    let m = 12usize;
    for k in 0..15 {
        for l in 0..15 {
            let mut q = Query::cql("pop > 1000").unwrap().with_offset(k).with_limit(l);
            let out = collect(QueryEngine::new().apply(&mut q, Cursors::from_vec(towns()))).unwrap();
            assert_eq!(out.len(), l.min(m.saturating_sub(k)), "offset {} limit {}", k, l);
        }
    }
}

#[test]
fn test_twenty_record_scenario() {
    let mut q = Query::cql("pop > 1000").unwrap().with_offset(5).with_limit(3);
    let out = collect(QueryEngine::new().apply(&mut q, Cursors::from_vec(towns()))).unwrap();

    // Matches are towns 0,1,2,5,6,7,10,11,...; the 6th to 8th are 7, 10, 11
    assert_eq!(ids(&out), vec!["town-7", "town-10", "town-11"]);
    assert!(q.is_all());
}

// =============================================================================
// Unhandled Option Tests
// =============================================================================

#[test]
fn test_sort_only_query_is_left_unconsumed() {
    let sink = Arc::new(MemorySink::new());
    let engine = QueryEngine::new().with_sink(sink.clone());
    let mut q = Query::new().with_sort("name");

    let out = collect(engine.apply(&mut q, Cursors::from_vec(towns()))).unwrap();

    assert_eq!(ids(&out), ids(&towns()));
    assert!(q.get(&SORT).is_some());

    let ignored = sink.events("QUERY_OPTION_IGNORED");
    assert_eq!(ignored.len(), 1);
    assert_eq!(ignored[0].field("option"), Some("SORT"));
}

#[test]
fn test_backend_consumed_option_not_reapplied() {
    let mut q = Query::cql("pop > 1000").unwrap().with_limit(2);

    // A backend that filters natively consumes FILTER before apply
    let filter = q.take(&geocursor::query::FILTER).unwrap();
    let prefiltered: Vec<Feature> = towns().into_iter().filter(|f| filter.matches(f)).collect();

    let plan = QueryEngine::new().explain(&q);
    assert_eq!(plan.steps.len(), 1);

    let out = collect(QueryEngine::new().apply(&mut q, Cursors::from_vec(prefiltered))).unwrap();
    assert_eq!(ids(&out), vec!["town-0", "town-1"]);
}

// =============================================================================
// Release Tests
// =============================================================================

#[test]
fn test_three_deep_chain_releases_once() {
    let (raw, closes) = CountingCursor::new(towns());
    let filter = compile("pop > 1000").unwrap();
    let mut chain = Cursors::limit(Cursors::offset(Cursors::filter(raw, filter), 2), 2);

    assert!(chain.next().unwrap().is_some());
    chain.close().unwrap();
    chain.close().unwrap();
    assert_eq!(closes.get(), 1);
}

#[test]
fn test_abandoned_iteration_releases() {
    let (raw, closes) = CountingCursor::new(towns());
    let mut q = Query::cql("pop > 1000").unwrap();
    let cursor = QueryEngine::new().apply(&mut q, raw);

    {
        let mut iter = CursorIter::new(cursor);
        assert!(iter.next().is_some());
    }
    assert_eq!(closes.get(), 1);
}

#[test]
fn test_exhausted_iteration_releases() {
    let (raw, closes) = CountingCursor::new(towns());
    let mut q = Query::new().with_limit(3);
    assert_eq!(collect(QueryEngine::new().apply(&mut q, raw)).unwrap().len(), 3);
    assert_eq!(closes.get(), 1);
}

#[test]
fn test_io_failure_surfaces_at_element_and_releases_once() {
    let (raw, closes) = CountingCursor::failing_on(towns(), 3);
    let mut q = Query::cql("pop > 1000").unwrap().with_offset(1).with_limit(5);
    let mut iter = CursorIter::new(QueryEngine::new().apply(&mut q, raw));

    // Pull 1 is skipped by the offset, pull 2 is delivered, pull 3 fails
    let first = iter.next().unwrap().unwrap();
    assert_eq!(first.id(), "town-1");
    assert!(matches!(iter.next(), Some(Err(CursorError::Io(_)))));
    assert!(iter.next().is_none());
    drop(iter);
    assert_eq!(closes.get(), 1);
}

#[test]
fn test_io_failure_fails_collect_and_releases_once() {
    let (raw, closes) = CountingCursor::failing_on(towns(), 3);
    let mut q = Query::cql("pop > 1000").unwrap().with_offset(1).with_limit(5);

    let result = collect(QueryEngine::new().apply(&mut q, raw));
    assert!(matches!(result, Err(CursorError::Io(_))));
    assert_eq!(closes.get(), 1);
}

// =============================================================================
// Evaluation Tests
// =============================================================================

#[test]
fn test_property_on_non_record_is_null() {
    let pop = Expression::property("pop");
    assert_eq!(pop.evaluate(&Value::Int(7)), Value::Null);
    assert_eq!(pop.evaluate(&towns()[0]).as_f64(), Some(2000.0));

    let missing = Expression::property("area");
    assert_eq!(missing.evaluate(&towns()[0]), Value::Null);
    assert_eq!(compile("area > 3").unwrap().evaluate(&towns()[0]), None);
}

// =============================================================================
// Reprojection Tests
// =============================================================================

#[test]
fn test_reproject_to_source_crs_is_identity() {
    let mut q = Query::new().with_reprojection(Crs::epsg(4326));
    let out = collect(QueryEngine::new().apply(&mut q, Cursors::from_vec(towns()))).unwrap();

    for (before, after) in towns().iter().zip(out.iter()) {
        assert!(approx_equal(before.geometry().unwrap(), after.geometry().unwrap(), 1e-9));
        assert_eq!(before.get("name"), after.get("name"));
    }
}

#[test]
fn test_reprojection_applied_last() {
    let mut q = Query::cql("pop > 1000")
        .unwrap()
        .with_limit(1)
        .with_reprojection(Crs::epsg(3857));
    let out = collect(QueryEngine::new().apply(&mut q, Cursors::from_vec(towns()))).unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].schema().crs(), Some(&Crs::epsg(3857)));
    assert!(approx_equal(
        out[0].geometry().unwrap(),
        &Geometry::Point(Point::new(0.0, 0.0)),
        1e-6
    ));
}
