//! The pushdown protocol
//!
//! A backend consumes whatever options it honors natively, then hands its
//! raw cursor to [`QueryEngine::apply`]. The engine consumes what is left in
//! a fixed order and wraps the cursor once per consumed option:
//!
//! 1. FILTER
//! 2. OFFSET, counting filtered results
//! 3. LIMIT, capping the final count
//! 4. REPROJECT, last, so discarded features are never transformed
//!
//! Anything still in the bag afterwards stays there and is reported as a
//! `QUERY_OPTION_IGNORED` diagnostic. It is never an error.
//!
//! Two opt-in fallbacks extend the chain (see [`EngineConfig`]): bounds
//! enforcement directly over the raw cursor, and a materializing sort between
//! FILTER and OFFSET.

use std::sync::Arc;

use super::descriptor::{Query, FILTER, LIMIT, OFFSET, REPROJECT, SORT};
use super::explain::{ApplyPlan, ApplyStep, IgnoredOption, PlannedStep};
use crate::config::EngineConfig;
use crate::cursor::{BoxCursor, Cursor, Cursors, SortSpec};
use crate::feature::Feature;
use crate::filter::Filter;
use crate::geom::Rect;
use crate::observability::{DiagnosticSink, Event, NoopSink};
use crate::proj::{Crs, Proj4Reprojector, Reprojector};

/// An option taken out of the bag, ready to become a decorator
enum Step {
    Bounds(Rect<f64>),
    Filter(Filter),
    Sort(Vec<SortSpec>),
    Offset(usize),
    Limit(usize),
    Reproject(Crs),
}

impl Step {
    fn kind(&self) -> ApplyStep {
        match self {
            Step::Bounds(_) => ApplyStep::Bounds,
            Step::Filter(_) => ApplyStep::Filter,
            Step::Sort(_) => ApplyStep::Sort,
            Step::Offset(_) => ApplyStep::Offset,
            Step::Limit(_) => ApplyStep::Limit,
            Step::Reproject(_) => ApplyStep::Reproject,
        }
    }

    fn detail(&self) -> String {
        match self {
            Step::Bounds(r) => format!(
                "{:?}, {:?}, {:?}, {:?}",
                r.min().x,
                r.min().y,
                r.max().x,
                r.max().y
            ),
            Step::Filter(f) => f.to_string(),
            Step::Sort(specs) => specs.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(","),
            Step::Offset(n) | Step::Limit(n) => n.to_string(),
            Step::Reproject(crs) => crs.name().to_string(),
        }
    }
}

/// Turns a query plus a raw backend cursor into the result cursor
#[derive(Clone)]
pub struct QueryEngine {
    config: EngineConfig,
    reprojector: Arc<dyn Reprojector>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEngine {
    /// Engine with default config, proj4rs reprojection and no diagnostics
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            reprojector: Arc::new(Proj4Reprojector),
            sink: Arc::new(NoopSink),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_reprojector(mut self, reprojector: Arc<dyn Reprojector>) -> Self {
        self.reprojector = reprojector;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Consumes the options this engine honors from `query` and wraps
    /// `cursor` accordingly. Never fails: errors surface from the returned
    /// cursor at the first affected element.
    ///
    /// # Panics
    ///
    /// Panics if a recognized option name holds a value of the wrong type,
    /// for example a `Key<f64>` named `"LIMIT"`.
    pub fn apply<C>(&self, query: &mut Query, cursor: C) -> BoxCursor<Feature>
    where
        C: Cursor<Item = Feature> + 'static,
    {
        let steps = self.take_steps(query);
        let mut out: BoxCursor<Feature> = Box::new(cursor);

        for step in steps {
            let detail = step.detail();
            let kind = step.kind();
            out = match step {
                Step::Bounds(rect) => {
                    self.sink.event(Event::QueryBoundsEnforced, &[("bounds", detail.as_str())]);
                    Box::new(Cursors::bounds(out, rect))
                }
                Step::Filter(filter) => Box::new(Cursors::filter(out, filter)),
                Step::Sort(specs) => {
                    self.sink.event(Event::QuerySortMaterialized, &[("sort", detail.as_str())]);
                    Box::new(Cursors::sort(out, specs))
                }
                Step::Offset(n) => Box::new(Cursors::offset(out, n)),
                Step::Limit(n) => Box::new(Cursors::limit(out, n)),
                Step::Reproject(target) => Box::new(Cursors::reproject(out, self.reprojector.clone(), target)),
            };
            self.sink
                .event(Event::QueryApplyStep, &[("step", kind.as_str()), ("detail", detail.as_str())]);
        }

        for (option, value) in query.options().describe() {
            self.sink
                .event(Event::QueryOptionIgnored, &[("option", option.as_str()), ("value", value.as_str())]);
        }

        out
    }

    /// What [`apply`](Self::apply) would do with `query`, leaving the query
    /// untouched
    pub fn explain(&self, query: &Query) -> ApplyPlan {
        let mut preview = query.clone();
        let steps = self
            .take_steps(&mut preview)
            .iter()
            .map(|s| PlannedStep {
                step: s.kind(),
                detail: s.detail(),
            })
            .collect();
        let ignored = preview
            .options()
            .describe()
            .into_iter()
            .map(|(option, value)| IgnoredOption { option, value })
            .collect();
        ApplyPlan { steps, ignored }
    }

    /// Consumes recognized options in protocol order
    fn take_steps(&self, query: &mut Query) -> Vec<Step> {
        let mut steps = Vec::new();

        if self.config.bounds_fallback {
            if let Some(bounds) = query.bounds() {
                steps.push(Step::Bounds(bounds));
            }
        }
        if let Some(filter) = query.take(&FILTER) {
            steps.push(Step::Filter(filter));
        }
        if self.config.sort_fallback {
            if let Some(specs) = query.take(&SORT) {
                steps.push(Step::Sort(specs));
            }
        }
        if let Some(n) = query.take(&OFFSET) {
            steps.push(Step::Offset(n));
        }
        if let Some(n) = query.take(&LIMIT) {
            steps.push(Step::Limit(n));
        }
        if let Some(target) = query.take(&REPROJECT) {
            steps.push(Step::Reproject(target));
        }

        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::collect;
    use crate::cursor::testing::Tracked;
    use crate::feature::{FieldType, Record, Schema, Value};
    use crate::filter::Expression;
    use crate::geom::{rect, Point};
    use crate::observability::MemorySink;
    use crate::query::SIMPLIFY;

    fn towns(n: i64) -> Vec<Feature> {
        let schema = Arc::new(
            Schema::new("towns")
                .field("pop", FieldType::Int)
                .geometry("geom", Some(Crs::epsg(4326))),
        );
        (0..n)
            .map(|i| {
                Feature::from_values(
                    format!("t{}", i),
                    schema.clone(),
                    vec![Value::Int(i * 100), Value::from(Point::new(i as f64, 0.0))],
                )
            })
            .collect()
    }

    fn ids(features: &[Feature]) -> Vec<&str> {
        features.iter().map(|f| f.id()).collect()
    }

    #[test]
    fn test_empty_query_passes_through() {
        let mut q = Query::new();
        let out = collect(QueryEngine::new().apply(&mut q, Cursors::from_vec(towns(3)))).unwrap();
        assert_eq!(ids(&out), vec!["t0", "t1", "t2"]);
    }

    #[test]
    fn test_consumes_recognized_options() {
        let mut q = Query::new()
            .with_filter(Expression::property("pop").ge(200))
            .with_offset(1)
            .with_limit(2)
            .with_reprojection(Crs::epsg(4326));
        let out = collect(QueryEngine::new().apply(&mut q, Cursors::from_vec(towns(10)))).unwrap();
        assert_eq!(ids(&out), vec!["t3", "t4"]);
        assert!(q.is_all());
    }

    #[test]
    fn test_leftovers_reported_not_consumed() {
        let sink = Arc::new(MemorySink::new());
        let engine = QueryEngine::new().with_sink(sink.clone());
        let mut q = Query::new().with_sort("-pop").with_simplify(0.5);

        let out = collect(engine.apply(&mut q, Cursors::from_vec(towns(3)))).unwrap();
        assert_eq!(ids(&out), vec!["t0", "t1", "t2"]);
        assert_eq!(q.get(&SIMPLIFY), Some(&0.5));

        let ignored = sink.events("QUERY_OPTION_IGNORED");
        let names: Vec<_> = ignored.iter().filter_map(|d| d.field("option")).collect();
        assert_eq!(names, vec!["SIMPLIFY", "SORT"]);
    }

    #[test]
    fn test_step_diagnostics_in_order() {
        let sink = Arc::new(MemorySink::new());
        let engine = QueryEngine::new().with_sink(sink.clone());
        let mut q = Query::new().with_limit(1).with_cql("pop > 0").unwrap().with_offset(1);

        let _ = engine.apply(&mut q, Cursors::from_vec(towns(3)));
        let steps: Vec<_> = sink
            .events("QUERY_APPLY_STEP")
            .iter()
            .filter_map(|d| d.field("step").map(str::to_string))
            .collect();
        assert_eq!(steps, vec!["FILTER", "OFFSET", "LIMIT"]);
    }

    #[test]
    fn test_sort_fallback() {
        let sink = Arc::new(MemorySink::new());
        let engine = QueryEngine::new()
            .with_config(EngineConfig::default().with_fallbacks())
            .with_sink(sink.clone());
        let mut q = Query::new().with_sort("-pop").with_limit(2);

        let out = collect(engine.apply(&mut q, Cursors::from_vec(towns(4)))).unwrap();
        assert_eq!(ids(&out), vec!["t3", "t2"]);
        assert!(q.is_all());
        assert_eq!(sink.events("QUERY_SORT_MATERIALIZED").len(), 1);
        assert!(sink.events("QUERY_OPTION_IGNORED").is_empty());
    }

    #[test]
    fn test_bounds_fallback() {
        let query = || Query::new().with_bounds(rect(0.5, -1.0, 2.5, 1.0));

        let plain = collect(QueryEngine::new().apply(&mut query(), Cursors::from_vec(towns(4)))).unwrap();
        assert_eq!(plain.len(), 4);

        let engine = QueryEngine::new().with_config(EngineConfig {
            bounds_fallback: true,
            ..EngineConfig::default()
        });
        let mut q = query();
        let out = collect(engine.apply(&mut q, Cursors::from_vec(towns(4)))).unwrap();
        assert_eq!(ids(&out), vec!["t1", "t2"]);
        assert!(q.bounds().is_some());
    }

    #[test]
    fn test_release_reaches_raw_cursor_once() {
        let raw = Tracked::new(towns(5));
        let closes = raw.closes.clone();
        let mut q = Query::cql("pop > 100").unwrap().with_offset(1).with_limit(1);

        let mut out = QueryEngine::new().apply(&mut q, raw);
        assert!(out.next().unwrap().is_some());
        out.close().unwrap();
        out.close().unwrap();
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_explain_matches_apply() {
        let engine = QueryEngine::new();
        let q = Query::cql("pop > 1000")
            .unwrap()
            .with_limit(3)
            .with_offset(5)
            .with_sort("name");

        let plan = engine.explain(&q);
        assert_eq!(
            plan.step_kinds(),
            vec![ApplyStep::Filter, ApplyStep::Offset, ApplyStep::Limit]
        );
        assert_eq!(plan.ignored.len(), 1);
        assert_eq!(plan.ignored[0].option, "SORT");
        assert_eq!(q.options().len(), 4);
    }

    #[test]
    fn test_reprojection_error_surfaces_lazily() {
        let mut q = Query::new().with_reprojection(Crs::epsg(1));
        let mut out = QueryEngine::new().apply(&mut q, Cursors::from_vec(towns(2)));
        assert!(out.next().is_err());
        let _ = out.close();
    }

    #[test]
    fn test_filter_nulls_dropped() {
        let schema = Arc::new(Schema::new("t").field("pop", FieldType::Int));
        let features = vec![
            Feature::from_values("a", schema.clone(), vec![Value::Null]),
            Feature::from_values("b", schema, vec![Value::Int(5000)]),
        ];
        let mut q = Query::cql("pop > 1000").unwrap();
        let out = collect(QueryEngine::new().apply(&mut q, Cursors::from_vec(features))).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("pop"), Some(&Value::Int(5000)));
    }
}
