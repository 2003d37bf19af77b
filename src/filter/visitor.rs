//! Filter visitors.
//!
//! A [`FilterVisitor`] gets one callback per filter variant and decides for
//! itself whether and how to descend into children. [`Filter::accept`] does the
//! dispatch. Evaluation, property collection and extent extraction are all
//! visitors, so backends can add their own (for example to translate a filter
//! into a native query language) without touching the filter model.

use std::collections::BTreeSet;

use super::expression::Expression;
use super::predicate::{like_match, ComparisonOp, Filter, SpatialOp};
use crate::feature::{Record, Value};
use crate::geom::{self, Rect};

/// Double-dispatch target for [`Filter::accept`]
pub trait FilterVisitor {
    type Output;

    fn visit_include(&mut self) -> Self::Output;

    fn visit_exclude(&mut self) -> Self::Output;

    fn visit_compare(&mut self, left: &Expression, op: ComparisonOp, right: &Expression) -> Self::Output;

    fn visit_like(&mut self, expr: &Expression, pattern: &str, negated: bool) -> Self::Output;

    fn visit_in(&mut self, expr: &Expression, list: &[Value], negated: bool) -> Self::Output;

    fn visit_is_null(&mut self, expr: &Expression, negated: bool) -> Self::Output;

    fn visit_spatial(&mut self, op: SpatialOp, left: &Expression, right: &Expression) -> Self::Output;

    fn visit_not(&mut self, inner: &Filter) -> Self::Output;

    fn visit_and(&mut self, clauses: &[Filter]) -> Self::Output;

    fn visit_or(&mut self, clauses: &[Filter]) -> Self::Output;
}

/// Evaluates a filter against one input with Kleene three-valued logic.
///
/// `None` is "unknown": produced by comparisons against null, propagated by
/// `NOT`, absorbed by `AND false` and `OR true`.
pub struct Evaluator<'a, R: Record + ?Sized> {
    input: &'a R,
}

impl<'a, R: Record + ?Sized> Evaluator<'a, R> {
    pub fn new(input: &'a R) -> Self {
        Self { input }
    }
}

impl<R: Record + ?Sized> FilterVisitor for Evaluator<'_, R> {
    type Output = Option<bool>;

    fn visit_include(&mut self) -> Option<bool> {
        Some(true)
    }

    fn visit_exclude(&mut self) -> Option<bool> {
        Some(false)
    }

    fn visit_compare(&mut self, left: &Expression, op: ComparisonOp, right: &Expression) -> Option<bool> {
        op.test(&left.evaluate(self.input), &right.evaluate(self.input))
    }

    fn visit_like(&mut self, expr: &Expression, pattern: &str, negated: bool) -> Option<bool> {
        match expr.evaluate(self.input) {
            Value::Null => None,
            Value::String(s) => Some(like_match(&s, pattern) != negated),
            _ => Some(negated),
        }
    }

    fn visit_in(&mut self, expr: &Expression, list: &[Value], negated: bool) -> Option<bool> {
        let value = expr.evaluate(self.input);
        if value.is_null() {
            return None;
        }
        let found = list.iter().any(|v| value.loose_eq(v) == Some(true));
        Some(found != negated)
    }

    fn visit_is_null(&mut self, expr: &Expression, negated: bool) -> Option<bool> {
        Some(expr.evaluate(self.input).is_null() != negated)
    }

    fn visit_spatial(&mut self, op: SpatialOp, left: &Expression, right: &Expression) -> Option<bool> {
        op.test(&left.evaluate(self.input), &right.evaluate(self.input))
    }

    fn visit_not(&mut self, inner: &Filter) -> Option<bool> {
        inner.accept(self).map(|b| !b)
    }

    fn visit_and(&mut self, clauses: &[Filter]) -> Option<bool> {
        let mut unknown = false;
        for c in clauses {
            match c.accept(self) {
                Some(false) => return Some(false),
                None => unknown = true,
                Some(true) => {}
            }
        }
        if unknown {
            None
        } else {
            Some(true)
        }
    }

    fn visit_or(&mut self, clauses: &[Filter]) -> Option<bool> {
        let mut unknown = false;
        for c in clauses {
            match c.accept(self) {
                Some(true) => return Some(true),
                None => unknown = true,
                Some(false) => {}
            }
        }
        if unknown {
            None
        } else {
            Some(false)
        }
    }
}

/// Collects every property name a filter reads
#[derive(Debug, Default)]
pub struct PropertyCollector {
    names: BTreeSet<String>,
}

impl PropertyCollector {
    pub fn into_names(self) -> Vec<String> {
        self.names.into_iter().collect()
    }

    fn expr(&mut self, expr: &Expression) {
        expr.for_each_property(&mut |name| {
            self.names.insert(name.to_string());
        });
    }
}

impl FilterVisitor for PropertyCollector {
    type Output = ();

    fn visit_include(&mut self) {}

    fn visit_exclude(&mut self) {}

    fn visit_compare(&mut self, left: &Expression, _op: ComparisonOp, right: &Expression) {
        self.expr(left);
        self.expr(right);
    }

    fn visit_like(&mut self, expr: &Expression, _pattern: &str, _negated: bool) {
        self.expr(expr);
    }

    fn visit_in(&mut self, expr: &Expression, _list: &[Value], _negated: bool) {
        self.expr(expr);
    }

    fn visit_is_null(&mut self, expr: &Expression, _negated: bool) {
        self.expr(expr);
    }

    fn visit_spatial(&mut self, _op: SpatialOp, left: &Expression, right: &Expression) {
        self.expr(left);
        self.expr(right);
    }

    fn visit_not(&mut self, inner: &Filter) {
        inner.accept(self);
    }

    fn visit_and(&mut self, clauses: &[Filter]) {
        for c in clauses {
            c.accept(self);
        }
    }

    fn visit_or(&mut self, clauses: &[Filter]) {
        for c in clauses {
            c.accept(self);
        }
    }
}

/// Where a matching feature's geometry can possibly lie
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpatialExtent {
    /// No spatial constraint
    Unbounded,
    /// The geometry's envelope must intersect this rectangle
    Bounded(Rect<f64>),
    /// Nothing can match
    Empty,
}

impl SpatialExtent {
    pub fn intersect(self, other: SpatialExtent) -> SpatialExtent {
        match (self, other) {
            (SpatialExtent::Empty, _) | (_, SpatialExtent::Empty) => SpatialExtent::Empty,
            (SpatialExtent::Unbounded, x) | (x, SpatialExtent::Unbounded) => x,
            (SpatialExtent::Bounded(a), SpatialExtent::Bounded(b)) => {
                match geom::envelope_intersection(&a, &b) {
                    Some(r) => SpatialExtent::Bounded(r),
                    None => SpatialExtent::Empty,
                }
            }
        }
    }

    pub fn union(self, other: SpatialExtent) -> SpatialExtent {
        match (self, other) {
            (SpatialExtent::Unbounded, _) | (_, SpatialExtent::Unbounded) => SpatialExtent::Unbounded,
            (SpatialExtent::Empty, x) | (x, SpatialExtent::Empty) => x,
            (SpatialExtent::Bounded(a), SpatialExtent::Bounded(b)) => SpatialExtent::Bounded(geom::rect(
                a.min().x.min(b.min().x),
                a.min().y.min(b.min().y),
                a.max().x.max(b.max().x),
                a.max().y.max(b.max().y),
            )),
        }
    }

    pub fn as_rect(&self) -> Option<Rect<f64>> {
        match self {
            SpatialExtent::Bounded(r) => Some(*r),
            _ => None,
        }
    }
}

/// Derives a conservative [`SpatialExtent`] from the spatial predicates in a
/// filter. Non-spatial predicates and negations never narrow the extent.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtentExtractor;

impl FilterVisitor for ExtentExtractor {
    type Output = SpatialExtent;

    fn visit_include(&mut self) -> SpatialExtent {
        SpatialExtent::Unbounded
    }

    fn visit_exclude(&mut self) -> SpatialExtent {
        SpatialExtent::Empty
    }

    fn visit_compare(&mut self, _left: &Expression, _op: ComparisonOp, _right: &Expression) -> SpatialExtent {
        SpatialExtent::Unbounded
    }

    fn visit_like(&mut self, _expr: &Expression, _pattern: &str, _negated: bool) -> SpatialExtent {
        SpatialExtent::Unbounded
    }

    fn visit_in(&mut self, _expr: &Expression, _list: &[Value], _negated: bool) -> SpatialExtent {
        SpatialExtent::Unbounded
    }

    fn visit_is_null(&mut self, _expr: &Expression, _negated: bool) -> SpatialExtent {
        SpatialExtent::Unbounded
    }

    fn visit_spatial(&mut self, op: SpatialOp, left: &Expression, right: &Expression) -> SpatialExtent {
        if op == SpatialOp::Disjoint {
            return SpatialExtent::Unbounded;
        }
        let literal = match (left, right) {
            (Expression::Property(_), Expression::Literal(Value::Geometry(g)))
            | (Expression::Literal(Value::Geometry(g)), Expression::Property(_)) => g,
            _ => return SpatialExtent::Unbounded,
        };
        match geom::envelope(literal) {
            Some(r) => SpatialExtent::Bounded(r),
            None => SpatialExtent::Empty,
        }
    }

    fn visit_not(&mut self, _inner: &Filter) -> SpatialExtent {
        SpatialExtent::Unbounded
    }

    fn visit_and(&mut self, clauses: &[Filter]) -> SpatialExtent {
        clauses
            .iter()
            .fold(SpatialExtent::Unbounded, |acc, c| acc.intersect(c.accept(self)))
    }

    fn visit_or(&mut self, clauses: &[Filter]) -> SpatialExtent {
        clauses
            .iter()
            .fold(SpatialExtent::Empty, |acc, c| acc.union(c.accept(self)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{rect, Geometry, Point};

    fn geom() -> Expression {
        Expression::property("geom")
    }

    #[test]
    fn test_evaluator_on_plain_value() {
        // Property lookups on a non-record input see null
        let f = Expression::property("pop").gt(1);
        assert_eq!(f.evaluate(&Value::Int(5)), None);
        assert_eq!(Expression::property("pop").is_null().evaluate(&Value::Int(5)), Some(true));
    }

    #[test]
    fn test_extent_of_bbox() {
        let f = geom().bbox(rect(0.0, 0.0, 10.0, 10.0));
        assert_eq!(f.spatial_extent(), SpatialExtent::Bounded(rect(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(f.spatial_extent().as_rect(), Some(rect(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(SpatialExtent::Unbounded.as_rect(), None);
    }

    #[test]
    fn test_extent_and_intersects() {
        let f = geom()
            .bbox(rect(0.0, 0.0, 10.0, 10.0))
            .and(geom().bbox(rect(5.0, 5.0, 20.0, 20.0)))
            .and(Expression::property("pop").gt(3));
        assert_eq!(f.spatial_extent(), SpatialExtent::Bounded(rect(5.0, 5.0, 10.0, 10.0)));
    }

    #[test]
    fn test_extent_disjoint_and_is_empty() {
        let f = geom()
            .bbox(rect(0.0, 0.0, 1.0, 1.0))
            .and(geom().bbox(rect(5.0, 5.0, 6.0, 6.0)));
        assert_eq!(f.spatial_extent(), SpatialExtent::Empty);
    }

    #[test]
    fn test_extent_or_unions() {
        let f = geom()
            .bbox(rect(0.0, 0.0, 1.0, 1.0))
            .or(geom().intersects(Geometry::Point(Point::new(5.0, 6.0))));
        assert_eq!(f.spatial_extent(), SpatialExtent::Bounded(rect(0.0, 0.0, 5.0, 6.0)));
    }

    #[test]
    fn test_extent_or_with_attribute_is_unbounded() {
        let f = geom()
            .bbox(rect(0.0, 0.0, 1.0, 1.0))
            .or(Expression::property("pop").gt(3));
        assert_eq!(f.spatial_extent(), SpatialExtent::Unbounded);
    }

    #[test]
    fn test_extent_ignores_negation_and_disjoint() {
        let f = geom().bbox(rect(0.0, 0.0, 1.0, 1.0)).negate();
        assert_eq!(f.spatial_extent(), SpatialExtent::Unbounded);
        let g = geom().disjoint(Geometry::Rect(rect(0.0, 0.0, 1.0, 1.0)));
        assert_eq!(g.spatial_extent(), SpatialExtent::Unbounded);
        assert_eq!(Filter::Exclude.spatial_extent(), SpatialExtent::Empty);
    }

    #[test]
    fn test_custom_visitor_counts_leaves() {
        struct LeafCounter(usize);

        impl FilterVisitor for LeafCounter {
            type Output = ();
            fn visit_include(&mut self) {}
            fn visit_exclude(&mut self) {}
            fn visit_compare(&mut self, _: &Expression, _: ComparisonOp, _: &Expression) {
                self.0 += 1;
            }
            fn visit_like(&mut self, _: &Expression, _: &str, _: bool) {
                self.0 += 1;
            }
            fn visit_in(&mut self, _: &Expression, _: &[Value], _: bool) {
                self.0 += 1;
            }
            fn visit_is_null(&mut self, _: &Expression, _: bool) {
                self.0 += 1;
            }
            fn visit_spatial(&mut self, _: SpatialOp, _: &Expression, _: &Expression) {
                self.0 += 1;
            }
            fn visit_not(&mut self, inner: &Filter) {
                inner.accept(self)
            }
            fn visit_and(&mut self, clauses: &[Filter]) {
                clauses.iter().for_each(|c| c.accept(self))
            }
            fn visit_or(&mut self, clauses: &[Filter]) {
                clauses.iter().for_each(|c| c.accept(self))
            }
        }

        let f = Expression::property("a")
            .gt(1)
            .and(Expression::property("b").like("x%").or(geom().bbox(rect(0.0, 0.0, 1.0, 1.0))))
            .negate();
        let mut counter = LeafCounter(0);
        f.accept(&mut counter);
        assert_eq!(counter.0, 3);
    }
}
