//! Bounds enforcement for backends that cannot restrict a scan spatially

use super::filter::{FilterCursor, Predicate};
use crate::feature::Feature;
use crate::geom::{self, Rect};

/// Keeps features whose default geometry's envelope intersects a rectangle.
/// Features without a geometry are dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    rect: Rect<f64>,
}

impl Bounds {
    pub fn new(rect: Rect<f64>) -> Self {
        Self { rect }
    }

    pub fn rect(&self) -> Rect<f64> {
        self.rect
    }
}

impl Predicate<Feature> for Bounds {
    fn test(&self, feature: &Feature) -> bool {
        feature
            .geometry()
            .and_then(geom::envelope)
            .map(|env| geom::envelopes_intersect(&env, &self.rect))
            .unwrap_or(false)
    }
}

/// Bounds-restricted cursor
pub type BoundsCursor<C> = FilterCursor<C, Bounds>;
