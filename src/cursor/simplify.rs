//! Topology-preserving simplification

use std::convert::Infallible;

use geo::SimplifyVwPreserve;

use super::{ensure_open, Cursor, CursorError, CursorResult, Mode};
use crate::feature::Feature;
use crate::geom::Geometry;

/// Simplifies lines and polygons with Visvalingam-Whyatt, keeping rings
/// valid. `tolerance` is an area threshold in squared CRS units. Points and
/// other geometry kinds come back unchanged.
pub fn simplify_geometry(geometry: &Geometry<f64>, tolerance: f64) -> Geometry<f64> {
    match geometry {
        Geometry::LineString(g) => Geometry::LineString(g.simplify_vw_preserve(&tolerance)),
        Geometry::MultiLineString(g) => Geometry::MultiLineString(g.simplify_vw_preserve(&tolerance)),
        Geometry::Polygon(g) => Geometry::Polygon(g.simplify_vw_preserve(&tolerance)),
        Geometry::MultiPolygon(g) => Geometry::MultiPolygon(g.simplify_vw_preserve(&tolerance)),
        other => other.clone(),
    }
}

/// Replaces every geometry attribute with its simplified form
pub struct SimplifyCursor<C: Cursor<Item = Feature>> {
    inner: C,
    tolerance: f64,
    closed: bool,
}

impl<C: Cursor<Item = Feature>> SimplifyCursor<C> {
    pub fn new(inner: C, tolerance: f64) -> Self {
        Self {
            inner,
            tolerance,
            closed: false,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl<C: Cursor<Item = Feature>> Cursor for SimplifyCursor<C> {
    type Item = Feature;

    fn mode(&self) -> Mode {
        self.inner.mode()
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        ensure_open(self.closed)?;
        self.inner.has_next()
    }

    fn next(&mut self) -> CursorResult<Option<Feature>> {
        ensure_open(self.closed)?;
        let tolerance = self.tolerance;
        Ok(self.inner.next()?.map(|feature| {
            match feature.try_map_geometries(|g| Ok::<_, Infallible>(simplify_geometry(g, tolerance))) {
                Ok(f) => f,
                Err(never) => match never {},
            }
        }))
    }

    fn write(&mut self, _item: Feature) -> CursorResult<()> {
        Err(CursorError::unsupported("write through simplification", self.mode()))
    }

    fn remove(&mut self, _item: &Feature) -> CursorResult<()> {
        Err(CursorError::unsupported("remove through simplification", self.mode()))
    }

    fn close(&mut self) -> CursorResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner.close()
    }
}
