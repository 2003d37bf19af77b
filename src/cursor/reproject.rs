//! Reprojection of feature geometries

use std::sync::Arc;

use super::{ensure_open, Cursor, CursorError, CursorResult, Mode};
use crate::feature::{Feature, Schema};
use crate::proj::{Crs, GeometryTransform, Reprojector};

struct Resolved {
    source_schema: Arc<Schema>,
    output_schema: Arc<Schema>,
    transform: Arc<dyn GeometryTransform>,
}

/// Rewrites every geometry attribute from the feature schema's CRS to
/// `target`. Non-geometry attributes pass through untouched.
///
/// The transform is resolved on the first feature and reused while the
/// incoming schema stays the same, so a bad CRS pair surfaces as an error from
/// the first `next`, not from construction.
pub struct ReprojectCursor<C: Cursor<Item = Feature>> {
    inner: C,
    reprojector: Arc<dyn Reprojector>,
    target: Crs,
    resolved: Option<Resolved>,
    closed: bool,
}

impl<C: Cursor<Item = Feature>> ReprojectCursor<C> {
    pub fn new(inner: C, reprojector: Arc<dyn Reprojector>, target: Crs) -> Self {
        Self {
            inner,
            reprojector,
            target,
            resolved: None,
            closed: false,
        }
    }

    pub fn target(&self) -> &Crs {
        &self.target
    }

    fn resolve(&mut self, feature: &Feature) -> CursorResult<&Resolved> {
        let schema = feature.schema();
        let stale = match &self.resolved {
            Some(r) => !Arc::ptr_eq(&r.source_schema, schema) && *r.source_schema != **schema,
            None => true,
        };
        if stale {
            let source = schema
                .crs()
                .ok_or_else(|| CursorError::MissingCrs(feature.id().to_string()))?;
            let transform = self.reprojector.resolve(source, &self.target)?;
            self.resolved = Some(Resolved {
                source_schema: schema.clone(),
                output_schema: Arc::new(schema.with_crs(&self.target)),
                transform,
            });
        }
        self.resolved.as_ref().ok_or(CursorError::Closed)
    }

    fn reproject(&mut self, feature: Feature) -> CursorResult<Feature> {
        if feature.schema().default_geometry().is_none() {
            return Ok(feature);
        }
        let resolved = self.resolve(&feature)?;
        let transform = resolved.transform.clone();
        let output_schema = resolved.output_schema.clone();
        let feature = feature.try_map_geometries(|g| transform.transform(g))?;
        Ok(feature.with_schema(output_schema))
    }
}

impl<C: Cursor<Item = Feature>> Cursor for ReprojectCursor<C> {
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
        match self.inner.next()? {
            Some(feature) => self.reproject(feature).map(Some),
            None => Ok(None),
        }
    }

    fn write(&mut self, _item: Feature) -> CursorResult<()> {
        Err(CursorError::unsupported("write through reprojection", self.mode()))
    }

    fn remove(&mut self, _item: &Feature) -> CursorResult<()> {
        Err(CursorError::unsupported("remove through reprojection", self.mode()))
    }

    fn close(&mut self) -> CursorResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.resolved = None;
        self.inner.close()
    }
}
