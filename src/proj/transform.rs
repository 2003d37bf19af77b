//! Reprojection collaborator: resolves CRS pairs into geometry transforms.

use std::sync::Arc;

use geo::MapCoords;
use proj4rs::proj::Proj;

use super::crs::Crs;
use super::errors::{ProjError, ProjResult};
use crate::geom::{Coord, Geometry};

/// A resolved transform between two reference systems
pub trait GeometryTransform {
    fn source(&self) -> &Crs;

    fn target(&self) -> &Crs;

    fn transform(&self, geometry: &Geometry<f64>) -> ProjResult<Geometry<f64>>;
}

/// Resolves transforms. Called once per cursor per source CRS, never per
/// element.
pub trait Reprojector: Send + Sync {
    fn resolve(&self, source: &Crs, target: &Crs) -> ProjResult<Arc<dyn GeometryTransform>>;
}

/// Transform between a CRS and itself
#[derive(Debug, Clone)]
pub struct IdentityTransform {
    crs: Crs,
}

impl IdentityTransform {
    pub fn new(crs: Crs) -> Self {
        Self { crs }
    }
}

impl GeometryTransform for IdentityTransform {
    fn source(&self) -> &Crs {
        &self.crs
    }

    fn target(&self) -> &Crs {
        &self.crs
    }

    fn transform(&self, geometry: &Geometry<f64>) -> ProjResult<Geometry<f64>> {
        Ok(geometry.clone())
    }
}

/// Default reprojector backed by `proj4rs`
#[derive(Debug, Clone, Copy, Default)]
pub struct Proj4Reprojector;

impl Reprojector for Proj4Reprojector {
    fn resolve(&self, source: &Crs, target: &Crs) -> ProjResult<Arc<dyn GeometryTransform>> {
        if source == target {
            return Ok(Arc::new(IdentityTransform::new(source.clone())));
        }
        Ok(Arc::new(Proj4Transform::new(source, target)?))
    }
}

struct Proj4Transform {
    source: Crs,
    target: Crs,
    from: Proj,
    to: Proj,
    from_degrees: bool,
    to_degrees: bool,
}

impl Proj4Transform {
    fn new(source: &Crs, target: &Crs) -> ProjResult<Self> {
        Ok(Self {
            from: build(source)?,
            to: build(target)?,
            from_degrees: source.is_geographic(),
            to_degrees: target.is_geographic(),
            source: source.clone(),
            target: target.clone(),
        })
    }

    fn coord(&self, c: Coord<f64>) -> ProjResult<Coord<f64>> {
        let mut point = if self.from_degrees {
            (c.x.to_radians(), c.y.to_radians(), 0.0)
        } else {
            (c.x, c.y, 0.0)
        };

        proj4rs::transform::transform(&self.from, &self.to, &mut point).map_err(|e| {
            ProjError::Transform {
                from: self.source.to_string(),
                to: self.target.to_string(),
                reason: format!("{:?}", e),
            }
        })?;

        let (x, y) = if self.to_degrees {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjError::Transform {
                from: self.source.to_string(),
                to: self.target.to_string(),
                reason: format!("non-finite result for ({}, {})", c.x, c.y),
            });
        }
        Ok(Coord { x, y })
    }
}

impl GeometryTransform for Proj4Transform {
    fn source(&self) -> &Crs {
        &self.source
    }

    fn target(&self) -> &Crs {
        &self.target
    }

    fn transform(&self, geometry: &Geometry<f64>) -> ProjResult<Geometry<f64>> {
        geometry.try_map_coords(|c| self.coord(c))
    }
}

fn build(crs: &Crs) -> ProjResult<Proj> {
    let definition = crs
        .definition()
        .ok_or_else(|| ProjError::UnknownCrs(crs.to_string()))?;
    Proj::from_proj_string(definition).map_err(|e| ProjError::InvalidDefinition {
        crs: crs.to_string(),
        reason: format!("{:?}", e),
    })
}
