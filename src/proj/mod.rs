//! Coordinate reference systems and the reprojection collaborator.
//!
//! The query engine never does projection math itself. It asks a
//! [`Reprojector`] for a [`GeometryTransform`] once per cursor and applies it
//! to each geometry.

mod crs;
mod errors;
mod transform;

pub use crs::Crs;
pub use errors::{ProjError, ProjResult};
pub use transform::{GeometryTransform, IdentityTransform, Proj4Reprojector, Reprojector};
