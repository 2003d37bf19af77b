//! geocursor - A uniform query and cursor layer over geospatial data stores
//!
//! Backends hand back raw cursors; the query engine wraps them so that every
//! query option is honored exactly once, whether natively by the backend or
//! generically here.

pub mod config;
pub mod cursor;
pub mod data;
pub mod feature;
pub mod filter;
pub mod geom;
pub mod observability;
pub mod proj;
pub mod query;
