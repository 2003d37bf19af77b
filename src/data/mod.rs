//! Backend contract and the in-memory backend
//!
//! A backend turns a [`Query`] into a raw cursor. Before returning it may
//! consume any option it honors natively; everything it leaves behind is
//! applied by the [`QueryEngine`]. Bounds are not an option: a backend reads
//! [`Query::bounds`] and restricts its own scan.

mod errors;
mod mem;

pub use errors::{DataError, DataResult};
pub use mem::{MemDataset, MemWorkspace};

use std::fmt;
use std::io;
use std::sync::Arc;

use crate::cursor::{collect, BoxCursor};
use crate::feature::{Feature, Schema};
use crate::geom::Rect;
use crate::proj::Crs;
use crate::query::{Query, QueryEngine};

/// Caller-owned transaction handle.
///
/// The query layer only carries it from the [`Query`] to the backend; it
/// never commits or rolls back on its own.
pub trait Transaction: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    fn commit(&self) -> io::Result<()>;

    fn rollback(&self) -> io::Result<()>;
}

/// A layer of features sharing one schema
pub trait VectorDataset: Send + Sync {
    fn name(&self) -> &str;

    fn schema(&self) -> Arc<Schema>;

    fn crs(&self) -> Option<Crs> {
        self.schema().crs().cloned()
    }

    /// Envelope of every feature, `None` when the layer has no geometries
    fn bounds(&self) -> DataResult<Option<Rect<f64>>>;

    /// Raw cursor for `query`, after consuming the options honored natively
    fn cursor(&self, query: &mut Query) -> DataResult<BoxCursor<Feature>>;

    /// Result cursor: the backend's raw cursor with the remaining options
    /// applied by `engine`
    fn features(&self, mut query: Query, engine: &QueryEngine) -> DataResult<BoxCursor<Feature>> {
        let raw = self.cursor(&mut query)?;
        Ok(engine.apply(&mut query, raw))
    }

    /// Number of features `query` returns
    fn count(&self, query: &Query) -> DataResult<usize> {
        let cursor = self.features(query.clone(), &QueryEngine::new())?;
        Ok(collect(cursor)?.len())
    }
}

/// A named collection of layers
pub trait Workspace {
    /// Layer names in creation order
    fn layers(&self) -> Vec<String>;

    fn get(&self, layer: &str) -> DataResult<Arc<dyn VectorDataset>>;

    /// Creates an empty layer named after the schema
    fn create(&self, schema: Schema) -> DataResult<Arc<dyn VectorDataset>>;

    /// Drops every layer
    fn dispose(&self);
}
