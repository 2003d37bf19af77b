//! Lazy cursors and the decorator library
//!
//! A [`Cursor`] is a single-consumer, forward-only sequence with an explicit
//! [`Cursor::close`]. Decorators wrap exactly one inner cursor, preserve its
//! relative order and close it exactly once, however often they are closed
//! themselves.
//!
//! # Release
//!
//! Close must run whether iteration finished, failed or was abandoned. Two
//! helpers make that automatic:
//!
//! - [`CursorIter`] closes on exhaustion, on the first error and on drop
//! - [`scoped`] closes after a closure returns, errors or panics
//!
//! # Mutation
//!
//! `write` is legal in [`Mode::Update`] and [`Mode::Append`]; `remove` only in
//! [`Mode::Update`]. Filter, offset, limit and bounds decorators forward
//! mutations to the cursor they wrap. Decorators that rewrite or reorder
//! elements reject them.

mod bounds;
mod errors;
mod filter;
mod limit;
mod mem;
mod offset;
mod reproject;
mod simplify;
mod sort;

pub use bounds::{Bounds, BoundsCursor};
pub use errors::{CursorError, CursorResult};
pub use filter::{FilterCursor, Predicate};
pub use limit::LimitCursor;
pub use mem::MemCursor;
pub use offset::OffsetCursor;
pub use reproject::ReprojectCursor;
pub use simplify::{simplify_geometry, SimplifyCursor};
pub use sort::{compare_values, sort_features, SortCursor, SortDirection, SortSpec};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::feature::Feature;
use crate::filter::Filter;
use crate::geom::Rect;
use crate::proj::{Crs, Reprojector};

/// What a consumer may do with the items a cursor yields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Read,
    Update,
    Append,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Read => "Read",
            Mode::Update => "Update",
            Mode::Append => "Append",
        }
    }

    pub fn allows_write(&self) -> bool {
        matches!(self, Mode::Update | Mode::Append)
    }

    pub fn allows_remove(&self) -> bool {
        matches!(self, Mode::Update)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lazy, forward-only sequence with explicit release
pub trait Cursor {
    type Item;

    fn mode(&self) -> Mode;

    /// Whether another item is available. May pull from the source, but never
    /// loses an item: the next call to [`Cursor::next`] returns it.
    fn has_next(&mut self) -> CursorResult<bool>;

    /// The next item, or `None` at the end
    fn next(&mut self) -> CursorResult<Option<Self::Item>>;

    /// Writes an item back (modified in `Update` mode, new in `Append` mode)
    fn write(&mut self, _item: Self::Item) -> CursorResult<()> {
        Err(CursorError::unsupported("write", self.mode()))
    }

    /// Removes a previously yielded item
    fn remove(&mut self, _item: &Self::Item) -> CursorResult<()> {
        Err(CursorError::unsupported("remove", self.mode()))
    }

    /// Releases the cursor and everything it wraps. Idempotent.
    fn close(&mut self) -> CursorResult<()>;
}

/// Type-erased cursor
pub type BoxCursor<T> = Box<dyn Cursor<Item = T>>;

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    type Item = C::Item;

    fn mode(&self) -> Mode {
        (**self).mode()
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        (**self).has_next()
    }

    fn next(&mut self) -> CursorResult<Option<Self::Item>> {
        (**self).next()
    }

    fn write(&mut self, item: Self::Item) -> CursorResult<()> {
        (**self).write(item)
    }

    fn remove(&mut self, item: &Self::Item) -> CursorResult<()> {
        (**self).remove(item)
    }

    fn close(&mut self) -> CursorResult<()> {
        (**self).close()
    }
}

pub(crate) fn ensure_open(closed: bool) -> CursorResult<()> {
    if closed {
        Err(CursorError::Closed)
    } else {
        Ok(())
    }
}

/// Iterator over a cursor's items that guarantees release.
///
/// The cursor is closed when it is exhausted, after the first error, or when
/// the iterator is dropped early.
pub struct CursorIter<C: Cursor> {
    cursor: C,
    done: bool,
}

impl<C: Cursor> CursorIter<C> {
    pub fn new(cursor: C) -> Self {
        Self { cursor, done: false }
    }

    fn finish(&mut self) -> CursorResult<()> {
        self.done = true;
        self.cursor.close()
    }
}

impl<C: Cursor> Iterator for CursorIter<C> {
    type Item = CursorResult<C::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.next() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => self.finish().err().map(Err),
            Err(e) => {
                let _ = self.finish();
                Some(Err(e))
            }
        }
    }
}

impl<C: Cursor> Drop for CursorIter<C> {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.finish();
        }
    }
}

/// Drains a cursor into a vector, closing it either way
pub fn collect<C: Cursor>(cursor: C) -> CursorResult<Vec<C::Item>> {
    CursorIter::new(cursor).collect()
}

struct CloseOnDrop<C: Cursor> {
    cursor: C,
    armed: bool,
}

impl<C: Cursor> Drop for CloseOnDrop<C> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.cursor.close();
        }
    }
}

/// Runs `f` against `cursor` and closes the cursor afterwards, also when `f`
/// fails or panics. An error from `f` takes precedence over one from close.
pub fn scoped<C, R, F>(cursor: C, f: F) -> CursorResult<R>
where
    C: Cursor,
    F: FnOnce(&mut C) -> CursorResult<R>,
{
    let mut guard = CloseOnDrop { cursor, armed: true };
    let result = f(&mut guard.cursor);
    guard.armed = false;
    let closed = guard.cursor.close();
    let value = result?;
    closed?;
    Ok(value)
}

/// Constructors for the cursor library
pub struct Cursors;

impl Cursors {
    /// In-memory read cursor over `items`
    pub fn from_vec<T>(items: Vec<T>) -> MemCursor<T> {
        MemCursor::new(items)
    }

    pub fn filter<C>(cursor: C, filter: Filter) -> FilterCursor<C>
    where
        C: Cursor,
        Filter: Predicate<C::Item>,
    {
        FilterCursor::new(cursor, filter)
    }

    pub fn offset<C: Cursor>(cursor: C, offset: usize) -> OffsetCursor<C> {
        OffsetCursor::new(cursor, offset)
    }

    pub fn limit<C: Cursor>(cursor: C, limit: usize) -> LimitCursor<C> {
        LimitCursor::new(cursor, limit)
    }

    pub fn reproject<C>(cursor: C, reprojector: Arc<dyn Reprojector>, target: Crs) -> ReprojectCursor<C>
    where
        C: Cursor<Item = Feature>,
    {
        ReprojectCursor::new(cursor, reprojector, target)
    }

    pub fn simplify<C>(cursor: C, tolerance: f64) -> SimplifyCursor<C>
    where
        C: Cursor<Item = Feature>,
    {
        SimplifyCursor::new(cursor, tolerance)
    }

    pub fn bounds<C>(cursor: C, bounds: Rect<f64>) -> BoundsCursor<C>
    where
        C: Cursor<Item = Feature>,
    {
        FilterCursor::new(cursor, Bounds::new(bounds))
    }

    pub fn sort<C>(cursor: C, specs: Vec<SortSpec>) -> SortCursor<C>
    where
        C: Cursor<Item = Feature>,
    {
        SortCursor::new(cursor, specs)
    }
}
