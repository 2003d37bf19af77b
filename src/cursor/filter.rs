//! Predicate filtering with read-ahead

use super::{ensure_open, Cursor, CursorResult, Mode};
use crate::feature::Record;
use crate::filter::Filter;

/// A test applied to each item by [`FilterCursor`]
pub trait Predicate<T> {
    fn test(&self, item: &T) -> bool;
}

/// Unknown (null) counts as a miss
impl<T: Record> Predicate<T> for Filter {
    fn test(&self, item: &T) -> bool {
        self.matches(item)
    }
}

/// Skips items the predicate rejects.
///
/// `has_next` advances the inner cursor until it finds a qualifying item and
/// holds it for the following `next`, so asking never loses an item.
pub struct FilterCursor<C: Cursor, P = Filter> {
    inner: C,
    predicate: P,
    lookahead: Option<C::Item>,
    closed: bool,
}

impl<C: Cursor, P: Predicate<C::Item>> FilterCursor<C, P> {
    pub fn new(inner: C, predicate: P) -> Self {
        Self {
            inner,
            predicate,
            lookahead: None,
            closed: false,
        }
    }

    pub fn predicate(&self) -> &P {
        &self.predicate
    }
}

impl<C: Cursor, P: Predicate<C::Item>> Cursor for FilterCursor<C, P> {
    type Item = C::Item;

    fn mode(&self) -> Mode {
        self.inner.mode()
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        ensure_open(self.closed)?;
        if self.lookahead.is_some() {
            return Ok(true);
        }
        while let Some(item) = self.inner.next()? {
            if self.predicate.test(&item) {
                self.lookahead = Some(item);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn next(&mut self) -> CursorResult<Option<C::Item>> {
        if !self.has_next()? {
            return Ok(None);
        }
        Ok(self.lookahead.take())
    }

    fn write(&mut self, item: C::Item) -> CursorResult<()> {
        ensure_open(self.closed)?;
        self.inner.write(item)
    }

    fn remove(&mut self, item: &C::Item) -> CursorResult<()> {
        ensure_open(self.closed)?;
        self.inner.remove(item)
    }

    fn close(&mut self) -> CursorResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.lookahead = None;
        self.inner.close()
    }
}
