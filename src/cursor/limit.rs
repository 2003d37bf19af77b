use super::{ensure_open, Cursor, CursorResult, Mode};

/// Yields at most `n` items, then reports exhaustion
pub struct LimitCursor<C: Cursor> {
    inner: C,
    remaining: usize,
    closed: bool,
}

impl<C: Cursor> LimitCursor<C> {
    pub fn new(inner: C, limit: usize) -> Self {
        Self {
            inner,
            remaining: limit,
            closed: false,
        }
    }
}

impl<C: Cursor> Cursor for LimitCursor<C> {
    type Item = C::Item;

    fn mode(&self) -> Mode {
        self.inner.mode()
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        ensure_open(self.closed)?;
        if self.remaining == 0 {
            return Ok(false);
        }
        self.inner.has_next()
    }

    fn next(&mut self) -> CursorResult<Option<C::Item>> {
        ensure_open(self.closed)?;
        if self.remaining == 0 {
            return Ok(None);
        }
        let item = self.inner.next()?;
        if item.is_some() {
            self.remaining -= 1;
        }
        Ok(item)
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
        self.inner.close()
    }
}
