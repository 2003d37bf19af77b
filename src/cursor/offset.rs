use super::{ensure_open, Cursor, CursorResult, Mode};

/// Discards the first `n` items, then passes the rest through
pub struct OffsetCursor<C: Cursor> {
    inner: C,
    remaining_skip: usize,
    closed: bool,
}

impl<C: Cursor> OffsetCursor<C> {
    pub fn new(inner: C, offset: usize) -> Self {
        Self {
            inner,
            remaining_skip: offset,
            closed: false,
        }
    }

    fn skip(&mut self) -> CursorResult<()> {
        while self.remaining_skip > 0 {
            if self.inner.next()?.is_none() {
                self.remaining_skip = 0;
                break;
            }
            self.remaining_skip -= 1;
        }
        Ok(())
    }
}

impl<C: Cursor> Cursor for OffsetCursor<C> {
    type Item = C::Item;

    fn mode(&self) -> Mode {
        self.inner.mode()
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        ensure_open(self.closed)?;
        self.skip()?;
        self.inner.has_next()
    }

    fn next(&mut self) -> CursorResult<Option<C::Item>> {
        ensure_open(self.closed)?;
        self.skip()?;
        self.inner.next()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{collect, Cursors};

    #[test]
    fn test_skips_prefix() {
        let c = Cursors::offset(Cursors::from_vec((1..=5).collect()), 2);
        assert_eq!(collect(c).unwrap(), vec![3, 4, 5]);
    }

    #[test]
    fn test_zero_is_pass_through() {
        let c = Cursors::offset(Cursors::from_vec(vec![1, 2]), 0);
        assert_eq!(collect(c).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_offset_past_end() {
        let mut c = Cursors::offset(Cursors::from_vec(vec![1, 2]), 5);
        assert!(!c.has_next().unwrap());
        assert_eq!(c.next().unwrap(), None);
    }
}
