use std::collections::VecDeque;

use super::{ensure_open, Cursor, CursorResult, Mode};

/// Read cursor over items already in memory
#[derive(Debug)]
pub struct MemCursor<T> {
    items: VecDeque<T>,
    closed: bool,
}

impl<T> MemCursor<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
            closed: false,
        }
    }

    /// Items not yet yielded
    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl<T> Cursor for MemCursor<T> {
    type Item = T;

    fn mode(&self) -> Mode {
        Mode::Read
    }

    fn has_next(&mut self) -> CursorResult<bool> {
        ensure_open(self.closed)?;
        Ok(!self.items.is_empty())
    }

    fn next(&mut self) -> CursorResult<Option<T>> {
        ensure_open(self.closed)?;
        Ok(self.items.pop_front())
    }

    fn close(&mut self) -> CursorResult<()> {
        self.closed = true;
        self.items.clear();
        Ok(())
    }
}
