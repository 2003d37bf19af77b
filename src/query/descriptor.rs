//! The query descriptor

use std::fmt;
use std::sync::Arc;

use super::errors::QueryError;
use super::key::Key;
use super::options::{OptionBag, OptionValue};
use crate::cursor::{Mode, SortSpec};
use crate::data::Transaction;
use crate::filter::{self, Filter, SyntaxError};
use crate::geom::Rect;
use crate::proj::Crs;

/// Predicate every result must satisfy
pub const FILTER: Key<Filter> = Key::new("FILTER");
/// Number of filtered results to skip
pub const OFFSET: Key<usize> = Key::new("OFFSET");
/// Maximum number of results
pub const LIMIT: Key<usize> = Key::new("LIMIT");
/// Result ordering
pub const SORT: Key<Vec<SortSpec>> = Key::new("SORT");
/// Target reference system for geometries
pub const REPROJECT: Key<Crs> = Key::new("REPROJECT");
/// Simplification tolerance, in squared CRS units
pub const SIMPLIFY: Key<f64> = Key::new("SIMPLIFY");

/// Declarative description of what a caller wants from a dataset.
///
/// Projection, bounds, transaction and mode are first-class; everything else
/// lives in the option bag, where the pushdown protocol consumes it.
#[derive(Clone, Default)]
pub struct Query {
    fields: Vec<String>,
    bounds: Option<Rect<f64>>,
    transaction: Option<Arc<dyn Transaction>>,
    mode: Mode,
    options: OptionBag,
}

impl Query {
    /// An unconstrained read query
    pub fn new() -> Self {
        Self::default()
    }

    /// Query with a filter compiled from CQL text.
    ///
    /// Malformed text fails here, before any query exists.
    pub fn cql(text: &str) -> Result<Self, SyntaxError> {
        Self::new().with_cql(text)
    }

    // ===== Builders =====

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_bounds(mut self, bounds: Rect<f64>) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.set(&FILTER, filter);
        self
    }

    pub fn with_cql(self, text: &str) -> Result<Self, SyntaxError> {
        Ok(self.with_filter(filter::compile(text)?))
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.set(&OFFSET, offset);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.set(&LIMIT, limit);
        self
    }

    /// Sort by a comma-separated list of properties; a leading `-` sorts
    /// that property descending (`"name,-pop"`).
    pub fn with_sort(self, spec: &str) -> Self {
        let specs = spec
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(SortSpec::parse)
            .collect();
        self.with_sort_specs(specs)
    }

    pub fn with_sort_specs(mut self, specs: Vec<SortSpec>) -> Self {
        self.set(&SORT, specs);
        self
    }

    pub fn with_reprojection(mut self, target: Crs) -> Self {
        self.set(&REPROJECT, target);
        self
    }

    /// Reproject to a CRS given as `EPSG:<code>` or a proj string
    pub fn with_reprojection_to(self, srs: &str) -> Result<Self, QueryError> {
        Ok(self.with_reprojection(Crs::parse(srs)?))
    }

    pub fn with_simplify(mut self, tolerance: f64) -> Self {
        self.set(&SIMPLIFY, tolerance);
        self
    }

    pub fn with_transaction(mut self, transaction: Arc<dyn Transaction>) -> Self {
        self.transaction = Some(transaction);
        self
    }

    /// Stores an arbitrary option, including backend-specific ones
    pub fn with_option<T: OptionValue>(mut self, key: &Key<T>, value: T) -> Self {
        self.set(key, value);
        self
    }

    /// Switches to update mode
    pub fn update(mut self) -> Self {
        self.mode = Mode::Update;
        self
    }

    /// Switches to append mode
    pub fn append(mut self) -> Self {
        self.mode = Mode::Append;
        self
    }

    // ===== Accessors =====

    /// Projection list; empty means all attributes
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }

    pub fn transaction(&self) -> Option<&Arc<dyn Transaction>> {
        self.transaction.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn options(&self) -> &OptionBag {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut OptionBag {
        &mut self.options
    }

    /// True when nothing restricts which features come back: no bounds and
    /// no options. A projection list changes shape only, so it does not count.
    pub fn is_all(&self) -> bool {
        self.bounds.is_none() && self.options.is_empty()
    }

    // ===== Option bag =====

    pub fn set<T: OptionValue>(&mut self, key: &Key<T>, value: T) -> &mut Self {
        self.options.set(key, value);
        self
    }

    /// Reads an option without removing it.
    ///
    /// # Panics
    ///
    /// Panics if the stored value is not a `T`.
    pub fn get<T: OptionValue>(&self, key: &Key<T>) -> Option<&T> {
        self.options.get(key)
    }

    pub fn try_get<T: OptionValue>(&self, key: &Key<T>) -> Result<Option<&T>, QueryError> {
        self.options.try_get(key)
    }

    /// Removes an option and returns it, or `default` when absent. Consuming
    /// is how an option is marked as honored.
    ///
    /// # Panics
    ///
    /// Panics if the stored value is not a `T`.
    pub fn consume<T: OptionValue>(&mut self, key: &Key<T>, default: T) -> T {
        self.options.consume(key, default)
    }

    pub fn try_consume<T: OptionValue>(&mut self, key: &Key<T>, default: T) -> Result<T, QueryError> {
        self.options.try_consume(key, default)
    }

    /// Removes an option, if present.
    ///
    /// # Panics
    ///
    /// Panics if the stored value is not a `T`.
    pub fn take<T: OptionValue>(&mut self, key: &Key<T>) -> Option<T> {
        self.options.take(key)
    }

    pub fn try_take<T: OptionValue>(&mut self, key: &Key<T>) -> Result<Option<T>, QueryError> {
        self.options.try_take(key)
    }
}

/// Transactions are compared by identity
impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        let same_tx = match (&self.transaction, &other.transaction) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        same_tx
            && self.fields == other.fields
            && self.bounds == other.bounds
            && self.mode == other.mode
            && self.options == other.options
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("fields", &self.fields)
            .field("bounds", &self.bounds)
            .field("transaction", &self.transaction.as_ref().map(|t| t.id()))
            .field("mode", &self.mode)
            .field("options", &self.options)
            .finish()
    }
}
