//! Query descriptors and the pushdown protocol
//!
//! A [`Query`] says what a caller wants: a projection list, optional bounds,
//! a cursor mode, an optional transaction and a bag of typed options. The
//! [`QueryEngine`] turns a query and a raw backend cursor into the final
//! result cursor.
//!
//! # Honoring options exactly once
//!
//! [`Query::consume`] removes an option as it returns it. A backend that
//! honors an option natively consumes it before calling
//! [`QueryEngine::apply`]; the engine then finds it gone and does not apply
//! it again.
//!
//! ```
//! use geocursor::cursor::{collect, Cursors};
//! use geocursor::feature::{Feature, FieldType, Schema, Value};
//! use geocursor::query::{Query, QueryEngine, LIMIT};
//! use std::sync::Arc;
//!
//! let schema = Arc::new(Schema::new("t").field("pop", FieldType::Int));
//! let rows: Vec<Feature> = (0..5)
//!     .map(|i| Feature::from_values(format!("{}", i), schema.clone(), vec![Value::Int(i * 1000)]))
//!     .collect();
//!
//! let mut query = Query::cql("pop > 1000").unwrap().with_limit(2);
//! let cursor = QueryEngine::new().apply(&mut query, Cursors::from_vec(rows));
//! assert_eq!(collect(cursor).unwrap().len(), 2);
//! assert_eq!(query.get(&LIMIT), None);
//! ```

mod apply;
mod descriptor;
mod errors;
mod explain;
mod key;
mod options;

pub use apply::QueryEngine;
pub use descriptor::{Query, FILTER, LIMIT, OFFSET, REPROJECT, SIMPLIFY, SORT};
pub use errors::QueryError;
pub use explain::{ApplyPlan, ApplyStep, IgnoredOption, PlannedStep};
pub use key::Key;
pub use options::{OptionBag, OptionValue};

pub use crate::cursor::{SortDirection, SortSpec};
