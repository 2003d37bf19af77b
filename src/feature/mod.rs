//! Feature model: values, schemas and records.

mod feature;
mod schema;
mod value;

pub use feature::{retype, Feature, Record};
pub use schema::{Field, FieldType, Schema};
pub use value::Value;
