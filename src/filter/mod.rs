//! Filter and expression model
//!
//! Expressions compute a [`Value`](crate::feature::Value) from one input;
//! filters compute a three-valued boolean. Both are plain immutable trees with
//! structural equality, so a filter compiled from CQL text equals the same
//! filter assembled by hand:
//!
//! ```
//! use geocursor::filter::{compile, Expression};
//!
//! let compiled = compile("pop > 1000").unwrap();
//! assert_eq!(compiled, Expression::property("pop").gt(1000));
//! ```
//!
//! Backends that can evaluate a filter natively walk it with a
//! [`FilterVisitor`]; everything else evaluates it in-process with
//! [`Filter::evaluate`].

mod cql;
mod errors;
mod expression;
mod predicate;
mod visitor;

pub use cql::{compile, compile_expression, MAX_NESTING};
pub use errors::SyntaxError;
pub use expression::{ArithmeticOp, Expression, Function};
pub use predicate::{like_match, ComparisonOp, Filter, SpatialOp};
pub use visitor::{Evaluator, ExtentExtractor, FilterVisitor, PropertyCollector, SpatialExtent};
