//! Value expressions: literals, property lookups, arithmetic and functions.

use std::fmt;

use geo::Area;

use super::predicate::{ComparisonOp, Filter, SpatialOp};
use crate::feature::{Record, Value};
use crate::geom::{Geometry, Rect};

/// Arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        }
    }

    fn apply(&self, left: &Value, right: &Value) -> Value {
        if let (Value::Int(a), Value::Int(b)) = (left, right) {
            let result = match self {
                ArithmeticOp::Add => a.checked_add(*b),
                ArithmeticOp::Subtract => a.checked_sub(*b),
                ArithmeticOp::Multiply => a.checked_mul(*b),
                ArithmeticOp::Divide => {
                    if *b != 0 && a % b == 0 {
                        a.checked_div(*b)
                    } else {
                        None
                    }
                }
            };
            if let Some(v) = result {
                return Value::Int(v);
            }
        }

        match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => {
                let v = match self {
                    ArithmeticOp::Add => a + b,
                    ArithmeticOp::Subtract => a - b,
                    ArithmeticOp::Multiply => a * b,
                    ArithmeticOp::Divide => a / b,
                };
                if v.is_finite() {
                    Value::Float(v)
                } else {
                    Value::Null
                }
            }
            _ => Value::Null,
        }
    }
}

/// Built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Abs,
    Upper,
    Lower,
    StrLen,
    Concat,
    Area,
}

impl Function {
    /// Looks a function up by its (case-insensitive) name
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "abs" => Some(Function::Abs),
            "upper" => Some(Function::Upper),
            "lower" => Some(Function::Lower),
            "strlen" => Some(Function::StrLen),
            "concat" => Some(Function::Concat),
            "area" => Some(Function::Area),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Abs => "abs",
            Function::Upper => "upper",
            Function::Lower => "lower",
            Function::StrLen => "strlen",
            Function::Concat => "concat",
            Function::Area => "area",
        }
    }

    /// Accepts an argument count
    pub fn accepts(&self, argc: usize) -> bool {
        match self {
            Function::Concat => argc >= 1,
            _ => argc == 1,
        }
    }

    fn call(&self, args: &[Value]) -> Value {
        match (self, args) {
            (Function::Abs, [Value::Int(i)]) => i.checked_abs().map(Value::Int).unwrap_or(Value::Null),
            (Function::Abs, [Value::Float(f)]) => Value::Float(f.abs()),
            (Function::Upper, [Value::String(s)]) => Value::String(s.to_uppercase()),
            (Function::Lower, [Value::String(s)]) => Value::String(s.to_lowercase()),
            (Function::StrLen, [Value::String(s)]) => Value::Int(s.chars().count() as i64),
            (Function::Area, [Value::Geometry(g)]) => Value::Float(g.unsigned_area()),
            (Function::Concat, parts) => {
                if parts.iter().any(Value::is_null) {
                    return Value::Null;
                }
                let mut out = String::new();
                for p in parts {
                    match p {
                        Value::String(s) => out.push_str(s),
                        other => out.push_str(&other.to_string()),
                    }
                }
                Value::String(out)
            }
            _ => Value::Null,
        }
    }
}

/// A side-effect-free function of one input to a value.
///
/// Equality and hashing are structural, so an expression compiled from text
/// equals one built by hand from the same parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    Literal(Value),
    Property(String),
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Function {
        function: Function,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn property(name: impl Into<String>) -> Self {
        Expression::Property(name.into())
    }

    pub fn arithmetic(op: ArithmeticOp, left: Expression, right: Expression) -> Self {
        Expression::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn function(function: Function, args: Vec<Expression>) -> Self {
        Expression::Function { function, args }
    }

    /// Evaluates against an input. Absent attributes and type mismatches
    /// produce [`Value::Null`], never an error.
    pub fn evaluate<R: Record + ?Sized>(&self, input: &R) -> Value {
        match self {
            Expression::Literal(v) => v.clone(),
            Expression::Property(name) => input.get(name).cloned().unwrap_or(Value::Null),
            Expression::Arithmetic { op, left, right } => {
                let l = left.evaluate(input);
                let r = right.evaluate(input);
                op.apply(&l, &r)
            }
            Expression::Function { function, args } => {
                let values: Vec<Value> = args.iter().map(|a| a.evaluate(input)).collect();
                function.call(&values)
            }
        }
    }

    /// Visits every property name referenced, depth first
    pub fn for_each_property(&self, f: &mut impl FnMut(&str)) {
        match self {
            Expression::Literal(_) => {}
            Expression::Property(name) => f(name),
            Expression::Arithmetic { left, right, .. } => {
                left.for_each_property(f);
                right.for_each_property(f);
            }
            Expression::Function { args, .. } => {
                for a in args {
                    a.for_each_property(f);
                }
            }
        }
    }

    pub fn compare(self, op: ComparisonOp, right: Expression) -> Filter {
        Filter::Compare {
            left: self,
            op,
            right,
        }
    }

    pub fn eq(self, value: impl Into<Value>) -> Filter {
        self.compare(ComparisonOp::Equal, Expression::literal(value))
    }

    pub fn ne(self, value: impl Into<Value>) -> Filter {
        self.compare(ComparisonOp::NotEqual, Expression::literal(value))
    }

    pub fn lt(self, value: impl Into<Value>) -> Filter {
        self.compare(ComparisonOp::LessThan, Expression::literal(value))
    }

    pub fn le(self, value: impl Into<Value>) -> Filter {
        self.compare(ComparisonOp::LessThanOrEqual, Expression::literal(value))
    }

    pub fn gt(self, value: impl Into<Value>) -> Filter {
        self.compare(ComparisonOp::GreaterThan, Expression::literal(value))
    }

    pub fn ge(self, value: impl Into<Value>) -> Filter {
        self.compare(ComparisonOp::GreaterThanOrEqual, Expression::literal(value))
    }

    pub fn like(self, pattern: impl Into<String>) -> Filter {
        Filter::Like {
            expr: self,
            pattern: pattern.into(),
            negated: false,
        }
    }

    pub fn in_list<I, V>(self, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In {
            expr: self,
            list: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn is_null(self) -> Filter {
        Filter::IsNull {
            expr: self,
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Filter {
        Filter::IsNull {
            expr: self,
            negated: true,
        }
    }

    pub fn spatial(self, op: SpatialOp, geometry: Geometry<f64>) -> Filter {
        Filter::Spatial {
            op,
            left: self,
            right: Expression::literal(geometry),
        }
    }

    pub fn intersects(self, geometry: Geometry<f64>) -> Filter {
        self.spatial(SpatialOp::Intersects, geometry)
    }

    pub fn within(self, geometry: Geometry<f64>) -> Filter {
        self.spatial(SpatialOp::Within, geometry)
    }

    pub fn contains(self, geometry: Geometry<f64>) -> Filter {
        self.spatial(SpatialOp::Contains, geometry)
    }

    pub fn disjoint(self, geometry: Geometry<f64>) -> Filter {
        self.spatial(SpatialOp::Disjoint, geometry)
    }

    pub fn bbox(self, bounds: Rect<f64>) -> Filter {
        self.spatial(SpatialOp::BBox, Geometry::Rect(bounds))
    }
}

/// Renders CQL text accepted back by the compiler
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::Property(name) => {
                if super::cql::is_plain_identifier(name) {
                    f.write_str(name)
                } else {
                    write!(f, "\"{}\"", name.replace('"', "\"\""))
                }
            }
            Expression::Arithmetic { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Function { function, args } => {
                write!(f, "{}(", function.name())?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<Value> for Expression {
    fn from(v: Value) -> Self {
        Expression::Literal(v)
    }
}
