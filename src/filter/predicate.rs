//! Boolean filters over features.

use std::fmt;

use super::expression::Expression;
use super::visitor::{Evaluator, ExtentExtractor, FilterVisitor, PropertyCollector, SpatialExtent};
use crate::feature::{Record, Value};
use crate::geom::Geometry;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "<>",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessThanOrEqual => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterThanOrEqual => ">=",
        }
    }

    /// Three-valued comparison. `None` when either side is null, and for an
    /// ordering between values that have no order, such as a string and a
    /// number.
    pub fn test(&self, left: &Value, right: &Value) -> Option<bool> {
        if left.is_null() || right.is_null() {
            return None;
        }
        let ord = match self {
            ComparisonOp::Equal => return left.loose_eq(right),
            ComparisonOp::NotEqual => return left.loose_eq(right).map(|b| !b),
            _ => left.compare(right)?,
        };
        Some(match self {
            ComparisonOp::Equal => ord.is_eq(),
            ComparisonOp::NotEqual => ord.is_ne(),
            ComparisonOp::LessThan => ord.is_lt(),
            ComparisonOp::LessThanOrEqual => ord.is_le(),
            ComparisonOp::GreaterThan => ord.is_gt(),
            ComparisonOp::GreaterThanOrEqual => ord.is_ge(),
        })
    }
}

/// Spatial relationship between two geometries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpatialOp {
    Intersects,
    Disjoint,
    Contains,
    Within,
    /// Intersects an axis-aligned rectangle
    BBox,
}

impl SpatialOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            SpatialOp::Intersects => "INTERSECTS",
            SpatialOp::Disjoint => "DISJOINT",
            SpatialOp::Contains => "CONTAINS",
            SpatialOp::Within => "WITHIN",
            SpatialOp::BBox => "BBOX",
        }
    }

    pub fn test(&self, left: &Value, right: &Value) -> Option<bool> {
        use geo::Relate;

        match (left, right) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Geometry(a), Value::Geometry(b)) => {
                let matrix = a.relate(b);
                Some(match self {
                    SpatialOp::Intersects | SpatialOp::BBox => matrix.is_intersects(),
                    SpatialOp::Disjoint => matrix.is_disjoint(),
                    SpatialOp::Contains => matrix.is_contains(),
                    SpatialOp::Within => matrix.is_within(),
                })
            }
            _ => Some(false),
        }
    }
}

/// A predicate over one input, evaluated with three-valued logic.
///
/// Like [`Expression`], equality is structural. The logical constructors
/// [`Filter::all`] and [`Filter::any`] flatten nested conjunctions and
/// disjunctions so equivalent trees compare equal regardless of how they were
/// assembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    /// Matches everything
    Include,
    /// Matches nothing
    Exclude,
    Compare {
        left: Expression,
        op: ComparisonOp,
        right: Expression,
    },
    /// SQL LIKE with `%` and `_` wildcards
    Like {
        expr: Expression,
        pattern: String,
        negated: bool,
    },
    In {
        expr: Expression,
        list: Vec<Value>,
        negated: bool,
    },
    IsNull {
        expr: Expression,
        negated: bool,
    },
    Spatial {
        op: SpatialOp,
        left: Expression,
        right: Expression,
    },
    Not(Box<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    /// Conjunction of `filters`, flattening nested `And`.
    ///
    /// An empty conjunction is [`Filter::Include`]; a single clause is returned
    /// unwrapped.
    pub fn all<I: IntoIterator<Item = Filter>>(filters: I) -> Filter {
        let mut clauses = Vec::new();
        for f in filters {
            match f {
                Filter::And(inner) => clauses.extend(inner),
                Filter::Include => {}
                other => clauses.push(other),
            }
        }
        match clauses.len() {
            0 => Filter::Include,
            1 => clauses.pop().unwrap_or(Filter::Include),
            _ => Filter::And(clauses),
        }
    }

    /// Disjunction of `filters`, flattening nested `Or`.
    ///
    /// An empty disjunction is [`Filter::Exclude`].
    pub fn any<I: IntoIterator<Item = Filter>>(filters: I) -> Filter {
        let mut clauses = Vec::new();
        for f in filters {
            match f {
                Filter::Or(inner) => clauses.extend(inner),
                Filter::Exclude => {}
                other => clauses.push(other),
            }
        }
        match clauses.len() {
            0 => Filter::Exclude,
            1 => clauses.pop().unwrap_or(Filter::Exclude),
            _ => Filter::Or(clauses),
        }
    }

    pub fn and(self, other: Filter) -> Filter {
        Filter::all([self, other])
    }

    pub fn or(self, other: Filter) -> Filter {
        Filter::any([self, other])
    }

    pub fn negate(self) -> Filter {
        match self {
            Filter::Include => Filter::Exclude,
            Filter::Exclude => Filter::Include,
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }

    pub fn is_include(&self) -> bool {
        matches!(self, Filter::Include)
    }

    pub fn is_exclude(&self) -> bool {
        matches!(self, Filter::Exclude)
    }

    /// Three-valued evaluation. `None` means unknown.
    pub fn evaluate<R: Record + ?Sized>(&self, input: &R) -> Option<bool> {
        self.accept(&mut Evaluator::new(input))
    }

    /// True only when the filter definitely holds. Unknown counts as a miss.
    pub fn matches<R: Record + ?Sized>(&self, input: &R) -> bool {
        self.evaluate(input) == Some(true)
    }

    /// Dispatches to the visitor method for this node
    pub fn accept<V: FilterVisitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            Filter::Include => visitor.visit_include(),
            Filter::Exclude => visitor.visit_exclude(),
            Filter::Compare { left, op, right } => visitor.visit_compare(left, *op, right),
            Filter::Like {
                expr,
                pattern,
                negated,
            } => visitor.visit_like(expr, pattern, *negated),
            Filter::In {
                expr,
                list,
                negated,
            } => visitor.visit_in(expr, list, *negated),
            Filter::IsNull { expr, negated } => visitor.visit_is_null(expr, *negated),
            Filter::Spatial { op, left, right } => visitor.visit_spatial(*op, left, right),
            Filter::Not(inner) => visitor.visit_not(inner),
            Filter::And(clauses) => visitor.visit_and(clauses),
            Filter::Or(clauses) => visitor.visit_or(clauses),
        }
    }

    /// Names of every property the filter reads, sorted
    pub fn properties(&self) -> Vec<String> {
        let mut collector = PropertyCollector::default();
        self.accept(&mut collector);
        collector.into_names()
    }

    /// The spatial extent a matching feature's geometry must touch
    pub fn spatial_extent(&self) -> SpatialExtent {
        self.accept(&mut ExtentExtractor)
    }
}

/// Matches `value` against a LIKE pattern. `%` matches any run of
/// characters, `_` exactly one.
pub fn like_match(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    like_match_chars(&value, &pattern)
}

/// Greedy wildcard scan. On a mismatch only the most recent `%` is widened,
/// so the cost stays linear in `value.len() * pattern.len()` at worst.
fn like_match_chars(value: &[char], pattern: &[char]) -> bool {
    let (mut v, mut p) = (0, 0);
    // Pattern position after the last `%`, and the value position it absorbed up to
    let mut star: Option<(usize, usize)> = None;

    while v < value.len() {
        match pattern.get(p) {
            Some('%') => {
                p += 1;
                star = Some((p, v));
            }
            Some('_') => {
                p += 1;
                v += 1;
            }
            Some(c) if *c == value[v] => {
                p += 1;
                v += 1;
            }
            _ => match star {
                Some((after, absorbed)) => {
                    p = after;
                    v = absorbed + 1;
                    star = Some((after, absorbed + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

fn write_clause(f: &mut fmt::Formatter<'_>, clause: &Filter) -> fmt::Result {
    match clause {
        Filter::And(_) | Filter::Or(_) => write!(f, "({})", clause),
        other => write!(f, "{}", other),
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, clauses: &[Filter], joiner: &str) -> fmt::Result {
    for (i, c) in clauses.iter().enumerate() {
        if i > 0 {
            f.write_str(joiner)?;
        }
        write_clause(f, c)?;
    }
    Ok(())
}

/// Renders CQL text that compiles back to an equal filter
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Include => f.write_str("INCLUDE"),
            Filter::Exclude => f.write_str("EXCLUDE"),
            Filter::Compare { left, op, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Filter::Like {
                expr,
                pattern,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}LIKE {}", expr, not, Value::from(pattern.as_str()))
            }
            Filter::In {
                expr,
                list,
                negated,
            } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{} {}IN (", expr, not)?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str(")")
            }
            Filter::IsNull { expr, negated } => {
                if *negated {
                    write!(f, "{} IS NOT NULL", expr)
                } else {
                    write!(f, "{} IS NULL", expr)
                }
            }
            Filter::Spatial {
                op: SpatialOp::BBox,
                left,
                right: Expression::Literal(Value::Geometry(Geometry::Rect(r))),
            } => write!(
                f,
                "BBOX({}, {:?}, {:?}, {:?}, {:?})",
                left,
                r.min().x,
                r.min().y,
                r.max().x,
                r.max().y
            ),
            Filter::Spatial { op, left, right } => {
                write!(f, "{}({}, {})", op.keyword(), left, right)
            }
            Filter::Not(inner) => write!(f, "NOT ({})", inner),
            Filter::And(clauses) if clauses.is_empty() => f.write_str("INCLUDE"),
            Filter::Or(clauses) if clauses.is_empty() => f.write_str("EXCLUDE"),
            Filter::And(clauses) => write_joined(f, clauses, " AND "),
            Filter::Or(clauses) => write_joined(f, clauses, " OR "),
        }
    }
}
