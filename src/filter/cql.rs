//! CQL text compiler.
//!
//! Grammar (keywords case-insensitive):
//!
//! ```text
//! filter     := or
//! or         := and { OR and }
//! and        := not { AND not }
//! not        := { NOT } primary
//! primary    := '(' filter ')' | INCLUDE | EXCLUDE
//!             | (INTERSECTS | DISJOINT | CONTAINS | WITHIN) '(' expr ',' expr ')'
//!             | BBOX '(' expr ',' num ',' num ',' num ',' num [',' string] ')'
//!             | predicate
//! predicate  := expr cmp expr
//!             | expr [NOT] LIKE string
//!             | expr [NOT] IN '(' literal { ',' literal } ')'
//!             | expr [NOT] BETWEEN expr AND expr
//!             | expr IS [NOT] NULL
//! expr       := term { ('+' | '-') term }
//! term       := unary { ('*' | '/') unary }
//! unary      := { '-' } atom
//! atom       := number | string | TRUE | FALSE | NULL | geometry
//!             | name '(' [expr { ',' expr }] ')' | name | '(' expr ')'
//! geometry   := POINT '(' x y ')' | LINESTRING '(' coords ')'
//!             | POLYGON '(' '(' coords ')' { ',' '(' coords ')' } ')'
//!             | ENVELOPE '(' num ',' num ',' num ',' num ')'
//! ```
//!
//! Text is tokenized first, then parsed from the token stream. `BETWEEN`
//! compiles to the conjunction of `>=` and `<=`. Nesting written with
//! parentheses is preserved in the compiled tree, so the `Display` output of
//! a filter compiles back to an equal filter.

use std::fmt;
use std::hash::Hash;
use std::ops::Range;

use chumsky::error::SimpleReason;
use chumsky::prelude::*;
use chumsky::Stream;

use super::errors::SyntaxError;
use super::expression::{ArithmeticOp, Expression, Function};
use super::predicate::{ComparisonOp, Filter, SpatialOp};
use crate::feature::Value;
use crate::geom::{rect, Coord, Geometry, LineString, Point, Polygon, Rect};

/// Deepest accepted nesting of groups, prefix operators and arithmetic chains
pub const MAX_NESTING: usize = 64;

type Span = Range<usize>;

/// Compiles CQL text into a [`Filter`]
pub fn compile(text: &str) -> Result<Filter, SyntaxError> {
    parse_text(text, filter_parser())
}

/// Compiles CQL text into a value [`Expression`]
pub fn compile_expression(text: &str) -> Result<Expression, SyntaxError> {
    parse_text(text, expression())
}

/// True if `name` can be written as a bare property name
pub(crate) fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && keyword(name).is_none()
}

fn parse_text<T>(
    text: &str,
    parser: impl Parser<Token, T, Error = Simple<Token>>,
) -> Result<T, SyntaxError> {
    let tokens = lexer().parse(text).map_err(|errors| first_error(text, errors))?;
    check_nesting(text, &tokens)?;

    let eoi = text.chars().count();
    parser
        .then_ignore(end())
        .parse(Stream::from_iter(eoi..eoi + 1, tokens.into_iter()))
        .map_err(|errors| first_error(text, errors))
}

// ============================================================================
// Tokens
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    // Keywords
    And,
    Or,
    Not,
    Like,
    In,
    Is,
    Null,
    Between,
    True,
    False,
    Include,
    Exclude,
    BBox,
    Intersects,
    Disjoint,
    Contains,
    Within,
    Point,
    LineString,
    Polygon,
    Envelope,

    // Names and literals
    Ident(String),
    Quoted(String),
    Str(String),
    Number(String),

    // Punctuation
    LParen,
    RParen,
    Comma,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
}

impl Token {
    /// Tokens that complete an operand, after which `-` is subtraction
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Ident(_)
                | Token::Quoted(_)
                | Token::Str(_)
                | Token::Number(_)
                | Token::True
                | Token::False
                | Token::Null
                | Token::RParen
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Ident(s) | Token::Number(s) => return f.write_str(s),
            Token::Quoted(s) => return write!(f, "\"{}\"", s),
            Token::Str(s) => return write!(f, "'{}'", s),
            Token::And => "AND",
            Token::Or => "OR",
            Token::Not => "NOT",
            Token::Like => "LIKE",
            Token::In => "IN",
            Token::Is => "IS",
            Token::Null => "NULL",
            Token::Between => "BETWEEN",
            Token::True => "TRUE",
            Token::False => "FALSE",
            Token::Include => "INCLUDE",
            Token::Exclude => "EXCLUDE",
            Token::BBox => "BBOX",
            Token::Intersects => "INTERSECTS",
            Token::Disjoint => "DISJOINT",
            Token::Contains => "CONTAINS",
            Token::Within => "WITHIN",
            Token::Point => "POINT",
            Token::LineString => "LINESTRING",
            Token::Polygon => "POLYGON",
            Token::Envelope => "ENVELOPE",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Eq => "=",
            Token::Ne => "<>",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
        };
        f.write_str(text)
    }
}

fn keyword(word: &str) -> Option<Token> {
    let token = match word.to_ascii_uppercase().as_str() {
        "AND" => Token::And,
        "OR" => Token::Or,
        "NOT" => Token::Not,
        "LIKE" => Token::Like,
        "IN" => Token::In,
        "IS" => Token::Is,
        "NULL" => Token::Null,
        "BETWEEN" => Token::Between,
        "TRUE" => Token::True,
        "FALSE" => Token::False,
        "INCLUDE" => Token::Include,
        "EXCLUDE" => Token::Exclude,
        "BBOX" => Token::BBox,
        "INTERSECTS" => Token::Intersects,
        "DISJOINT" => Token::Disjoint,
        "CONTAINS" => Token::Contains,
        "WITHIN" => Token::Within,
        "POINT" => Token::Point,
        "LINESTRING" => Token::LineString,
        "POLYGON" => Token::Polygon,
        "ENVELOPE" => Token::Envelope,
        _ => return None,
    };
    Some(token)
}

/// Splits CQL text into spanned tokens. A doubled quote inside a quoted run
/// stands for the quote itself.
fn lexer() -> impl Parser<char, Vec<(Token, Span)>, Error = Simple<char>> {
    let word = text::ident().map(|s: String| keyword(&s).unwrap_or(Token::Ident(s)));

    let digits = filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .at_least(1)
        .collect::<String>();
    let fraction = just('.').ignore_then(digits.clone()).map(|d| format!(".{}", d));
    let exponent = one_of("eE")
        .ignore_then(one_of("+-").or_not())
        .then(digits.clone())
        .map(|(sign, d): (Option<char>, String)| match sign {
            Some(sign) => format!("e{}{}", sign, d),
            None => format!("e{}", d),
        });
    let number = digits
        .then(fraction.or_not())
        .then(exponent.or_not())
        .map(|((int, fraction), exponent)| {
            Token::Number(format!(
                "{}{}{}",
                int,
                fraction.unwrap_or_default(),
                exponent.unwrap_or_default()
            ))
        });

    let quoted = |quote: char| {
        just(quote)
            .ignore_then(
                just(quote)
                    .then(just(quote))
                    .to(quote)
                    .or(none_of(quote))
                    .repeated()
                    .collect::<String>(),
            )
            .then_ignore(just(quote))
    };
    let string = quoted('\'').map(Token::Str);
    let name = quoted('"').map(Token::Quoted);

    // Two-character operators before their one-character prefixes
    let punctuation = choice((
        just("<=").to(Token::Le),
        just("<>").to(Token::Ne),
        just(">=").to(Token::Ge),
        just("!=").to(Token::Ne),
        just('<').to(Token::Lt),
        just('>').to(Token::Gt),
        just('=').to(Token::Eq),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just(',').to(Token::Comma),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
    ));

    choice((word, number, string, name, punctuation))
        .map_with_span(|token, span| (token, span))
        .padded()
        .repeated()
        .padded()
        .then_ignore(end())
}

/// Rejects token streams whose compiled tree would nest deeper than
/// [`MAX_NESTING`]. Parsing, evaluating and dropping a tree all recurse once
/// per level, so the bound is enforced before any tree exists.
fn check_nesting(text: &str, tokens: &[(Token, Span)]) -> Result<(), SyntaxError> {
    // Depth contributed by enclosing groups, the arithmetic chain at this
    // level, and the prefix operators waiting for an operand
    let mut base = 0;
    let mut chain = 0;
    let mut prefix = 0;
    let mut groups: Vec<(usize, usize)> = Vec::new();
    let mut after_operand = false;

    for (token, span) in tokens {
        match token {
            Token::Not => prefix += 1,
            Token::Minus if !after_operand => prefix += 1,
            Token::Plus | Token::Minus | Token::Star | Token::Slash => {
                chain += 1;
                prefix = 0;
            }
            Token::LParen => {
                groups.push((base, chain));
                base += chain + prefix + 1;
                chain = 0;
                prefix = 0;
            }
            Token::RParen => {
                (base, chain) = groups.pop().unwrap_or((0, 0));
                prefix = 0;
            }
            t if t.ends_operand() => prefix = 0,
            _ => {
                chain = 0;
                prefix = 0;
            }
        }
        after_operand = token.ends_operand();

        if base + chain + prefix > MAX_NESTING {
            return Err(SyntaxError::new(byte_offset(text, span.start), "nesting too deep"));
        }
    }
    Ok(())
}

// ============================================================================
// Expressions
// ============================================================================

fn expression() -> impl Parser<Token, Expression, Error = Simple<Token>> + Clone {
    recursive(|expr| {
        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let name_or_call = select! { Token::Ident(name) => name }
            .then(args.or_not())
            .try_map(|(name, args), span: Span| match args {
                None => Ok(Expression::Property(name)),
                Some(args) => call(name, args).map_err(|message| Simple::custom(span, message)),
            });

        let literal = choice((
            number().map(Expression::Literal),
            select! {
                Token::Str(s) => Expression::literal(s),
                Token::Quoted(name) => Expression::Property(name),
                Token::True => Expression::literal(true),
                Token::False => Expression::literal(false),
                Token::Null => Expression::Literal(Value::Null),
            },
            geometry().map(|g| Expression::Literal(Value::Geometry(g))),
        ));

        let atom = choice((
            literal,
            name_or_call,
            expr.delimited_by(just(Token::LParen), just(Token::RParen)),
        ))
        .labelled("expression");

        let unary = just(Token::Minus)
            .repeated()
            .then(atom)
            .foldr(|_, operand| negate(operand));

        let product_op = choice((
            just(Token::Star).to(ArithmeticOp::Multiply),
            just(Token::Slash).to(ArithmeticOp::Divide),
        ));
        let product = unary
            .clone()
            .then(product_op.then(unary).repeated())
            .foldl(|left, (op, right)| Expression::arithmetic(op, left, right));

        let sum_op = choice((
            just(Token::Plus).to(ArithmeticOp::Add),
            just(Token::Minus).to(ArithmeticOp::Subtract),
        ));
        product
            .clone()
            .then(sum_op.then(product).repeated())
            .foldl(|left, (op, right)| Expression::arithmetic(op, left, right))
    })
}

fn call(name: String, args: Vec<Expression>) -> Result<Expression, String> {
    let function = Function::parse(&name).ok_or_else(|| format!("unknown function '{}'", name))?;
    if !function.accepts(args.len()) {
        return Err(format!(
            "wrong number of arguments to {}: {}",
            function.name(),
            args.len()
        ));
    }
    Ok(Expression::function(function, args))
}

/// Folds a leading minus into numeric literals
fn negate(operand: Expression) -> Expression {
    match operand {
        Expression::Literal(Value::Int(i)) => match i.checked_neg() {
            Some(n) => Expression::Literal(Value::Int(n)),
            None => Expression::Literal(Value::Float(-(i as f64))),
        },
        Expression::Literal(Value::Float(f)) => Expression::Literal(Value::Float(-f)),
        other => Expression::arithmetic(ArithmeticOp::Subtract, Expression::literal(0), other),
    }
}

/// Integers that fit `i64` stay integers; everything else is a float
fn number() -> impl Parser<Token, Value, Error = Simple<Token>> + Clone {
    select! { Token::Number(n) => n }.try_map(|n, span: Span| {
        if !n.contains(|c| matches!(c, '.' | 'e' | 'E')) {
            if let Ok(i) = n.parse::<i64>() {
                return Ok(Value::Int(i));
            }
        }
        n.parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Simple::custom(span, format!("invalid number '{}'", n)))
    })
}

/// A signed coordinate inside geometry and BBOX literals
fn coordinate() -> impl Parser<Token, f64, Error = Simple<Token>> + Clone {
    just(Token::Minus)
        .or_not()
        .then(select! { Token::Number(n) => n })
        .try_map(|(minus, n), span: Span| match n.parse::<f64>() {
            Ok(v) if minus.is_some() => Ok(-v),
            Ok(v) => Ok(v),
            Err(_) => Err(Simple::custom(span, format!("invalid number '{}'", n))),
        })
        .labelled("number")
}

/// `minx, miny, maxx, maxy`
fn corners() -> impl Parser<Token, Rect<f64>, Error = Simple<Token>> + Clone {
    coordinate()
        .then_ignore(just(Token::Comma))
        .then(coordinate())
        .then_ignore(just(Token::Comma))
        .then(coordinate())
        .then_ignore(just(Token::Comma))
        .then(coordinate())
        .map(|(((minx, miny), maxx), maxy)| rect(minx, miny, maxx, maxy))
}

fn geometry() -> impl Parser<Token, Geometry<f64>, Error = Simple<Token>> + Clone {
    let coord = coordinate().then(coordinate()).map(|(x, y)| Coord { x, y });
    let coords = coord
        .clone()
        .separated_by(just(Token::Comma))
        .at_least(1)
        .delimited_by(just(Token::LParen), just(Token::RParen));

    let point = just(Token::Point)
        .ignore_then(coord.delimited_by(just(Token::LParen), just(Token::RParen)))
        .map(|c| Geometry::Point(Point(c)));
    let line = just(Token::LineString)
        .ignore_then(coords.clone())
        .map(|c| Geometry::LineString(LineString::new(c)));
    let polygon = just(Token::Polygon)
        .ignore_then(
            coords
                .separated_by(just(Token::Comma))
                .at_least(1)
                .delimited_by(just(Token::LParen), just(Token::RParen)),
        )
        .map(|rings| {
            let mut rings = rings.into_iter().map(LineString::new);
            let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
            Geometry::Polygon(Polygon::new(exterior, rings.collect()))
        });
    let envelope = just(Token::Envelope)
        .ignore_then(corners().delimited_by(just(Token::LParen), just(Token::RParen)))
        .map(Geometry::Rect);

    choice((point, line, polygon, envelope))
}

// ============================================================================
// Filters
// ============================================================================

/// What follows the left operand of a predicate
enum Suffix {
    Compare(ComparisonOp, Expression),
    IsNull { negated: bool },
    Like { pattern: String, negated: bool },
    In { list: Vec<Value>, negated: bool },
    Between { low: Expression, high: Expression, negated: bool },
}

impl Suffix {
    fn complete(self, left: Expression) -> Filter {
        match self {
            Suffix::Compare(op, right) => Filter::Compare { left, op, right },
            Suffix::IsNull { negated } => Filter::IsNull { expr: left, negated },
            Suffix::Like { pattern, negated } => Filter::Like {
                expr: left,
                pattern,
                negated,
            },
            Suffix::In { list, negated } => Filter::In {
                expr: left,
                list,
                negated,
            },
            Suffix::Between { low, high, negated } => {
                let range = Filter::And(vec![
                    left.clone().compare(ComparisonOp::GreaterThanOrEqual, low),
                    left.compare(ComparisonOp::LessThanOrEqual, high),
                ]);
                if negated {
                    Filter::Not(Box::new(range))
                } else {
                    range
                }
            }
        }
    }
}

fn suffix<E>(expr: E) -> impl Parser<Token, Suffix, Error = Simple<Token>> + Clone
where
    E: Parser<Token, Expression, Error = Simple<Token>> + Clone,
{
    let op = select! {
        Token::Eq => ComparisonOp::Equal,
        Token::Ne => ComparisonOp::NotEqual,
        Token::Lt => ComparisonOp::LessThan,
        Token::Le => ComparisonOp::LessThanOrEqual,
        Token::Gt => ComparisonOp::GreaterThan,
        Token::Ge => ComparisonOp::GreaterThanOrEqual,
    };
    let compare = op
        .then(expr.clone())
        .map(|(op, right)| Suffix::Compare(op, right));

    let is_null = just(Token::Is)
        .ignore_then(just(Token::Not).or_not())
        .then_ignore(just(Token::Null))
        .map(|not| Suffix::IsNull {
            negated: not.is_some(),
        });

    let negated = just(Token::Not).or_not().map(|not| not.is_some());

    let like = negated
        .clone()
        .then_ignore(just(Token::Like))
        .then(select! { Token::Str(s) => s }.labelled("pattern string"))
        .map(|(negated, pattern)| Suffix::Like { pattern, negated });

    let list = expr
        .clone()
        .try_map(|e, span: Span| match e {
            Expression::Literal(v) => Ok(v),
            _ => Err(Simple::custom(span, "IN list accepts literals only")),
        })
        .separated_by(just(Token::Comma))
        .at_least(1)
        .delimited_by(just(Token::LParen), just(Token::RParen));
    let in_list = negated
        .clone()
        .then_ignore(just(Token::In))
        .then(list)
        .map(|(negated, list)| Suffix::In { list, negated });

    let between = negated
        .then_ignore(just(Token::Between))
        .then(expr.clone())
        .then_ignore(just(Token::And))
        .then(expr)
        .map(|((negated, low), high)| Suffix::Between { low, high, negated });

    choice((compare, is_null, like, in_list, between))
}

fn filter_parser() -> impl Parser<Token, Filter, Error = Simple<Token>> + Clone {
    let expr = expression();

    recursive(move |nested| {
        // A parenthesised filter is tried before a predicate, so
        // `(a + b) > 3` falls through to the arithmetic reading
        let grouped = nested.delimited_by(just(Token::LParen), just(Token::RParen));

        let constant = select! {
            Token::Include => Filter::Include,
            Token::Exclude => Filter::Exclude,
        };

        let spatial_op = select! {
            Token::Intersects => SpatialOp::Intersects,
            Token::Disjoint => SpatialOp::Disjoint,
            Token::Contains => SpatialOp::Contains,
            Token::Within => SpatialOp::Within,
        };
        let spatial = spatial_op
            .then(
                expr.clone()
                    .then_ignore(just(Token::Comma))
                    .then(expr.clone())
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .map(|(op, (left, right))| Filter::Spatial { op, left, right });

        // The trailing CRS argument is accepted for compatibility and not checked
        let crs = just(Token::Comma).then(select! { Token::Str(_) => () }).or_not();
        let bbox = just(Token::BBox)
            .ignore_then(
                expr.clone()
                    .then_ignore(just(Token::Comma))
                    .then(corners())
                    .then_ignore(crs)
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .map(|(left, bounds)| left.bbox(bounds));

        let predicate = expr
            .clone()
            .then(suffix(expr.clone()))
            .map(|(left, suffix)| suffix.complete(left));

        let primary = choice((grouped, constant, spatial, bbox, predicate));

        let negation = just(Token::Not)
            .repeated()
            .then(primary)
            .foldr(|_, inner| Filter::Not(Box::new(inner)));

        let conjunction = negation
            .separated_by(just(Token::And))
            .at_least(1)
            .map(|clauses| join(clauses, Filter::And));

        conjunction
            .separated_by(just(Token::Or))
            .at_least(1)
            .map(|clauses| join(clauses, Filter::Or))
    })
}

fn join(mut clauses: Vec<Filter>, combine: fn(Vec<Filter>) -> Filter) -> Filter {
    if clauses.len() == 1 {
        if let Some(only) = clauses.pop() {
            return only;
        }
    }
    combine(clauses)
}

// ============================================================================
// Errors
// ============================================================================

fn first_error<T: fmt::Display + Hash + Eq>(text: &str, errors: Vec<Simple<T>>) -> SyntaxError {
    match errors.into_iter().next() {
        Some(error) => syntax_error(text, &error),
        None => SyntaxError::new(0, "invalid filter text"),
    }
}

/// Maps a chumsky error onto a byte position and a readable message
fn syntax_error<T: fmt::Display + Hash + Eq>(text: &str, error: &Simple<T>) -> SyntaxError {
    let found = match error.found() {
        Some(token) => format!("'{}'", token),
        None => "end of input".to_string(),
    };
    let message = match error.reason() {
        SimpleReason::Custom(message) => message.clone(),
        SimpleReason::Unclosed { delimiter, .. } => format!("unclosed '{}'", delimiter),
        SimpleReason::Unexpected => match error.label() {
            Some(label) => format!("expected {}, found {}", label, found),
            None => format!("unexpected {}", found),
        },
    };
    SyntaxError::new(byte_offset(text, error.span().start), message)
}

/// Spans count characters; positions in [`SyntaxError`] are byte offsets
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(at, _)| at)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pop() -> Expression {
        Expression::property("pop")
    }

    #[test]
    fn test_compile_comparison() {
        let f = compile("pop > 1000").unwrap();
        assert_eq!(
            f,
            Filter::Compare {
                left: Expression::Property("pop".into()),
                op: ComparisonOp::GreaterThan,
                right: Expression::Literal(Value::Int(1000)),
            }
        );
        assert_eq!(f, pop().gt(1000));
    }

    #[test]
    fn test_compile_rejects_bad_operator() {
        let err = compile("pop >>> 1000").unwrap_err();
        assert_eq!(err.position, 5);
        assert_eq!(err.code(), "GEO_FILTER_SYNTAX");
    }

    #[test]
    fn test_compile_errors() {
        assert!(compile("").is_err());
        assert!(compile("pop >").is_err());
        assert!(compile("pop > 1 extra").is_err());
        assert!(compile("name = 'open").is_err());
        assert!(compile("pop ! 3").is_err());
        assert!(compile("nosuch(pop) > 1").is_err());
        assert!(compile("pop IN (a, 2)").is_err());
        assert!(compile("(pop > 1").is_err());
    }

    #[test]
    fn test_compile_logic_and_precedence() {
        let f = compile("a = 1 OR b = 2 AND NOT c = 3").unwrap();
        let expected = Filter::Or(vec![
            Expression::property("a").eq(1),
            Filter::And(vec![
                Expression::property("b").eq(2),
                Filter::Not(Box::new(Expression::property("c").eq(3))),
            ]),
        ]);
        assert_eq!(f, expected);
    }

    #[test]
    fn test_compile_keywords_case_insensitive() {
        assert_eq!(
            compile("name like 'O%' and pop is not null").unwrap(),
            Expression::property("name").like("O%").and(pop().is_not_null())
        );
    }

    #[test]
    fn test_compile_in_between() {
        assert_eq!(
            compile("name NOT IN ('a', 'b')").unwrap(),
            Filter::In {
                expr: Expression::property("name"),
                list: vec![Value::from("a"), Value::from("b")],
                negated: true,
            }
        );
        assert_eq!(
            compile("pop BETWEEN 1 AND 10").unwrap(),
            Filter::And(vec![pop().ge(1), pop().le(10)])
        );
    }

    #[test]
    fn test_compile_arithmetic() {
        let f = compile("(pop + 1) * 2 >= -4.5").unwrap();
        let left = Expression::arithmetic(
            ArithmeticOp::Multiply,
            Expression::arithmetic(ArithmeticOp::Add, pop(), Expression::literal(1)),
            Expression::literal(2),
        );
        assert_eq!(f, left.compare(ComparisonOp::GreaterThanOrEqual, Expression::literal(-4.5)));
    }

    #[test]
    fn test_compile_functions() {
        let f = compile("upper(name) = 'OSLO'").unwrap();
        let upper = Expression::function(Function::Upper, vec![Expression::property("name")]);
        assert_eq!(f, upper.eq("OSLO"));
    }

    #[test]
    fn test_compile_spatial() {
        let f = compile("BBOX(geom, 0, 0, 10, 10)").unwrap();
        assert_eq!(f, Expression::property("geom").bbox(rect(0.0, 0.0, 10.0, 10.0)));

        let g = compile("INTERSECTS(geom, POINT(1 2))").unwrap();
        assert_eq!(
            g,
            Expression::property("geom").intersects(Geometry::Point(Point::new(1.0, 2.0)))
        );

        let h = compile("WITHIN(geom, POLYGON((0 0, 4 0, 4 4, 0 4, 0 0)))").unwrap();
        assert!(matches!(h, Filter::Spatial { op: SpatialOp::Within, .. }));
    }

    #[test]
    fn test_quoted_property_names() {
        let f = compile("\"my field\" = 'it''s'").unwrap();
        assert_eq!(f, Expression::property("my field").eq("it's"));
    }

    #[test]
    fn test_display_round_trips() {
        let sources = [
            "pop > 1000",
            "a = 1 OR b = 2 AND NOT c = 3",
            "(a = 1 OR b = 2) AND c <> 'x'",
            "name NOT LIKE '%land' AND pop IS NULL",
            "pop BETWEEN -5 AND 10.25",
            "BBOX(geom, -10, -5, 10, 5) AND INCLUDE",
            "INTERSECTS(geom, ENVELOPE(0, 0, 1, 1))",
            "CONTAINS(geom, POINT(1.5 2))",
            "abs(pop - 10) / 2 < 3 OR concat(name, 'x') IN ('ax', 'bx')",
            "\"select\" = TRUE",
        ];
        for src in sources {
            let compiled = compile(src).unwrap();
            let rendered = compiled.to_string();
            assert_eq!(compile(&rendered).unwrap(), compiled, "{} -> {}", src, rendered);
        }
    }

    #[test]
    fn test_compile_expression() {
        assert_eq!(
            compile_expression("pop * 2").unwrap(),
            Expression::arithmetic(ArithmeticOp::Multiply, pop(), Expression::literal(2))
        );
        assert!(compile_expression("pop > 2").is_err());
    }

    #[test]
    fn test_error_positions_are_bytes() {
        let err = compile("name = 'Tøyen' AND pop >").unwrap_err();
        assert_eq!(err.position, "name = 'Tøyen' AND pop >".len());
        assert!(err.message.contains("end of input"), "{}", err.message);
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let deep_not = format!("{}pop > 1", "NOT ".repeat(200_000));
        let err = compile(&deep_not).unwrap_err();
        assert_eq!(err.message, "nesting too deep");
        assert_eq!(err.position, 4 * MAX_NESTING);

        let open = "(".repeat(MAX_NESTING + 1);
        let close = ")".repeat(MAX_NESTING + 1);
        assert!(compile(&format!("{}pop > 1{}", open, close)).is_err());
        assert!(compile(&format!("pop > {}1", "-".repeat(MAX_NESTING + 1))).is_err());
        assert!(compile_expression(&vec!["pop"; MAX_NESTING + 2].join(" + ")).is_err());
    }

    #[test]
    fn test_moderate_nesting_compiles() {
        let text = format!("{}pop > 1{}", "(".repeat(16), ")".repeat(16));
        assert_eq!(compile(&text).unwrap(), pop().gt(1));

        let mut expected = pop().gt(1);
        for _ in 0..8 {
            expected = Filter::Not(Box::new(expected));
        }
        assert_eq!(compile(&format!("{}pop > 1", "NOT ".repeat(8))).unwrap(), expected);
        assert_eq!(compile("pop > - -3").unwrap(), pop().gt(3));
    }

    #[test]
    fn test_plain_identifiers() {
        assert!(is_plain_identifier("pop_2020"));
        assert!(!is_plain_identifier("2020"));
        assert!(!is_plain_identifier("Between"));
        assert!(!is_plain_identifier(""));
    }
}
