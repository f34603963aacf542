//! Formula expressions for pay components.
//!
//! A formula is a small arithmetic expression over decimal literals and
//! identifiers, e.g. `min(BASIC * 0.1, 2500)` or `present_days * 100`.
//! Expressions are parsed once into an [`Expr`] tree when the catalogue is
//! loaded and evaluated per run against a resolver for identifiers. There is
//! no way to call anything other than the built-in `min` and `max`.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | primary
//! primary := NUMBER | IDENT | IDENT '(' expr (',' expr)* ')' | '(' expr ')'
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;
use std::ops::Range;
use std::str::FromStr;

use chumsky::Stream;
use chumsky::prelude::*;
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

/// Built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// Smallest argument.
    Min,
    /// Largest argument.
    Max,
}

/// A parsed formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Decimal literal.
    Number(Decimal),
    /// Component code, basis field, `annual` or `monthly`.
    Ident(String),
    /// Unary minus.
    Neg(Box<Expr>),
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// `min(...)` or `max(...)`.
    Call {
        /// Function called.
        function: Function,
        /// Arguments, at least one.
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Returns every identifier the expression reads, sorted.
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ident(name) => {
                out.insert(name.clone());
            }
            Expr::Neg(inner) => inner.collect_identifiers(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_identifiers(out);
                rhs.collect_identifiers(out);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_identifiers(out);
                }
            }
        }
    }

    /// Evaluates the expression.
    ///
    /// `resolve` maps identifiers to values; an identifier it cannot resolve,
    /// division by zero and arithmetic overflow all fail with `InvalidFormula`
    /// naming `component`.
    pub fn evaluate<F>(&self, component: &str, resolve: &F) -> EngineResult<Decimal>
    where
        F: Fn(&str) -> Option<Decimal>,
    {
        match self {
            Expr::Number(value) => Ok(*value),
            Expr::Ident(name) => resolve(name).ok_or_else(|| {
                EngineError::invalid_formula(component, format!("unknown identifier '{}'", name))
            }),
            Expr::Neg(inner) => Ok(-inner.evaluate(component, resolve)?),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = lhs.evaluate(component, resolve)?;
                let rhs = rhs.evaluate(component, resolve)?;
                let result = match op {
                    BinaryOp::Add => lhs.checked_add(rhs),
                    BinaryOp::Sub => lhs.checked_sub(rhs),
                    BinaryOp::Mul => lhs.checked_mul(rhs),
                    BinaryOp::Div => {
                        if rhs.is_zero() {
                            return Err(EngineError::invalid_formula(component, "division by zero"));
                        }
                        lhs.checked_div(rhs)
                    }
                };
                result.ok_or_else(|| EngineError::invalid_formula(component, "arithmetic overflow"))
            }
            Expr::Call { function, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.evaluate(component, resolve)?);
                }
                let picked = match function {
                    Function::Min => values.into_iter().min(),
                    Function::Max => values.into_iter().max(),
                };
                picked.ok_or_else(|| {
                    EngineError::invalid_formula(component, "function called without arguments")
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    Number(Decimal),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(value) => write!(f, "{}", value),
            Token::Ident(name) => write!(f, "{}", name),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

fn lexer() -> impl Parser<char, Vec<(Token, Range<usize>)>, Error = Simple<char>> {
    let number = text::digits(10)
        .then(just('.').ignore_then(text::digits(10)).or_not())
        .try_map(|(int_part, frac): (String, Option<String>), span| {
            let raw = match frac {
                Some(frac) => format!("{}.{}", int_part, frac),
                None => int_part,
            };
            Decimal::from_str(&raw).map_err(|_| Simple::custom(span, "invalid number literal"))
        })
        .map(Token::Number);

    let ident = text::ident().map(Token::Ident);

    let op = choice::<_, Simple<char>>((
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just(',').to(Token::Comma),
    ));

    choice::<_, Simple<char>>((number, ident, op))
        .map_with_span(|tok, span| (tok, span))
        .padded()
        .repeated()
        .then_ignore(end())
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

fn expr_parser() -> impl Parser<Token, Expr, Error = Simple<Token>> {
    recursive(|expr| {
        let number = select! { Token::Number(value) => Expr::Number(value) };
        let ident = select! { Token::Ident(name) => name };

        let call = ident
            .clone()
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .at_least(1)
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .try_map(|(name, args), span| {
                let function = match name.to_ascii_lowercase().as_str() {
                    "min" => Function::Min,
                    "max" => Function::Max,
                    _ => {
                        return Err(Simple::custom(span, format!("unknown function '{}'", name)));
                    }
                };
                Ok(Expr::Call { function, args })
            });

        let primary = choice::<_, Simple<Token>>((
            number,
            call,
            ident.map(Expr::Ident),
            expr.delimited_by(just(Token::LParen), just(Token::RParen)),
        ));

        let unary = just(Token::Minus)
            .repeated()
            .then(primary)
            .foldr(|_, inner| Expr::Neg(Box::new(inner)));

        let product = unary
            .clone()
            .then(
                choice::<_, Simple<Token>>((
                    just(Token::Star).to(BinaryOp::Mul),
                    just(Token::Slash).to(BinaryOp::Div),
                ))
                .then(unary)
                .repeated(),
            )
            .foldl(|lhs, (op, rhs)| binary(op, lhs, rhs));

        product
            .clone()
            .then(
                choice::<_, Simple<Token>>((
                    just(Token::Plus).to(BinaryOp::Add),
                    just(Token::Minus).to(BinaryOp::Sub),
                ))
                .then(product)
                .repeated(),
            )
            .foldl(|lhs, (op, rhs)| binary(op, lhs, rhs))
    })
}

/// Turns the first parse error into `InvalidFormula`, keeping its span.
fn to_formula_error<T>(component: &str, errors: Vec<Simple<T>>) -> EngineError
where
    T: fmt::Display + Hash + Eq,
{
    match errors.into_iter().next() {
        Some(err) => {
            let span = err.span();
            EngineError::invalid_formula(
                component,
                format!("{} at {}..{}", err, span.start, span.end),
            )
        }
        None => EngineError::invalid_formula(component, "unparseable formula"),
    }
}

/// Parses a formula expression.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::parse_formula;
/// use rust_decimal::Decimal;
///
/// let expr = parse_formula("LTA", "min(BASIC * 0.1, 2500)").unwrap();
/// let value = expr
///     .evaluate("LTA", &|name: &str| (name == "BASIC").then(|| Decimal::from(30_000)))
///     .unwrap();
/// assert_eq!(value, Decimal::from(2500));
/// ```
pub fn parse_formula(component: &str, source: &str) -> EngineResult<Expr> {
    if source.trim().is_empty() {
        return Err(EngineError::invalid_formula(component, "empty formula"));
    }
    let tokens = lexer()
        .parse(source)
        .map_err(|errors| to_formula_error(component, errors))?;

    let eoi = source.len()..source.len() + 1;
    let stream = Stream::from_iter(eoi, tokens.into_iter());
    expr_parser()
        .then_ignore(end())
        .parse(stream)
        .map_err(|errors| to_formula_error(component, errors))
}
