//! Parameter expressions for parameterized circuits.
//!
//! Gate angles are represented as a small serializable expression tree
//! rather than host-language closures. An expression is either concrete
//! (`Constant`, `Pi`), a reference into a circuit's trainable parameter
//! vector (`Index`), a named free parameter (`Symbol`), or an arithmetic
//! combination of sub-expressions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::PI;
use std::fmt;

/// An arithmetic combinator over two sub-expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
}

impl BinOp {
    fn apply(self, lhs: f64, rhs: f64) -> Option<f64> {
        match self {
            BinOp::Add => Some(lhs + rhs),
            BinOp::Sub => Some(lhs - rhs),
            BinOp::Mul => Some(lhs * rhs),
            BinOp::Div => (rhs != 0.0).then(|| lhs / rhs),
        }
    }

    fn symbol(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
        }
    }
}

/// A symbolic or concrete parameter expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A constant numeric value.
    Constant(f64),
    /// The constant π.
    Pi,
    /// A position in the circuit's trainable parameter vector.
    Index(usize),
    /// A named symbolic parameter.
    Symbol(String),
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// An arithmetic combination of two sub-expressions.
    Binary(BinOp, Box<ParameterExpression>, Box<ParameterExpression>),
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a reference to the trainable parameter vector.
    pub fn index(position: usize) -> Self {
        ParameterExpression::Index(position)
    }

    /// Create a symbolic parameter.
    pub fn symbol(name: impl Into<String>) -> Self {
        ParameterExpression::Symbol(name.into())
    }

    /// Create a π constant.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    fn binary(op: BinOp, lhs: Self, rhs: Self) -> Self {
        ParameterExpression::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// Check if this expression contains any symbols or vector references.
    pub fn is_symbolic(&self) -> bool {
        match self {
            ParameterExpression::Symbol(_) | ParameterExpression::Index(_) => true,
            ParameterExpression::Constant(_) | ParameterExpression::Pi => false,
            ParameterExpression::Neg(e) => e.is_symbolic(),
            ParameterExpression::Binary(_, a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// Try to evaluate as a concrete f64 value without a parameter vector.
    pub fn as_f64(&self) -> Option<f64> {
        self.evaluate(&[])
    }

    /// Evaluate against a trainable parameter vector.
    ///
    /// `Index` entries resolve to `params[i]`; out-of-range indices and
    /// unbound symbols yield `None`.
    pub fn evaluate(&self, params: &[f64]) -> Option<f64> {
        match self {
            ParameterExpression::Constant(v) => Some(*v),
            ParameterExpression::Pi => Some(PI),
            ParameterExpression::Index(i) => params.get(*i).copied(),
            ParameterExpression::Symbol(_) => None,
            ParameterExpression::Neg(e) => e.evaluate(params).map(|v| -v),
            ParameterExpression::Binary(op, a, b) => {
                op.apply(a.evaluate(params)?, b.evaluate(params)?)
            }
        }
    }

    /// Get all symbol names in this expression.
    pub fn symbols(&self) -> HashSet<String> {
        let mut set = HashSet::new();
        self.collect_symbols(&mut set);
        set
    }

    fn collect_symbols(&self, set: &mut HashSet<String>) {
        match self {
            ParameterExpression::Constant(_)
            | ParameterExpression::Pi
            | ParameterExpression::Index(_) => {}
            ParameterExpression::Symbol(name) => {
                set.insert(name.clone());
            }
            ParameterExpression::Neg(e) => e.collect_symbols(set),
            ParameterExpression::Binary(_, a, b) => {
                a.collect_symbols(set);
                b.collect_symbols(set);
            }
        }
    }

    /// Bind a symbol to a value, returning a new expression.
    pub fn bind(&self, name: &str, value: f64) -> Self {
        match self {
            ParameterExpression::Symbol(n) if n == name => ParameterExpression::Constant(value),
            ParameterExpression::Constant(_)
            | ParameterExpression::Pi
            | ParameterExpression::Index(_)
            | ParameterExpression::Symbol(_) => self.clone(),
            ParameterExpression::Neg(e) => ParameterExpression::Neg(Box::new(e.bind(name, value))),
            ParameterExpression::Binary(op, a, b) => {
                Self::binary(*op, a.bind(name, value), b.bind(name, value))
            }
        }
    }

    /// Simplify the expression by evaluating constant subexpressions.
    pub fn simplify(&self) -> Self {
        if let Some(v) = self.as_f64() {
            return ParameterExpression::Constant(v);
        }
        match self {
            ParameterExpression::Neg(e) => ParameterExpression::Neg(Box::new(e.simplify())),
            ParameterExpression::Binary(op, a, b) => {
                Self::binary(*op, a.simplify(), b.simplify())
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Pi => write!(f, "pi"),
            ParameterExpression::Index(i) => write!(f, "theta[{i}]"),
            ParameterExpression::Symbol(name) => write!(f, "{name}"),
            ParameterExpression::Neg(e) => write!(f, "-({e})"),
            ParameterExpression::Binary(op, a, b) => write!(f, "({a} {} {b})", op.symbol()),
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl From<i32> for ParameterExpression {
    fn from(value: i32) -> Self {
        ParameterExpression::Constant(f64::from(value))
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::binary(BinOp::Add, self, rhs)
    }
}

impl std::ops::Sub for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::binary(BinOp::Sub, self, rhs)
    }
}

impl std::ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self::binary(BinOp::Mul, self, rhs)
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Self::binary(BinOp::Div, self, rhs)
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ParameterExpression::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let p = ParameterExpression::constant(1.5);
        assert!(!p.is_symbolic());
        assert_eq!(p.as_f64(), Some(1.5));
    }

    #[test]
    fn test_symbol() {
        let p = ParameterExpression::symbol("theta");
        assert!(p.is_symbolic());
        assert_eq!(p.as_f64(), None);
        assert!(p.symbols().contains("theta"));
    }

    #[test]
    fn test_index_evaluates_against_vector() {
        let p = ParameterExpression::index(1);
        assert!(p.is_symbolic());
        assert_eq!(p.as_f64(), None);
        assert_eq!(p.evaluate(&[0.5, 2.5]), Some(2.5));
        assert_eq!(p.evaluate(&[0.5]), None);
    }

    #[test]
    fn test_bind() {
        let p = ParameterExpression::symbol("theta");
        let bound = p.bind("theta", PI / 2.0);
        assert!(!bound.is_symbolic());
        assert!((bound.as_f64().unwrap() - PI / 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_arithmetic() {
        let a = ParameterExpression::constant(2.0);
        let b = ParameterExpression::constant(3.0);

        let sum = (a.clone() + b.clone()).simplify();
        assert_eq!(sum.as_f64(), Some(5.0));

        let prod = (a * b).simplify();
        assert_eq!(prod.as_f64(), Some(6.0));
    }

    #[test]
    fn test_division_by_zero_is_unbound() {
        let expr = ParameterExpression::pi() / ParameterExpression::constant(0.0);
        assert_eq!(expr.as_f64(), None);
    }

    #[test]
    fn test_affine_over_vector() {
        // 2 * theta[0] + pi/2
        let expr = ParameterExpression::constant(2.0) * ParameterExpression::index(0)
            + ParameterExpression::pi() / ParameterExpression::constant(2.0);
        let v = expr.evaluate(&[0.25]).unwrap();
        assert!((v - (0.5 + PI / 2.0)).abs() < 1e-12);
    }
}
