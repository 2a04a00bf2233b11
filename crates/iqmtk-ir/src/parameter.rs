//! Parameter expressions for parameterized circuits.
//!
//! Angles are radians. An expression is a small tree over constants, π and
//! named symbols; it evaluates to `f64` once every symbol is bound.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fmt;

/// Arithmetic operator of a binary expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
}

impl BinaryOp {
    fn apply(self, a: f64, b: f64) -> Option<f64> {
        match self {
            BinaryOp::Add => Some(a + b),
            BinaryOp::Sub => Some(a - b),
            BinaryOp::Mul => Some(a * b),
            BinaryOp::Div => (b != 0.0).then(|| a / b),
        }
    }

    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
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
    /// A named free parameter.
    Symbol(String),
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// Binary arithmetic.
    Binary(BinaryOp, Box<ParameterExpression>, Box<ParameterExpression>),
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a symbolic parameter.
    pub fn symbol(name: impl Into<String>) -> Self {
        ParameterExpression::Symbol(name.into())
    }

    /// Create a π constant.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    fn binary(op: BinaryOp, a: Self, b: Self) -> Self {
        ParameterExpression::Binary(op, Box::new(a), Box::new(b))
    }

    /// Check if this expression contains any symbols.
    pub fn is_symbolic(&self) -> bool {
        match self {
            ParameterExpression::Symbol(_) => true,
            ParameterExpression::Constant(_) | ParameterExpression::Pi => false,
            ParameterExpression::Neg(e) => e.is_symbolic(),
            ParameterExpression::Binary(_, a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// Evaluate to a concrete value.
    ///
    /// Returns `None` while a symbol is unbound or on division by zero.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterExpression::Constant(v) => Some(*v),
            ParameterExpression::Pi => Some(PI),
            ParameterExpression::Symbol(_) => None,
            ParameterExpression::Neg(e) => e.as_f64().map(|v| -v),
            ParameterExpression::Binary(op, a, b) => op.apply(a.as_f64()?, b.as_f64()?),
        }
    }

    /// All symbol names in this expression, sorted.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        self.collect_symbols(&mut set);
        set
    }

    fn collect_symbols(&self, set: &mut BTreeSet<String>) {
        match self {
            ParameterExpression::Symbol(name) => {
                set.insert(name.clone());
            }
            ParameterExpression::Constant(_) | ParameterExpression::Pi => {}
            ParameterExpression::Neg(e) => e.collect_symbols(set),
            ParameterExpression::Binary(_, a, b) => {
                a.collect_symbols(set);
                b.collect_symbols(set);
            }
        }
    }

    /// Replace every symbol for which `lookup` yields a value.
    pub fn substitute(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Self {
        match self {
            ParameterExpression::Symbol(name) => lookup(name)
                .map_or_else(|| self.clone(), ParameterExpression::Constant),
            ParameterExpression::Constant(_) | ParameterExpression::Pi => self.clone(),
            ParameterExpression::Neg(e) => ParameterExpression::Neg(Box::new(e.substitute(lookup))),
            ParameterExpression::Binary(op, a, b) => {
                Self::binary(*op, a.substitute(lookup), b.substitute(lookup))
            }
        }
    }

    /// Bind a symbol to a value, returning a new expression.
    pub fn bind(&self, name: &str, value: f64) -> Self {
        self.substitute(&|s| (s == name).then_some(value))
    }

    /// Fold constant subexpressions.
    pub fn simplify(&self) -> Self {
        if let Some(v) = self.as_f64() {
            return ParameterExpression::Constant(v);
        }
        match self {
            ParameterExpression::Neg(e) => ParameterExpression::Neg(Box::new(e.simplify())),
            ParameterExpression::Binary(op, a, b) => Self::binary(*op, a.simplify(), b.simplify()),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Pi => write!(f, "π"),
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

impl From<&str> for ParameterExpression {
    fn from(name: &str) -> Self {
        ParameterExpression::symbol(name)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl std::ops::$trait for ParameterExpression {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                ParameterExpression::binary($op, self, rhs)
            }
        }

        impl std::ops::$trait<f64> for ParameterExpression {
            type Output = Self;

            fn $method(self, rhs: f64) -> Self::Output {
                ParameterExpression::binary($op, self, ParameterExpression::Constant(rhs))
            }
        }
    };
}

impl_binary_op!(Add, add, BinaryOp::Add);
impl_binary_op!(Sub, sub, BinaryOp::Sub);
impl_binary_op!(Mul, mul, BinaryOp::Mul);
impl_binary_op!(Div, div, BinaryOp::Div);

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ParameterExpression::Neg(Box::new(self))
    }
}
