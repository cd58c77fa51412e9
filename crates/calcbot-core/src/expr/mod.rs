//! Symbolic expressions in the single variable `x`.
//!
//! Text is parsed with `meval` and folded into an [`Expr`] tree. The tree
//! feeds [`derive::differentiate`], [`simplify::simplify`] and
//! [`solve::real_roots`]; [`Expr::eval`] evaluates derived trees.

pub mod derive;
mod display;
mod parse;
pub mod poly;
pub mod simplify;
pub mod solve;

pub(crate) use parse::compile;

use crate::error::ParseError;

/// Named constants accepted in input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    Pi,
    E,
}

impl Constant {
    pub fn value(self) -> f64 {
        match self {
            Constant::Pi => std::f64::consts::PI,
            Constant::E => std::f64::consts::E,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Constant::Pi => "pi",
            Constant::E => "E",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "pi" => Some(Constant::Pi),
            "E" | "e" => Some(Constant::E),
            _ => None,
        }
    }
}

/// Elementary functions of one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Sqrt,
    Abs,
}

impl Func {
    /// Canonical printed name.
    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Asin => "asin",
            Func::Acos => "acos",
            Func::Atan => "atan",
            Func::Sinh => "sinh",
            Func::Cosh => "cosh",
            Func::Tanh => "tanh",
            Func::Exp => "exp",
            Func::Ln => "log",
            Func::Sqrt => "sqrt",
            Func::Abs => "Abs",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        let func = match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "tan" => Func::Tan,
            "asin" | "arcsin" => Func::Asin,
            "acos" | "arccos" => Func::Acos,
            "atan" | "arctan" => Func::Atan,
            "sinh" => Func::Sinh,
            "cosh" => Func::Cosh,
            "tanh" => Func::Tanh,
            "exp" => Func::Exp,
            "log" | "ln" => Func::Ln,
            "sqrt" => Func::Sqrt,
            "abs" | "Abs" => Func::Abs,
            _ => return None,
        };
        Some(func)
    }

    pub fn apply(self, v: f64) -> f64 {
        match self {
            Func::Sin => v.sin(),
            Func::Cos => v.cos(),
            Func::Tan => v.tan(),
            Func::Asin => v.asin(),
            Func::Acos => v.acos(),
            Func::Atan => v.atan(),
            Func::Sinh => v.sinh(),
            Func::Cosh => v.cosh(),
            Func::Tanh => v.tanh(),
            Func::Exp => v.exp(),
            Func::Ln => v.ln(),
            Func::Sqrt => v.sqrt(),
            Func::Abs => v.abs(),
        }
    }
}

/// Expression tree over `x`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    X,
    Const(Constant),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

impl Expr {
    /// Parse sympy-style text such as `x**2 - 4*x + 4` or `sin(x)/x`.
    pub fn parse(input: &str) -> Result<Expr, ParseError> {
        parse::parse(input)
    }

    pub fn number(n: f64) -> Self {
        Expr::Number(n)
    }

    pub fn neg(e: Expr) -> Self {
        Expr::Neg(Box::new(e))
    }

    pub fn add(a: Expr, b: Expr) -> Self {
        Expr::Add(Box::new(a), Box::new(b))
    }

    pub fn sub(a: Expr, b: Expr) -> Self {
        Expr::Sub(Box::new(a), Box::new(b))
    }

    pub fn mul(a: Expr, b: Expr) -> Self {
        Expr::Mul(Box::new(a), Box::new(b))
    }

    pub fn div(a: Expr, b: Expr) -> Self {
        Expr::Div(Box::new(a), Box::new(b))
    }

    pub fn pow(a: Expr, b: Expr) -> Self {
        Expr::Pow(Box::new(a), Box::new(b))
    }

    pub fn call(f: Func, arg: Expr) -> Self {
        Expr::Call(f, Box::new(arg))
    }

    /// True if `x` occurs anywhere in the tree.
    pub fn depends_on_x(&self) -> bool {
        match self {
            Expr::X => true,
            Expr::Number(_) | Expr::Const(_) => false,
            Expr::Neg(a) | Expr::Call(_, a) => a.depends_on_x(),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => a.depends_on_x() || b.depends_on_x(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Evaluate at `x`. Undefined points come back as `NaN` or infinities.
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Expr::Number(n) => *n,
            Expr::X => x,
            Expr::Const(c) => c.value(),
            Expr::Neg(a) => -a.eval(x),
            Expr::Add(a, b) => a.eval(x) + b.eval(x),
            Expr::Sub(a, b) => a.eval(x) - b.eval(x),
            Expr::Mul(a, b) => a.eval(x) * b.eval(x),
            Expr::Div(a, b) => a.eval(x) / b.eval(x),
            Expr::Pow(a, b) => pow(a.eval(x), b.eval(x)),
            Expr::Call(f, a) => f.apply(a.eval(x)),
        }
    }
}

/// Real power. Negative bases only allow integer exponents.
pub(crate) fn pow(base: f64, exp: f64) -> f64 {
    if exp.fract() == 0.0 && exp.abs() <= i32::MAX as f64 {
        base.powi(exp as i32)
    } else {
        base.powf(exp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_polynomial() {
        let e = Expr::parse("x**2 - 4*x + 4").unwrap();
        assert_eq!(e.eval(2.0), 0.0);
        assert_eq!(e.eval(0.0), 4.0);
    }

    #[test]
    fn eval_undefined_points() {
        assert!(Expr::parse("1/x").unwrap().eval(0.0).is_infinite());
        assert!(Expr::parse("log(x)").unwrap().eval(-1.0).is_nan());
        assert!(Expr::parse("sqrt(x)").unwrap().eval(-4.0).is_nan());
        assert!(Expr::parse("x**0.5").unwrap().eval(-4.0).is_nan());
    }

    #[test]
    fn negative_base_integer_power() {
        assert_eq!(Expr::parse("x**3").unwrap().eval(-2.0), -8.0);
    }

    #[test]
    fn constants_and_dependency() {
        let e = Expr::parse("pi*E").unwrap();
        assert!(!e.depends_on_x());
        assert!((e.eval(0.0) - std::f64::consts::PI * std::f64::consts::E).abs() < 1e-12);
        assert!(Expr::parse("sin(2*x)").unwrap().depends_on_x());
    }
}
