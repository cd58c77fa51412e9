// Printing in sympy's conventions: `2*x - 4`, `x**2`, `-1/x**2`.
use std::fmt;

use super::Expr;

const PREC_ADD: u8 = 10;
const PREC_NEG: u8 = 15;
const PREC_MUL: u8 = 20;
const PREC_POW: u8 = 30;
const PREC_ATOM: u8 = 40;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Number(n) if *n < 0.0 => PREC_NEG,
        Expr::Number(_) | Expr::X | Expr::Const(_) | Expr::Call(_, _) => PREC_ATOM,
        Expr::Neg(_) => PREC_NEG,
        Expr::Add(_, _) | Expr::Sub(_, _) => PREC_ADD,
        Expr::Mul(_, _) | Expr::Div(_, _) => PREC_MUL,
        Expr::Pow(_, _) => PREC_POW,
    }
}

/// Below this magnitude fixed notation would round away significant digits.
const SMALL: f64 = 1e-4;
/// From here on integers no longer print exactly through `i64`.
const LARGE: f64 = 1e15;

/// Format a float without trailing noise: `2`, `0.5`, `0.333333333333`,
/// `1e-20`, `2.5e+16`. Only an exact zero prints as `0`.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "nan".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "oo".into() } else { "-oo".into() };
    }
    if n == 0.0 {
        return "0".into();
    }
    let magnitude = n.abs();
    if magnitude < SMALL || magnitude >= LARGE {
        return scientific(n);
    }
    if n.fract() == 0.0 {
        return format!("{}", n as i64);
    }
    let rounded = format!("{n:.12}");
    rounded
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Twelve significant digits with the mantissa trimmed: `1.5e-7`.
fn scientific(n: f64) -> String {
    let text = format!("{n:.11e}");
    let Some((mantissa, exponent)) = text.split_once('e') else {
        return text;
    };
    let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
    if exponent.starts_with('-') {
        format!("{mantissa}e{exponent}")
    } else {
        format!("{mantissa}e+{exponent}")
    }
}

struct Wrapped<'a>(&'a Expr, bool);

impl fmt::Display for Wrapped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.1 {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", format_number(*n)),
            Expr::X => write!(f, "x"),
            Expr::Const(c) => write!(f, "{}", c.name()),
            Expr::Call(func, arg) => write!(f, "{}({})", func.name(), arg),
            Expr::Neg(a) => write!(f, "-{}", Wrapped(a, precedence(a) < PREC_MUL)),
            Expr::Add(a, b) => write!(f, "{} + {}", a, Wrapped(b, precedence(b) <= PREC_NEG)),
            Expr::Sub(a, b) => write!(f, "{} - {}", a, Wrapped(b, precedence(b) <= PREC_NEG)),
            Expr::Mul(a, b) => {
                // A leading sign reads naturally: -x*y
                let left = precedence(a) < PREC_NEG;
                write!(f, "{}*{}", Wrapped(a, left), Wrapped(b, precedence(b) < PREC_MUL))
            }
            Expr::Div(a, b) => {
                let left = precedence(a) < PREC_NEG;
                write!(f, "{}/{}", Wrapped(a, left), Wrapped(b, precedence(b) <= PREC_MUL))
            }
            Expr::Pow(a, b) => write!(
                f,
                "{}**{}",
                Wrapped(a, precedence(a) <= PREC_POW),
                Wrapped(b, precedence(b) < PREC_POW)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Func;

    #[test]
    fn numbers() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-4.0), "-4");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(0.1 * 3.0), "0.3");
        assert_eq!(format_number(1.0 / 3.0), "0.333333333333");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn tiny_and_huge_numbers_keep_their_digits() {
        assert_eq!(format_number(1e-20), "1e-20");
        assert_eq!(format_number(-3e-20), "-3e-20");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(2.0e-13 / 3.0), "6.66666666667e-14");
        assert_eq!(format_number(1e20), "1e+20");
        assert_eq!(format_number(-2.5e16), "-2.5e+16");
        assert_eq!(format_number(123456789012345.0), "123456789012345");
        assert_eq!(format_number(0.0001), "0.0001");
    }

    #[test]
    fn tiny_coefficient_stays_visible() {
        let term = Expr::mul(Expr::Number(3e-20), Expr::pow(Expr::X, Expr::Number(2.0)));
        assert_eq!(term.to_string(), "3e-20*x**2");
    }

    #[test]
    fn sums_and_differences() {
        let e = Expr::add(
            Expr::sub(
                Expr::pow(Expr::X, Expr::Number(2.0)),
                Expr::mul(Expr::Number(4.0), Expr::X),
            ),
            Expr::Number(4.0),
        );
        assert_eq!(e.to_string(), "x**2 - 4*x + 4");

        let grouped = Expr::sub(Expr::X, Expr::add(Expr::X, Expr::Number(1.0)));
        assert_eq!(grouped.to_string(), "x - (x + 1)");
    }

    #[test]
    fn negation() {
        let e = Expr::neg(Expr::div(
            Expr::Number(1.0),
            Expr::pow(Expr::X, Expr::Number(2.0)),
        ));
        assert_eq!(e.to_string(), "-1/x**2");
        let sum = Expr::neg(Expr::add(Expr::X, Expr::Number(1.0)));
        assert_eq!(sum.to_string(), "-(x + 1)");
        assert_eq!(
            Expr::neg(Expr::call(Func::Sin, Expr::X)).to_string(),
            "-sin(x)"
        );
    }

    #[test]
    fn division_grouping() {
        let e = Expr::div(
            Expr::Number(1.0),
            Expr::mul(Expr::Number(2.0), Expr::X),
        );
        assert_eq!(e.to_string(), "1/(2*x)");
        let e = Expr::div(
            Expr::add(Expr::X, Expr::Number(1.0)),
            Expr::X,
        );
        assert_eq!(e.to_string(), "(x + 1)/x");
    }

    #[test]
    fn power_grouping() {
        let nested = Expr::pow(Expr::pow(Expr::X, Expr::Number(2.0)), Expr::Number(3.0));
        assert_eq!(nested.to_string(), "(x**2)**3");
        let negative_exp = Expr::pow(Expr::X, Expr::Number(-2.0));
        assert_eq!(negative_exp.to_string(), "x**(-2)");
        let sum_base = Expr::pow(Expr::add(Expr::X, Expr::Number(1.0)), Expr::Number(2.0));
        assert_eq!(sum_base.to_string(), "(x + 1)**2");
    }
}
