//! Symbolic differentiation with respect to `x`.
//!
//! Produces an unsimplified tree; callers run [`super::simplify::simplify`]
//! on the result.

use super::{Constant, Expr, Func};

/// Differentiate `expr` with respect to `x`.
pub fn differentiate(expr: &Expr) -> Expr {
    // Constant rule
    if !expr.depends_on_x() {
        return Expr::Number(0.0);
    }

    match expr {
        Expr::Number(_) | Expr::Const(_) => Expr::Number(0.0),
        Expr::X => Expr::Number(1.0),
        Expr::Neg(a) => Expr::neg(differentiate(a)),
        Expr::Add(a, b) => Expr::add(differentiate(a), differentiate(b)),
        Expr::Sub(a, b) => Expr::sub(differentiate(a), differentiate(b)),

        // (uv)' = u'v + uv'
        Expr::Mul(a, b) => Expr::add(
            Expr::mul(differentiate(a), (**b).clone()),
            Expr::mul((**a).clone(), differentiate(b)),
        ),

        Expr::Div(a, b) => {
            if !b.depends_on_x() {
                // (u/c)' = u'/c
                return Expr::div(differentiate(a), (**b).clone());
            }
            // (u/v)' = (u'v - uv') / v^2
            let numerator = Expr::sub(
                Expr::mul(differentiate(a), (**b).clone()),
                Expr::mul((**a).clone(), differentiate(b)),
            );
            Expr::div(numerator, Expr::pow((**b).clone(), Expr::Number(2.0)))
        }

        Expr::Pow(base, exp) => {
            if !exp.depends_on_x() {
                // (u^n)' = n * u^(n-1) * u'
                let lowered = Expr::pow(
                    (**base).clone(),
                    Expr::sub((**exp).clone(), Expr::Number(1.0)),
                );
                return Expr::mul(
                    Expr::mul((**exp).clone(), lowered),
                    differentiate(base),
                );
            }
            if !base.depends_on_x() {
                // (a^u)' = a^u * ln(a) * u'
                let scaled = match **base {
                    Expr::Const(Constant::E) => expr.clone(),
                    _ => Expr::mul(expr.clone(), Expr::call(Func::Ln, (**base).clone())),
                };
                return Expr::mul(scaled, differentiate(exp));
            }
            // (u^v)' = u^v * (v' ln(u) + v u' / u)
            let inner = Expr::add(
                Expr::mul(differentiate(exp), Expr::call(Func::Ln, (**base).clone())),
                Expr::div(
                    Expr::mul((**exp).clone(), differentiate(base)),
                    (**base).clone(),
                ),
            );
            Expr::mul(expr.clone(), inner)
        }

        // Chain rule: f(u)' = f'(u) * u'
        Expr::Call(func, arg) => Expr::mul(outer_derivative(*func, arg), differentiate(arg)),
    }
}

/// `f'(u)` for each elementary function.
fn outer_derivative(func: Func, u: &Expr) -> Expr {
    let u = u.clone();
    let one = || Expr::Number(1.0);
    let square = |e: Expr| Expr::pow(e, Expr::Number(2.0));

    match func {
        Func::Sin => Expr::call(Func::Cos, u),
        Func::Cos => Expr::neg(Expr::call(Func::Sin, u)),
        Func::Tan => Expr::add(square(Expr::call(Func::Tan, u)), one()),
        Func::Asin => Expr::div(
            one(),
            Expr::call(Func::Sqrt, Expr::sub(one(), square(u))),
        ),
        Func::Acos => Expr::neg(Expr::div(
            one(),
            Expr::call(Func::Sqrt, Expr::sub(one(), square(u))),
        )),
        Func::Atan => Expr::div(one(), Expr::add(square(u), one())),
        Func::Sinh => Expr::call(Func::Cosh, u),
        Func::Cosh => Expr::call(Func::Sinh, u),
        Func::Tanh => Expr::sub(one(), square(Expr::call(Func::Tanh, u))),
        Func::Exp => Expr::call(Func::Exp, u),
        Func::Ln => Expr::div(one(), u),
        Func::Sqrt => Expr::div(
            one(),
            Expr::mul(Expr::Number(2.0), Expr::call(Func::Sqrt, u)),
        ),
        // d|u|/du = u/|u|, undefined at 0
        Func::Abs => Expr::div(u.clone(), Expr::call(Func::Abs, u)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compare the symbolic derivative with a central difference.
    fn check_numerically(input: &str, points: &[f64]) {
        let f = Expr::parse(input).unwrap();
        let df = differentiate(&f);
        for &x in points {
            let h = 1e-6;
            let numeric = (f.eval(x + h) - f.eval(x - h)) / (2.0 * h);
            let symbolic = df.eval(x);
            assert!(
                (numeric - symbolic).abs() < 1e-4 * (1.0 + symbolic.abs()),
                "d/dx {input} at {x}: symbolic {symbolic}, numeric {numeric}"
            );
        }
    }

    #[test]
    fn constants_vanish() {
        assert_eq!(differentiate(&Expr::parse("pi*3").unwrap()), Expr::Number(0.0));
    }

    #[test]
    fn polynomial_rules() {
        check_numerically("x**2 - 4*x + 4", &[-3.0, 0.0, 2.5]);
        check_numerically("(x + 1)**3 * (2 - x)", &[-1.5, 0.3, 4.0]);
    }

    #[test]
    fn quotient_rule() {
        check_numerically("1/x", &[-2.0, 0.5, 3.0]);
        check_numerically("(x**2 + 1)/(x - 3)", &[-1.0, 0.0, 5.0]);
        check_numerically("x/4", &[1.0]);
    }

    #[test]
    fn exponential_and_power_rules() {
        check_numerically("2**x", &[-1.0, 0.0, 1.5]);
        check_numerically("E**(3*x)", &[0.2]);
        check_numerically("x**x", &[0.5, 1.0, 2.0]);
    }

    #[test]
    fn function_table() {
        for input in [
            "sin(x**2)",
            "cos(2*x)",
            "tan(x)",
            "asin(x/2)",
            "acos(x/2)",
            "atan(x)",
            "sinh(x)",
            "cosh(x)",
            "tanh(x)",
            "exp(-x)",
            "log(x**2 + 1)",
            "sqrt(x + 2)",
            "abs(x - 0.5)",
        ] {
            check_numerically(input, &[-0.7, 0.3, 1.1]);
        }
    }
}
