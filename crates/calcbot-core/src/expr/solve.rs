//! Real roots of a derivative.
//!
//! Rational functions are solved exactly through their numerator. Anything
//! else is scanned for sign changes over a bounded range.

use super::poly::{bisect, Rational};
use super::Expr;

/// Sub-intervals used by the sign-change scan.
const SCAN_STEPS: usize = 2000;

/// Roots closer than this are reported once.
const DEDUP_EPSILON: f64 = 1e-7;

/// All real `x` with `expr(x) = 0`, ascending.
///
/// Rational expressions return every real root. Other expressions only
/// report roots inside `domain`.
pub fn real_roots(expr: &Expr, domain: (f64, f64)) -> Vec<f64> {
    if !expr.depends_on_x() {
        // A constant is either never zero or zero everywhere; neither has
        // isolated roots.
        return Vec::new();
    }

    let mut roots = match Rational::from_expr(expr) {
        Some(r) if r.num.is_zero() => Vec::new(),
        Some(r) => r.real_zeros(),
        None => scan(expr, domain),
    };

    roots.sort_by(f64::total_cmp);
    roots.dedup_by(|a, b| (*a - *b).abs() < DEDUP_EPSILON);
    roots
}

fn scan(expr: &Expr, (from, to): (f64, f64)) -> Vec<f64> {
    let g = |x: f64| expr.eval(x);
    let step = (to - from) / SCAN_STEPS as f64;
    let mut roots = Vec::new();

    for i in 0..SCAN_STEPS {
        let a = from + step * i as f64;
        let b = if i + 1 == SCAN_STEPS { to } else { a + step };
        let (ga, gb) = (g(a), g(b));

        if ga == 0.0 {
            roots.push(a);
            continue;
        }
        if !ga.is_finite() || !gb.is_finite() || ga * gb >= 0.0 {
            continue;
        }

        let root = bisect(g, a, b);
        let at_root = g(root);
        // A sign change across a pole or a jump is not a root
        if at_root.is_finite() && at_root.abs() <= 1e-6 * (1.0 + ga.abs().max(gb.abs())) {
            roots.push(root);
        }
    }
    if g(to) == 0.0 {
        roots.push(to);
    }
    roots
}
