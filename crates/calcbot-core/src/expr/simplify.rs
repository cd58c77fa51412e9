//! Algebraic clean-up of expression trees.
//!
//! Children are simplified first, then local identities are applied at each
//! node. Polynomial subtrees are finally rewritten in canonical descending
//! form when that does not make them longer.

use super::poly::Poly;
use super::Expr;

/// Simplify `expr` into a smaller equivalent tree.
pub fn simplify(expr: &Expr) -> Expr {
    let node = match expr {
        Expr::Number(_) | Expr::X | Expr::Const(_) => return expr.clone(),
        Expr::Neg(a) => neg(simplify(a)),
        Expr::Add(a, b) => add(simplify(a), simplify(b)),
        Expr::Sub(a, b) => sub(simplify(a), simplify(b)),
        Expr::Mul(a, b) => mul(simplify(a), simplify(b)),
        Expr::Div(a, b) => div(simplify(a), simplify(b)),
        Expr::Pow(a, b) => pow(simplify(a), simplify(b)),
        Expr::Call(f, a) => call(*f, simplify(a)),
    };
    canonical(node)
}

/// Swap a polynomial subtree for its expanded form if that is no larger.
fn canonical(expr: Expr) -> Expr {
    if !matches!(
        expr,
        Expr::Add(..) | Expr::Sub(..) | Expr::Mul(..) | Expr::Neg(..) | Expr::Pow(..)
    ) {
        return expr;
    }
    match Poly::from_expr(&expr) {
        Some(p) => {
            let expanded = p.to_expr();
            if size(&expanded) <= size(&expr) {
                expanded
            } else {
                expr
            }
        }
        None => expr,
    }
}

fn size(expr: &Expr) -> usize {
    match expr {
        Expr::Number(_) | Expr::X | Expr::Const(_) => 1,
        Expr::Neg(a) | Expr::Call(_, a) => 1 + size(a),
        Expr::Add(a, b)
        | Expr::Sub(a, b)
        | Expr::Mul(a, b)
        | Expr::Div(a, b)
        | Expr::Pow(a, b) => 1 + size(a) + size(b),
    }
}

fn is_num(expr: &Expr, n: f64) -> bool {
    expr.as_number() == Some(n)
}

fn integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0
}

// ---------------------------------------------------------------------------
// Local rules. Each assumes its operands are already simplified.
// ---------------------------------------------------------------------------

fn neg(a: Expr) -> Expr {
    match a {
        Expr::Number(n) => Expr::Number(-n),
        Expr::Neg(inner) => *inner,
        other => Expr::neg(other),
    }
}

fn add(a: Expr, b: Expr) -> Expr {
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return Expr::Number(x + y);
    }
    if is_num(&a, 0.0) {
        return b;
    }
    if is_num(&b, 0.0) {
        return a;
    }
    match (a, b) {
        (a, Expr::Number(n)) if n < 0.0 => Expr::sub(a, Expr::Number(-n)),
        (a, Expr::Neg(c)) => sub(a, *c),
        (Expr::Neg(c), b) => sub(b, *c),
        // Keep the constant term last: 4 + x -> x + 4
        (Expr::Number(n), b) => Expr::add(b, Expr::Number(n)),
        (a, b) => Expr::add(a, b),
    }
}

fn sub(a: Expr, b: Expr) -> Expr {
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return Expr::Number(x - y);
    }
    if is_num(&b, 0.0) {
        return a;
    }
    if is_num(&a, 0.0) {
        return neg(b);
    }
    if a == b {
        return Expr::Number(0.0);
    }
    match (a, b) {
        (a, Expr::Number(n)) if n < 0.0 => Expr::add(a, Expr::Number(-n)),
        (a, Expr::Neg(c)) => add(a, *c),
        (a, b) => Expr::sub(a, b),
    }
}

fn mul(a: Expr, b: Expr) -> Expr {
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return Expr::Number(x * y);
    }
    if is_num(&a, 0.0) || is_num(&b, 0.0) {
        return Expr::Number(0.0);
    }
    if is_num(&a, 1.0) {
        return b;
    }
    if is_num(&b, 1.0) {
        return a;
    }
    if is_num(&a, -1.0) {
        return neg(b);
    }
    if is_num(&b, -1.0) {
        return neg(a);
    }

    match (a, b) {
        // Coefficient first: x*3 -> 3*x
        (a, Expr::Number(n)) => mul(Expr::Number(n), a),
        (Expr::Neg(c), b) => neg(mul(*c, b)),
        (a, Expr::Neg(c)) => neg(mul(a, *c)),
        (Expr::Number(n), Expr::Mul(l, r)) if l.as_number().is_some() => {
            let m = l.as_number().unwrap_or(1.0);
            mul(Expr::Number(n * m), *r)
        }
        // Numbers lead: pi*(2*x) -> 2*pi*x
        (a, Expr::Mul(l, r)) if l.as_number().is_some() => mul(*l, mul(a, *r)),
        (Expr::Number(n), Expr::Div(num, den)) => div(mul(Expr::Number(n), *num), *den),
        (a, Expr::Div(num, den)) if is_num(&num, 1.0) => div(a, *den),
        (Expr::Div(num, den), b) if is_num(&num, 1.0) => div(b, *den),
        (a, b) if a == b => pow(a, Expr::Number(2.0)),
        (a, b) => Expr::mul(a, b),
    }
}

fn div(a: Expr, b: Expr) -> Expr {
    if is_num(&b, 1.0) {
        return a;
    }
    if is_num(&a, 0.0) && !is_num(&b, 0.0) {
        return Expr::Number(0.0);
    }
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        // Keep exact fractions like 1/3 symbolic
        if y != 0.0 && integral(x / y) {
            return Expr::Number(x / y);
        }
    }
    if a == b && !is_num(&a, 0.0) {
        return Expr::Number(1.0);
    }

    // Cancel numeric coefficients: (2*x)/(2*u) -> x/u, 2/(6*u) -> 1/(3*u)
    let (p, q) = (coefficient(&a), coefficient(&b));
    if p > 0.0 && q > 1.0 && integral(p / q) {
        return div(mul(Expr::Number(p / q), strip(a)), strip(b));
    }
    if p > 1.0 && q > 0.0 && integral(q / p) {
        return div(strip(a), mul(Expr::Number(q / p), strip(b)));
    }

    match (a, b) {
        (Expr::Neg(c), b) => neg(div(*c, b)),
        (Expr::Number(n), b) if n < 0.0 => neg(div(Expr::Number(-n), b)),
        (a, Expr::Neg(c)) => neg(div(a, *c)),
        (Expr::Div(num, den), c) => div(*num, mul(*den, c)),
        (a, Expr::Div(num, den)) => div(mul(a, *den), *num),
        (a, b) => Expr::div(a, b),
    }
}

/// Leading numeric factor: 3 for `3*u` and for `3`, 1 otherwise.
fn coefficient(expr: &Expr) -> f64 {
    match expr {
        Expr::Number(n) => *n,
        Expr::Mul(l, _) => l.as_number().unwrap_or(1.0),
        _ => 1.0,
    }
}

/// `expr` without the factor [`coefficient`] reports.
fn strip(expr: Expr) -> Expr {
    match expr {
        Expr::Number(_) => Expr::Number(1.0),
        Expr::Mul(l, r) if l.as_number().is_some() => *r,
        other => other,
    }
}

fn pow(a: Expr, b: Expr) -> Expr {
    if is_num(&b, 0.0) {
        return Expr::Number(1.0);
    }
    if is_num(&b, 1.0) {
        return a;
    }
    if is_num(&a, 1.0) {
        return Expr::Number(1.0);
    }
    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        let v = super::pow(x, y);
        if integral(v) {
            return Expr::Number(v);
        }
    }

    match (a, b) {
        // (u^m)^n = u^(mn) holds for integer n
        (Expr::Pow(base, m), Expr::Number(n)) if integral(n) && m.as_number().is_some() => {
            let m = m.as_number().unwrap_or(1.0);
            pow(*base, Expr::Number(m * n))
        }
        // u^(-k) -> 1/u^k
        (a, Expr::Number(n)) if n < 0.0 && integral(n) => {
            div(Expr::Number(1.0), pow(a, Expr::Number(-n)))
        }
        (a, b) => Expr::pow(a, b),
    }
}

fn call(f: super::Func, a: Expr) -> Expr {
    if let Some(v) = a.as_number() {
        let folded = f.apply(v);
        // sin(0) -> 0, exp(0) -> 1; irrational values stay symbolic
        if integral(folded) {
            return Expr::Number(folded);
        }
    }
    Expr::call(f, a)
}
