//! Dense real polynomials and ratios of polynomials.
//!
//! Used both to print polynomial results in canonical form and to solve
//! rational derivatives exactly instead of by scanning.

use super::Expr;

/// Polynomials above this degree are left symbolic.
const MAX_DEGREE: usize = 64;

/// Bisection steps for isolated roots; well past f64 resolution.
const BISECTION_STEPS: usize = 200;

/// Coefficients in ascending order: `coeffs[k]` multiplies `x**k`.
#[derive(Debug, Clone, PartialEq)]
pub struct Poly {
    coeffs: Vec<f64>,
}

impl Poly {
    pub fn new(mut coeffs: Vec<f64>) -> Self {
        while coeffs.len() > 1 && coeffs.last() == Some(&0.0) {
            coeffs.pop();
        }
        if coeffs.is_empty() {
            coeffs.push(0.0);
        }
        Self { coeffs }
    }

    pub fn constant(c: f64) -> Self {
        Self::new(vec![c])
    }

    pub fn x() -> Self {
        Self::new(vec![0.0, 1.0])
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|c| *c == 0.0)
    }

    /// Horner evaluation.
    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    pub fn derivative(&self) -> Poly {
        if self.coeffs.len() <= 1 {
            return Poly::constant(0.0);
        }
        Poly::new(
            self.coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, c)| c * k as f64)
                .collect(),
        )
    }

    pub fn add(&self, other: &Poly) -> Poly {
        let len = self.coeffs.len().max(other.coeffs.len());
        Poly::new(
            (0..len)
                .map(|k| {
                    self.coeffs.get(k).copied().unwrap_or(0.0)
                        + other.coeffs.get(k).copied().unwrap_or(0.0)
                })
                .collect(),
        )
    }

    pub fn scale(&self, factor: f64) -> Poly {
        Poly::new(self.coeffs.iter().map(|c| c * factor).collect())
    }

    pub fn sub(&self, other: &Poly) -> Poly {
        self.add(&other.scale(-1.0))
    }

    pub fn mul(&self, other: &Poly) -> Poly {
        let mut out = vec![0.0; self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                out[i + j] += a * b;
            }
        }
        Poly::new(out)
    }

    fn powi(&self, n: usize) -> Poly {
        let mut acc = Poly::constant(1.0);
        for _ in 0..n {
            acc = acc.mul(self);
        }
        acc
    }

    /// Drop leading coefficients that are rounding noise relative to the rest.
    fn cleaned(&self) -> Poly {
        let scale = self.coeffs.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
        if scale == 0.0 {
            return Poly::constant(0.0);
        }
        Poly::new(
            self.coeffs
                .iter()
                .map(|c| if c.abs() <= scale * 1e-12 { 0.0 } else { *c })
                .collect(),
        )
    }

    /// Read `expr` as a polynomial in `x` with numeric coefficients.
    pub fn from_expr(expr: &Expr) -> Option<Poly> {
        let poly = match expr {
            Expr::Number(n) => Poly::constant(*n),
            Expr::X => Poly::x(),
            Expr::Const(_) | Expr::Call(_, _) => return None,
            Expr::Neg(a) => Poly::from_expr(a)?.scale(-1.0),
            Expr::Add(a, b) => Poly::from_expr(a)?.add(&Poly::from_expr(b)?),
            Expr::Sub(a, b) => Poly::from_expr(a)?.sub(&Poly::from_expr(b)?),
            Expr::Mul(a, b) => Poly::from_expr(a)?.mul(&Poly::from_expr(b)?),
            Expr::Div(a, b) => {
                let divisor = b.as_number().filter(|d| *d != 0.0)?;
                Poly::from_expr(a)?.scale(1.0 / divisor)
            }
            Expr::Pow(a, b) => {
                let n = non_negative_integer(b)?;
                let base = Poly::from_expr(a)?;
                if base.degree() * n > MAX_DEGREE {
                    return None;
                }
                base.powi(n)
            }
        };
        (poly.degree() <= MAX_DEGREE).then_some(poly)
    }

    /// Canonical expression: descending powers, signs folded into `-`.
    pub fn to_expr(&self) -> Expr {
        let mut result: Option<Expr> = None;

        for (k, &c) in self.coeffs.iter().enumerate().rev() {
            if c == 0.0 {
                continue;
            }
            let magnitude = c.abs();
            let power = match k {
                0 => None,
                1 => Some(Expr::X),
                _ => Some(Expr::pow(Expr::X, Expr::Number(k as f64))),
            };
            let term = match power {
                None => Expr::Number(magnitude),
                Some(p) if magnitude == 1.0 => p,
                Some(p) => Expr::mul(Expr::Number(magnitude), p),
            };
            result = Some(match result {
                None if c < 0.0 => Expr::neg(term),
                None => term,
                Some(acc) if c < 0.0 => Expr::sub(acc, term),
                Some(acc) => Expr::add(acc, term),
            });
        }

        result.unwrap_or(Expr::Number(0.0))
    }

    /// All distinct real roots, ascending.
    pub fn real_roots(&self) -> Vec<f64> {
        let p = self.cleaned();
        let c = p.coeffs();
        match p.degree() {
            0 => Vec::new(),
            1 => vec![-c[0] / c[1]],
            2 => quadratic_roots(c[2], c[1], c[0]),
            _ => p.isolate_roots(),
        }
    }

    /// Roots of higher-degree polynomials: the critical points of `p` split
    /// the line into monotone pieces, each holding at most one root.
    fn isolate_roots(&self) -> Vec<f64> {
        let leading = self.coeffs[self.degree()];
        // Cauchy bound on root magnitude
        let bound = 1.0
            + self.coeffs[..self.degree()]
                .iter()
                .fold(0.0_f64, |m, c| m.max((c / leading).abs()));

        let mut breaks = vec![-bound];
        breaks.extend(
            self.derivative()
                .real_roots()
                .into_iter()
                .filter(|r| r.abs() < bound),
        );
        breaks.push(bound);

        let scale = self.coeffs.iter().fold(0.0_f64, |m, c| m.max(c.abs()));
        let mut roots: Vec<f64> = Vec::new();
        let push = |r: f64, roots: &mut Vec<f64>| {
            if roots
                .last()
                .map_or(true, |last| (r - last).abs() > 1e-9 * (1.0 + r.abs()))
            {
                roots.push(r);
            }
        };

        for pair in breaks.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (fa, fb) = (self.eval(a), self.eval(b));
            if fa.abs() <= scale * 1e-12 {
                push(a, &mut roots);
            }
            if fa * fb < 0.0 {
                push(bisect(|x| self.eval(x), a, b), &mut roots);
            }
        }
        if let Some(&last) = breaks.last() {
            if self.eval(last).abs() <= scale * 1e-12 {
                push(last, &mut roots);
            }
        }
        roots
    }
}

fn non_negative_integer(expr: &Expr) -> Option<usize> {
    let n = expr.as_number()?;
    (n >= 0.0 && n.fract() == 0.0 && n <= MAX_DEGREE as f64).then_some(n as usize)
}

fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    let disc = b * b - 4.0 * a * c;
    let tolerance = 1e-12 * (b * b).max((4.0 * a * c).abs());
    if disc < -tolerance {
        return Vec::new();
    }
    if disc.abs() <= tolerance {
        return vec![-b / (2.0 * a)];
    }
    // Numerically stable pair
    let q = -0.5 * (b + b.signum() * disc.sqrt());
    let (r1, r2) = if q == 0.0 {
        let r = (-c / a).sqrt();
        (-r, r)
    } else {
        (q / a, c / q)
    };
    if r1 < r2 {
        vec![r1, r2]
    } else {
        vec![r2, r1]
    }
}

/// Bisection on a bracket with a sign change.
pub(crate) fn bisect(f: impl Fn(f64) -> f64, mut a: f64, mut b: f64) -> f64 {
    let mut fa = f(a);
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (a + b);
        if mid <= a || mid >= b {
            break;
        }
        let fm = f(mid);
        if fm == 0.0 {
            return mid;
        }
        if fa * fm < 0.0 {
            b = mid;
        } else {
            a = mid;
            fa = fm;
        }
    }
    0.5 * (a + b)
}

/// A ratio `num / den` of polynomials.
#[derive(Debug, Clone, PartialEq)]
pub struct Rational {
    pub num: Poly,
    pub den: Poly,
}

impl Rational {
    fn poly(p: Poly) -> Self {
        Self {
            num: p,
            den: Poly::constant(1.0),
        }
    }

    fn checked(num: Poly, den: Poly) -> Option<Self> {
        if den.is_zero() || num.degree() > MAX_DEGREE || den.degree() > MAX_DEGREE {
            return None;
        }
        Some(Self { num, den })
    }

    /// Read `expr` as a rational function of `x`.
    pub fn from_expr(expr: &Expr) -> Option<Rational> {
        match expr {
            Expr::Number(n) => Some(Rational::poly(Poly::constant(*n))),
            Expr::X => Some(Rational::poly(Poly::x())),
            Expr::Const(_) | Expr::Call(_, _) => None,
            Expr::Neg(a) => {
                let r = Rational::from_expr(a)?;
                Some(Rational {
                    num: r.num.scale(-1.0),
                    den: r.den,
                })
            }
            Expr::Add(a, b) | Expr::Sub(a, b) => {
                let (l, r) = (Rational::from_expr(a)?, Rational::from_expr(b)?);
                let right = l.den.mul(&r.num);
                let left = l.num.mul(&r.den);
                let num = if matches!(expr, Expr::Add(..)) {
                    left.add(&right)
                } else {
                    left.sub(&right)
                };
                Rational::checked(num, l.den.mul(&r.den))
            }
            Expr::Mul(a, b) => {
                let (l, r) = (Rational::from_expr(a)?, Rational::from_expr(b)?);
                Rational::checked(l.num.mul(&r.num), l.den.mul(&r.den))
            }
            Expr::Div(a, b) => {
                let (l, r) = (Rational::from_expr(a)?, Rational::from_expr(b)?);
                Rational::checked(l.num.mul(&r.den), l.den.mul(&r.num))
            }
            Expr::Pow(a, b) => {
                let n = b.as_number().filter(|n| n.fract() == 0.0)?;
                if n.abs() > MAX_DEGREE as f64 {
                    return None;
                }
                let base = Rational::from_expr(a)?;
                let k = n.abs() as usize;
                if base.num.degree().max(base.den.degree()) * k > MAX_DEGREE {
                    return None;
                }
                let (num, den) = (base.num.powi(k), base.den.powi(k));
                if n < 0.0 {
                    Rational::checked(den, num)
                } else {
                    Rational::checked(num, den)
                }
            }
        }
    }

    /// Real zeros: roots of the numerator where the denominator is non-zero.
    pub fn real_zeros(&self) -> Vec<f64> {
        let den_scale = self.den.coeffs().iter().fold(0.0_f64, |m, c| m.max(c.abs()));
        self.num
            .real_roots()
            .into_iter()
            .filter(|r| self.den.eval(*r).abs() > den_scale * 1e-9)
            .collect()
    }
}
