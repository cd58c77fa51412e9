//! Function analysis: derivative, critical points, and a sampled curve.

use tracing::debug;

use crate::error::AnalysisError;
use crate::expr::derive::differentiate;
use crate::expr::simplify::simplify;
use crate::expr::solve::real_roots;
use crate::expr::{compile, Expr};
use crate::model::{AnalysisResult, CriticalPoint, SampleCurve};

/// Sampling range and density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    /// Closed interval the curve is sampled on.
    pub domain: (f64, f64),
    /// Number of evenly spaced samples, endpoints included.
    pub samples: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            domain: (-10.0, 10.0),
            samples: 400,
        }
    }
}

/// Stateless analysis pipeline. Cheap to clone and safe to share.
#[derive(Debug, Clone, Default)]
pub struct ExpressionEngine {
    options: AnalysisOptions,
}

impl ExpressionEngine {
    pub fn new(options: AnalysisOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Parse `input`, differentiate it, find the critical points, and
    /// sample the function over the configured domain.
    ///
    /// Function values come from meval's evaluator on the text as typed;
    /// the simplified tree is only used for the derivative and the label.
    pub fn analyze(&self, input: &str) -> Result<AnalysisResult, AnalysisError> {
        let parsed = Expr::parse(input)?;
        let eval = compile(input)?;
        let function = simplify(&parsed);
        let derivative = simplify(&differentiate(&function));
        debug!(function = %function, derivative = %derivative, "differentiated");

        let critical_points = real_roots(&derivative, self.options.domain)
            .into_iter()
            .filter_map(|x| critical_point(&eval, x))
            .collect::<Vec<_>>();

        let curve = self.sample(&eval);
        if curve.finite_points().next().is_none() {
            let (from, to) = self.options.domain;
            return Err(AnalysisError::Evaluation { from, to });
        }

        Ok(AnalysisResult {
            expression_label: function.to_string(),
            derivative_text: derivative.to_string(),
            critical_points,
            curve,
        })
    }

    fn sample(&self, function: impl Fn(f64) -> f64) -> SampleCurve {
        let (from, to) = self.options.domain;
        let n = self.options.samples.max(2);
        let step = (to - from) / (n - 1) as f64;

        let xs: Vec<f64> = (0..n)
            .map(|i| if i + 1 == n { to } else { from + step * i as f64 })
            .collect();
        let ys = xs
            .iter()
            .map(|&x| {
                let y = function(x);
                if y.is_finite() {
                    y
                } else {
                    f64::NAN
                }
            })
            .collect();

        SampleCurve { xs, ys }
    }
}

/// Build the display record for a root of the derivative, or drop it when
/// the function itself is undefined there.
fn critical_point(function: impl Fn(f64) -> f64, x: f64) -> Option<CriticalPoint> {
    // Avoid printing "-0.00" for roots that are zero up to rounding
    let x = if x.abs() < 1e-9 { 0.0 } else { x };
    let value = function(x);
    if !value.is_finite() {
        debug!(x, "dropping critical point where the function is undefined");
        return None;
    }
    Some(CriticalPoint {
        x,
        formatted: format!("{x:.2}"),
        value,
    })
}
