//! calcbot-render: plot rendering for analysed functions.
//!
//! Draws the sampled curve and its critical points with `plotters` into an
//! in-memory RGB buffer and encodes it as PNG. Nothing touches the disk.
//! Axis ticks and the legend use an embedded DejaVu Sans, so rendering does
//! not depend on fonts installed on the host.

pub mod plot;

pub use plot::{render, render_result, PlotOptions};

use thiserror::Error;

/// Errors from plot rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The curve has no finite sample to draw.
    #[error("nothing to plot: the curve has no finite points")]
    EmptyCurve,

    /// Width or height of zero.
    #[error("invalid image size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// The embedded font could not be loaded.
    #[error("the plot font could not be registered")]
    Font,

    /// The drawing backend failed.
    #[error("drawing failed: {0}")]
    Draw(String),

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}
