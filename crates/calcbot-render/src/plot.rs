//! Function plot: curve with gaps, critical point markers, legend.

use std::fmt::Display;
use std::ops::Range;
use std::sync::OnceLock;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use plotters::prelude::*;
use plotters::style::register_font;
use tracing::{debug, error};

use calcbot_core::model::{AnalysisResult, CriticalPoint, SampleCurve};

use crate::RenderError;

/// Output image settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

fn draw_err(e: impl Display) -> RenderError {
    RenderError::Draw(e.to_string())
}

const FONT_FAMILY: &str = "sans-serif";
static FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

/// Register the embedded font under the family plotters uses for mesh
/// labels and legends. Runs once per process.
fn ensure_font() -> Result<(), RenderError> {
    let registered = *FONT_REGISTERED.get_or_init(|| {
        let ok = register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok();
        if !ok {
            error!("embedded plot font is not a valid font file");
        }
        ok
    });
    if registered {
        Ok(())
    } else {
        Err(RenderError::Font)
    }
}

/// Render an analysis result with its own label and points.
pub fn render_result(result: &AnalysisResult, options: &PlotOptions) -> Result<Vec<u8>, RenderError> {
    render(
        &result.curve,
        &result.critical_points,
        &result.expression_label,
        options,
    )
}

/// Draw `curve` labelled `label`, mark each critical point at `(x, f(x))`,
/// and return the PNG bytes.
///
/// Non-finite samples split the curve into separate segments instead of
/// being joined across.
pub fn render(
    curve: &SampleCurve,
    points: &[CriticalPoint],
    label: &str,
    options: &PlotOptions,
) -> Result<Vec<u8>, RenderError> {
    let PlotOptions { width, height } = *options;
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidSize { width, height });
    }

    let segments = segments(curve);
    if segments.is_empty() {
        return Err(RenderError::EmptyCurve);
    }
    ensure_font()?;
    let (x_range, y_range) = ranges(&segments, points);
    debug!(
        segments = segments.len(),
        points = points.len(),
        ?x_range,
        ?y_range,
        "rendering plot"
    );

    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(15)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, y_range)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .label_style((FONT_FAMILY, 14))
            .draw()
            .map_err(draw_err)?;

        for (i, segment) in segments.into_iter().enumerate() {
            let series = chart
                .draw_series(LineSeries::new(segment, BLUE.stroke_width(2)))
                .map_err(draw_err)?;
            // One legend entry for the whole curve
            if i == 0 {
                series
                    .label(label)
                    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
            }
        }

        chart
            .draw_series(PointSeries::of_element(
                points.iter().map(|p| (p.x, p.value)),
                5,
                &RED,
                &|c, s, st| EmptyElement::at(c) + Circle::new((0, 0), s, st.filled()),
            ))
            .map_err(draw_err)?;

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font((FONT_FAMILY, 16))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
    }

    encode_png(&buffer, width, height)
}

/// Runs of consecutive finite samples.
fn segments(curve: &SampleCurve) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();

    for (&x, &y) in curve.xs.iter().zip(&curve.ys) {
        if x.is_finite() && y.is_finite() {
            current.push((x, y));
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Axis ranges covering the curve and every marker, padded a little.
fn ranges(segments: &[Vec<(f64, f64)>], points: &[CriticalPoint]) -> (Range<f64>, Range<f64>) {
    let all = segments
        .iter()
        .flatten()
        .copied()
        .chain(points.iter().map(|p| (p.x, p.value)));

    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in all {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }

    (padded(x_min, x_max, 0.0), padded(y_min, y_max, 0.05))
}

fn padded(min: f64, max: f64, fraction: f64) -> Range<f64> {
    let span = max - min;
    if span <= f64::EPSILON * max.abs().max(1.0) {
        return (min - 1.0)..(max + 1.0);
    }
    let pad = span * fraction;
    (min - pad)..(max + pad)
}

fn encode_png(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(png)
}
