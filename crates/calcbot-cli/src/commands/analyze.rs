//! The `calcbot analyze` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use calcbot_core::analysis::ExpressionEngine;
use calcbot_core::model::AnalysisResult;
use calcbot_render::PlotOptions;

pub fn execute(
    function: String,
    plot: Option<PathBuf>,
    width: u32,
    height: u32,
    json: bool,
) -> Result<()> {
    let result = ExpressionEngine::default()
        .analyze(&function)
        .with_context(|| format!("failed to analyse '{function}'"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if let Some(path) = plot {
        let png = calcbot_render::render_result(&result, &PlotOptions { width, height })
            .context("failed to render plot")?;
        std::fs::write(&path, png)
            .with_context(|| format!("failed to write plot: {}", path.display()))?;
        eprintln!("Plot saved to: {}", path.display());
    }

    Ok(())
}

fn print_result(result: &AnalysisResult) {
    use comfy_table::{Cell, Table};

    println!("Function:   {}", result.expression_label);
    println!("Derivative: {}", result.derivative_text);

    if result.critical_points.is_empty() {
        println!("No critical points.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "x", "f(x)"]);
    for (i, point) in result.critical_points.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&point.formatted),
            Cell::new(format!("{:.4}", point.value)),
        ]);
    }
    println!("{table}");
}
