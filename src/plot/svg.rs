//! Per-subject SVG figures (Plotters).
//!
//! One figure per fitted subject: the model at the measured contrasts with the
//! residual segments, the data as crosses, the model on the fine grid as a
//! dashed line and the parameter values as text. The contrast axis is
//! log-scaled.

use std::error::Error;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::info;

use crate::domain::{ExportConfig, SubjectFit};
use crate::error::AppError;
use crate::fit::evaluate_curve;
use crate::math::log_space;

const FIGURE_SIZE: (u32, u32) = (800, 600);

/// `{subject}_{source}`: figure title and file stem.
pub fn figure_title(subject: &str, export: &ExportConfig) -> String {
    format!("{subject}_{}", export.source_label)
}

/// Write the figure of one subject into `out_dir`; returns the file path.
pub fn write_fit_svg(
    out_dir: &Path,
    fit: &SubjectFit,
    contrasts: &[f64],
    export: &ExportConfig,
) -> Result<PathBuf, AppError> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| AppError::new(2, format!("Failed to create `{}`: {e}", out_dir.display())))?;
    let title = figure_title(&fit.record.subject, export);
    let path = out_dir.join(format!("{title}.svg"));

    draw_fit(&path, &title, fit, contrasts, export)
        .map_err(|e| AppError::new(2, format!("Failed to draw `{}`: {e}", path.display())))?;
    info!(subject = %fit.record.subject, path = %path.display(), "wrote figure");
    Ok(path)
}

fn draw_fit(
    path: &Path,
    title: &str,
    fit: &SubjectFit,
    contrasts: &[f64],
    export: &ExportConfig,
) -> Result<(), Box<dyn Error>> {
    let p = &fit.result.params;
    let observed = &fit.record.responses;
    let fitted = evaluate_curve(p, contrasts);
    let fine_x = log_space(export.grid_min, export.grid_max, export.grid_points.max(2))?;
    let fine_y = evaluate_curve(p, &fine_x);

    let (x_min, x_max) = contrasts
        .iter()
        .chain(&fine_x)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| (lo.min(c), hi.max(c)));
    let (y_min, y_max) = observed
        .iter()
        .chain(&fitted)
        .chain(&fine_y)
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !(x_min > 0.0 && x_max > x_min && y_max >= y_min) {
        return Err("no finite data to plot".into());
    }
    let pad = ((y_max - y_min) * 0.1).max(1e-6);

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            ((x_min * 0.8)..(x_max * 1.25)).log_scale(),
            (y_min - pad)..(y_max + pad),
        )?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("contrast")
        .y_desc("response (pT)")
        .x_label_formatter(&|v| format!("{:.0}%", v * 100.0))
        .draw()?;

    // Guides at the measured contrasts.
    let (y_lo, y_hi) = (y_min - pad, y_max + pad);
    chart.draw_series(
        contrasts
            .iter()
            .map(|&c| PathElement::new(vec![(c, y_lo), (c, y_hi)], BLACK.mix(0.1))),
    )?;

    chart.draw_series(DashedLineSeries::new(
        fine_x.iter().copied().zip(fine_y.iter().copied()),
        6,
        4,
        RGBColor(120, 120, 120).stroke_width(1),
    ))?;

    chart.draw_series(LineSeries::new(
        contrasts.iter().copied().zip(fitted.iter().copied()),
        BLUE.stroke_width(2),
    ))?;

    chart.draw_series(
        contrasts
            .iter()
            .zip(observed)
            .zip(&fitted)
            .map(|((&c, &o), &f)| PathElement::new(vec![(c, o), (c, f)], RED.mix(0.7))),
    )?;

    chart.draw_series(
        contrasts
            .iter()
            .zip(observed)
            .map(|(&c, &o)| Cross::new((c, o), 5, BLACK.stroke_width(2))),
    )?;

    let text = format!(
        "semi={:.3}  Rmax={:.3}  s={:.3}  b={:.3}  R²={:.3}",
        p.semisaturation,
        p.max_amplitude,
        p.saturation_exponent,
        p.baseline,
        fit.result.quality.r_squared
    );
    root.draw(&Text::new(text, (80, 45), ("sans-serif", 14).into_font()))?;

    root.present()?;
    Ok(())
}
