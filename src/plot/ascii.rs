//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid with a log-scaled contrast axis, optimized for
//! quick sanity checks and deterministic output (golden tests).
//!
//! Plot elements:
//! - observed responses: `o`
//! - fitted curve: `-` line

use crate::domain::{CurveFile, SubjectFit};
use crate::error::AppError;
use crate::fit::evaluate_curve;
use crate::math::log_space;

/// Render an in-memory fit: observed samples over the model curve.
pub fn render_fit_plot(
    fit: &SubjectFit,
    contrasts: &[f64],
    width: usize,
    height: usize,
) -> Result<String, AppError> {
    let (c_min, c_max) = x_range(contrasts).unwrap_or((0.05, 0.8));
    let grid = log_space(c_min, c_max, width.max(2))?;
    let curve: Vec<(f64, f64)> = grid
        .iter()
        .copied()
        .zip(evaluate_curve(&fit.result.params, &grid))
        .collect();
    let points: Vec<(f64, f64)> = contrasts
        .iter()
        .copied()
        .zip(fit.record.responses.iter().copied())
        .collect();
    Ok(render_plot(&points, &curve, c_min, c_max, width, height))
}

/// Render a saved curve file (observed samples + precomputed grid).
pub fn render_curve_file_plot(curve: &CurveFile, width: usize, height: usize) -> String {
    let xs: Vec<f64> = curve
        .grid
        .contrast
        .iter()
        .chain(&curve.observed.contrast)
        .copied()
        .collect();
    let (c_min, c_max) = x_range(&xs).unwrap_or((0.05, 0.8));
    let pairs = |g: &crate::domain::CurveGrid| -> Vec<(f64, f64)> {
        g.contrast.iter().copied().zip(g.response.iter().copied()).collect()
    };
    render_plot(&pairs(&curve.observed), &pairs(&curve.grid), c_min, c_max, width, height)
}

fn render_plot(
    points: &[(f64, f64)],
    curve: &[(f64, f64)],
    c_min: f64,
    c_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(points, curve).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    draw_curve(&mut grid, curve, c_min, c_max, y_min, y_max);

    for &(c, y) in points {
        if !(c > 0.0 && y.is_finite()) {
            continue;
        }
        let x = map_x(c, c_min, c_max, width);
        let yy = map_y(y, y_min, y_max, height);
        grid[yy][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: contrast=[{c_min:.3}, {c_max:.3}] (log) | response=[{y_min:.3}, {y_max:.3}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn x_range(xs: &[f64]) -> Option<(f64, f64)> {
    let (min, max) = xs
        .iter()
        .filter(|c| **c > 0.0 && c.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| (lo.min(c), hi.max(c)));
    (min.is_finite() && max > min).then_some((min, max))
}

fn y_range(points: &[(f64, f64)], curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    let (min, max) = points
        .iter()
        .chain(curve)
        .map(|&(_, y)| y)
        .filter(|y| y.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
    (min.is_finite() && max > min).then_some((min, max))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(c: f64, c_min: f64, c_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((c.ln() - c_min.ln()) / (c_max.ln() - c_min.ln())).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], c_min: f64, c_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(c, y) in curve {
        if !(c > 0.0 && y.is_finite()) {
            continue;
        }
        let x = map_x(c, c_min, c_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
