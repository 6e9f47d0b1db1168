//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of a fitted profile
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - measured samples: `o`
//! - fitted curve: `-` line
//! - sample with the largest absolute residual: `*`

use crate::fit::{FittedCurve, Residual};

/// Render measured points and the fitted curve over the sample window.
pub fn render_ascii_plot(
    residuals: &[Residual],
    curve: &FittedCurve,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = x_range(residuals).unwrap_or((0.0, 1.0));
    let curve_points = sample_curve(curve, x_min, x_max, width);

    let (y_min, y_max) = y_range(residuals, &curve_points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    draw_curve(&mut grid, &curve_points, x_min, x_max, y_min, y_max);

    let worst = residuals
        .iter()
        .enumerate()
        .filter(|(_, r)| r.residual.is_finite())
        .max_by(|(_, a), (_, b)| {
            a.residual
                .abs()
                .partial_cmp(&b.residual.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i);

    for (i, r) in residuals.iter().enumerate() {
        if !r.y_obs.is_finite() {
            continue;
        }
        let col = map_x(r.x, x_min, x_max, width);
        let row = map_y(r.y_obs, y_min, y_max, height);
        grid[row][col] = if Some(i) == worst { '*' } else { 'o' };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: x=[{x_min:.3}, {x_max:.3}] | y=[{y_min:.4}, {y_max:.4}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn x_range(residuals: &[Residual]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for r in residuals {
        min_x = min_x.min(r.x);
        max_x = max_x.max(r.x);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn sample_curve(curve: &FittedCurve, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = x_min + u * (x_max - x_min);
            (x, curve.evaluate(x))
        })
        .collect()
}

fn y_range(residuals: &[Residual], curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    let ys = residuals
        .iter()
        .map(|r| r.y_obs)
        .chain(curve.iter().map(|&(_, y)| y))
        .filter(|y| y.is_finite());
    for y in ys {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        // Flat profile: centre it.
        Some((min_y - 0.5, min_y + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CoefficientVector, FitPoint};

    #[test]
    fn plot_golden_snapshot_small() {
        let curve = FittedCurve::new(CoefficientVector::new(vec![1.0]));
        let points = [FitPoint { x: 0.0, y: 1.0 }, FitPoint { x: 9.0, y: 1.1 }];
        let residuals = curve.residuals(&points);

        let txt = render_ascii_plot(&residuals, &curve, 10, 5);
        let expected = concat!(
            "Plot: x=[0.000, 9.000] | y=[0.9950, 1.1050]\n",
            "         *\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn flat_profile_does_not_panic() {
        let curve = FittedCurve::new(CoefficientVector::new(vec![2.0]));
        let points: Vec<FitPoint> = (0..5).map(|i| FitPoint { x: i as f64, y: 2.0 }).collect();
        let txt = render_ascii_plot(&curve.residuals(&points), &curve, 20, 6);
        assert_eq!(txt.lines().count(), 7);
    }
}
