//! Module containing miscellaneous utility functions.

use crate::imports::*;

/// Returns true when `val1` and `val2` are within a relative difference of `epsilon`
/// (default 1e-8), or both are within `epsilon` of zero.
pub fn almost_eq(val1: f64, val2: f64, epsilon: Option<f64>) -> bool {
    let epsilon = epsilon.unwrap_or(1e-8);
    ((val2 - val1) / (val1 + val2)).abs() < epsilon || (val2 - val1).abs() < epsilon
}

/// Returns true if values are non-decreasing
pub fn is_sorted(data: &[f64]) -> bool {
    data.windows(2).all(|w| w[0] <= w[1])
}

/// Linear interpolation of `y` over `x` at `x_val`.  Outside of the range of `x`, the first or
/// last segment is extrapolated when `extrapolate` is true and the end value is held otherwise.
///
/// # Arguments
/// - `x_val`: point at which to interpolate
/// - `x`: strictly increasing abscissa
/// - `y`: ordinate, same length as `x`
/// - `extrapolate`: whether to continue the end segments past the table
pub fn interp1d(x_val: f64, x: &[f64], y: &[f64], extrapolate: bool) -> anyhow::Result<f64> {
    ensure!(
        x.len() == y.len(),
        "{}\nInterpolation arrays must have equal length: {} vs {}",
        format_dbg!(),
        x.len(),
        y.len()
    );
    ensure!(!x.is_empty(), "{}\nCannot interpolate an empty table", format_dbg!());
    if x.len() == 1 {
        return Ok(y[0]);
    }
    let last = x.len() - 1;
    let idx = if x_val <= x[0] {
        if !extrapolate {
            return Ok(y[0]);
        }
        0
    } else if x_val >= x[last] {
        if !extrapolate {
            return Ok(y[last]);
        }
        last - 1
    } else {
        // index of the segment containing `x_val`
        x.partition_point(|xi| *xi <= x_val) - 1
    };
    let dx = x[idx + 1] - x[idx];
    ensure!(
        dx > 0.0,
        "{}\nInterpolation abscissa must be strictly increasing",
        format_dbg!()
    );
    Ok(y[idx] + (y[idx + 1] - y[idx]) * (x_val - x[idx]) / dx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interp1d_inside_and_outside() {
        let x = [0.0, 10.0, 20.0];
        let y = [0.0, 100.0, 150.0];
        assert!(almost_eq(interp1d(5.0, &x, &y, false).unwrap(), 50.0, None));
        assert!(almost_eq(interp1d(15.0, &x, &y, false).unwrap(), 125.0, None));
        assert!(almost_eq(interp1d(30.0, &x, &y, false).unwrap(), 150.0, None));
        assert!(almost_eq(interp1d(30.0, &x, &y, true).unwrap(), 200.0, None));
        assert!(almost_eq(interp1d(-10.0, &x, &y, true).unwrap(), -100.0, None));
        assert!(almost_eq(interp1d(10.0, &x, &y, true).unwrap(), 100.0, None));
    }

    #[test]
    fn test_interp1d_rejects_mismatched_lengths() {
        assert!(interp1d(1.0, &[0.0, 1.0], &[0.0], false).is_err());
    }

    #[test]
    fn test_is_sorted() {
        assert!(is_sorted(&[0.0, 0.0, 1.0]));
        assert!(!is_sorted(&[1.0, 0.0]));
    }
}
