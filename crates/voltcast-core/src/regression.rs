//! Multivariate linear regression
//!
//! Ordinary least squares with an optional ridge penalty, fitted on
//! standardized columns via the normal equations. Ill-conditioned systems are
//! reported as [`Error::NumericFit`] instead of producing garbage or panicking.

use crate::error::{Error, Result};

/// Pivots smaller than this are treated as singular
const SINGULAR_TOLERANCE: f64 = 1e-10;

/// Columns with a smaller standard deviation are treated as constant
const CONSTANT_COLUMN_TOLERANCE: f64 = 1e-12;

/// A fitted linear model y = intercept + Σ β_j · z_j, where z_j is the j-th
/// standardized feature.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    intercept: f64,
    coefficients: Vec<f64>,
    means: Vec<f64>,
    scales: Vec<f64>,
    r_squared: f64,
    n_observations: usize,
}

impl LinearModel {
    /// Fit the model. `rows[i]` is the feature row for `targets[i]`.
    ///
    /// `ridge` is scaled by the number of observations so its effect does
    /// not fade as the training window grows. A zero penalty with a constant
    /// column makes the system singular.
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], ridge: f64) -> Result<Self> {
        if rows.len() != targets.len() {
            return Err(Error::InvalidData(format!(
                "{} feature rows for {} targets",
                rows.len(),
                targets.len()
            )));
        }

        let n = rows.len();
        let p = rows.first().map(|r| r.len()).unwrap_or(0);
        if p == 0 || n <= p {
            return Err(Error::NumericFit(format!(
                "need more observations than parameters ({} rows, {} features)",
                n, p
            )));
        }
        if rows.iter().any(|r| r.len() != p) {
            return Err(Error::InvalidData("ragged feature rows".into()));
        }
        if rows.iter().flatten().chain(targets).any(|v| !v.is_finite()) {
            return Err(Error::NumericFit("non-finite value in training data".into()));
        }

        let nf = n as f64;
        let mut means = vec![0.0; p];
        let mut scales = vec![1.0; p];
        for j in 0..p {
            let mean = rows.iter().map(|r| r[j]).sum::<f64>() / nf;
            let variance = rows.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / nf;
            let std = variance.sqrt();
            means[j] = mean;
            if std > CONSTANT_COLUMN_TOLERANCE {
                scales[j] = std;
            }
        }

        let z: Vec<Vec<f64>> = rows
            .iter()
            .map(|r| {
                r.iter()
                    .enumerate()
                    .map(|(j, &x)| (x - means[j]) / scales[j])
                    .collect()
            })
            .collect();

        let y_mean = targets.iter().sum::<f64>() / nf;

        // Normal equations on centered data: (ZᵀZ + λnI) β = Zᵀ(y - ȳ)
        let mut gram = vec![vec![0.0; p]; p];
        let mut rhs = vec![0.0; p];
        for (row, &y) in z.iter().zip(targets) {
            let centered = y - y_mean;
            for a in 0..p {
                rhs[a] += row[a] * centered;
                for b in a..p {
                    gram[a][b] += row[a] * row[b];
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                gram[a][b] = gram[b][a];
            }
            gram[a][a] += ridge * nf;
        }

        let coefficients = solve(gram, rhs)?;

        let mut model = Self {
            intercept: y_mean,
            coefficients,
            means,
            scales,
            r_squared: 0.0,
            n_observations: n,
        };

        let ss_tot: f64 = targets.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = rows
            .iter()
            .zip(targets)
            .map(|(r, y)| (y - model.predict(r)).powi(2))
            .sum();

        if !ss_res.is_finite() {
            return Err(Error::NumericFit("non-finite residuals".into()));
        }

        model.r_squared = if ss_tot > CONSTANT_COLUMN_TOLERANCE {
            (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
        } else if ss_res <= 1e-9 {
            // Constant target reproduced exactly
            1.0
        } else {
            0.0
        };

        Ok(model)
    }

    /// Predict for one raw (unstandardized) feature row.
    ///
    /// Returns NaN when the row width does not match the fitted model.
    pub fn predict(&self, row: &[f64]) -> f64 {
        if row.len() != self.coefficients.len() {
            return f64::NAN;
        }

        self.intercept
            + row
                .iter()
                .enumerate()
                .map(|(j, &x)| self.coefficients[j] * (x - self.means[j]) / self.scales[j])
                .sum::<f64>()
    }

    /// Coefficient of determination on the training data, clamped to [0, 1]
    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }

    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }
}

/// Solve `a · x = b` by Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);

        let pivot = a[pivot_row][col];
        if !pivot.is_finite() || pivot.abs() < SINGULAR_TOLERANCE {
            return Err(Error::NumericFit(format!(
                "singular system at column {}",
                col
            )));
        }

        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(Error::NumericFit("non-finite coefficients".into()));
    }

    Ok(x)
}
