//! Dense row-major float matrix with the handful of operations the
//! network needs: multiply, add, 2-D crossover and gaussian mutation.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EvoError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    columns: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Zero-filled `rows x columns` matrix.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns, data: vec![0.0; rows * columns] }
    }

    /// Column vector (`len x 1`) holding `values`.
    pub fn from_column(values: &[f32]) -> Self {
        Self { rows: values.len(), columns: 1, data: values.to_vec() }
    }

    /// Every cell drawn uniformly from `[min, max)`.
    pub fn random<R: Rng + ?Sized>(rows: usize, columns: usize, min: f32, max: f32, rng: &mut R) -> Self {
        let data = (0..rows * columns).map(|_| rng.gen_range(min..max)).collect();
        Self { rows, columns, data }
    }

    pub fn rows(&self) -> usize { self.rows }
    pub fn columns(&self) -> usize { self.columns }
    pub fn shape(&self) -> (usize, usize) { (self.rows, self.columns) }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.columns + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row * self.columns + col] = value;
    }

    pub fn values(&self) -> &[f32] {
        &self.data
    }

    /// `self * other`, shaped `(self.rows, other.columns)`.
    pub fn multiply(&self, other: &Matrix) -> Result<Matrix> {
        if self.columns != other.rows {
            return Err(EvoError::ShapeMismatch { op: "multiply", left: self.shape(), right: other.shape() });
        }
        let mut out = Matrix::new(self.rows, other.columns);
        for y in 0..out.rows {
            for x in 0..out.columns {
                let mut sum = 0.0f32;
                for k in 0..self.columns {
                    sum += self.get(y, k) * other.get(k, x);
                }
                out.set(y, x, sum);
            }
        }
        Ok(out)
    }

    /// Element-wise sum of two equally shaped matrices.
    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        if self.shape() != other.shape() {
            return Err(EvoError::ShapeMismatch { op: "add", left: self.shape(), right: other.shape() });
        }
        let data = self.data.iter().zip(&other.data).map(|(a, b)| a + b).collect();
        Ok(Matrix { rows: self.rows, columns: self.columns, data })
    }

    /// Applies `f` to every cell, producing a new matrix of the same shape.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Matrix {
        Matrix { rows: self.rows, columns: self.columns, data: self.data.iter().map(|&v| f(v)).collect() }
    }

    /// Single 2-D cut crossover.
    ///
    /// A cut `(r, c)` is drawn uniformly. Scanning row-major, every cell up to
    /// and including `(r, c)` comes from `self`, the rest from `other`.
    pub fn cross_with<R: Rng + ?Sized>(&self, other: &Matrix, rng: &mut R) -> Result<Matrix> {
        if self.shape() != other.shape() {
            return Err(EvoError::ShapeMismatch { op: "cross_with", left: self.shape(), right: other.shape() });
        }
        if self.data.is_empty() {
            return Ok(self.clone());
        }
        let cut_row = rng.gen_range(0..self.rows);
        let cut_col = rng.gen_range(0..self.columns);
        Ok(self.cross_at(other, cut_row, cut_col))
    }

    fn cross_at(&self, other: &Matrix, cut_row: usize, cut_col: usize) -> Matrix {
        let mut child = Matrix::new(self.rows, self.columns);
        for j in 0..self.rows {
            for i in 0..self.columns {
                let from_self = j < cut_row || (j == cut_row && i <= cut_col);
                let v = if from_self { self.get(j, i) } else { other.get(j, i) };
                child.set(j, i, v);
            }
        }
        child
    }

    /// Each cell, with probability `rate`, gets `N(0,1) * multiplier` added and
    /// is then clamped into `[min, max]`.
    pub fn mutate<R: Rng + ?Sized>(&mut self, min: f32, max: f32, multiplier: f32, rate: f32, rng: &mut R) {
        for v in self.data.iter_mut() {
            if rng.r#gen::<f32>() < rate {
                let n = standard_normal(rng) as f32;
                *v = (*v + n * multiplier).clamp(min, max);
            }
        }
    }

    /// Flattens a column vector.
    pub fn to_array(&self) -> Result<Vec<f32>> {
        if self.columns != 1 {
            return Err(EvoError::ShapeMismatch { op: "to_array", left: self.shape(), right: (self.rows, 1) });
        }
        Ok(self.data.clone())
    }
}

/// Box-Muller transform over two uniform draws in `(0, 1]`.
pub fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1 = 1.0 - rng.r#gen::<f64>();
    let u2 = 1.0 - rng.r#gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).sin()
}
