//! Binary classifier contract and the default logistic regression.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimilarityError};
use crate::vector::SparseVec;

/// Train/predict contract used by the tracking model.
pub trait Classifier {
    /// Fit on sparse rows of width `dims` with 0/1 labels.
    fn fit(&mut self, rows: &[SparseVec], dims: usize, labels: &[u8]) -> Result<()>;

    /// Probability of class 1.
    fn predict_proba(&self, row: &SparseVec) -> f64;

    fn predict(&self, row: &SparseVec) -> u8 {
        u8::from(self.predict_proba(row) >= 0.5)
    }
}

/// Logistic regression trained with full-batch gradient descent and an L2
/// penalty on the weights (not the bias).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticRegression {
    pub learning_rate: f64,
    pub l2: f64,
    pub epochs: usize,
    weights: Vec<f64>,
    bias: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            l2: 1e-4,
            epochs: 300,
            weights: Vec::new(),
            bias: 0.0,
        }
    }
}

impl LogisticRegression {
    pub fn new(learning_rate: f64, l2: f64, epochs: usize) -> Self {
        Self {
            learning_rate,
            l2,
            epochs,
            ..Default::default()
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    fn margin(&self, row: &SparseVec) -> f64 {
        self.bias
            + row
                .iter()
                .filter_map(|&(i, v)| self.weights.get(i as usize).map(|w| w * v))
                .sum::<f64>()
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, rows: &[SparseVec], dims: usize, labels: &[u8]) -> Result<()> {
        if rows.is_empty() {
            return Err(SimilarityError::Model("no training rows".to_string()));
        }
        if rows.len() != labels.len() {
            return Err(SimilarityError::Model(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        self.weights = vec![0.0; dims];
        self.bias = 0.0;
        let n = rows.len() as f64;

        for _ in 0..self.epochs {
            let mut grad = vec![0.0; dims];
            let mut grad_bias = 0.0;
            for (row, &label) in rows.iter().zip(labels) {
                let err = sigmoid(self.margin(row)) - f64::from(label);
                for &(i, v) in row {
                    if let Some(g) = grad.get_mut(i as usize) {
                        *g += err * v;
                    }
                }
                grad_bias += err;
            }
            for (w, g) in self.weights.iter_mut().zip(&grad) {
                *w -= self.learning_rate * (g / n + self.l2 * *w);
            }
            self.bias -= self.learning_rate * grad_bias / n;
        }
        Ok(())
    }

    fn predict_proba(&self, row: &SparseVec) -> f64 {
        sigmoid(self.margin(row))
    }
}
