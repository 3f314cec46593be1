//! Latent Dirichlet allocation fitted with batch variational Bayes.
//!
//! Each pass runs the per-document E-step over the whole corpus,
//! accumulates sufficient statistics, and replaces the topic-word
//! parameters `lambda = eta + sstats`. Priors are symmetric:
//! `alpha = eta = 1 / num_topics`.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::corpus::BagOfWords;
use crate::error::{Result, SimilarityError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LdaParams {
    pub num_topics: usize,
    pub passes: usize,
    /// Maximum E-step iterations per document.
    pub iterations: usize,
    /// Mean absolute change in gamma that stops the E-step.
    pub gamma_threshold: f64,
    /// Topic weights below this are zeroed in document distributions.
    pub minimum_probability: f64,
}

impl Default for LdaParams {
    fn default() -> Self {
        Self {
            num_topics: 100,
            passes: 10,
            iterations: 50,
            gamma_threshold: 0.001,
            minimum_probability: 0.01,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "LdaState", into = "LdaState")]
pub struct LdaModel {
    params: LdaParams,
    alpha: f64,
    eta: f64,
    /// `num_topics x num_terms` variational topic-word parameters.
    lambda: Array2<f64>,
    /// `exp(E[log beta])`, derived from `lambda`.
    exp_elog_beta: Array2<f64>,
}

/// Persisted form; the derived matrix is rebuilt on load.
#[derive(Clone, Serialize, Deserialize)]
struct LdaState {
    params: LdaParams,
    alpha: f64,
    eta: f64,
    lambda: Array2<f64>,
}

impl From<LdaState> for LdaModel {
    fn from(state: LdaState) -> Self {
        let exp_elog_beta = exp_dirichlet_expectation(&state.lambda);
        Self {
            params: state.params,
            alpha: state.alpha,
            eta: state.eta,
            lambda: state.lambda,
            exp_elog_beta,
        }
    }
}

impl From<LdaModel> for LdaState {
    fn from(model: LdaModel) -> Self {
        Self {
            params: model.params,
            alpha: model.alpha,
            eta: model.eta,
            lambda: model.lambda,
        }
    }
}

impl LdaModel {
    pub fn train(bows: &[BagOfWords], num_terms: usize, params: &LdaParams, seed: u64) -> Result<Self> {
        if num_terms == 0 {
            return Err(SimilarityError::InsufficientVocabulary(
                "topic model needs at least one term".to_string(),
            ));
        }
        let k = params.num_topics.max(1);
        let mut rng = StdRng::seed_from_u64(seed);
        let lambda = Array2::from_shape_fn((k, num_terms), |_| rng.gen_range(0.9..1.1));

        let mut model = LdaModel::from(LdaState {
            params: params.clone(),
            alpha: 1.0 / k as f64,
            eta: 1.0 / k as f64,
            lambda,
        });

        for pass in 0..params.passes {
            let mut sstats = Array2::<f64>::zeros((k, num_terms));
            for bow in bows {
                model.e_step(bow, Some(&mut sstats));
            }
            sstats *= &model.exp_elog_beta;
            model.lambda = sstats.mapv(|s| s + model.eta);
            model.exp_elog_beta = exp_dirichlet_expectation(&model.lambda);
            tracing::debug!(pass, "topic model pass complete");
        }

        tracing::info!(topics = k, terms = num_terms, passes = params.passes, "topic model trained");
        Ok(model)
    }

    pub fn num_topics(&self) -> usize {
        self.lambda.nrows()
    }

    /// Normalized topic mixture of a document.
    pub fn infer(&self, bow: &BagOfWords) -> Vec<f64> {
        let gamma = self.e_step(bow, None);
        let total = gamma.sum();
        gamma.iter().map(|g| g / total).collect()
    }

    /// Dense topic distribution with weights under `minimum_probability` zeroed.
    pub fn topic_distribution(&self, bow: &BagOfWords) -> Vec<f64> {
        self.infer(bow)
            .into_iter()
            .map(|p| if p < self.params.minimum_probability { 0.0 } else { p })
            .collect()
    }

    fn e_step(&self, bow: &BagOfWords, sstats: Option<&mut Array2<f64>>) -> Array1<f64> {
        let k = self.num_topics();
        let mut gamma = Array1::<f64>::ones(k);
        let elog_beta = &self.exp_elog_beta;

        let ids: Vec<usize> = bow
            .iter()
            .map(|&(id, _)| id as usize)
            .filter(|&id| id < elog_beta.ncols())
            .collect();
        if ids.is_empty() {
            return gamma;
        }
        let counts: Array1<f64> = bow
            .iter()
            .filter(|&&(id, _)| (id as usize) < elog_beta.ncols())
            .map(|&(_, c)| c as f64)
            .collect();

        let beta_d = elog_beta.select(Axis(1), &ids);
        let mut exp_elog_theta = dirichlet_expectation(&gamma).mapv(f64::exp);
        let mut phinorm = exp_elog_theta.dot(&beta_d) + 1e-100;

        for _ in 0..self.params.iterations {
            let last = gamma.clone();
            let ratio = &counts / &phinorm;
            gamma = &exp_elog_theta * &beta_d.dot(&ratio) + self.alpha;
            exp_elog_theta = dirichlet_expectation(&gamma).mapv(f64::exp);
            phinorm = exp_elog_theta.dot(&beta_d) + 1e-100;
            let change = (&gamma - &last).mapv(f64::abs).mean().unwrap_or(0.0);
            if change < self.params.gamma_threshold {
                break;
            }
        }

        if let Some(sstats) = sstats {
            let ratio = &counts / &phinorm;
            for (t, &id) in ids.iter().enumerate() {
                let mut col = sstats.column_mut(id);
                col.scaled_add(ratio[t], &exp_elog_theta);
            }
        }
        gamma
    }
}

/// Row-wise `exp(psi(x) - psi(sum(row)))`.
fn exp_dirichlet_expectation(lambda: &Array2<f64>) -> Array2<f64> {
    let mut out = lambda.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let psi_total = digamma(row.sum());
        row.mapv_inplace(|x| (digamma(x) - psi_total).exp());
    }
    out
}

fn dirichlet_expectation(alpha: &Array1<f64>) -> Array1<f64> {
    let psi_total = digamma(alpha.sum());
    alpha.mapv(|a| digamma(a) - psi_total)
}

/// Digamma function: recurrence up to `x >= 6`, then the asymptotic series.
pub fn digamma(mut x: f64) -> f64 {
    if x <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let f = 1.0 / (x * x);
    result + x.ln()
        - 0.5 / x
        - f * (1.0 / 12.0 - f * (1.0 / 120.0 - f * (1.0 / 252.0 - f * (1.0 / 240.0 - f / 132.0))))
}
