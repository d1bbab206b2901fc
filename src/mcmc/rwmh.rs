//! Random-walk Metropolis-Hastings over the free estimates.
use nalgebra::{DMatrix, DVector};
use ndarray::Array2;
use tracing::{debug, info};

use crate::{
    mcmc::{
        chain::{ChainLink, ChainState, ScoreBreakdown},
        config::{CovarianceAdjustment, McmcConfig, ProposalDistribution},
    },
    model::errors::{ModelError, ModelResult},
    optimization::covariance::to_dmatrix,
    rng::ModelRng,
};

const MAX_START_ATTEMPTS: usize = 1000;

/// Objective the chain samples from, `exp(-score)`.
pub trait McmcTarget {
    /// Fully re-evaluate the model at `values` (one per estimate).
    fn evaluate(&mut self, values: &[f64]) -> ModelResult<ScoreBreakdown>;
}

/// Where the chain starts and the space it moves in.
#[derive(Debug, Clone, Copy)]
pub struct ChainStart<'a> {
    pub values: &'a [f64],
    pub lower: &'a [f64],
    pub upper: &'a [f64],
    /// Estimates held at their starting value.
    pub fixed: &'a [bool],
    pub covariance: &'a Array2<f64>,
}

/// Run the chain and return the kept links.
///
/// Every proposal counts as an iteration; a proposal outside the bounds
/// is rejected without evaluating the model.
///
/// Errors
/// ------
/// - `Mcmc` for inconsistent dimensions, no sampled estimates, a
///   covariance that is not positive definite, or a start jitter that
///   never lands inside the bounds.
/// - Any error from [`McmcTarget::evaluate`] or the random draws.
pub fn run_rwmh<T: McmcTarget>(
    target: &mut T, config: &McmcConfig, start: ChainStart<'_>, rng: &mut ModelRng,
) -> ModelResult<Vec<ChainLink>> {
    config.validate()?;
    check_dimensions(&start)?;
    let moving: Vec<usize> = (0..start.values.len()).filter(|&i| !start.fixed[i]).collect();
    if moving.is_empty() {
        return Err(ModelError::Mcmc { reason: "every estimate is mcmc_fixed; nothing to sample".to_string() });
    }

    let covariance = adjust_covariance(config, &start, &moving);
    let cholesky = to_dmatrix(&covariance)
        .cholesky()
        .ok_or_else(|| ModelError::Mcmc { reason: "the covariance matrix is not positive definite".to_string() })?;
    let factor = cholesky.l();

    let mut step_size = config.step_size.unwrap_or(2.4 / (moving.len() as f64).sqrt());
    let mut current = start.values.to_vec();
    if config.start > 0.0 {
        current = jitter_start(config, &start, &moving, &factor, rng)?;
    }
    let mut current_scores = target.evaluate(&current)?;
    info!(estimates = moving.len(), step_size, score = current_scores.score, "MCMC starting");

    let mut chain = Vec::with_capacity(config.length / config.keep);
    let (mut accepted, mut accepted_since_adapt, mut jumps_since_adapt) = (0usize, 0usize, 0usize);
    for iteration in 1..=config.length {
        if config.adapt_stepsize_at.contains(&iteration) && jumps_since_adapt > 0 {
            let rate = accepted_since_adapt as f64 / jumps_since_adapt as f64;
            if rate > 0.5 {
                step_size *= 2.0;
            } else if rate < 0.2 {
                step_size /= 2.0;
            }
            info!(iteration, rate, step_size, "MCMC step size adapted");
            accepted_since_adapt = 0;
            jumps_since_adapt = 0;
        }

        jumps_since_adapt += 1;
        let candidate = propose(config, &current, &moving, &factor, step_size, rng)?;
        if within_bounds(&candidate, &start) {
            let proposed = target.evaluate(&candidate)?;
            let accept = proposed.score <= current_scores.score
                || rng.uniform() < (current_scores.score - proposed.score).exp();
            if accept {
                accepted += 1;
                accepted_since_adapt += 1;
                current = candidate;
                current_scores = proposed;
            }
            debug!(iteration, score = proposed.score, accept, "MCMC jump");
        } else {
            debug!(iteration, "MCMC jump rejected: outside bounds");
        }

        if iteration % config.keep == 0 {
            chain.push(ChainLink {
                iteration,
                state: if iteration > config.burn_in { ChainState::Mcmc } else { ChainState::BurnIn },
                score: current_scores.score,
                likelihood: current_scores.likelihood,
                prior: current_scores.prior,
                penalty: current_scores.penalty,
                additional_prior: current_scores.additional_prior,
                jacobian: current_scores.jacobian,
                acceptance_rate: accepted as f64 / iteration as f64,
                acceptance_rate_since_adapt: accepted_since_adapt as f64 / jumps_since_adapt as f64,
                step_size,
                values: current.clone(),
            });
        }
    }
    info!(links = chain.len(), acceptance = accepted as f64 / config.length as f64, "MCMC finished");
    Ok(chain)
}

// ---- Helper methods ----

fn check_dimensions(start: &ChainStart<'_>) -> ModelResult<()> {
    let n = start.values.len();
    if start.lower.len() != n || start.upper.len() != n || start.fixed.len() != n {
        return Err(ModelError::Mcmc { reason: format!("expected bounds and flags for {n} estimates") });
    }
    if start.covariance.dim() != (n, n) {
        return Err(ModelError::Mcmc {
            reason: format!("covariance matrix is {:?}, expected ({n}, {n})", start.covariance.dim()),
        });
    }
    Ok(())
}

/// Sub-covariance of the sampled estimates, conditioned per `config`.
fn adjust_covariance(config: &McmcConfig, start: &ChainStart<'_>, moving: &[usize]) -> Array2<f64> {
    let m = moving.len();
    let mut cov = Array2::from_shape_fn((m, m), |(i, j)| start.covariance[[moving[i], moving[j]]]);
    if config.covariance_adjustment == CovarianceAdjustment::None {
        return cov;
    }
    if config.covariance_adjustment == CovarianceAdjustment::Correlation {
        for i in 0..m {
            for j in 0..i {
                let bound = config.max_correlation * (cov[[i, i]] * cov[[j, j]]).max(0.0).sqrt();
                if cov[[i, j]].abs() > bound {
                    let clamped = bound.copysign(cov[[i, j]]);
                    cov[[i, j]] = clamped;
                    cov[[j, i]] = clamped;
                }
            }
        }
    }
    for (k, &i) in moving.iter().enumerate() {
        let floor = (config.correlation_adjustment_diff * (start.upper[i] - start.lower[i])).powi(2);
        if cov[[k, k]] < floor {
            cov[[k, k]] = floor;
        }
    }
    cov
}

fn propose(
    config: &McmcConfig, current: &[f64], moving: &[usize], factor: &DMatrix<f64>, step_size: f64,
    rng: &mut ModelRng,
) -> ModelResult<Vec<f64>> {
    let z = DVector::from_fn(moving.len(), |_, _| rng.standard_normal());
    let weight = match config.proposal_distribution {
        ProposalDistribution::Normal => 1.0,
        ProposalDistribution::T { df } => {
            let chi2 = 2.0 * rng.gamma(df / 2.0)?;
            (df / chi2).sqrt()
        }
    };
    let jump = factor * z * (step_size * weight);
    let mut candidate = current.to_vec();
    for (k, &i) in moving.iter().enumerate() {
        candidate[i] += jump[k];
    }
    Ok(candidate)
}

fn within_bounds(candidate: &[f64], start: &ChainStart<'_>) -> bool {
    candidate.iter().zip(start.lower.iter().zip(start.upper)).all(|(v, (lo, hi))| lo <= v && v <= hi)
}

fn jitter_start(
    config: &McmcConfig, start: &ChainStart<'_>, moving: &[usize], factor: &DMatrix<f64>, rng: &mut ModelRng,
) -> ModelResult<Vec<f64>> {
    for _ in 0..MAX_START_ATTEMPTS {
        let candidate = propose(config, start.values, moving, factor, config.start, rng)?;
        if within_bounds(&candidate, start) {
            return Ok(candidate);
        }
    }
    Err(ModelError::Mcmc {
        reason: format!("no start point inside the bounds after {MAX_START_ATTEMPTS} jittered draws"),
    })
}
