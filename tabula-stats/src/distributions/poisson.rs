//! Poisson distribution

use crate::helpers::{number_result, read_args};
use crate::solver::{invert, search_quantile, SolverConfig};
use crate::special::gammln;
use tabula_core::{Checks, DomainError};
use tabula_plugin::prelude::*;

/// Largest double below 1; a sum landing here is treated as exactly 1
const ALMOST_ONE: f64 = 0.9999999999999999;

/// P(X = k) for X ~ Poisson(mean)
pub fn poisson_pmf(k: u64, mean: f64) -> Result<f64, DomainError> {
    validate(mean)?;
    Ok(mass(k, mean))
}

/// P(X ≤ k) for X ~ Poisson(mean)
pub fn poisson_cdf(k: u64, mean: f64) -> Result<f64, DomainError> {
    validate(mean)?;
    Ok(cumulative(k, mean))
}

pub fn poisson_dist(k: u64, mean: f64, cumulative: bool) -> Result<f64, DomainError> {
    if cumulative {
        poisson_cdf(k, mean)
    } else {
        poisson_pmf(k, mean)
    }
}

/// Smallest k with P(X ≤ k) ≥ `prob`; +∞ when `prob` is 1
pub fn poisson_inv(prob: f64, mean: f64) -> Result<f64, DomainError> {
    let mut checks = Checks::new();
    checks
        .probability("probability", prob)
        .non_negative("mean", mean)
        .finite("mean", mean);
    checks.finish()?;

    if prob == 0.0 {
        return Ok(0.0);
    }
    if prob == 1.0 {
        return Ok(f64::INFINITY);
    }
    Ok(search_quantile(prob, None, |k| cumulative(k, mean)) as f64)
}

/// Mean rate at which P(X ≤ k) = `prob`
pub fn poisson_invp(k: u64, prob: f64) -> Result<f64, DomainError> {
    let mut checks = Checks::new();
    checks.probability("probability", prob);
    checks.finish()?;

    if prob == 1.0 {
        return Ok(0.0);
    }
    if prob == 0.0 {
        return Ok(f64::INFINITY);
    }
    let guess = k as f64 + 1.0;
    Ok(invert(
        1.0 - prob,
        |mean| 1.0 - cumulative(k, mean),
        |_| guess,
        &SolverConfig::RATE,
    ))
}

fn validate(mean: f64) -> Result<(), DomainError> {
    let mut checks = Checks::new();
    checks.non_negative("mean", mean).finite("mean", mean);
    checks.finish()
}

pub(crate) fn mass(k: u64, mean: f64) -> f64 {
    if mean == 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    let k = k as f64;
    (k * mean.ln() - mean - gammln(k + 1.0)).exp()
}

pub(crate) fn cumulative(k: u64, mean: f64) -> f64 {
    let sum: f64 = (0..=k).rev().map(|j| mass(j, mean)).sum();
    if sum == ALMOST_ONE {
        1.0
    } else {
        sum.min(1.0)
    }
}

// ============ Plugins ============

pub struct PoissonDist;

static POISSON_DIST_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("events", "Number", "Number of events k"),
    ArgMeta::required("mean", "Number", "Expected number of events"),
    ArgMeta::optional("cumulative", "Bool", "P(X ≤ k) instead of P(X = k)", "false"),
];

static POISSON_DIST_EXAMPLES: [&str; 2] = [
    "poisson_dist(2, 3) → 0.2240",
    "poisson_dist(2, 3, true) → 0.4232",
];

static POISSON_DIST_RELATED: [&str; 3] = ["poisson_inv", "poisson_conf", "binom_dist"];

impl FunctionPlugin for PoissonDist {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "poisson_dist",
            description: "Poisson probability mass or cumulative distribution",
            usage: "poisson_dist(events, mean, [cumulative])",
            args: &POISSON_DIST_ARGS,
            returns: "Number",
            examples: &POISSON_DIST_EXAMPLES,
            category: "stats/distribution",
            related: &POISSON_DIST_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("poisson_dist", args, 2, 3, |a| {
            (a.whole(0, "events"), a.number(1, "mean"), a.flag(2, "cumulative", false))
        });
        match parsed {
            Ok((k, mean, cumulative)) => number_result("poisson_dist", poisson_dist(k, mean, cumulative)),
            Err(e) => Value::Error(e),
        }
    }
}

pub struct PoissonInv;

static POISSON_INV_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("probability", "Number", "Cumulative probability"),
    ArgMeta::required("mean", "Number", "Expected number of events"),
];

static POISSON_INV_EXAMPLES: [&str; 1] = ["poisson_inv(0.5, 4) → 4"];

static POISSON_INV_RELATED: [&str; 2] = ["poisson_dist", "poisson_invp"];

impl FunctionPlugin for PoissonInv {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "poisson_inv",
            description: "Smallest event count whose cumulative probability reaches the given level",
            usage: "poisson_inv(probability, mean)",
            args: &POISSON_INV_ARGS,
            returns: "Number",
            examples: &POISSON_INV_EXAMPLES,
            category: "stats/distribution",
            related: &POISSON_INV_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("poisson_inv", args, 2, 2, |a| {
            (a.number(0, "probability"), a.number(1, "mean"))
        });
        match parsed {
            Ok((prob, mean)) => number_result("poisson_inv", poisson_inv(prob, mean)),
            Err(e) => Value::Error(e),
        }
    }
}

pub struct PoissonInvp;

static POISSON_INVP_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("events", "Number", "Number of events k"),
    ArgMeta::required("probability", "Number", "Target cumulative probability P(X ≤ k)"),
];

static POISSON_INVP_EXAMPLES: [&str; 1] = ["poisson_invp(0, 0.5) → 0.6931"];

static POISSON_INVP_RELATED: [&str; 3] = ["poisson_inv", "poisson_conf", "binom_invp"];

impl FunctionPlugin for PoissonInvp {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "poisson_invp",
            description: "Mean rate at which P(X ≤ k) equals the given level",
            usage: "poisson_invp(events, probability)",
            args: &POISSON_INVP_ARGS,
            returns: "Number",
            examples: &POISSON_INVP_EXAMPLES,
            category: "stats/distribution",
            related: &POISSON_INVP_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("poisson_invp", args, 2, 2, |a| {
            (a.whole(0, "events"), a.number(1, "probability"))
        });
        match parsed {
            Ok((k, prob)) => number_result("poisson_invp", poisson_invp(k, prob)),
            Err(e) => Value::Error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn eval_ctx() -> EvalContext {
        EvalContext::new(Arc::new(PluginRegistry::new()))
    }

    #[test]
    fn test_pmf() {
        // e^{-3} 3^2 / 2
        let expected = (-3.0_f64).exp() * 4.5;
        assert!((poisson_pmf(2, 3.0).unwrap() - expected).abs() < 1e-10);
        assert_eq!(poisson_pmf(0, 0.0).unwrap(), 1.0);
        assert_eq!(poisson_pmf(3, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_cdf() {
        let expected = (-3.0_f64).exp() * (1.0 + 3.0 + 4.5);
        assert!((poisson_cdf(2, 3.0).unwrap() - expected).abs() < 1e-10);
        assert!((poisson_cdf(4, 4.0).unwrap() - 0.6288369351798737).abs() < 1e-9);
    }

    #[test]
    fn test_cdf_reaches_one() {
        assert!((poisson_cdf(60, 2.0).unwrap() - 1.0).abs() < 1e-12);
        let total: f64 = (0..200).map(|k| poisson_pmf(k, 25.0).unwrap()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cdf_one_ulp_short_is_one() {
        // The raw sum for k = 19, mean 1.5 stops one ulp below 1
        let raw: f64 = (0..=19u64).rev().map(|j| mass(j, 1.5)).sum();
        assert_eq!(raw, ALMOST_ONE);
        assert_eq!(poisson_cdf(19, 1.5).unwrap(), 1.0);
        assert!(poisson_cdf(18, 1.5).unwrap() < 1.0);
    }

    #[test]
    fn test_domain() {
        assert!(poisson_pmf(1, -1.0).is_err());
        assert!(poisson_cdf(1, f64::NAN).is_err());
        assert!(poisson_inv(2.0, 1.0).is_err());
    }

    #[test]
    fn test_inv() {
        assert_eq!(poisson_inv(0.5, 4.0).unwrap(), 4.0);
        assert_eq!(poisson_inv(0.9, 4.0).unwrap(), 7.0);
        assert_eq!(poisson_inv(0.01, 4.0).unwrap(), 0.0);
        assert_eq!(poisson_inv(0.999, 4.0).unwrap(), 11.0);
        assert_eq!(poisson_inv(0.5, 1000.0).unwrap(), 1000.0);
    }

    #[test]
    fn test_inv_boundaries() {
        assert_eq!(poisson_inv(0.0, 4.0).unwrap(), 0.0);
        assert_eq!(poisson_inv(1.0, 4.0).unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_invp_round_trip() {
        for &(k, prob) in &[(0u64, 0.5), (3, 0.9), (10, 0.025), (10, 0.975)] {
            let mean = poisson_invp(k, prob).unwrap();
            assert!((poisson_cdf(k, mean).unwrap() - prob).abs() < 1e-8, "k={} prob={}", k, prob);
        }
        assert!((poisson_invp(0, 0.5).unwrap() - 2.0_f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_invp_boundaries() {
        assert_eq!(poisson_invp(3, 1.0).unwrap(), 0.0);
        assert_eq!(poisson_invp(3, 0.0).unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_plugin_dist_defaults_to_mass() {
        let ctx = eval_ctx();
        let args = vec![Value::Number(2.0), Value::Number(3.0)];
        let mass = PoissonDist.call(&args, &ctx).as_number().unwrap();
        assert!((mass - (-3.0_f64).exp() * 4.5).abs() < 1e-10);
    }

    #[test]
    fn test_plugin_inv_infinite_quantile() {
        let ctx = eval_ctx();
        let args = vec![Value::Number(1.0), Value::Number(3.0)];
        assert_eq!(PoissonInv.call(&args, &ctx).as_number(), Some(f64::INFINITY));
    }
}
