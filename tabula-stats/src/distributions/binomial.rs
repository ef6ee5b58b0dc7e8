//! Binomial distribution

use crate::combinatorics::ratio_product;
use crate::helpers::{number_result, read_args};
use crate::solver::{invert, search_quantile, SolverConfig};
use crate::special::gammln;
use tabula_core::{Checks, DomainError};
use tabula_plugin::prelude::*;

/// P(X = k) for X ~ Binomial(n, p)
pub fn binom_pmf(k: u64, n: u64, p: f64) -> Result<f64, DomainError> {
    validate(k, n, p)?;
    Ok(mass(k, n, p))
}

/// P(X ≤ k) for X ~ Binomial(n, p)
pub fn binom_cdf(k: u64, n: u64, p: f64) -> Result<f64, DomainError> {
    validate(k, n, p)?;
    Ok(cumulative(k, n, p))
}

/// Mass or cumulative probability depending on `cumulative`
pub fn binom_dist(k: u64, n: u64, p: f64, cumulative: bool) -> Result<f64, DomainError> {
    if cumulative {
        binom_cdf(k, n, p)
    } else {
        binom_pmf(k, n, p)
    }
}

/// Smallest k with P(X ≤ k) ≥ `prob`
pub fn binom_inv(prob: f64, n: u64, p: f64) -> Result<u64, DomainError> {
    let mut checks = Checks::new();
    checks.probability("probability", prob).probability("p", p);
    checks.finish()?;

    if prob == 0.0 {
        return Ok(0);
    }
    if prob == 1.0 {
        return Ok(n);
    }
    Ok(search_quantile(prob, Some(n), |k| cumulative(k, n, p)))
}

/// Success probability p for which P(X ≤ k) = `prob` with n trials
///
/// The cumulative probability falls as p grows, so the solver works on its
/// complement. Undefined for k = n, where P(X ≤ n) is 1 for every p.
pub fn binom_invp(k: u64, n: u64, prob: f64) -> Result<f64, DomainError> {
    let mut checks = Checks::new();
    checks
        .require(k < n, format!("successes must be less than trials, got {} of {}", k, n))
        .probability("probability", prob);
    checks.finish()?;

    if prob == 1.0 {
        return Ok(0.0);
    }
    if prob == 0.0 {
        return Ok(1.0);
    }
    let guess = (k as f64 + 0.5) / (n as f64 + 1.0);
    Ok(invert(
        1.0 - prob,
        |p| 1.0 - cumulative(k, n, p),
        |_| guess,
        &SolverConfig::PROPORTION,
    ))
}

fn validate(k: u64, n: u64, p: f64) -> Result<(), DomainError> {
    let mut checks = Checks::new();
    checks
        .require(k <= n, format!("successes must not exceed trials, got {} of {}", k, n))
        .probability("p", p);
    checks.finish()
}

/// Mass without overflow: seed with the smaller power, multiply in the
/// C(n, k) ratios, apply the larger power last
///
/// When either power leaves the normal `f64` range the product is formed in
/// log space instead, so large n keeps its mass.
pub(crate) fn mass(k: u64, n: u64, p: f64) -> f64 {
    if k > n || (p == 0.0 && k > 0) || (p == 1.0 && k < n) {
        return 0.0;
    }
    let success = p.powf(k as f64);
    let failure = (1.0 - p).powf((n - k) as f64);
    if success < f64::MIN_POSITIVE || failure < f64::MIN_POSITIVE {
        return log_mass(k, n, p);
    }
    let (small, large) = if success <= failure {
        (success, failure)
    } else {
        (failure, success)
    };
    ratio_product(small, n, k) * large
}

/// exp(ln C(n, k) + k·ln p + (n-k)·ln(1-p)) for 0 < p < 1
fn log_mass(k: u64, n: u64, p: f64) -> f64 {
    let (k, n) = (k as f64, n as f64);
    let ln_choose = gammln(n + 1.0) - gammln(k + 1.0) - gammln(n - k + 1.0);
    (ln_choose + k * p.ln() + (n - k) * (-p).ln_1p()).exp()
}

/// Sum of the mass from k down to 0
pub(crate) fn cumulative(k: u64, n: u64, p: f64) -> f64 {
    if k >= n {
        return 1.0;
    }
    (0..=k).rev().map(|j| mass(j, n, p)).sum::<f64>().min(1.0)
}

// ============ Plugins ============

pub struct BinomDist;

static BINOM_DIST_ARGS: [ArgMeta; 4] = [
    ArgMeta::required("successes", "Number", "Number of successes k"),
    ArgMeta::required("trials", "Number", "Number of trials n"),
    ArgMeta::required("p", "Number", "Success probability per trial"),
    ArgMeta::optional("cumulative", "Bool", "P(X ≤ k) instead of P(X = k)", "false"),
];

static BINOM_DIST_EXAMPLES: [&str; 2] = [
    "binom_dist(3, 10, 0.5) → 0.1171875",
    "binom_dist(3, 10, 0.5, true) → 0.171875",
];

static BINOM_DIST_RELATED: [&str; 3] = ["binom_inv", "binom_conf", "poisson_dist"];

impl FunctionPlugin for BinomDist {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "binom_dist",
            description: "Binomial probability mass or cumulative distribution",
            usage: "binom_dist(successes, trials, p, [cumulative])",
            args: &BINOM_DIST_ARGS,
            returns: "Number",
            examples: &BINOM_DIST_EXAMPLES,
            category: "stats/distribution",
            related: &BINOM_DIST_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("binom_dist", args, 3, 4, |a| {
            (
                a.whole(0, "successes"),
                a.whole(1, "trials"),
                a.number(2, "p"),
                a.flag(3, "cumulative", false),
            )
        });
        match parsed {
            Ok((k, n, p, cumulative)) => number_result("binom_dist", binom_dist(k, n, p, cumulative)),
            Err(e) => Value::Error(e),
        }
    }
}

pub struct BinomInv;

static BINOM_INV_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("probability", "Number", "Cumulative probability"),
    ArgMeta::required("trials", "Number", "Number of trials n"),
    ArgMeta::required("p", "Number", "Success probability per trial"),
];

static BINOM_INV_EXAMPLES: [&str; 1] = ["binom_inv(0.5, 10, 0.5) → 5"];

static BINOM_INV_RELATED: [&str; 2] = ["binom_dist", "binom_invp"];

impl FunctionPlugin for BinomInv {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "binom_inv",
            description: "Smallest number of successes whose cumulative probability reaches the given level",
            usage: "binom_inv(probability, trials, p)",
            args: &BINOM_INV_ARGS,
            returns: "Number",
            examples: &BINOM_INV_EXAMPLES,
            category: "stats/distribution",
            related: &BINOM_INV_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("binom_inv", args, 3, 3, |a| {
            (a.number(0, "probability"), a.whole(1, "trials"), a.number(2, "p"))
        });
        match parsed {
            Ok((prob, n, p)) => number_result("binom_inv", binom_inv(prob, n, p).map(|k| k as f64)),
            Err(e) => Value::Error(e),
        }
    }
}

pub struct BinomInvp;

static BINOM_INVP_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("successes", "Number", "Number of successes k (less than trials)"),
    ArgMeta::required("trials", "Number", "Number of trials n"),
    ArgMeta::required("probability", "Number", "Target cumulative probability P(X ≤ k)"),
];

static BINOM_INVP_EXAMPLES: [&str; 1] = ["binom_invp(3, 10, 0.5) → 0.3551"];

static BINOM_INVP_RELATED: [&str; 3] = ["binom_inv", "binom_conf", "poisson_invp"];

impl FunctionPlugin for BinomInvp {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "binom_invp",
            description: "Success probability at which P(X ≤ k) equals the given level",
            usage: "binom_invp(successes, trials, probability)",
            args: &BINOM_INVP_ARGS,
            returns: "Number",
            examples: &BINOM_INVP_EXAMPLES,
            category: "stats/distribution",
            related: &BINOM_INVP_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("binom_invp", args, 3, 3, |a| {
            (a.whole(0, "successes"), a.whole(1, "trials"), a.number(2, "probability"))
        });
        match parsed {
            Ok((k, n, prob)) => number_result("binom_invp", binom_invp(k, n, prob)),
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
    fn test_pmf_reference() {
        assert!((binom_pmf(3, 10, 0.5).unwrap() - 0.1171875).abs() < 1e-12);
        assert_eq!(binom_pmf(0, 5, 0.0).unwrap(), 1.0);
        assert_eq!(binom_pmf(5, 5, 1.0).unwrap(), 1.0);
        assert_eq!(binom_pmf(2, 5, 1.0).unwrap(), 0.0);
    }

    #[test]
    fn test_pmf_sums_to_one() {
        for &(n, p) in &[(10u64, 0.5), (40, 0.3), (200, 0.07)] {
            let total: f64 = (0..=n).map(|k| binom_pmf(k, n, p).unwrap()).sum();
            assert!((total - 1.0).abs() < 1e-9, "n={} p={} total={}", n, p, total);
        }
    }

    #[test]
    fn test_pmf_large_trials_stays_finite() {
        let m = binom_pmf(500, 1000, 0.5).unwrap();
        assert!(m.is_finite() && m > 0.02 && m < 0.03);
        // 0.5^5000 is below the smallest f64
        assert_eq!(binom_pmf(0, 5000, 0.5).unwrap(), 0.0);
    }

    #[test]
    fn test_pmf_survives_power_underflow() {
        // 0.5^2500 underflows on its own, the mass does not
        let m = binom_pmf(2500, 5000, 0.5).unwrap();
        assert!((m - 0.0112832275).abs() < 1e-9, "m={}", m);
        for &(n, p) in &[(5000u64, 0.5), (3000, 0.3)] {
            let total: f64 = (0..=n).map(|k| binom_pmf(k, n, p).unwrap()).sum();
            assert!((total - 1.0).abs() < 1e-8, "n={} p={} total={}", n, p, total);
        }
    }

    #[test]
    fn test_large_trials_downstream() {
        assert_eq!(binom_inv(0.5, 5000, 0.5).unwrap(), 2500);
        assert!((binom_cdf(2500, 5000, 0.5).unwrap() - 0.5056416137).abs() < 1e-8);
    }

    #[test]
    fn test_cdf() {
        assert!((binom_cdf(3, 10, 0.5).unwrap() - 0.171875).abs() < 1e-12);
        assert_eq!(binom_cdf(10, 10, 0.3).unwrap(), 1.0);
    }

    #[test]
    fn test_domain_errors_are_collected() {
        let err = binom_pmf(11, 10, 1.5).unwrap_err();
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_inv() {
        assert_eq!(binom_inv(0.5, 10, 0.5).unwrap(), 5);
        assert_eq!(binom_inv(0.3, 10, 0.5).unwrap(), 4);
        assert_eq!(binom_inv(0.623046875, 10, 0.5).unwrap(), 5);
        assert_eq!(binom_inv(0.999, 10, 0.5).unwrap(), 9);
        assert_eq!(binom_inv(0.5, 1000, 0.3).unwrap(), 300);
    }

    #[test]
    fn test_inv_boundaries() {
        assert_eq!(binom_inv(0.0, 10, 0.5).unwrap(), 0);
        assert_eq!(binom_inv(1.0, 10, 0.5).unwrap(), 10);
        assert!(binom_inv(1.1, 10, 0.5).is_err());
    }

    #[test]
    fn test_invp_round_trip() {
        for &(k, n, prob) in &[(3u64, 10u64, 0.5), (0, 10, 0.1), (9, 10, 0.975), (4, 20, 0.025)] {
            let p = binom_invp(k, n, prob).unwrap();
            assert!((binom_cdf(k, n, p).unwrap() - prob).abs() < 1e-8, "k={} n={}", k, n);
        }
        assert!((binom_invp(3, 10, 0.5).unwrap() - 0.35510).abs() < 1e-4);
    }

    #[test]
    fn test_invp_domain() {
        assert!(binom_invp(10, 10, 0.5).is_err());
        assert_eq!(binom_invp(2, 10, 1.0).unwrap(), 0.0);
        assert_eq!(binom_invp(2, 10, 0.0).unwrap(), 1.0);
    }

    #[test]
    fn test_plugin_dist() {
        let ctx = eval_ctx();
        let args = vec![Value::Number(3.0), Value::Number(10.0), Value::Number(0.5)];
        let result = BinomDist.call(&args, &ctx);
        assert!((result.as_number().unwrap() - 0.1171875).abs() < 1e-12);

        let args = vec![Value::Number(3.0), Value::Number(10.0), Value::Number(0.5), Value::Bool(true)];
        let result = BinomDist.call(&args, &ctx);
        assert!((result.as_number().unwrap() - 0.171875).abs() < 1e-12);
    }

    #[test]
    fn test_plugin_reports_domain_error() {
        let ctx = eval_ctx();
        let args = vec![Value::Number(3.5), Value::Number(10.0), Value::Number(0.5)];
        let err = BinomDist.call(&args, &ctx);
        assert_eq!(err.as_error().unwrap().code, codes::DOMAIN_ERROR);

        let args = vec![Value::Number(12.0), Value::Number(10.0), Value::Number(0.5)];
        let err = BinomDist.call(&args, &ctx);
        assert!(err.as_error().unwrap().message.contains("must not exceed"));
    }

    #[test]
    fn test_plugin_inv() {
        let ctx = eval_ctx();
        let args = vec![Value::Number(0.5), Value::Number(10.0), Value::Number(0.5)];
        assert_eq!(BinomInv.call(&args, &ctx).as_number(), Some(5.0));
    }
}
