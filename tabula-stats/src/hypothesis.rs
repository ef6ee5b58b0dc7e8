//! One-sample hypothesis tests returning a p-value
//!
//! Each test takes the hypothesised value first, then the sample summary.

use crate::distributions::{binomial, chi, normal, poisson, t};
use crate::helpers::{number_result, read_args, Selector};
use serde::Serialize;
use tabula_core::{Checks, DomainError};
use tabula_plugin::prelude::*;

/// Alternative hypothesis relative to the expected value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alternative {
    /// Lower tail
    Less,
    /// Both tails
    Different,
    /// Upper tail
    Greater,
}

impl Alternative {
    /// p-value from the lower tail P(X ≤ x) and upper tail P(X ≥ x)
    pub fn p_value(self, lower_tail: f64, upper_tail: f64) -> f64 {
        let p = match self {
            Alternative::Less => lower_tail,
            Alternative::Greater => upper_tail,
            Alternative::Different => (2.0 * lower_tail.min(upper_tail)).min(1.0),
        };
        p.clamp(0.0, 1.0)
    }
}

impl Selector for Alternative {
    const NAME: &'static str = "alternative";
    const ACCEPTED: &'static [&'static str] = &["less", "different", "greater", "-1", "0", "1"];

    fn from_code(code: i64) -> Result<Self, DomainError> {
        match code {
            -1 => Ok(Alternative::Less),
            0 => Ok(Alternative::Different),
            1 => Ok(Alternative::Greater),
            other => Err(DomainError::invalid_selector(Self::NAME, &other.to_string(), Self::ACCEPTED)),
        }
    }

    fn from_name(name: &str) -> Result<Self, DomainError> {
        match name {
            "less" => Ok(Alternative::Less),
            "different" => Ok(Alternative::Different),
            "greater" => Ok(Alternative::Greater),
            other => Err(DomainError::invalid_selector(Self::NAME, other, Self::ACCEPTED)),
        }
    }
}

/// z test of a mean against `expected` with known standard deviation
pub fn norm_test1s(expected: f64, mean: f64, stdev: f64, count: u64, alternative: Alternative) -> Result<f64, DomainError> {
    let mut checks = Checks::new();
    check_mean_inputs(&mut checks, expected, mean, stdev);
    checks.require(count >= 1, "count must be at least 1");
    checks.finish()?;

    let z = (mean - expected) / (stdev / (count as f64).sqrt());
    let lower = normal::standard_cdf(z);
    Ok(alternative.p_value(lower, 1.0 - lower))
}

/// t test of a mean against `expected`, df = count − 1
pub fn t_test1s(expected: f64, mean: f64, stdev: f64, count: u64, alternative: Alternative) -> Result<f64, DomainError> {
    let mut checks = Checks::new();
    check_mean_inputs(&mut checks, expected, mean, stdev);
    checks.require(count >= 2, format!("count must be at least 2, got {}", count));
    checks.finish()?;

    let statistic = (mean - expected) / (stdev / (count as f64).sqrt());
    let lower = t::cumulative(statistic, (count - 1) as f64);
    Ok(alternative.p_value(lower, 1.0 - lower))
}

/// Test of a standard deviation against `expected_stdev`,
/// statistic (n−1)s²/σ₀² on n − 1 degrees of freedom
pub fn chisq_test1s(expected_stdev: f64, stdev: f64, count: u64, alternative: Alternative) -> Result<f64, DomainError> {
    let mut checks = Checks::new();
    checks
        .positive("expected stdev", expected_stdev)
        .finite("expected stdev", expected_stdev)
        .non_negative("stdev", stdev)
        .finite("stdev", stdev)
        .require(count >= 2, format!("count must be at least 2, got {}", count));
    checks.finish()?;

    let df = (count - 1) as f64;
    let statistic = df * stdev * stdev / (expected_stdev * expected_stdev);
    let lower = chi::cumulative(statistic, df);
    Ok(alternative.p_value(lower, 1.0 - lower))
}

/// Exact binomial test of `successes` out of `trials` against `expected_p`
pub fn binom_test1s(expected_p: f64, successes: u64, trials: u64, alternative: Alternative) -> Result<f64, DomainError> {
    let mut checks = Checks::new();
    checks.probability("expected p", expected_p).require(
        successes <= trials,
        format!("successes must not exceed trials, got {} of {}", successes, trials),
    );
    checks.finish()?;

    let lower = binomial::cumulative(successes, trials, expected_p);
    let upper = if successes == 0 {
        1.0
    } else {
        1.0 - binomial::cumulative(successes - 1, trials, expected_p)
    };
    Ok(alternative.p_value(lower, upper))
}

/// Exact Poisson test of an observed per-unit `mean` over `count` units
/// against `expected_mean`; the observed total is `round(mean · count)`
pub fn poisson_test1s(expected_mean: f64, mean: f64, count: u64, alternative: Alternative) -> Result<f64, DomainError> {
    let mut checks = Checks::new();
    checks
        .non_negative("expected mean", expected_mean)
        .finite("expected mean", expected_mean)
        .non_negative("mean", mean)
        .finite("mean", mean)
        .require(count >= 1, "count must be at least 1");
    checks.finish()?;

    let units = count as f64;
    let total = (mean * units).round() as u64;
    let rate = expected_mean * units;
    let lower = poisson::cumulative(total, rate);
    let upper = if total == 0 {
        1.0
    } else {
        1.0 - poisson::cumulative(total - 1, rate)
    };
    Ok(alternative.p_value(lower, upper))
}

fn check_mean_inputs(checks: &mut Checks, expected: f64, mean: f64, stdev: f64) {
    checks
        .finite("expected", expected)
        .finite("mean", mean)
        .positive("stdev", stdev)
        .finite("stdev", stdev);
}

// ============ Plugins ============

pub struct NormTest1s;

static NORM_TEST1S_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("expected", "Number", "Hypothesised mean μ₀"),
    ArgMeta::required("mean", "Number", "Sample mean"),
    ArgMeta::required("stdev", "Number", "Known population standard deviation"),
    ArgMeta::required("count", "Number", "Sample size"),
    ArgMeta::optional("alternative", "Text|Number", "less (-1), different (0) or greater (1)", "different"),
];

static NORM_TEST1S_EXAMPLES: [&str; 1] = ["norm_test1s(10, 10.5, 2, 25) → 0.2113"];

static NORM_TEST1S_RELATED: [&str; 2] = ["t_test1s", "norm_conf"];

impl FunctionPlugin for NormTest1s {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "norm_test1s",
            description: "One-sample z test p-value",
            usage: "norm_test1s(expected, mean, stdev, count, [alternative])",
            args: &NORM_TEST1S_ARGS,
            returns: "Number",
            examples: &NORM_TEST1S_EXAMPLES,
            category: "stats/hypothesis",
            related: &NORM_TEST1S_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("norm_test1s", args, 4, 5, |a| {
            (
                a.number(0, "expected"),
                a.number(1, "mean"),
                a.number(2, "stdev"),
                a.whole(3, "count"),
                a.selector(4, Alternative::Different),
            )
        });
        match parsed {
            Ok((expected, mean, stdev, count, alt)) => {
                number_result("norm_test1s", norm_test1s(expected, mean, stdev, count, alt))
            }
            Err(e) => Value::Error(e),
        }
    }
}

pub struct TTest1s;

static T_TEST1S_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("expected", "Number", "Hypothesised mean μ₀"),
    ArgMeta::required("mean", "Number", "Sample mean"),
    ArgMeta::required("stdev", "Number", "Sample standard deviation"),
    ArgMeta::required("count", "Number", "Sample size, at least 2"),
    ArgMeta::optional("alternative", "Text|Number", "less (-1), different (0) or greater (1)", "different"),
];

static T_TEST1S_EXAMPLES: [&str; 1] = ["t_test1s(10, 10.5, 2, 25) → 0.2234"];

static T_TEST1S_RELATED: [&str; 2] = ["norm_test1s", "t_conf"];

impl FunctionPlugin for TTest1s {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "t_test1s",
            description: "One-sample Student's t test p-value",
            usage: "t_test1s(expected, mean, stdev, count, [alternative])",
            args: &T_TEST1S_ARGS,
            returns: "Number",
            examples: &T_TEST1S_EXAMPLES,
            category: "stats/hypothesis",
            related: &T_TEST1S_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("t_test1s", args, 4, 5, |a| {
            (
                a.number(0, "expected"),
                a.number(1, "mean"),
                a.number(2, "stdev"),
                a.whole(3, "count"),
                a.selector(4, Alternative::Different),
            )
        });
        match parsed {
            Ok((expected, mean, stdev, count, alt)) => {
                number_result("t_test1s", t_test1s(expected, mean, stdev, count, alt))
            }
            Err(e) => Value::Error(e),
        }
    }
}

pub struct ChisqTest1s;

static CHISQ_TEST1S_ARGS: [ArgMeta; 4] = [
    ArgMeta::required("expected_stdev", "Number", "Hypothesised standard deviation σ₀"),
    ArgMeta::required("stdev", "Number", "Sample standard deviation"),
    ArgMeta::required("count", "Number", "Sample size, at least 2"),
    ArgMeta::optional("alternative", "Text|Number", "less (-1), different (0) or greater (1)", "different"),
];

static CHISQ_TEST1S_EXAMPLES: [&str; 1] = ["chisq_test1s(2, 3, 25, \"greater\") → 0.00043"];

static CHISQ_TEST1S_RELATED: [&str; 2] = ["chisq_conf", "chisq_dist"];

impl FunctionPlugin for ChisqTest1s {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "chisq_test1s",
            description: "One-sample chi-squared test of a standard deviation",
            usage: "chisq_test1s(expected_stdev, stdev, count, [alternative])",
            args: &CHISQ_TEST1S_ARGS,
            returns: "Number",
            examples: &CHISQ_TEST1S_EXAMPLES,
            category: "stats/hypothesis",
            related: &CHISQ_TEST1S_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("chisq_test1s", args, 3, 4, |a| {
            (
                a.number(0, "expected_stdev"),
                a.number(1, "stdev"),
                a.whole(2, "count"),
                a.selector(3, Alternative::Different),
            )
        });
        match parsed {
            Ok((expected, stdev, count, alt)) => {
                number_result("chisq_test1s", chisq_test1s(expected, stdev, count, alt))
            }
            Err(e) => Value::Error(e),
        }
    }
}

pub struct BinomTest1s;

static BINOM_TEST1S_ARGS: [ArgMeta; 4] = [
    ArgMeta::required("expected_p", "Number", "Hypothesised success probability"),
    ArgMeta::required("successes", "Number", "Observed successes"),
    ArgMeta::required("trials", "Number", "Number of trials"),
    ArgMeta::optional("alternative", "Text|Number", "less (-1), different (0) or greater (1)", "different"),
];

static BINOM_TEST1S_EXAMPLES: [&str; 1] = ["binom_test1s(0.5, 8, 10) → 0.109375"];

static BINOM_TEST1S_RELATED: [&str; 2] = ["binom_conf", "binom_dist"];

impl FunctionPlugin for BinomTest1s {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "binom_test1s",
            description: "Exact one-sample binomial test p-value",
            usage: "binom_test1s(expected_p, successes, trials, [alternative])",
            args: &BINOM_TEST1S_ARGS,
            returns: "Number",
            examples: &BINOM_TEST1S_EXAMPLES,
            category: "stats/hypothesis",
            related: &BINOM_TEST1S_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("binom_test1s", args, 3, 4, |a| {
            (
                a.number(0, "expected_p"),
                a.whole(1, "successes"),
                a.whole(2, "trials"),
                a.selector(3, Alternative::Different),
            )
        });
        match parsed {
            Ok((p, k, n, alt)) => number_result("binom_test1s", binom_test1s(p, k, n, alt)),
            Err(e) => Value::Error(e),
        }
    }
}

pub struct PoissonTest1s;

static POISSON_TEST1S_ARGS: [ArgMeta; 4] = [
    ArgMeta::required("expected_mean", "Number", "Hypothesised events per unit"),
    ArgMeta::required("mean", "Number", "Observed events per unit"),
    ArgMeta::required("count", "Number", "Number of units observed"),
    ArgMeta::optional("alternative", "Text|Number", "less (-1), different (0) or greater (1)", "different"),
];

static POISSON_TEST1S_EXAMPLES: [&str; 1] = ["poisson_test1s(2, 3, 5) → 0.1669"];

static POISSON_TEST1S_RELATED: [&str; 2] = ["poisson_conf", "poisson_dist"];

impl FunctionPlugin for PoissonTest1s {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "poisson_test1s",
            description: "Exact one-sample Poisson rate test p-value",
            usage: "poisson_test1s(expected_mean, mean, count, [alternative])",
            args: &POISSON_TEST1S_ARGS,
            returns: "Number",
            examples: &POISSON_TEST1S_EXAMPLES,
            category: "stats/hypothesis",
            related: &POISSON_TEST1S_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("poisson_test1s", args, 3, 4, |a| {
            (
                a.number(0, "expected_mean"),
                a.number(1, "mean"),
                a.whole(2, "count"),
                a.selector(3, Alternative::Different),
            )
        });
        match parsed {
            Ok((expected, mean, count, alt)) => {
                number_result("poisson_test1s", poisson_test1s(expected, mean, count, alt))
            }
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
    fn test_norm_test1s() {
        // z = 1.25
        let two = norm_test1s(10.0, 10.5, 2.0, 25, Alternative::Different).unwrap();
        assert!((two - 0.21129954733778833).abs() < 1e-8);
        let greater = norm_test1s(10.0, 10.5, 2.0, 25, Alternative::Greater).unwrap();
        assert!((greater - 0.10564977366889416).abs() < 1e-8);
        let less = norm_test1s(10.0, 10.5, 2.0, 25, Alternative::Less).unwrap();
        assert!((less + greater - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_norm_test1s_no_difference() {
        let p = norm_test1s(5.0, 5.0, 1.0, 10, Alternative::Different).unwrap();
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_t_test1s() {
        let p = t_test1s(10.0, 10.5, 2.0, 25, Alternative::Different).unwrap();
        assert!((p - 0.22335147816541268).abs() < 1e-8);
        assert!(t_test1s(10.0, 10.5, 2.0, 1, Alternative::Different).is_err());
    }

    #[test]
    fn test_chisq_test1s() {
        // statistic = 24 · 9 / 4 = 54
        let greater = chisq_test1s(2.0, 3.0, 25, Alternative::Greater).unwrap();
        assert!((greater - 0.00042624332117557895).abs() < 1e-9);
        let two = chisq_test1s(2.0, 3.0, 25, Alternative::Different).unwrap();
        assert!((two - 2.0 * greater).abs() < 1e-12);
    }

    #[test]
    fn test_binom_test1s() {
        let lower = binom_test1s(0.5, 8, 10, Alternative::Less).unwrap();
        assert!((lower - 0.9892578125).abs() < 1e-12);
        let upper = binom_test1s(0.5, 8, 10, Alternative::Greater).unwrap();
        assert!((upper - 0.0546875).abs() < 1e-12);
        let two = binom_test1s(0.5, 8, 10, Alternative::Different).unwrap();
        assert!((two - 0.109375).abs() < 1e-12);
    }

    #[test]
    fn test_binom_test1s_zero_successes() {
        let upper = binom_test1s(0.3, 0, 10, Alternative::Greater).unwrap();
        assert_eq!(upper, 1.0);
        let two = binom_test1s(0.3, 0, 10, Alternative::Different).unwrap();
        assert!((two - 2.0 * 0.7_f64.powi(10)).abs() < 1e-12);
    }

    #[test]
    fn test_binom_test1s_large_trials() {
        // Data on the null: both tails exceed one half
        let two = binom_test1s(0.5, 2500, 5000, Alternative::Different).unwrap();
        assert_eq!(two, 1.0);
        let upper = binom_test1s(0.5, 2500, 5000, Alternative::Greater).unwrap();
        assert!((upper - 0.5056416138).abs() < 1e-8);
    }

    #[test]
    fn test_poisson_test1s() {
        // 15 events over 5 units against 2 per unit
        let lower = poisson_test1s(2.0, 3.0, 5, Alternative::Less).unwrap();
        assert!((lower - 0.9512595966948836).abs() < 1e-9);
        let two = poisson_test1s(2.0, 3.0, 5, Alternative::Different).unwrap();
        assert!((two - 0.16691694587126316).abs() < 1e-9);
    }

    #[test]
    fn test_two_sided_caps_at_one() {
        assert_eq!(Alternative::Different.p_value(0.7, 0.6), 1.0);
    }

    #[test]
    fn test_selector() {
        assert_eq!(Alternative::from_code(-1).unwrap(), Alternative::Less);
        assert_eq!(Alternative::from_name("greater").unwrap(), Alternative::Greater);
        let err = Alternative::from_name("two-sided").unwrap_err();
        assert!(err.to_string().contains("less, different, greater"));
    }

    #[test]
    fn test_plugin_default_alternative() {
        let ctx = eval_ctx();
        let args = vec![Value::Number(0.5), Value::Number(8.0), Value::Number(10.0)];
        let p = BinomTest1s.call(&args, &ctx).as_number().unwrap();
        assert!((p - 0.109375).abs() < 1e-12);

        let args = vec![Value::Number(0.5), Value::Number(8.0), Value::Number(10.0), Value::from("upper")];
        assert!(BinomTest1s.call(&args, &ctx).is_error());
    }
}
