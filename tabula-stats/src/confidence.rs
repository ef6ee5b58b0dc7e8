//! Confidence intervals: norm_conf, t_conf, chisq_conf, binom_conf, poisson_conf
//!
//! Every interval is built from the caller's summary statistics. Two-sided
//! intervals split alpha evenly between the tails; one-sided intervals put
//! all of it in one tail and leave the other bound unset.

use crate::distributions::{binomial, chi, normal, poisson, t};
use crate::helpers::{object_result, read_args, Selector};
use serde::Serialize;
use std::collections::HashMap;
use tabula_core::{Checks, DomainError};
use tabula_plugin::prelude::*;

/// Which bounds an interval carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sidedness {
    /// Lower bound only
    Lower,
    TwoSided,
    /// Upper bound only
    Upper,
}

impl Sidedness {
    /// Probability mass left outside the interval in each bounded tail
    pub fn tail_alpha(self, alpha: f64) -> f64 {
        match self {
            Sidedness::TwoSided => alpha / 2.0,
            Sidedness::Lower | Sidedness::Upper => alpha,
        }
    }
}

impl Selector for Sidedness {
    const NAME: &'static str = "sidedness";
    const ACCEPTED: &'static [&'static str] = &["lower", "two-sided", "upper", "-1", "0", "1"];

    fn from_code(code: i64) -> Result<Self, DomainError> {
        match code {
            -1 => Ok(Sidedness::Lower),
            0 => Ok(Sidedness::TwoSided),
            1 => Ok(Sidedness::Upper),
            other => Err(DomainError::invalid_selector(Self::NAME, &other.to_string(), Self::ACCEPTED)),
        }
    }

    fn from_name(name: &str) -> Result<Self, DomainError> {
        match name {
            "lower" => Ok(Sidedness::Lower),
            "two-sided" => Ok(Sidedness::TwoSided),
            "upper" => Ok(Sidedness::Upper),
            other => Err(DomainError::invalid_selector(Self::NAME, other, Self::ACCEPTED)),
        }
    }
}

/// How binomial and Poisson intervals are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Approximate when the sample is large enough, exact otherwise
    Auto,
    /// Normal approximation
    Approximate,
    /// Inversion of the exact cumulative distribution
    Exact,
}

impl Selector for Method {
    const NAME: &'static str = "method";
    const ACCEPTED: &'static [&'static str] = &["auto", "approximate", "exact", "0", "1", "2"];

    fn from_code(code: i64) -> Result<Self, DomainError> {
        match code {
            0 => Ok(Method::Auto),
            1 => Ok(Method::Approximate),
            2 => Ok(Method::Exact),
            other => Err(DomainError::invalid_selector(Self::NAME, &other.to_string(), Self::ACCEPTED)),
        }
    }

    fn from_name(name: &str) -> Result<Self, DomainError> {
        match name {
            "auto" => Ok(Method::Auto),
            "approximate" => Ok(Method::Approximate),
            "exact" => Ok(Method::Exact),
            other => Err(DomainError::invalid_selector(Self::NAME, other, Self::ACCEPTED)),
        }
    }
}

/// Binomial intervals use the normal approximation once n·p̂·(1−p̂) reaches this
const BINOMIAL_APPROX_MIN: f64 = 5.0;

/// Poisson intervals use the normal approximation once the event total reaches this
const POISSON_APPROX_MIN: u64 = 10;

/// An interval estimate; one-sided intervals leave the other bound `None`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl ConfidenceInterval {
    fn from_bounds(lower: f64, upper: f64, sidedness: Sidedness) -> Self {
        match sidedness {
            Sidedness::Lower => Self { lower: Some(lower), upper: None },
            Sidedness::TwoSided => Self { lower: Some(lower), upper: Some(upper) },
            Sidedness::Upper => Self { lower: None, upper: Some(upper) },
        }
    }

    fn around(center: f64, margin: f64, sidedness: Sidedness) -> Self {
        Self::from_bounds(center - margin, center + margin, sidedness)
    }

    /// Distance from `center` to the farthest present bound
    pub fn margin_about(&self, center: f64) -> Option<f64> {
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) => Some((hi - lo) / 2.0),
            (Some(lo), None) => Some(center - lo),
            (None, Some(hi)) => Some(hi - center),
            (None, None) => None,
        }
    }

    pub fn to_fields(&self) -> HashMap<String, Value> {
        let mut fields = HashMap::new();
        fields.insert("lower".to_string(), Value::from_option(self.lower));
        fields.insert("upper".to_string(), Value::from_option(self.upper));
        fields
    }
}

/// Interval for a mean with known standard deviation: mean ± z·σ/√n
pub fn norm_conf(alpha: f64, mean: f64, stdev: f64, count: u64, sidedness: Sidedness) -> Result<ConfidenceInterval, DomainError> {
    let mut checks = Checks::new();
    check_mean_inputs(&mut checks, alpha, mean, stdev);
    checks.require(count >= 1, "count must be at least 1");
    checks.finish()?;

    let z = normal::standard_inv(1.0 - sidedness.tail_alpha(alpha));
    let margin = z * stdev / (count as f64).sqrt();
    Ok(ConfidenceInterval::around(mean, margin, sidedness))
}

/// Interval for a mean with estimated standard deviation, df = count − 1
pub fn t_conf(alpha: f64, mean: f64, stdev: f64, count: u64, sidedness: Sidedness) -> Result<ConfidenceInterval, DomainError> {
    let mut checks = Checks::new();
    check_mean_inputs(&mut checks, alpha, mean, stdev);
    checks.require(count >= 2, format!("count must be at least 2, got {}", count));
    checks.finish()?;

    let df = (count - 1) as f64;
    let critical = t::quantile(1.0 - sidedness.tail_alpha(alpha), df);
    let margin = critical * stdev / (count as f64).sqrt();
    Ok(ConfidenceInterval::around(mean, margin, sidedness))
}

/// Interval for the population standard deviation: √((n−1)s²/χ²)
pub fn chisq_conf(alpha: f64, stdev: f64, count: u64, sidedness: Sidedness) -> Result<ConfidenceInterval, DomainError> {
    let mut checks = Checks::new();
    checks
        .open_probability("alpha", alpha)
        .positive("stdev", stdev)
        .finite("stdev", stdev)
        .require(count >= 2, format!("count must be at least 2, got {}", count));
    checks.finish()?;

    let df = (count - 1) as f64;
    let sum_squares = df * stdev * stdev;
    let tail = sidedness.tail_alpha(alpha);
    let lower = (sum_squares / chi::quantile(1.0 - tail, df)).sqrt();
    let upper = (sum_squares / chi::quantile(tail, df)).sqrt();
    Ok(ConfidenceInterval::from_bounds(lower, upper, sidedness))
}

/// Interval for a success probability from `successes` out of `trials`
///
/// Approximate is the Wald interval clamped to [0, 1]; exact is
/// Clopper–Pearson.
pub fn binom_conf(
    alpha: f64,
    successes: u64,
    trials: u64,
    sidedness: Sidedness,
    method: Method,
) -> Result<ConfidenceInterval, DomainError> {
    let mut checks = Checks::new();
    checks
        .open_probability("alpha", alpha)
        .require(trials >= 1, "trials must be at least 1")
        .require(
            successes <= trials,
            format!("successes must not exceed trials, got {} of {}", successes, trials),
        );
    checks.finish()?;

    let n = trials as f64;
    let p_hat = successes as f64 / n;
    let tail = sidedness.tail_alpha(alpha);

    let approximate = match method {
        Method::Auto => n * p_hat * (1.0 - p_hat) >= BINOMIAL_APPROX_MIN,
        Method::Approximate => true,
        Method::Exact => false,
    };

    let (lower, upper) = if approximate {
        let margin = normal::standard_inv(1.0 - tail) * (p_hat * (1.0 - p_hat) / n).sqrt();
        ((p_hat - margin).max(0.0), (p_hat + margin).min(1.0))
    } else {
        let lower = if successes == 0 {
            0.0
        } else {
            binomial::binom_invp(successes - 1, trials, 1.0 - tail)?
        };
        let upper = if successes == trials {
            1.0
        } else {
            binomial::binom_invp(successes, trials, tail)?
        };
        (lower, upper)
    };
    Ok(ConfidenceInterval::from_bounds(lower, upper, sidedness))
}

/// Interval for a Poisson rate per unit from an observed `mean` over `count` units
///
/// The event total is `round(mean · count)`. Exact is the Garwood interval
/// on that total, rescaled by `count`.
pub fn poisson_conf(
    alpha: f64,
    mean: f64,
    count: u64,
    sidedness: Sidedness,
    method: Method,
) -> Result<ConfidenceInterval, DomainError> {
    let mut checks = Checks::new();
    checks
        .open_probability("alpha", alpha)
        .non_negative("mean", mean)
        .finite("mean", mean)
        .require(count >= 1, "count must be at least 1");
    checks.finish()?;

    let units = count as f64;
    let total = (mean * units).round() as u64;
    let tail = sidedness.tail_alpha(alpha);

    let approximate = match method {
        Method::Auto => total >= POISSON_APPROX_MIN,
        Method::Approximate => true,
        Method::Exact => false,
    };

    let (lower, upper) = if approximate {
        let margin = normal::standard_inv(1.0 - tail) * (mean / units).sqrt();
        ((mean - margin).max(0.0), mean + margin)
    } else {
        let lower = if total == 0 {
            0.0
        } else {
            poisson::poisson_invp(total - 1, 1.0 - tail)? / units
        };
        let upper = poisson::poisson_invp(total, tail)? / units;
        (lower, upper)
    };
    Ok(ConfidenceInterval::from_bounds(lower, upper, sidedness))
}

fn check_mean_inputs(checks: &mut Checks, alpha: f64, mean: f64, stdev: f64) {
    checks
        .open_probability("alpha", alpha)
        .finite("mean", mean)
        .positive("stdev", stdev)
        .finite("stdev", stdev);
}

// ============ Plugins ============

fn mean_interval_fields(ci: ConfidenceInterval, mean: f64) -> HashMap<String, Value> {
    let mut fields = ci.to_fields();
    fields.insert("margin".to_string(), Value::from_option(ci.margin_about(mean)));
    fields
}

pub struct NormConf;

static NORM_CONF_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("alpha", "Number", "Significance level, 0 < alpha < 1"),
    ArgMeta::required("mean", "Number", "Sample mean"),
    ArgMeta::required("stdev", "Number", "Known population standard deviation"),
    ArgMeta::required("count", "Number", "Sample size"),
    ArgMeta::optional("sidedness", "Text|Number", "lower (-1), two-sided (0) or upper (1)", "two-sided"),
];

static NORM_CONF_EXAMPLES: [&str; 2] = [
    "norm_conf(0.05, 10, 2, 25) → {lower: 9.216, upper: 10.784, margin: 0.784}",
    "norm_conf(0.05, 10, 2, 25, \"lower\") → {lower: 9.342, upper: null, ...}",
];

static NORM_CONF_RELATED: [&str; 3] = ["t_conf", "norm_inv", "norm_test1s"];

impl FunctionPlugin for NormConf {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "norm_conf",
            description: "Confidence interval for a mean with known standard deviation",
            usage: "norm_conf(alpha, mean, stdev, count, [sidedness])",
            args: &NORM_CONF_ARGS,
            returns: "Object",
            examples: &NORM_CONF_EXAMPLES,
            category: "stats/confidence",
            related: &NORM_CONF_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("norm_conf", args, 4, 5, |a| {
            (
                a.number(0, "alpha"),
                a.number(1, "mean"),
                a.number(2, "stdev"),
                a.whole(3, "count"),
                a.selector(4, Sidedness::TwoSided),
            )
        });
        match parsed {
            Ok((alpha, mean, stdev, count, sidedness)) => object_result(
                "norm_conf",
                norm_conf(alpha, mean, stdev, count, sidedness),
                |ci| mean_interval_fields(ci, mean),
            ),
            Err(e) => Value::Error(e),
        }
    }
}

pub struct TConf;

static T_CONF_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("alpha", "Number", "Significance level, 0 < alpha < 1"),
    ArgMeta::required("mean", "Number", "Sample mean"),
    ArgMeta::required("stdev", "Number", "Sample standard deviation"),
    ArgMeta::required("count", "Number", "Sample size, at least 2"),
    ArgMeta::optional("sidedness", "Text|Number", "lower (-1), two-sided (0) or upper (1)", "two-sided"),
];

static T_CONF_EXAMPLES: [&str; 1] = ["t_conf(0.05, 10, 2, 25) → {lower: 9.174, upper: 10.826, margin: 0.826}"];

static T_CONF_RELATED: [&str; 3] = ["norm_conf", "t_inv", "t_test1s"];

impl FunctionPlugin for TConf {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "t_conf",
            description: "Confidence interval for a mean using Student's t",
            usage: "t_conf(alpha, mean, stdev, count, [sidedness])",
            args: &T_CONF_ARGS,
            returns: "Object",
            examples: &T_CONF_EXAMPLES,
            category: "stats/confidence",
            related: &T_CONF_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("t_conf", args, 4, 5, |a| {
            (
                a.number(0, "alpha"),
                a.number(1, "mean"),
                a.number(2, "stdev"),
                a.whole(3, "count"),
                a.selector(4, Sidedness::TwoSided),
            )
        });
        match parsed {
            Ok((alpha, mean, stdev, count, sidedness)) => object_result(
                "t_conf",
                t_conf(alpha, mean, stdev, count, sidedness),
                |ci| mean_interval_fields(ci, mean),
            ),
            Err(e) => Value::Error(e),
        }
    }
}

pub struct ChisqConf;

static CHISQ_CONF_ARGS: [ArgMeta; 4] = [
    ArgMeta::required("alpha", "Number", "Significance level, 0 < alpha < 1"),
    ArgMeta::required("stdev", "Number", "Sample standard deviation"),
    ArgMeta::required("count", "Number", "Sample size, at least 2"),
    ArgMeta::optional("sidedness", "Text|Number", "lower (-1), two-sided (0) or upper (1)", "two-sided"),
];

static CHISQ_CONF_EXAMPLES: [&str; 1] = ["chisq_conf(0.05, 2, 25) → {lower: 1.5617, upper: 2.7823}"];

static CHISQ_CONF_RELATED: [&str; 2] = ["chisq_inv", "chisq_test1s"];

impl FunctionPlugin for ChisqConf {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "chisq_conf",
            description: "Confidence interval for a population standard deviation",
            usage: "chisq_conf(alpha, stdev, count, [sidedness])",
            args: &CHISQ_CONF_ARGS,
            returns: "Object",
            examples: &CHISQ_CONF_EXAMPLES,
            category: "stats/confidence",
            related: &CHISQ_CONF_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("chisq_conf", args, 3, 4, |a| {
            (
                a.number(0, "alpha"),
                a.number(1, "stdev"),
                a.whole(2, "count"),
                a.selector(3, Sidedness::TwoSided),
            )
        });
        match parsed {
            Ok((alpha, stdev, count, sidedness)) => object_result(
                "chisq_conf",
                chisq_conf(alpha, stdev, count, sidedness),
                |ci| ci.to_fields(),
            ),
            Err(e) => Value::Error(e),
        }
    }
}

pub struct BinomConf;

static BINOM_CONF_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("alpha", "Number", "Significance level, 0 < alpha < 1"),
    ArgMeta::required("successes", "Number", "Observed successes"),
    ArgMeta::required("trials", "Number", "Number of trials"),
    ArgMeta::optional("sidedness", "Text|Number", "lower (-1), two-sided (0) or upper (1)", "two-sided"),
    ArgMeta::optional("method", "Text|Number", "auto (0), approximate (1) or exact (2)", "auto"),
];

static BINOM_CONF_EXAMPLES: [&str; 2] = [
    "binom_conf(0.05, 4, 20) → {lower: 0.0573, upper: 0.4366}",
    "binom_conf(0.05, 40, 100, \"two-sided\", \"approximate\")",
];

static BINOM_CONF_RELATED: [&str; 2] = ["binom_invp", "binom_test1s"];

impl FunctionPlugin for BinomConf {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "binom_conf",
            description: "Confidence interval for a success probability",
            usage: "binom_conf(alpha, successes, trials, [sidedness], [method])",
            args: &BINOM_CONF_ARGS,
            returns: "Object",
            examples: &BINOM_CONF_EXAMPLES,
            category: "stats/confidence",
            related: &BINOM_CONF_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("binom_conf", args, 3, 5, |a| {
            (
                a.number(0, "alpha"),
                a.whole(1, "successes"),
                a.whole(2, "trials"),
                a.selector(3, Sidedness::TwoSided),
                a.selector(4, Method::Auto),
            )
        });
        match parsed {
            Ok((alpha, k, n, sidedness, method)) => object_result(
                "binom_conf",
                binom_conf(alpha, k, n, sidedness, method),
                |ci| ci.to_fields(),
            ),
            Err(e) => Value::Error(e),
        }
    }
}

pub struct PoissonConf;

static POISSON_CONF_ARGS: [ArgMeta; 5] = [
    ArgMeta::required("alpha", "Number", "Significance level, 0 < alpha < 1"),
    ArgMeta::required("mean", "Number", "Observed events per unit"),
    ArgMeta::required("count", "Number", "Number of units observed"),
    ArgMeta::optional("sidedness", "Text|Number", "lower (-1), two-sided (0) or upper (1)", "two-sided"),
    ArgMeta::optional("method", "Text|Number", "auto (0), approximate (1) or exact (2)", "auto"),
];

static POISSON_CONF_EXAMPLES: [&str; 1] = ["poisson_conf(0.05, 2, 5, \"two-sided\", \"exact\") → {lower: 0.959, upper: 3.678}"];

static POISSON_CONF_RELATED: [&str; 2] = ["poisson_invp", "poisson_test1s"];

impl FunctionPlugin for PoissonConf {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "poisson_conf",
            description: "Confidence interval for a Poisson rate per unit",
            usage: "poisson_conf(alpha, mean, count, [sidedness], [method])",
            args: &POISSON_CONF_ARGS,
            returns: "Object",
            examples: &POISSON_CONF_EXAMPLES,
            category: "stats/confidence",
            related: &POISSON_CONF_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("poisson_conf", args, 3, 5, |a| {
            (
                a.number(0, "alpha"),
                a.number(1, "mean"),
                a.whole(2, "count"),
                a.selector(3, Sidedness::TwoSided),
                a.selector(4, Method::Auto),
            )
        });
        match parsed {
            Ok((alpha, mean, count, sidedness, method)) => object_result(
                "poisson_conf",
                poisson_conf(alpha, mean, count, sidedness, method),
                |ci| ci.to_fields(),
            ),
            Err(e) => Value::Error(e),
        }
    }
}
