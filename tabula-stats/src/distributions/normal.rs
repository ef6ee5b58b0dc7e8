//! Normal distribution functions

use crate::helpers::{number_result, read_args};
use crate::solver::{invert, symmetric_guess, SolverConfig};
use crate::special::erf;
use std::f64::consts::{PI, SQRT_2};
use tabula_core::{Checks, DomainError};
use tabula_plugin::prelude::*;

/// Density of N(mean, stdev²) at `x`
pub fn norm_pdf(x: f64, mean: f64, stdev: f64) -> Result<f64, DomainError> {
    validate(x, mean, stdev)?;
    let z = (x - mean) / stdev;
    Ok((-0.5 * z * z).exp() / (stdev * (2.0 * PI).sqrt()))
}

/// P(X ≤ x) for X ~ N(mean, stdev²)
pub fn norm_cdf(x: f64, mean: f64, stdev: f64) -> Result<f64, DomainError> {
    validate(x, mean, stdev)?;
    Ok(standard_cdf((x - mean) / stdev))
}

pub fn norm_dist(x: f64, mean: f64, stdev: f64, cumulative: bool) -> Result<f64, DomainError> {
    if cumulative {
        norm_cdf(x, mean, stdev)
    } else {
        norm_pdf(x, mean, stdev)
    }
}

/// x with P(X ≤ x) = `p`; ±∞ at p = 0 and p = 1
pub fn norm_inv(p: f64, mean: f64, stdev: f64) -> Result<f64, DomainError> {
    let mut checks = Checks::new();
    checks
        .probability("p", p)
        .finite("mean", mean)
        .positive("stdev", stdev)
        .finite("stdev", stdev);
    checks.finish()?;
    Ok(mean + stdev * standard_inv(p))
}

fn validate(x: f64, mean: f64, stdev: f64) -> Result<(), DomainError> {
    let mut checks = Checks::new();
    checks
        .numeric("x", x)
        .finite("mean", mean)
        .positive("stdev", stdev)
        .finite("stdev", stdev);
    checks.finish()
}

/// Standard normal CDF, Φ(z) = (1 + erf(z/√2)) / 2
pub(crate) fn standard_cdf(z: f64) -> f64 {
    let t = z / SQRT_2;
    if t == 0.0 {
        return 0.5;
    }
    (1.0 + erf(t)) / 2.0
}

/// Standard normal quantile
pub(crate) fn standard_inv(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    invert(p, standard_cdf, symmetric_guess, &SolverConfig::SYMMETRIC)
}

// ============ Plugins ============

pub struct NormDist;

static NORM_DIST_ARGS: [ArgMeta; 4] = [
    ArgMeta::required("x", "Number", "Value"),
    ArgMeta::required("mean", "Number", "Mean μ"),
    ArgMeta::required("stdev", "Number", "Standard deviation σ > 0"),
    ArgMeta::optional("cumulative", "Bool", "P(X ≤ x) instead of the density", "true"),
];

static NORM_DIST_EXAMPLES: [&str; 2] = [
    "norm_dist(1.96, 0, 1) → 0.9750",
    "norm_dist(0, 0, 1, false) → 0.3989",
];

static NORM_DIST_RELATED: [&str; 3] = ["norm_inv", "norm_conf", "t_dist"];

impl FunctionPlugin for NormDist {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "norm_dist",
            description: "Normal cumulative distribution or density",
            usage: "norm_dist(x, mean, stdev, [cumulative])",
            args: &NORM_DIST_ARGS,
            returns: "Number",
            examples: &NORM_DIST_EXAMPLES,
            category: "stats/distribution",
            related: &NORM_DIST_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("norm_dist", args, 3, 4, |a| {
            (
                a.number(0, "x"),
                a.number(1, "mean"),
                a.number(2, "stdev"),
                a.flag(3, "cumulative", true),
            )
        });
        match parsed {
            Ok((x, mean, stdev, cumulative)) => number_result("norm_dist", norm_dist(x, mean, stdev, cumulative)),
            Err(e) => Value::Error(e),
        }
    }
}

pub struct NormInv;

static NORM_INV_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("p", "Number", "Probability"),
    ArgMeta::required("mean", "Number", "Mean μ"),
    ArgMeta::required("stdev", "Number", "Standard deviation σ > 0"),
];

static NORM_INV_EXAMPLES: [&str; 1] = ["norm_inv(0.975, 0, 1) → 1.96"];

static NORM_INV_RELATED: [&str; 2] = ["norm_dist", "t_inv"];

impl FunctionPlugin for NormInv {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "norm_inv",
            description: "Inverse normal CDF (quantile function)",
            usage: "norm_inv(p, mean, stdev)",
            args: &NORM_INV_ARGS,
            returns: "Number",
            examples: &NORM_INV_EXAMPLES,
            category: "stats/distribution",
            related: &NORM_INV_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("norm_inv", args, 3, 3, |a| {
            (a.number(0, "p"), a.number(1, "mean"), a.number(2, "stdev"))
        });
        match parsed {
            Ok((p, mean, stdev)) => number_result("norm_inv", norm_inv(p, mean, stdev)),
            Err(e) => Value::Error(e),
        }
    }
}
