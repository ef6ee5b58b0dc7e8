//! Chi-squared distribution

use crate::helpers::{number_result, read_args};
use crate::solver::{invert, SolverConfig};
use crate::special::{gamma_p, gammln};
use std::f64::consts::LN_2;
use tabula_core::{Checks, DomainError};
use tabula_plugin::prelude::*;

/// Density of χ²(df); zero for s ≤ 0
pub fn chisq_pdf(s: f64, df: f64) -> Result<f64, DomainError> {
    validate(s, df)?;
    if s <= 0.0 || s.is_infinite() {
        return Ok(0.0);
    }
    let k = df / 2.0;
    Ok(((k - 1.0) * s.ln() - s / 2.0 - k * LN_2 - gammln(k)).exp())
}

/// P(X ≤ s) = γ(df/2, s/2) / Γ(df/2)
pub fn chisq_cdf(s: f64, df: f64) -> Result<f64, DomainError> {
    validate(s, df)?;
    Ok(cumulative(s, df))
}

pub fn chisq_dist(s: f64, df: f64, cumulative: bool) -> Result<f64, DomainError> {
    if cumulative {
        chisq_cdf(s, df)
    } else {
        chisq_pdf(s, df)
    }
}

/// s with P(X ≤ s) = `p`; 0 at p = 0 and +∞ at p = 1
pub fn chisq_inv(p: f64, df: f64) -> Result<f64, DomainError> {
    let mut checks = Checks::new();
    checks.probability("p", p).positive("df", df).finite("df", df);
    checks.finish()?;
    Ok(quantile(p, df))
}

fn validate(s: f64, df: f64) -> Result<(), DomainError> {
    let mut checks = Checks::new();
    checks.numeric("s", s).positive("df", df).finite("df", df);
    checks.finish()
}

/// The series branch of P(a, x) would need about x terms once s/2 passes
/// df/2 + 1, so the continued-fraction complement takes over there
pub(crate) fn cumulative(s: f64, df: f64) -> f64 {
    if s <= 0.0 {
        return 0.0;
    }
    gamma_p(df / 2.0, s / 2.0)
}

pub(crate) fn quantile(p: f64, df: f64) -> f64 {
    if p <= 0.0 {
        return 0.0;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    invert(p, |s| cumulative(s, df), |_| df, &SolverConfig::CHI_SQUARE)
}

// ============ Plugins ============

pub struct ChisqDist;

static CHISQ_DIST_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("s", "Number", "Chi-square statistic"),
    ArgMeta::required("df", "Number", "Degrees of freedom > 0"),
    ArgMeta::optional("cumulative", "Bool", "P(X ≤ s) instead of the density", "true"),
];

static CHISQ_DIST_EXAMPLES: [&str; 2] = [
    "chisq_dist(2, 2) → 0.6321",
    "chisq_dist(0, 5, false) → 0",
];

static CHISQ_DIST_RELATED: [&str; 3] = ["chisq_inv", "chisq_conf", "chisq_test1s"];

impl FunctionPlugin for ChisqDist {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "chisq_dist",
            description: "Chi-squared cumulative distribution or density",
            usage: "chisq_dist(s, df, [cumulative])",
            args: &CHISQ_DIST_ARGS,
            returns: "Number",
            examples: &CHISQ_DIST_EXAMPLES,
            category: "stats/distribution",
            related: &CHISQ_DIST_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("chisq_dist", args, 2, 3, |a| {
            (a.number(0, "s"), a.number(1, "df"), a.flag(2, "cumulative", true))
        });
        match parsed {
            Ok((s, df, cumulative)) => number_result("chisq_dist", chisq_dist(s, df, cumulative)),
            Err(e) => Value::Error(e),
        }
    }
}

pub struct ChisqInv;

static CHISQ_INV_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("p", "Number", "Probability"),
    ArgMeta::required("df", "Number", "Degrees of freedom > 0"),
];

static CHISQ_INV_EXAMPLES: [&str; 1] = ["chisq_inv(0.975, 24) → 39.364"];

static CHISQ_INV_RELATED: [&str; 2] = ["chisq_dist", "chisq_conf"];

impl FunctionPlugin for ChisqInv {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "chisq_inv",
            description: "Inverse chi-squared CDF",
            usage: "chisq_inv(p, df)",
            args: &CHISQ_INV_ARGS,
            returns: "Number",
            examples: &CHISQ_INV_EXAMPLES,
            category: "stats/distribution",
            related: &CHISQ_INV_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("chisq_inv", args, 2, 2, |a| (a.number(0, "p"), a.number(1, "df")));
        match parsed {
            Ok((p, df)) => number_result("chisq_inv", chisq_inv(p, df)),
            Err(e) => Value::Error(e),
        }
    }
}
