//! Student's t distribution

use crate::helpers::{number_result, read_args};
use crate::solver::{invert, symmetric_guess, SolverConfig};
use crate::special::{beta_reg, gammln};
use std::f64::consts::PI;
use tabula_core::{Checks, DomainError};
use tabula_plugin::prelude::*;

/// Density of Student's t with `df` degrees of freedom
pub fn t_pdf(t: f64, df: f64) -> Result<f64, DomainError> {
    validate(t, df)?;
    let ln_norm = gammln((df + 1.0) / 2.0) - gammln(df / 2.0) - 0.5 * (df * PI).ln();
    Ok((ln_norm - (df + 1.0) / 2.0 * (1.0 + t * t / df).ln()).exp())
}

/// P(T ≤ t) through the regularized incomplete beta I_x(df/2, 1/2),
/// x = df / (t² + df)
pub fn t_cdf(t: f64, df: f64) -> Result<f64, DomainError> {
    validate(t, df)?;
    Ok(cumulative(t, df))
}

pub fn t_dist(t: f64, df: f64, cumulative: bool) -> Result<f64, DomainError> {
    if cumulative {
        t_cdf(t, df)
    } else {
        t_pdf(t, df)
    }
}

/// t with P(T ≤ t) = `p`; ±∞ at p = 0 and p = 1
pub fn t_inv(p: f64, df: f64) -> Result<f64, DomainError> {
    let mut checks = Checks::new();
    checks.probability("p", p).positive("df", df).finite("df", df);
    checks.finish()?;
    Ok(quantile(p, df))
}

fn validate(t: f64, df: f64) -> Result<(), DomainError> {
    let mut checks = Checks::new();
    checks.numeric("t", t).positive("df", df).finite("df", df);
    checks.finish()
}

pub(crate) fn cumulative(t: f64, df: f64) -> f64 {
    let x = df / (t * t + df);
    let tail = 0.5 * beta_reg(x, df / 2.0, 0.5);
    if t > 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

pub(crate) fn quantile(p: f64, df: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    invert(p, |t| cumulative(t, df), symmetric_guess, &SolverConfig::SYMMETRIC)
}

// ============ Plugins ============

pub struct TDist;

static T_DIST_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("t", "Number", "t statistic"),
    ArgMeta::required("df", "Number", "Degrees of freedom > 0"),
    ArgMeta::optional("cumulative", "Bool", "P(T ≤ t) instead of the density", "true"),
];

static T_DIST_EXAMPLES: [&str; 2] = ["t_dist(1, 1) → 0.75", "t_dist(0, 10, false) → 0.3891"];

static T_DIST_RELATED: [&str; 3] = ["t_inv", "t_conf", "norm_dist"];

impl FunctionPlugin for TDist {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "t_dist",
            description: "Student's t cumulative distribution or density",
            usage: "t_dist(t, df, [cumulative])",
            args: &T_DIST_ARGS,
            returns: "Number",
            examples: &T_DIST_EXAMPLES,
            category: "stats/distribution",
            related: &T_DIST_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("t_dist", args, 2, 3, |a| {
            (a.number(0, "t"), a.number(1, "df"), a.flag(2, "cumulative", true))
        });
        match parsed {
            Ok((t, df, cumulative)) => number_result("t_dist", t_dist(t, df, cumulative)),
            Err(e) => Value::Error(e),
        }
    }
}

pub struct TInv;

static T_INV_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("p", "Number", "Probability"),
    ArgMeta::required("df", "Number", "Degrees of freedom > 0"),
];

static T_INV_EXAMPLES: [&str; 1] = ["t_inv(0.975, 24) → 2.0639"];

static T_INV_RELATED: [&str; 2] = ["t_dist", "norm_inv"];

impl FunctionPlugin for TInv {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "t_inv",
            description: "Inverse Student's t CDF",
            usage: "t_inv(p, df)",
            args: &T_INV_ARGS,
            returns: "Number",
            examples: &T_INV_EXAMPLES,
            category: "stats/distribution",
            related: &T_INV_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        let parsed = read_args("t_inv", args, 2, 2, |a| (a.number(0, "p"), a.number(1, "df")));
        match parsed {
            Ok((p, df)) => number_result("t_inv", t_inv(p, df)),
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
    fn test_cdf_cauchy_case() {
        // df = 1 is the Cauchy distribution: 1/2 + atan(t)/π
        assert!((t_cdf(1.0, 1.0).unwrap() - 0.75).abs() < 1e-9);
        let expected = 0.5 + (-2.5_f64).atan() / PI;
        assert!((t_cdf(-2.5, 1.0).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_cdf_symmetry() {
        for &df in &[1.0, 3.0, 24.0, 100.0] {
            assert_eq!(t_cdf(0.0, df).unwrap(), 0.5);
            let lo = t_cdf(-1.7, df).unwrap();
            let hi = t_cdf(1.7, df).unwrap();
            assert!((lo + hi - 1.0).abs() < 1e-12, "df={}", df);
        }
    }

    #[test]
    fn test_cdf_infinite_t() {
        assert_eq!(t_cdf(f64::INFINITY, 5.0).unwrap(), 1.0);
        assert_eq!(t_cdf(f64::NEG_INFINITY, 5.0).unwrap(), 0.0);
    }

    #[test]
    fn test_pdf() {
        // df = 1: 1 / (π (1 + t²))
        assert!((t_pdf(0.0, 1.0).unwrap() - 1.0 / PI).abs() < 1e-9);
        assert!((t_pdf(2.0, 1.0).unwrap() - 1.0 / (5.0 * PI)).abs() < 1e-9);
        // df = 2: (2 + t²)^{-3/2}
        assert!((t_pdf(1.0, 2.0).unwrap() - 3.0_f64.powf(-1.5)).abs() < 1e-9);
    }

    #[test]
    fn test_domain() {
        assert!(t_cdf(1.0, 0.0).is_err());
        assert!(t_inv(-0.1, 5.0).is_err());
    }

    #[test]
    fn test_inv_round_trip() {
        for &df in &[1.0, 3.0, 24.0, 100.0] {
            for &p in &[0.01, 0.3, 0.975] {
                let t = t_inv(p, df).unwrap();
                assert!((t_cdf(t, df).unwrap() - p).abs() < 1e-8, "df={} p={}", df, p);
            }
        }
        assert!((t_inv(0.975, 24.0).unwrap() - 2.0638985616280205).abs() < 1e-6);
        assert!((t_inv(0.975, 1.0).unwrap() - 12.706204736174698).abs() < 1e-5);
    }

    #[test]
    fn test_inv_boundaries() {
        assert_eq!(t_inv(0.0, 4.0).unwrap(), f64::NEG_INFINITY);
        assert_eq!(t_inv(1.0, 4.0).unwrap(), f64::INFINITY);
        assert_eq!(t_inv(0.5, 4.0).unwrap(), 0.0);
    }

    #[test]
    fn test_plugin() {
        let ctx = eval_ctx();
        let args = vec![Value::Number(1.0), Value::Number(1.0)];
        assert!((TDist.call(&args, &ctx).as_number().unwrap() - 0.75).abs() < 1e-9);

        let args = vec![Value::Number(0.5), Value::from("ten")];
        let err = TInv.call(&args, &ctx);
        assert_eq!(err.as_error().unwrap().code, codes::DOMAIN_ERROR);
    }
}
