//! Permutation and combination counts without factorials
//!
//! Factorials overflow `f64` beyond 170!, so counts are built one ratio at a
//! time. The same ratio product seeds the binomial mass function.

use crate::helpers::{number_result, read_args};
use tabula_core::{Checks, DomainError};
use tabula_plugin::prelude::*;

/// Number of ordered selections of `k` items from `n`: n·(n-1)·…·(n-k+1)
pub fn permutations(n: u64, k: u64) -> Result<u64, DomainError> {
    let mut checks = Checks::new();
    checks.require(k <= n, format!("k must not exceed n, got k={} n={}", k, n));
    checks.finish()?;

    (n - k + 1..=n).try_fold(1u64, |acc, factor| {
        acc.checked_mul(factor).ok_or_else(|| {
            DomainError::new(format!("permutations({}, {}) exceeds {}", n, k, u64::MAX))
        })
    })
}

/// Number of unordered selections of `k` items from `n`
///
/// Returned as `f64` so that counts far beyond `u64` stay representable.
/// C(n, k) and C(n, n-k) take the identical path and agree exactly.
pub fn combinations(n: u64, k: u64) -> Result<f64, DomainError> {
    let mut checks = Checks::new();
    checks.require(k <= n, format!("k must not exceed n, got k={} n={}", k, n));
    checks.finish()?;

    Ok(ratio_product(1.0, n, k))
}

/// Multiply `seed` by C(n, k), one ratio (n-m+i)/i at a time, using the
/// smaller of k and n-k as the number of ratios
pub(crate) fn ratio_product(seed: f64, n: u64, k: u64) -> f64 {
    let m = k.min(n - k);
    let base = (n - m) as f64;
    let mut acc = seed;
    for i in 1..=m {
        let i = i as f64;
        acc *= (base + i) / i;
    }
    acc
}

// ============ Plugins ============

pub struct Permut;

static PERMUT_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("n", "Number", "Number of items"),
    ArgMeta::required("k", "Number", "Number chosen, k ≤ n"),
];

static PERMUT_EXAMPLES: [&str; 1] = ["permut(5, 2) → 20"];

static PERMUT_RELATED: [&str; 1] = ["combin"];

impl FunctionPlugin for Permut {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "permut",
            description: "Number of ordered selections of k items from n",
            usage: "permut(n, k)",
            args: &PERMUT_ARGS,
            returns: "Number",
            examples: &PERMUT_EXAMPLES,
            category: "stats/combinatorics",
            related: &PERMUT_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        match read_args("permut", args, 2, 2, |a| (a.whole(0, "n"), a.whole(1, "k"))) {
            Ok((n, k)) => number_result("permut", permutations(n, k).map(|p| p as f64)),
            Err(e) => Value::Error(e),
        }
    }
}

pub struct Combin;

static COMBIN_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("n", "Number", "Number of items"),
    ArgMeta::required("k", "Number", "Number chosen, k ≤ n"),
];

static COMBIN_EXAMPLES: [&str; 1] = ["combin(52, 5) → 2598960"];

static COMBIN_RELATED: [&str; 2] = ["permut", "binom_dist"];

impl FunctionPlugin for Combin {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "combin",
            description: "Number of unordered selections of k items from n",
            usage: "combin(n, k)",
            args: &COMBIN_ARGS,
            returns: "Number",
            examples: &COMBIN_EXAMPLES,
            category: "stats/combinatorics",
            related: &COMBIN_RELATED,
        }
    }

    fn call(&self, args: &[Value], _ctx: &EvalContext) -> Value {
        match read_args("combin", args, 2, 2, |a| (a.whole(0, "n"), a.whole(1, "k"))) {
            Ok((n, k)) => number_result("combin", combinations(n, k)),
            Err(e) => Value::Error(e),
        }
    }
}
