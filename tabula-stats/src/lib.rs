//! Tabula Statistics Plugin
//!
//! Distribution functions, inverses, confidence intervals and one-sample
//! tests in native `f64`. Every public function validates its inputs and
//! returns `Result<_, DomainError>`; the plugins wrap them and follow the
//! never-panic philosophy, returning `Value::Error` on failure.

mod helpers;

pub mod combinatorics;
pub mod confidence;
pub mod distributions;
pub mod hypothesis;
pub mod solver;
pub mod special;

pub use combinatorics::{combinations, permutations};
pub use confidence::{binom_conf, chisq_conf, norm_conf, poisson_conf, t_conf, ConfidenceInterval, Method, Sidedness};
pub use distributions::binomial::{binom_cdf, binom_dist, binom_inv, binom_invp, binom_pmf};
pub use distributions::chi::{chisq_cdf, chisq_dist, chisq_inv, chisq_pdf};
pub use distributions::normal::{norm_cdf, norm_dist, norm_inv, norm_pdf};
pub use distributions::poisson::{poisson_cdf, poisson_dist, poisson_inv, poisson_invp, poisson_pmf};
pub use distributions::t::{t_cdf, t_dist, t_inv, t_pdf};
pub use hypothesis::{binom_test1s, chisq_test1s, norm_test1s, poisson_test1s, t_test1s, Alternative};
pub use solver::{invert, search_quantile, SolverConfig};
pub use special::{
    erf, ln_gamma, ln_incomplete_beta, ln_lower_incomplete_gamma, ln_upper_incomplete_gamma, regularized_beta,
    regularized_gamma_p,
};

use tabula_plugin::PluginRegistry;

/// Load statistics functions into registry
pub fn load_stats_library(registry: PluginRegistry) -> PluginRegistry {
    registry
        // Binomial
        .with_function(distributions::BinomDist)
        .with_function(distributions::BinomInv)
        .with_function(distributions::BinomInvp)
        .with_function(confidence::BinomConf)
        .with_function(hypothesis::BinomTest1s)
        // Poisson
        .with_function(distributions::PoissonDist)
        .with_function(distributions::PoissonInv)
        .with_function(distributions::PoissonInvp)
        .with_function(confidence::PoissonConf)
        .with_function(hypothesis::PoissonTest1s)
        // Normal
        .with_function(distributions::NormDist)
        .with_function(distributions::NormInv)
        .with_function(confidence::NormConf)
        .with_function(hypothesis::NormTest1s)
        // Student's t
        .with_function(distributions::TDist)
        .with_function(distributions::TInv)
        .with_function(confidence::TConf)
        .with_function(hypothesis::TTest1s)
        // Chi-squared
        .with_function(distributions::ChisqDist)
        .with_function(distributions::ChisqInv)
        .with_function(confidence::ChisqConf)
        .with_function(hypothesis::ChisqTest1s)
        // Combinatorics and special functions
        .with_function(combinatorics::Permut)
        .with_function(combinatorics::Combin)
        .with_function(special::GammaLn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tabula_core::{codes, Value};
    use tabula_plugin::EvalContext;

    fn registry() -> Arc<PluginRegistry> {
        Arc::new(load_stats_library(PluginRegistry::new()))
    }

    #[test]
    fn test_library_registers_every_function() {
        let reg = registry();
        assert_eq!(reg.len(), 25);
        for name in ["binom_invp", "poisson_test1s", "chisq_conf", "gamma_ln", "permut"] {
            assert!(reg.get_function(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_metadata_is_consistent() {
        let reg = registry();
        for name in reg.function_names() {
            let meta = reg.get_function(name).unwrap().meta();
            assert_eq!(meta.name, name);
            assert!(meta.usage.starts_with(name), "{}", name);
            assert!(meta.category.starts_with("stats/"), "{}", name);
            for related in meta.related {
                assert!(reg.get_function(related).is_some(), "{} relates to unknown {}", name, related);
            }
        }
    }

    #[test]
    fn test_call_through_registry() {
        let reg = registry();
        let ctx = EvalContext::new(reg.clone());
        let result = reg.call_function(
            "norm_dist",
            &[Value::Number(1.96), Value::Number(0.0), Value::Number(1.0), Value::Bool(true)],
            &ctx,
        );
        assert!((result.as_number().unwrap() - 0.9750021).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_function_suggests_family() {
        let reg = registry();
        let ctx = EvalContext::new(reg.clone());
        let result = reg.call_function("binom_distr", &[], &ctx);
        let err = result.as_error().unwrap();
        assert_eq!(err.code, codes::UNDEFINED_FUNC);
        assert!(err.suggestion.as_ref().unwrap().contains("binom_dist"));
    }

    #[test]
    fn test_list_by_category() {
        let reg = registry();
        let conf = reg.list_functions(Some("stats/confidence"));
        assert_eq!(conf.as_list().unwrap().len(), 5);
        let all = reg.list_functions(Some("stats"));
        assert_eq!(all.as_list().unwrap().len(), 25);
    }

    #[test]
    fn test_inverse_round_trips() {
        for &p in &[0.01, 0.2, 0.5, 0.8, 0.99] {
            let x = norm_inv(p, 3.0, 2.0).unwrap();
            assert!((norm_cdf(x, 3.0, 2.0).unwrap() - p).abs() < 1e-8);
            let x = t_inv(p, 7.0).unwrap();
            assert!((t_cdf(x, 7.0).unwrap() - p).abs() < 1e-8);
            let x = chisq_inv(p, 7.0).unwrap();
            assert!((chisq_cdf(x, 7.0).unwrap() - p).abs() < 1e-8);
        }
    }
}
