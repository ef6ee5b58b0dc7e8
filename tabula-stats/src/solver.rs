//! Inversion of cumulative distribution functions
//!
//! [`invert`] is a directional hill climb: it walks towards the target
//! probability, lengthening its stride while the error keeps its sign and
//! shortening it after every overshoot. It does not keep a bracket, so each
//! family supplies tuned constants through [`SolverConfig`].
//!
//! [`search_quantile`] is the integer counterpart used by the discrete
//! families.

/// Tuning constants for [`invert`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    pub initial_step: f64,
    /// Step multiplier while the error keeps its sign
    pub growth: f64,
    /// Step multiplier after the error changes sign
    pub decay: f64,
    /// Absolute probability error accepted as converged
    pub tolerance: f64,
    pub max_iterations: usize,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl SolverConfig {
    /// Distributions symmetric about zero (standard normal, Student's t)
    pub const SYMMETRIC: Self = Self {
        initial_step: 0.5,
        growth: 1.2,
        decay: 0.5,
        tolerance: 1e-10,
        max_iterations: 1000,
        lower_bound: f64::NEG_INFINITY,
        upper_bound: f64::INFINITY,
    };

    /// Chi-square: right-skewed, supported on [0, ∞)
    pub const CHI_SQUARE: Self = Self {
        initial_step: 0.20,
        growth: 1.09,
        decay: 0.35,
        tolerance: 1e-10,
        max_iterations: 1000,
        lower_bound: 0.0,
        upper_bound: f64::INFINITY,
    };

    /// A success probability in [0, 1]
    pub const PROPORTION: Self = Self {
        initial_step: 0.05,
        growth: 1.2,
        decay: 0.5,
        tolerance: 1e-10,
        max_iterations: 1000,
        lower_bound: 0.0,
        upper_bound: 1.0,
    };

    /// A Poisson rate in [0, ∞)
    pub const RATE: Self = Self {
        initial_step: 0.5,
        growth: 1.2,
        decay: 0.5,
        tolerance: 1e-10,
        max_iterations: 1000,
        lower_bound: 0.0,
        upper_bound: f64::INFINITY,
    };

    fn clamp(&self, x: f64) -> f64 {
        x.max(self.lower_bound).min(self.upper_bound)
    }
}

/// Initial guess for a distribution symmetric about zero
pub fn symmetric_guess(target: f64) -> f64 {
    if target < 0.5 {
        -0.5
    } else if target > 0.5 {
        0.5
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy)]
struct SolverState {
    guess: f64,
    last_error: f64,
    step: f64,
    iterations: usize,
}

/// Find `x` with `cdf(x) ≈ target` for a non-decreasing `cdf`
///
/// Stops once `|target - cdf(x)| < tolerance` or after `max_iterations`,
/// returning the current guess either way. For a non-increasing function
/// invert `1 - f` against `1 - target` instead.
pub fn invert<G, F>(target: f64, cdf: F, initial_guess: G, config: &SolverConfig) -> f64
where
    G: FnOnce(f64) -> f64,
    F: Fn(f64) -> f64,
{
    let mut state = SolverState {
        guess: config.clamp(initial_guess(target)),
        last_error: f64::NAN,
        step: config.initial_step,
        iterations: 0,
    };

    loop {
        let error = target - cdf(state.guess);
        if error.abs() < config.tolerance || state.iterations >= config.max_iterations {
            return state.guess;
        }

        let direction = error.signum();
        if state.iterations > 0 {
            if direction == state.last_error.signum() {
                state.step *= config.growth;
            } else {
                state.step *= config.decay;
            }
        }

        state.guess = config.clamp(state.guess + direction * state.step);
        state.last_error = error;
        state.iterations += 1;
    }
}

/// Iteration cap for [`search_quantile`]
const SEARCH_MAX_ITER: usize = 1000;

/// Largest position the integer search will visit on an unbounded support
const SEARCH_CEILING: f64 = 9.0e15;

/// Smallest integer `k` in `[0, upper]` with `cdf(k) >= target`
///
/// Starts at 0 with step 2. The step doubles while the search keeps moving
/// the same way and, once the direction has flipped, halves on every move
/// (never below 1). If the probability difference repeats exactly while the
/// search sits on a support boundary, that boundary is returned as is.
pub fn search_quantile<F>(target: f64, upper: Option<u64>, cdf: F) -> u64
where
    F: Fn(u64) -> f64,
{
    let ceiling = upper.map_or(SEARCH_CEILING, |u| u as f64);
    let mut k = 0.0_f64;
    let mut step = 2.0_f64;
    let mut last_direction = 0.0_f64;
    let mut last_diff: Option<f64> = None;
    let mut contracting = false;

    for _ in 0..SEARCH_MAX_ITER {
        let kk = k as u64;
        let diff = target - cdf(kk);

        let direction = if diff <= 0.0 {
            if kk == 0 || cdf(kk - 1) < target {
                return kk;
            }
            -1.0
        } else {
            1.0
        };

        let at_boundary = kk == 0 || k >= ceiling;
        if at_boundary && last_diff.map_or(false, |d| d.to_bits() == diff.to_bits()) {
            return kk;
        }

        if last_direction != 0.0 {
            if direction != last_direction {
                contracting = true;
            }
            step = if contracting {
                (step * 0.5).max(1.0)
            } else {
                step * 2.0
            };
        }

        k = (k + direction * step).clamp(0.0, ceiling);
        last_direction = direction;
        last_diff = Some(diff);
    }

    k as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logistic(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    #[test]
    fn test_invert_logistic() {
        for &p in &[0.01, 0.2, 0.5, 0.77, 0.999] {
            let x = invert(p, logistic, symmetric_guess, &SolverConfig::SYMMETRIC);
            let expected = (p / (1.0 - p)).ln();
            assert!((logistic(x) - p).abs() < 1e-10, "p={} x={}", p, x);
            assert!((x - expected).abs() < 1e-6, "p={} x={} expected={}", p, x, expected);
        }
    }

    #[test]
    fn test_invert_respects_lower_bound() {
        // Exponential CDF on [0, ∞)
        let cdf = |x: f64| if x <= 0.0 { 0.0 } else { 1.0 - (-x).exp() };
        let x = invert(0.001, cdf, |_| 3.0, &SolverConfig::CHI_SQUARE);
        assert!(x >= 0.0);
        assert!((cdf(x) - 0.001).abs() < 1e-10);
    }

    #[test]
    fn test_invert_returns_best_guess_when_unreachable() {
        // cdf never exceeds 0.5, so the cap stops the search
        let config = SolverConfig {
            max_iterations: 50,
            ..SolverConfig::PROPORTION
        };
        let x = invert(0.9, |x| 0.5 * x, |_| 0.5, &config);
        assert_eq!(x, 1.0);
    }

    #[test]
    fn test_symmetric_guess() {
        assert_eq!(symmetric_guess(0.1), -0.5);
        assert_eq!(symmetric_guess(0.5), 0.0);
        assert_eq!(symmetric_guess(0.9), 0.5);
    }

    #[test]
    fn test_search_quantile_step_function() {
        // cdf(k) = (k+1)/100 on 0..=99
        let cdf = |k: u64| ((k + 1) as f64 / 100.0).min(1.0);
        for &(target, expected) in &[(0.005, 0), (0.01, 0), (0.37, 36), (0.505, 50), (1.0, 99)] {
            assert_eq!(search_quantile(target, Some(99), cdf), expected, "target={}", target);
        }
    }

    #[test]
    fn test_search_quantile_unbounded() {
        // Geometric(1/2): cdf(k) = 1 - 2^{-(k+1)}
        let cdf = |k: u64| 1.0 - 0.5_f64.powi(k as i32 + 1);
        assert_eq!(search_quantile(0.9, None, cdf), 3);
        assert_eq!(search_quantile(0.999, None, cdf), 9);
    }

    #[test]
    fn test_search_quantile_flat_near_zero() {
        // Underflowed masses leave the cdf exactly 0 for small k; the repeated
        // difference must not stop the search away from a boundary
        let cdf = |k: u64| if k < 40 { 0.0 } else { ((k - 39) as f64 / 10.0).min(1.0) };
        assert_eq!(search_quantile(0.35, None, cdf), 43);
        assert_eq!(search_quantile(0.35, Some(100), cdf), 43);

        // Flat at or above the target from k = 0 returns 0 at once
        assert_eq!(search_quantile(0.5, Some(10), |_| 0.6), 0);
        assert_eq!(search_quantile(0.5, Some(10), |k| if k < 3 { 0.5 } else { 0.9 }), 0);
    }

    #[test]
    fn test_search_quantile_stalls_at_upper_boundary() {
        // cdf tops out below the target, so the search parks on k = n
        let cdf = |k: u64| (k as f64 / 20.0).min(0.9);
        assert_eq!(search_quantile(0.95, Some(10), cdf), 10);
    }
}
