//! Precondition checking for numeric arguments
//!
//! Every public numeric function validates its inputs up front. Violations
//! are collected by [`Checks`] so a caller sees all of them at once rather
//! than fixing one argument per round trip.

use thiserror::Error;

/// One or more numeric arguments are outside the domain of a function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .violations.join("; "))]
pub struct DomainError {
    violations: Vec<String>,
}

impl DomainError {
    /// Create an error with a single violation
    pub fn new(violation: impl Into<String>) -> Self {
        Self {
            violations: vec![violation.into()],
        }
    }

    /// Error for a selector value that is not one of `accepted`
    pub fn invalid_selector(name: &str, got: &str, accepted: &[&str]) -> Self {
        Self::new(format!(
            "{} must be one of {}, got '{}'",
            name,
            accepted.join(", "),
            got
        ))
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }
}

/// Collects violated preconditions and fails once with all of them.
#[derive(Debug, Default)]
pub struct Checks {
    violations: Vec<String>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` unless `condition` holds
    pub fn require(&mut self, condition: bool, message: impl Into<String>) -> &mut Self {
        if !condition {
            self.violations.push(message.into());
        }
        self
    }

    /// Record a violation unconditionally
    pub fn violate(&mut self, message: impl Into<String>) -> &mut Self {
        self.violations.push(message.into());
        self
    }

    /// Value must be a number (not NaN). Infinities pass.
    pub fn numeric(&mut self, name: &str, x: f64) -> &mut Self {
        self.require(!x.is_nan(), format!("{} must be a number", name))
    }

    pub fn finite(&mut self, name: &str, x: f64) -> &mut Self {
        if x.is_nan() {
            return self.numeric(name, x);
        }
        self.require(x.is_finite(), format!("{} must be finite, got {}", name, x))
    }

    /// Value must lie in the closed interval [0, 1]
    pub fn probability(&mut self, name: &str, x: f64) -> &mut Self {
        if x.is_nan() {
            return self.numeric(name, x);
        }
        self.require(
            (0.0..=1.0).contains(&x),
            format!("{} must be between 0 and 1, got {}", name, x),
        )
    }

    /// Value must lie in the open interval (0, 1)
    pub fn open_probability(&mut self, name: &str, x: f64) -> &mut Self {
        if x.is_nan() {
            return self.numeric(name, x);
        }
        self.require(
            x > 0.0 && x < 1.0,
            format!("{} must be strictly between 0 and 1, got {}", name, x),
        )
    }

    pub fn positive(&mut self, name: &str, x: f64) -> &mut Self {
        if x.is_nan() {
            return self.numeric(name, x);
        }
        self.require(x > 0.0, format!("{} must be > 0, got {}", name, x))
    }

    pub fn non_negative(&mut self, name: &str, x: f64) -> &mut Self {
        if x.is_nan() {
            return self.numeric(name, x);
        }
        self.require(x >= 0.0, format!("{} must be >= 0, got {}", name, x))
    }

    /// Value must be a finite non-negative integer
    pub fn whole(&mut self, name: &str, x: f64) -> &mut Self {
        if x.is_nan() {
            return self.numeric(name, x);
        }
        self.require(
            x.is_finite() && x >= 0.0 && x.fract() == 0.0,
            format!("{} must be a non-negative integer, got {}", name, x),
        )
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn finish(self) -> Result<(), DomainError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError {
                violations: self.violations,
            })
        }
    }
}
