//! Helper functions for plugin argument handling
//!
//! Plugins read their arguments through [`Args`], which records every type
//! or kind problem instead of stopping at the first one.

use std::collections::HashMap;
use tabula_core::{Checks, DomainError, TabulaError, Value};

/// Positional plugin arguments with violation collection
pub struct Args<'a> {
    func: &'static str,
    args: &'a [Value],
    checks: Checks,
}

impl<'a> Args<'a> {
    /// Check arity and propagate any error value passed as an argument
    pub fn new(func: &'static str, args: &'a [Value], min: usize, max: usize) -> Result<Self, TabulaError> {
        if args.len() < min || args.len() > max {
            return Err(TabulaError::arg_count(func, min, max, args.len()));
        }
        if let Some(Value::Error(e)) = args.iter().find(|a| a.is_error()) {
            return Err(e.clone());
        }
        Ok(Self {
            func,
            args,
            checks: Checks::new(),
        })
    }

    fn present(&self, idx: usize) -> Option<&'a Value> {
        match self.args.get(idx) {
            None | Some(Value::Null) => None,
            Some(v) => Some(v),
        }
    }

    /// Any real number; NaN stands in for a wrong-typed argument
    pub fn number(&mut self, idx: usize, name: &str) -> f64 {
        match self.present(idx) {
            Some(Value::Number(n)) => {
                self.checks.numeric(name, *n);
                *n
            }
            Some(other) => {
                self.checks
                    .violate(format!("{} must be a Number, got {}", name, other.type_name()));
                f64::NAN
            }
            None => {
                self.checks.violate(format!("{} is required", name));
                f64::NAN
            }
        }
    }

    /// A non-negative integer such as a count or a number of trials
    pub fn whole(&mut self, idx: usize, name: &str) -> u64 {
        let n = self.number(idx, name);
        if n.is_nan() {
            return 0;
        }
        self.checks.whole(name, n);
        if !(n.is_finite() && n >= 0.0 && n.fract() == 0.0) {
            return 0;
        }
        // u64::MAX rounds up to 2^64, the first whole f64 that does not fit
        if n >= u64::MAX as f64 {
            self.checks
                .violate(format!("{} must not exceed {}, got {}", name, u64::MAX, n));
            return 0;
        }
        n as u64
    }

    /// Optional boolean flag; numbers are read as non-zero = true
    pub fn flag(&mut self, idx: usize, name: &str, default: bool) -> bool {
        match self.present(idx) {
            None => default,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => *n != 0.0,
            Some(other) => {
                self.checks
                    .violate(format!("{} must be a Bool, got {}", name, other.type_name()));
                default
            }
        }
    }

    /// Optional selector given as an integer code or a lowercase string
    pub fn selector<S: Selector>(&mut self, idx: usize, default: S) -> S {
        let parsed = match self.present(idx) {
            None => return default,
            Some(Value::Number(n)) if n.fract() == 0.0 => S::from_code(*n as i64),
            Some(Value::Number(n)) => Err(DomainError::invalid_selector(S::NAME, &n.to_string(), S::ACCEPTED)),
            Some(Value::Text(s)) => S::from_name(s),
            Some(other) => Err(DomainError::invalid_selector(S::NAME, other.type_name(), S::ACCEPTED)),
        };
        match parsed {
            Ok(s) => s,
            Err(e) => {
                for v in e.violations() {
                    self.checks.violate(v.clone());
                }
                default
            }
        }
    }

    /// Fail with every recorded violation
    pub fn finish(self) -> Result<(), TabulaError> {
        let func = self.func;
        self.checks
            .finish()
            .map_err(|e| TabulaError::from(e).in_function(func))
    }
}

/// Read all arguments of one call, failing with every violation found
pub fn read_args<T, F>(func: &'static str, args: &[Value], min: usize, max: usize, read: F) -> Result<T, TabulaError>
where
    F: FnOnce(&mut Args) -> T,
{
    let mut a = Args::new(func, args, min, max)?;
    let values = read(&mut a);
    a.finish()?;
    Ok(values)
}

/// Enumerated option accepted as either an integer code or a name
pub trait Selector: Sized + Copy {
    const NAME: &'static str;
    const ACCEPTED: &'static [&'static str];

    fn from_code(code: i64) -> Result<Self, DomainError>;
    fn from_name(name: &str) -> Result<Self, DomainError>;
}

/// Wrap a numeric result as a plugin value; a NaN from validated input is
/// an internal fault
pub fn number_result(func: &str, result: Result<f64, DomainError>) -> Value {
    match result {
        Ok(n) if n.is_nan() => {
            Value::Error(TabulaError::internal(format!("{} produced NaN", func)).in_function(func))
        }
        Ok(n) => Value::Number(n),
        Err(e) => Value::Error(TabulaError::from(e).in_function(func)),
    }
}

/// Wrap an object-shaped result as a plugin value
pub fn object_result<T, F>(func: &str, result: Result<T, DomainError>, to_fields: F) -> Value
where
    F: FnOnce(T) -> HashMap<String, Value>,
{
    match result {
        Ok(v) => Value::Object(to_fields(v)),
        Err(e) => Value::Error(TabulaError::from(e).in_function(func)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence::Sidedness;
    use tabula_core::codes;

    #[test]
    fn test_arity() {
        let args = vec![Value::Number(1.0)];
        let err = Args::new("t_dist", &args, 2, 3).err().unwrap();
        assert_eq!(err.code, codes::ARG_COUNT);
    }

    #[test]
    fn test_error_argument_propagates() {
        let args = vec![Value::Error(TabulaError::internal("upstream")), Value::Number(1.0)];
        let err = Args::new("t_dist", &args, 2, 2).err().unwrap();
        assert_eq!(err.code, codes::INTERNAL);
    }

    #[test]
    fn test_collects_all_kind_violations() {
        let args = vec![Value::from("three"), Value::Number(2.5), Value::from(true)];
        let mut a = Args::new("binom_dist", &args, 3, 4).unwrap();
        a.whole(0, "successes");
        a.whole(1, "trials");
        a.number(2, "p");
        let err = a.finish().unwrap_err();
        assert_eq!(err.code, codes::DOMAIN_ERROR);
        let ctx = err.context.unwrap();
        assert_eq!(ctx.function.as_deref(), Some("binom_dist"));
        assert_eq!(ctx.notes.len(), 3);
    }

    #[test]
    fn test_whole_rejects_values_beyond_u64() {
        let args = vec![Value::Number(1e20), Value::Number(9007199254740992.0)];
        let mut a = Args::new("permut", &args, 2, 2).unwrap();
        assert_eq!(a.whole(0, "n"), 0);
        assert_eq!(a.whole(1, "k"), 9_007_199_254_740_992);
        let err = a.finish().unwrap_err();
        assert_eq!(err.code, codes::DOMAIN_ERROR);
        assert!(err.message.contains("n must not exceed 18446744073709551615"));
    }

    #[test]
    fn test_number_result() {
        assert_eq!(number_result("f", Ok(0.25)).as_number(), Some(0.25));
        assert_eq!(number_result("f", Ok(f64::INFINITY)).as_number(), Some(f64::INFINITY));
        let nan = number_result("f", Ok(f64::NAN));
        let err = nan.as_error().unwrap();
        assert_eq!(err.code, codes::INTERNAL);
        assert_eq!(err.severity, tabula_core::Severity::Fatal);
    }

    #[test]
    fn test_read_args() {
        let args = vec![Value::Number(4.0), Value::Number(0.25)];
        let (k, p) = read_args("f", &args, 2, 2, |a| (a.whole(0, "k"), a.number(1, "p"))).unwrap();
        assert_eq!(k, 4);
        assert_eq!(p, 0.25);
        assert!(read_args("f", &args, 2, 2, |a| a.whole(1, "k")).is_err());
    }

    #[test]
    fn test_optional_arguments_default() {
        let args = vec![Value::Number(1.0), Value::Null];
        let mut a = Args::new("f", &args, 1, 3).unwrap();
        assert!(a.flag(1, "cumulative", true));
        assert_eq!(a.selector(2, Sidedness::TwoSided), Sidedness::TwoSided);
        assert!(a.finish().is_ok());
    }

    #[test]
    fn test_selector_from_code_and_name() {
        let args = vec![Value::Number(-1.0), Value::from("upper"), Value::from("sideways")];
        let mut a = Args::new("f", &args, 3, 3).unwrap();
        assert_eq!(a.selector(0, Sidedness::TwoSided), Sidedness::Lower);
        assert_eq!(a.selector(1, Sidedness::TwoSided), Sidedness::Upper);
        a.selector(2, Sidedness::TwoSided);
        let err = a.finish().unwrap_err();
        assert!(err.message.contains("lower"));
    }
}
