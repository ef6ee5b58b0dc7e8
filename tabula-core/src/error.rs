//! Structured errors for plugin callers
//!
//! Errors never crash the system. At the plugin boundary they are values
//! that carry a machine-readable code, a message and actionable hints.

use crate::DomainError;
use serde::{Deserialize, Serialize};

/// Standard error codes (machine-readable)
pub mod codes {
    pub const UNDEFINED_FUNC: &str = "UNDEFINED_FUNC";
    pub const UNDEFINED_FIELD: &str = "UNDEFINED_FIELD";
    pub const TYPE_ERROR: &str = "TYPE_ERROR";
    pub const ARG_COUNT: &str = "ARG_COUNT";
    pub const DOMAIN_ERROR: &str = "DOMAIN_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The call failed
    Error,
    /// The caller cannot continue
    Fatal,
}

/// Where an error occurred
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Function whose preconditions failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,

    /// One entry per violated precondition
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

/// Structured error returned inside `Value::Error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabulaError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    pub severity: Severity,
}

impl TabulaError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            context: None,
            severity: Severity::Error,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: record the failing function
    pub fn in_function(mut self, function: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.function = Some(function.into());
        self
    }

    /// Builder: add note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.notes.push(note.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    // ========== Common Error Constructors ==========

    pub fn undefined_func(name: &str) -> Self {
        Self::new(codes::UNDEFINED_FUNC, format!("Unknown function: {}", name))
            .with_suggestion("Use list_functions to see available functions")
    }

    pub fn undefined_field(name: &str) -> Self {
        Self::new(codes::UNDEFINED_FIELD, format!("Undefined field: {}", name))
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::new(codes::TYPE_ERROR, format!("Expected {}, got {}", expected, got))
    }

    pub fn arg_count(func: &str, min: usize, max: usize, got: usize) -> Self {
        let expected = if min == max {
            format!("{}", min)
        } else {
            format!("{} to {}", min, max)
        };
        Self::new(
            codes::ARG_COUNT,
            format!("{}() expects {} arguments, got {}", func, expected, got),
        )
        .with_suggestion(format!("Use help('{}') for usage", func))
    }

    pub fn domain_error(details: impl Into<String>) -> Self {
        Self::new(codes::DOMAIN_ERROR, format!("Domain error: {}", details.into()))
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL, format!("Internal error: {}", details.into()))
            .with_suggestion("This is a bug, please report it")
            .with_severity(Severity::Fatal)
    }
}

impl std::fmt::Display for TabulaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for TabulaError {}

impl From<DomainError> for TabulaError {
    fn from(err: DomainError) -> Self {
        let notes = err.violations().to_vec();
        let mut out = Self::domain_error(err.to_string());
        for note in notes {
            out = out.with_note(note);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code_and_suggestion() {
        let err = TabulaError::undefined_func("nrom_dist");
        let text = err.to_string();
        assert!(text.starts_with("[UNDEFINED_FUNC]"));
        assert!(text.contains("suggestion"));
    }

    #[test]
    fn test_arg_count_range_message() {
        let err = TabulaError::arg_count("binom_dist", 3, 4, 1);
        assert_eq!(err.code, codes::ARG_COUNT);
        assert!(err.message.contains("3 to 4"));
    }

    #[test]
    fn test_domain_error_keeps_every_violation() {
        let mut checks = crate::Checks::new();
        checks.positive("stdev", 0.0).probability("p", 2.0);
        let err: TabulaError = checks.finish().unwrap_err().into();
        assert_eq!(err.code, codes::DOMAIN_ERROR);
        assert_eq!(err.context.unwrap().notes.len(), 2);
    }

    #[test]
    fn test_internal_is_fatal() {
        let err = TabulaError::internal("kernel returned NaN");
        assert_eq!(err.severity, Severity::Fatal);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"severity\":\"fatal\""));
    }

    #[test]
    fn test_serializes_without_empty_fields() {
        let err = TabulaError::domain_error("p must be between 0 and 1");
        let json = serde_json::to_string(&err).unwrap();
        assert!(!json.contains("suggestion"));
        assert!(json.contains("\"severity\":\"error\""));
    }
}
