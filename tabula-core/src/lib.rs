//! Tabula Core - Fundamental types
//!
//! This crate provides the core types used throughout Tabula:
//! - `Value`: Runtime values (numbers, text, objects, errors)
//! - `TabulaError`: Structured errors returned by plugins
//! - `DomainError` / `Checks`: precondition collection for numeric functions

mod domain;
mod error;
mod value;

pub use domain::{Checks, DomainError};
pub use error::{codes, ErrorContext, Severity, TabulaError};
pub use value::{format_number, Value};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::codes;
    pub use crate::{Checks, DomainError, Severity, TabulaError, Value};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod value_tests {
        use super::*;

        #[test]
        fn test_accessors() {
            let v = Value::Number(2.5);
            assert_eq!(v.as_number(), Some(2.5));
            assert!(v.as_text().is_none());
            assert_eq!(Value::from("x").type_name(), "Text");
        }

        #[test]
        fn test_get_missing_field() {
            let v = Value::Object(Default::default());
            let field = v.get("lower");
            assert!(field.is_error());
            assert_eq!(field.as_error().unwrap().code, codes::UNDEFINED_FIELD);
        }

        #[test]
        fn test_get_on_error_propagates() {
            let err = Value::Error(TabulaError::domain_error("bad"));
            assert_eq!(err.get("x").as_error().unwrap().code, codes::DOMAIN_ERROR);
        }

        #[test]
        fn test_from_option() {
            assert!(Value::from_option(None).is_null());
            assert_eq!(Value::from_option(Some(1.0)).as_number(), Some(1.0));
        }
    }

    mod format_tests {
        use super::*;

        #[test]
        fn test_format_significant_digits() {
            assert_eq!(format_number(0.1171875, 15), "0.1171875");
            assert_eq!(format_number(2.0638985616280205, 4), "2.064");
            assert_eq!(format_number(120.00000000000001, 15), "120");
        }

        #[test]
        fn test_format_non_finite() {
            assert_eq!(format_number(f64::INFINITY, 15), "inf");
            assert_eq!(format_number(f64::NEG_INFINITY, 15), "-inf");
        }

        #[test]
        fn test_render_object_sorted() {
            let mut obj = std::collections::HashMap::new();
            obj.insert("upper".to_string(), Value::Number(2.0));
            obj.insert("lower".to_string(), Value::Null);
            assert_eq!(Value::Object(obj).render(6), "{lower: null, upper: 2}");
        }
    }

    mod json_tests {
        use super::*;

        #[test]
        fn test_json_numbers_and_numeric_strings() {
            let v = Value::from_json(&json!([1, 2.5, "0.05", "two-sided", null]));
            let items = v.as_list().unwrap();
            assert_eq!(items[0].as_number(), Some(1.0));
            assert_eq!(items[1].as_number(), Some(2.5));
            assert_eq!(items[2].as_number(), Some(0.05));
            assert_eq!(items[3].as_text(), Some("two-sided"));
            assert!(items[4].is_null());
        }

        #[test]
        fn test_infinite_number_to_json() {
            assert_eq!(Value::Number(f64::INFINITY).to_json(), json!("inf"));
            assert_eq!(Value::from_json(&json!("-inf")).as_number(), Some(f64::NEG_INFINITY));
        }

        #[test]
        fn test_error_to_json() {
            let v = Value::Error(TabulaError::domain_error("p out of range"));
            assert_eq!(v.to_json()["_error"]["code"], json!("DOMAIN_ERROR"));
        }
    }
}
