//! Validation system for configuration values
//!
//! Each config section implements `ConfigSection`, so new sections can be
//! added without touching the load/save machinery.

pub use crate::error::ValidationError;

/// Trait for configuration sections that can validate themselves
pub trait ConfigSection: Default {
    /// Validates the section. An empty error list means valid.
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Merges another section into this one; values from `other` win.
    fn merge(&mut self, other: Self);

    /// Section name for error reporting
    fn section_name(&self) -> &'static str;
}

/// Common validators for config values
pub struct Validator;

impl Validator {
    /// Validates that a numeric value is within a range
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            Err(ValidationError::with_value(
                field,
                format!("must be between {} and {}", min, max),
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Validates that a string is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::new(field, "must not be empty"))
        } else {
            Ok(())
        }
    }

    /// Validates that a value is one of the allowed options
    pub fn one_of<T>(value: &T, allowed: &[T], field: &str) -> Result<(), ValidationError>
    where
        T: PartialEq + std::fmt::Display,
    {
        if !allowed.contains(value) {
            let allowed_str = allowed
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Err(ValidationError::with_value(
                field,
                format!("must be one of: {}", allowed_str),
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Collects multiple validation results into a single result
    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = results.into_iter().filter_map(|r| r.err()).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_bounds_inclusive() {
        assert!(Validator::in_range(0.0, 0.0, 1.0, "test").is_ok());
        assert!(Validator::in_range(1.0, 0.0, 1.0, "test").is_ok());
        assert!(Validator::in_range(1.1, 0.0, 1.0, "test").is_err());
        assert!(Validator::in_range(-0.1, 0.0, 1.0, "test").is_err());
    }

    #[test]
    fn test_not_empty() {
        assert!(Validator::not_empty("microdns_renderer", "test").is_ok());
        assert!(Validator::not_empty("   ", "test").is_err());
    }

    #[test]
    fn test_one_of() {
        let levels = ["error", "warn", "info"];
        assert!(Validator::one_of(&"info", &levels, "test").is_ok());
        assert!(Validator::one_of(&"verbose", &levels, "test").is_err());
    }

    #[test]
    fn test_collect_errors_keeps_all() {
        let results = vec![
            Ok(()),
            Err(ValidationError::new("a", "bad")),
            Err(ValidationError::new("b", "bad")),
        ];
        assert_eq!(Validator::collect_errors(results).unwrap_err().len(), 2);
    }
}
