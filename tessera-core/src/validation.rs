//! Validation traits
//!
//! Domain checks that model constructors run before an instance exists.
//! Failures are [`ValidationError`]s, so they stay distinguishable from
//! structural conversion errors when they surface through the converter.

use crate::error::{TesseraResult, ValidationError};
use chrono::NaiveDate;
use regex::Regex;
use uuid::Uuid;

/// Trait for validating non-empty strings.
///
/// # Example
/// ```ignore
/// use tessera_core::validation::ValidateNonEmpty;
///
/// fn new_title(title: &str) -> TesseraResult<()> {
///     title.validate_non_empty("title")?;
///     Ok(())
/// }
/// ```
pub trait ValidateNonEmpty {
    /// Validate that the value is non-empty.
    ///
    /// # Errors
    /// Returns `ValidationError::EmptyValue` if the value is empty or
    /// whitespace-only.
    fn validate_non_empty(&self, field_name: &str) -> TesseraResult<()>;
}

impl ValidateNonEmpty for str {
    fn validate_non_empty(&self, field_name: &str) -> TesseraResult<()> {
        if self.trim().is_empty() {
            return Err(ValidationError::EmptyValue {
                field: field_name.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl ValidateNonEmpty for &str {
    fn validate_non_empty(&self, field_name: &str) -> TesseraResult<()> {
        (*self).validate_non_empty(field_name)
    }
}

impl ValidateNonEmpty for String {
    fn validate_non_empty(&self, field_name: &str) -> TesseraResult<()> {
        self.as_str().validate_non_empty(field_name)
    }
}

impl<T: ValidateNonEmpty> ValidateNonEmpty for Option<T> {
    fn validate_non_empty(&self, field_name: &str) -> TesseraResult<()> {
        match self {
            Some(value) => value.validate_non_empty(field_name),
            None => Err(ValidationError::EmptyValue {
                field: field_name.to_string(),
            }
            .into()),
        }
    }
}

/// Trait for validating numeric ranges.
pub trait ValidateRange {
    /// Validate that the value is zero or greater.
    fn validate_non_negative(&self, field_name: &str) -> TesseraResult<()>;

    /// Validate that the value is within an inclusive range.
    fn validate_range(&self, field_name: &str, min: Self, max: Self) -> TesseraResult<()>
    where
        Self: Sized;
}

fn out_of_range(field_name: &str, reason: String) -> crate::TesseraError {
    ValidationError::IllegalValue {
        field: field_name.to_string(),
        reason,
    }
    .into()
}

macro_rules! impl_validate_range_int {
    ($($t:ty),*) => {
        $(
            impl ValidateRange for $t {
                #[allow(unused_comparisons)]
                fn validate_non_negative(&self, field_name: &str) -> TesseraResult<()> {
                    if *self < 0 as $t {
                        return Err(out_of_range(field_name, format!("{} is negative", self)));
                    }
                    Ok(())
                }

                fn validate_range(&self, field_name: &str, min: Self, max: Self) -> TesseraResult<()> {
                    if *self < min || *self > max {
                        return Err(out_of_range(
                            field_name,
                            format!("{} outside [{}, {}]", self, min, max),
                        ));
                    }
                    Ok(())
                }
            }
        )*
    };
}

impl_validate_range_int!(i32, i64, u32, u64, usize);

impl ValidateRange for f64 {
    fn validate_non_negative(&self, field_name: &str) -> TesseraResult<()> {
        if !self.is_finite() || *self < 0.0 {
            return Err(out_of_range(field_name, format!("{} is not a non-negative number", self)));
        }
        Ok(())
    }

    fn validate_range(&self, field_name: &str, min: Self, max: Self) -> TesseraResult<()> {
        if !self.is_finite() || *self < min || *self > max {
            return Err(out_of_range(
                field_name,
                format!("{} outside [{}, {}]", self, min, max),
            ));
        }
        Ok(())
    }
}

/// Validate that `value` is a hyphenated UUID.
pub fn validate_uuid(field_name: &str, value: &str) -> TesseraResult<Uuid> {
    value.validate_non_empty(field_name)?;
    Uuid::try_parse(value)
        .map_err(|e| out_of_range(field_name, format!("malformed UUID {:?}: {}", value, e)))
}

/// Validate that `value` is a date in the given `chrono` format.
pub fn validate_date(field_name: &str, value: &str, format: &str) -> TesseraResult<NaiveDate> {
    value.validate_non_empty(field_name)?;
    NaiveDate::parse_from_str(value, format).map_err(|e| {
        out_of_range(
            field_name,
            format!("{:?} is not a date in format {}: {}", value, format, e),
        )
    })
}

/// Validate that `value` matches `pattern`.
pub fn validate_pattern(field_name: &str, value: &str, pattern: &Regex) -> TesseraResult<()> {
    if !pattern.is_match(value) {
        return Err(out_of_range(
            field_name,
            format!("{:?} does not match {}", value, pattern.as_str()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TesseraError;

    #[test]
    fn test_validate_non_empty_str() {
        assert!("hello".validate_non_empty("test").is_ok());
        assert!("".validate_non_empty("test").is_err());
        assert!("   ".validate_non_empty("test").is_err());
        assert!("  hi  ".validate_non_empty("test").is_ok());
    }

    #[test]
    fn test_validate_non_empty_option() {
        let some_str: Option<&str> = Some("hello");
        let some_empty: Option<&str> = Some("");
        let none_str: Option<&str> = None;

        assert!(some_str.validate_non_empty("test").is_ok());
        assert!(some_empty.validate_non_empty("test").is_err());
        assert!(matches!(
            none_str.validate_non_empty("test"),
            Err(TesseraError::Validation(ValidationError::EmptyValue { .. }))
        ));
    }

    #[test]
    fn test_validate_range_int() {
        assert!(5i64.validate_range("test", 1, 10).is_ok());
        assert!(1i64.validate_range("test", 1, 10).is_ok());
        assert!(10i64.validate_range("test", 1, 10).is_ok());
        assert!(0i64.validate_range("test", 1, 10).is_err());
        assert!(11i64.validate_range("test", 1, 10).is_err());
        assert!((-1i32).validate_non_negative("test").is_err());
        assert!(0u64.validate_non_negative("test").is_ok());
    }

    #[test]
    fn test_validate_range_float() {
        assert!(25.0f64.validate_range("rate", 0.0, 100.0).is_ok());
        assert!((-1.0f64).validate_range("rate", 0.0, 100.0).is_err());
        assert!(f64::NAN.validate_range("rate", 0.0, 100.0).is_err());
        assert!(f64::INFINITY.validate_non_negative("amount").is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
        assert!(validate_uuid("id", "not-a-uuid").is_err());
        assert!(matches!(
            validate_uuid("id", ""),
            Err(TesseraError::Validation(ValidationError::EmptyValue { .. }))
        ));
    }

    #[test]
    fn test_validate_date() {
        let date = validate_date("starts_at", "2024-02-29", "%Y-%m-%d").expect("leap day");
        assert_eq!(date.to_string(), "2024-02-29");
        assert!(validate_date("starts_at", "2023-02-29", "%Y-%m-%d").is_err());
        assert!(validate_date("starts_at", "29/02/2024", "%Y-%m-%d").is_err());
    }

    #[test]
    fn test_validate_pattern() {
        let re = Regex::new(r"^[A-Z]{3}$").expect("valid regex");
        assert!(validate_pattern("code", "SEK", &re).is_ok());
        assert!(validate_pattern("code", "sek", &re).is_err());
    }
}
