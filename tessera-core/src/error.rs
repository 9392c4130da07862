//! Error types for Tessera operations

use thiserror::Error;

/// Domain validation errors raised by model constructors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Empty value for {field}")]
    EmptyValue { field: String },

    #[error("Illegal value for {field}: {reason}")]
    IllegalValue { field: String, reason: String },
}

/// Structural conversion errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Illegal type for {field}: expected {expected}, got {actual}")]
    IllegalType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Required field missing: {model}.{field}")]
    MissingField { model: String, field: String },

    #[error("Invalid conversion target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Malformed data: {reason}")]
    MalformedData { reason: String },
}

/// Collection access errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollectionError {
    #[error("Collection access out of range at position {position} (count {count})")]
    Access { position: usize, count: usize },
}

/// Cache layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Invalid cache key {key:?}: {reason}")]
    KeyValidation { key: String, reason: String },

    #[error("Cache type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Corrupt cache payload under {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Cache driver {driver} failed: {reason}")]
    Backend { driver: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Tessera errors.
#[derive(Debug, Clone, Error)]
pub enum TesseraError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Collection error: {0}")]
    Collection(#[from] CollectionError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl TesseraError {
    /// Shorthand for a conversion type mismatch.
    pub fn illegal_type(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        ConversionError::IllegalType {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
        .into()
    }

    /// Shorthand for a domain validation failure.
    pub fn illegal_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::IllegalValue {
            field: field.into(),
            reason: reason.into(),
        }
        .into()
    }

    /// Shorthand for malformed input.
    pub fn malformed(reason: impl Into<String>) -> Self {
        ConversionError::MalformedData {
            reason: reason.into(),
        }
        .into()
    }

    /// True when the error came from a model constructor's domain checks.
    pub fn is_validation(&self) -> bool {
        matches!(self, TesseraError::Validation(_))
    }

    /// True for runtime type disagreements.
    pub fn is_illegal_type(&self) -> bool {
        matches!(
            self,
            TesseraError::Conversion(ConversionError::IllegalType { .. })
        )
    }

    /// True for `IllegalValue` domain failures.
    pub fn is_illegal_value(&self) -> bool {
        matches!(
            self,
            TesseraError::Validation(ValidationError::IllegalValue { .. })
        )
    }
}

/// Result type alias for Tessera operations.
pub type TesseraResult<T> = Result<T, TesseraError>;

// =============================================================================
// TESTS
// =============================================================================
