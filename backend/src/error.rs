//! Error types for the AIM transformation pipeline.
//!
//! This module defines the error hierarchy used across the pipeline stages:
//!
//! - [`ParsingError`] - Raw FAST UI input could not be parsed
//! - [`ValidationError`] - Business rules rejected the canonical data
//! - [`MappingError`] - Mapping configuration could not be applied
//! - [`ConfigError`] - Configuration files could not be loaded or written
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`StoreError`] / [`ExportError`] - Collaborator failures
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across stage boundaries.

use thiserror::Error;

// =============================================================================
// Parsing Errors
// =============================================================================

/// Errors while turning raw FAST UI input into canonical fields.
#[derive(Debug, Error)]
pub enum ParsingError {
    /// Top-level input was not a JSON object.
    #[error("Failed to parse FAST UI data: expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// Input file could not be read.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// Input text is not valid JSON.
    #[error("Failed to parse FAST UI data: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Validation failure carrying every rule violation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// One or more rules were violated.
    #[error("{}", .errors.join("; "))]
    Rejected { errors: Vec<String> },

    /// The rule set itself is unusable (bad regex, malformed section).
    #[error("Validation error: {0}")]
    InvalidRules(String),
}

// =============================================================================
// Mapping Errors
// =============================================================================

/// Hard mapping failures.
///
/// Unmapped fields degrade softly and never produce this error; it is only
/// raised when a product's mapping configuration cannot be interpreted.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A mapping rule could not be deserialised.
    #[error("Failed to map fields: invalid rule for '{field}': {message}")]
    InvalidRule { field: String, message: String },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading or persisting the product configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error on a configuration file.
    #[error("Config IO error on {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// File content is not JSON.
    #[error("Invalid JSON in configuration file {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    /// File content does not match its schema.
    #[error("Configuration file {file} does not match its schema: {}", .errors.join(", "))]
    Schema { file: String, errors: Vec<String> },

    /// A product section could not be turned into typed configuration.
    #[error("Invalid {category} configuration for product '{product}': {message}")]
    InvalidSection {
        category: &'static str,
        product: String,
        message: String,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// Never returned to callers of [`crate::transform::pipeline::Pipeline::process`];
/// the orchestrator folds it into the error envelope.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Parsing stage failed.
    #[error(transparent)]
    Parsing(#[from] ParsingError),

    /// Validation stage rejected the input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Mapping stage failed.
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

// =============================================================================
// Collaborator Errors
// =============================================================================

/// Errors from the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the spreadsheet-export collaborator.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("Export CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No target fields were supplied.
    #[error("No target fields to export")]
    NoTargets,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for parsing operations.
pub type ParsingResult<T> = Result<T, ParsingError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline stages.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let parse_err = ParsingError::NotAnObject("array");
        let pipeline_err: PipelineError = parse_err.into();
        assert!(pipeline_err.to_string().contains("expected a JSON object"));

        let mapping_err = MappingError::InvalidRule {
            field: "applicant_gender".into(),
            message: "missing target_field".into(),
        };
        let pipeline_err: PipelineError = mapping_err.into();
        assert!(pipeline_err.to_string().contains("applicant_gender"));
    }

    #[test]
    fn test_validation_error_joins_messages() {
        let err = ValidationError::Rejected {
            errors: vec!["first".into(), "second".into()],
        };
        assert_eq!(err.to_string(), "first; second");
    }

    #[test]
    fn test_schema_error_format() {
        let err = ConfigError::Schema {
            file: "field_mappings.json".into(),
            errors: vec!["bad type".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("field_mappings.json"));
        assert!(msg.contains("bad type"));
    }
}
