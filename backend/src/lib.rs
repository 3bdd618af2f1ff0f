//! # AIM - Actuarial Input Mapper
//!
//! AIM turns heterogeneous FAST UI insurance-application data into validated,
//! product-specific input documents for the actuarial calculator.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────┐   ┌──────────┐   ┌────────┐   ┌───────────┐   ┌──────────┐
//! │ FAST UI  │──▶│ Parser │──▶│ Validator│──▶│ Mapper │──▶│Transformer│──▶│ Assembler│
//! │  (JSON)  │   │ (flat) │   │ (tiers)  │   │(rules) │   │(derived)  │   │(sections)│
//! └──────────┘   └────────┘   └──────────┘   └────────┘   └───────────┘   └──────────┘
//!                              ▲ ConfigStore: mappings, rules, transformations, templates
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aim::{ConfigStore, Pipeline, ValidationLevel};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigStore::load("config")?;
//!     let raw = aim::read_input_file("application.json")?;
//!     let envelope = Pipeline::new(&config).process(&raw, "life", ValidationLevel::Full);
//!     println!("{}", serde_json::to_string_pretty(&envelope)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per stage
//! - [`models`] - FieldValue, canonical map, mapped and output documents
//! - [`parser`] - Value normalization and structural flattening
//! - [`config`] - Per-product configuration store
//! - [`validation`] - Basic, business and strict rule tiers
//! - [`transform`] - Mapping, transformations, assembly and the pipeline
//! - [`store`] - Duplicate-aware submission persistence
//! - [`export`] - Mapping comparison export
//! - [`logs`] - Log broadcasting

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Stages
pub mod config;
pub mod parser;
pub mod transform;
pub mod validation;

// Collaborators
pub mod export;
pub mod store;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    ExportError,
    MappingError,
    ParsingError,
    PipelineError,
    StoreError,
    ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CanonicalField,
    CanonicalFieldMap,
    FieldValue,
    MappedDocument,
    OutputDocument,
    ValidationLevel,
    ValidationResult,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    parse,
    parsing_statistics,
    read_input_file,
    parse_input_bytes,
    ParsingStatistics,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{ConfigReport, ConfigStore, MappingRule, MappingSummary, Transformation};

// =============================================================================
// Re-exports - Stages and Pipeline
// =============================================================================

pub use validation::Validator;

pub use transform::{
    FieldMapper,
    MappingReport,
    MatchMethod,
    OutputAssembler,
    Pipeline,
    ResultEnvelope,
    Transformer,
};

// =============================================================================
// Re-exports - Collaborators
// =============================================================================

pub use export::{CsvMappingExporter, ExportSource, MappingExporter};
pub use store::{content_hash, JsonSubmissionStore, SubmissionOutcome, SubmissionStore};
