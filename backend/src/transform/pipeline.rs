//! High-level pipeline API: FAST UI input to actuarial calculator input.
//!
//! Runs every stage in order, stopping at the first failure:
//! parse, validate, map, transform, assemble.
//!
//! # Example
//!
//! ```rust,ignore
//! use aim::{ConfigStore, Pipeline, ValidationLevel};
//!
//! let config = ConfigStore::load("config")?;
//! let envelope = Pipeline::new(&config).process(&raw, "life", ValidationLevel::Full);
//! println!("{}", serde_json::to_string_pretty(&envelope)?);
//! ```

use chrono::{Local, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use uuid::Uuid;

use super::assembler::OutputAssembler;
use super::mapper::FieldMapper;
use super::transformer::Transformer;
use crate::config::ConfigStore;
use crate::error::{PipelineResult, ValidationError};
use crate::logs::{log_error, log_info, log_success, log_warning};
use crate::models::{OutputDocument, ValidationLevel};
use crate::parser;
use crate::validation::Validator;

/// Uniform result of one pipeline run. Callers never see a raw error.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResultEnvelope {
    Success {
        actuarial_inputs: OutputDocument,
        metadata: RunMetadata,
    },
    Error {
        error_message: String,
        product_type: String,
        /// Seconds.
        processing_time: f64,
        processed_at: String,
    },
}

impl ResultEnvelope {
    pub fn is_success(&self) -> bool {
        matches!(self, ResultEnvelope::Success { .. })
    }

    pub fn actuarial_inputs(&self) -> Option<&OutputDocument> {
        match self {
            ResultEnvelope::Success { actuarial_inputs, .. } => Some(actuarial_inputs),
            ResultEnvelope::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ResultEnvelope::Error { error_message, .. } => Some(error_message),
            ResultEnvelope::Success { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub processed_at: String,
    pub fields_processed: usize,
    pub fields_mapped: usize,
    /// Wall-clock seconds for the whole call.
    pub processing_time: f64,
    pub product_type: String,
    pub validation_level: ValidationLevel,
    pub run_id: Uuid,
    /// Non-fatal validation findings.
    pub warnings: Vec<String>,
}

/// Output of the stages, before timing is known.
struct StageOutput {
    document: OutputDocument,
    fields_processed: usize,
    fields_mapped: usize,
    warnings: Vec<String>,
}

pub struct Pipeline<'a> {
    config: &'a ConfigStore,
    reference_date: Option<NaiveDate>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a ConfigStore) -> Self {
        Self {
            config,
            reference_date: None,
        }
    }

    /// Fix "today" for age validation and policy-year calculations.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Process one raw input document for `product`.
    pub fn process(&self, raw: &Value, product: &str, level: ValidationLevel) -> ResultEnvelope {
        let start = Instant::now();
        log_info(format!("🚀 Processing {} input ({} validation)", product, level));

        let result = self.run(raw, product, level);
        let processing_time = start.elapsed().as_secs_f64();
        let processed_at = Local::now().to_rfc3339();

        match result {
            Ok(output) => {
                log_success(format!("Processing completed in {:.2}s", processing_time));
                ResultEnvelope::Success {
                    actuarial_inputs: output.document,
                    metadata: RunMetadata {
                        processed_at,
                        fields_processed: output.fields_processed,
                        fields_mapped: output.fields_mapped,
                        processing_time,
                        product_type: product.to_string(),
                        validation_level: level,
                        run_id: Uuid::new_v4(),
                        warnings: output.warnings,
                    },
                }
            }
            Err(e) => {
                log_error(format!("Processing failed after {:.2}s: {}", processing_time, e));
                ResultEnvelope::Error {
                    error_message: e.to_string(),
                    product_type: product.to_string(),
                    processing_time,
                    processed_at,
                }
            }
        }
    }

    fn run(&self, raw: &Value, product: &str, level: ValidationLevel) -> PipelineResult<StageOutput> {
        if !self.config.has_product(product) {
            log_warning(format!("Unknown product type '{}', using empty configuration", product));
        }

        // Step 1: Parse
        let canonical = parser::parse(raw)?;

        // Step 2: Validate
        log_info(format!("✔️  Validating ({})...", level));
        let mut validator = Validator::new(self.config);
        if let Some(date) = self.reference_date {
            validator = validator.with_reference_date(date);
        }
        let validation = validator.validate(&canonical, product, level);
        if !validation.is_valid {
            return Err(ValidationError::Rejected {
                errors: validation.errors,
            }
            .into());
        }
        for warning in &validation.warnings {
            log_warning(warning.clone());
        }
        log_success("Input validation passed");

        // Step 3: Map
        log_info("🗺️  Mapping fields...");
        let mut mapped = FieldMapper::new(self.config).map_fields(&canonical, product)?;
        let fields_mapped = mapped.len();
        log_success(format!("Mapped to {} calculator fields", fields_mapped));

        // Step 4: Transform
        let mut transformer = Transformer::new(self.config);
        if let Some(date) = self.reference_date {
            transformer = transformer.with_reference_date(date);
        }
        transformer.apply_transformations(&mut mapped, product);

        // Step 5: Assemble
        log_info("📦 Assembling output...");
        let document = OutputAssembler::new(self.config).assemble(&mapped, product);

        Ok(StageOutput {
            document,
            fields_processed: canonical.len(),
            fields_mapped,
            warnings: validation.warnings,
        })
    }
}
