//! Transformation module.
//!
//! Everything after validation:
//! - Mapper: canonical fields to calculator target fields
//! - Similarity: fuzzy name matching for fields without a rule
//! - Formula / Actuarial / Transformer: derived and reformatted fields
//! - Assembler: sectioned output document
//! - Pipeline: the end-to-end orchestrator

pub mod actuarial;
pub mod assembler;
pub mod formula;
pub mod mapper;
pub mod pipeline;
pub mod similarity;
pub mod transformer;

pub use assembler::{assemble, OutputAssembler};
pub use formula::{evaluate, FormulaError};
pub use mapper::{FieldMapper, FieldMatch, MappingReport, MatchMethod};
pub use pipeline::{Pipeline, ResultEnvelope, RunMetadata};
pub use transformer::Transformer;
