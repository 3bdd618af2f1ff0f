//! Config Store - product configuration on disk
//!
//! Four JSON files drive the pipeline, each keyed by product type:
//!
//! | File | Content |
//! |---|---|
//! | `field_mappings.json` | canonical field → mapping rule |
//! | `validation_rules.json` | tiered rules, with a shared `base` entry |
//! | `transformations.json` | ordered post-mapping transformations |
//! | `output_templates.json` | output sections with fields and defaults |
//!
//! Files are checked against embedded JSON Schemas when loaded. A missing
//! file degrades to an empty category; a malformed one is a hard error.
//! The store is read-only once built.

pub mod defaults;
pub mod types;

pub use types::*;

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult, MappingError};
use crate::logs::{log_info, log_success, log_warning};

/// Default configuration directory (relative to current dir)
pub const DEFAULT_CONFIG_DIR: &str = "config";

pub const FIELD_MAPPINGS_FILE: &str = "field_mappings.json";
pub const VALIDATION_RULES_FILE: &str = "validation_rules.json";
pub const TRANSFORMATIONS_FILE: &str = "transformations.json";
pub const OUTPUT_TEMPLATES_FILE: &str = "output_templates.json";

/// Validation-rules entry merged under every product.
pub const BASE_RULES_KEY: &str = "base";

const FIELD_MAPPINGS_SCHEMA: &str = include_str!("../../schemas/field-mappings.json");
const VALIDATION_RULES_SCHEMA: &str = include_str!("../../schemas/validation-rules.json");
const TRANSFORMATIONS_SCHEMA: &str = include_str!("../../schemas/transformations.json");
const OUTPUT_TEMPLATES_SCHEMA: &str = include_str!("../../schemas/output-templates.json");

// =============================================================================
// Reports
// =============================================================================

/// Result of [`ConfigStore::validate_configuration`].
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub product_coverage: BTreeMap<String, ProductCoverage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductCoverage {
    pub has_field_mappings: bool,
    pub has_validation_rules: bool,
    pub has_transformations: bool,
    pub has_output_template: bool,
}

/// Result of [`ConfigStore::get_mapping_summary`].
#[derive(Debug, Clone, Serialize)]
pub struct MappingSummary {
    pub product_type: String,
    pub total_mappings: usize,
    pub simple_mappings: usize,
    pub complex_mappings: usize,
    pub field_list: Vec<MappingSummaryEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MappingSummaryEntry {
    pub fast_ui_field: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub target_field: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transformations: Vec<String>,
}

// =============================================================================
// Config Store
// =============================================================================

/// Product configuration, loaded once and shared by reference.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_dir: Option<PathBuf>,
    /// Kept raw so a bad rule surfaces as a mapping error for its product only.
    field_mappings: Map<String, Value>,
    /// Kept raw for the `base` deep merge.
    validation_rules: Map<String, Value>,
    transformations: BTreeMap<String, Vec<Transformation>>,
    output_templates: BTreeMap<String, OutputTemplate>,
}

impl ConfigStore {
    /// Built-in configuration, no disk access.
    pub fn defaults() -> Self {
        Self::from_json(
            defaults::field_mappings(),
            defaults::validation_rules(),
            defaults::transformations(),
            defaults::output_templates(),
        )
        .expect("built-in configuration is valid")
    }

    /// Load configuration from a directory.
    pub fn load(dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let dir = dir.as_ref();
        log_info(format!("📂 Loading configuration from {}", dir.display()));

        let store = Self::from_values(
            Some(dir.to_path_buf()),
            load_category(dir, FIELD_MAPPINGS_FILE, FIELD_MAPPINGS_SCHEMA)?,
            load_category(dir, VALIDATION_RULES_FILE, VALIDATION_RULES_SCHEMA)?,
            load_category(dir, TRANSFORMATIONS_FILE, TRANSFORMATIONS_SCHEMA)?,
            load_category(dir, OUTPUT_TEMPLATES_FILE, OUTPUT_TEMPLATES_SCHEMA)?,
        )?;

        log_success(format!(
            "Configuration loaded ({} products)",
            store.get_supported_products().len()
        ));
        Ok(store)
    }

    /// Write every default file missing from `dir`. Existing files are never
    /// overwritten. Returns the files created.
    pub fn ensure_defaults(dir: impl AsRef<Path>) -> ConfigResult<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            file: dir.display().to_string(),
            source,
        })?;

        let files = [
            (FIELD_MAPPINGS_FILE, defaults::field_mappings()),
            (VALIDATION_RULES_FILE, defaults::validation_rules()),
            (TRANSFORMATIONS_FILE, defaults::transformations()),
            (OUTPUT_TEMPLATES_FILE, defaults::output_templates()),
        ];

        let mut created = Vec::new();
        for (file, content) in files {
            let path = dir.join(file);
            if path.exists() {
                continue;
            }
            let json = serde_json::to_string_pretty(&content).map_err(|source| ConfigError::Json {
                file: file.to_string(),
                source,
            })?;
            fs::write(&path, json).map_err(|source| ConfigError::Io {
                file: file.to_string(),
                source,
            })?;
            log_info(format!("📝 Created default configuration file {}", path.display()));
            created.push(path);
        }
        Ok(created)
    }

    /// Build a store from in-memory JSON, one product-keyed object per
    /// category. Non-object categories are treated as empty.
    pub fn from_json(
        field_mappings: Value,
        validation_rules: Value,
        transformations: Value,
        output_templates: Value,
    ) -> ConfigResult<Self> {
        Self::from_values(
            None,
            into_category(field_mappings),
            into_category(validation_rules),
            into_category(transformations),
            into_category(output_templates),
        )
    }

    fn from_values(
        config_dir: Option<PathBuf>,
        field_mappings: Map<String, Value>,
        validation_rules: Map<String, Value>,
        transformations: Map<String, Value>,
        output_templates: Map<String, Value>,
    ) -> ConfigResult<Self> {
        let mut typed_transformations = BTreeMap::new();
        for (product, list) in transformations {
            typed_transformations.insert(product.clone(), parse_transformations(&product, list));
        }

        let mut typed_templates = BTreeMap::new();
        for (product, template) in output_templates {
            let parsed: OutputTemplate =
                serde_json::from_value(template).map_err(|e| ConfigError::InvalidSection {
                    category: "output template",
                    product: product.clone(),
                    message: e.to_string(),
                })?;
            typed_templates.insert(product, parsed);
        }

        Ok(Self {
            config_dir,
            field_mappings,
            validation_rules,
            transformations: typed_transformations,
            output_templates: typed_templates,
        })
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    // =========================================================================
    // Per-product lookups
    // =========================================================================

    /// Mapping rules for a product. Unknown products have none.
    pub fn get_field_mappings(&self, product: &str) -> Result<BTreeMap<String, MappingRule>, MappingError> {
        let Some(Value::Object(rules)) = self.field_mappings.get(product) else {
            return Ok(BTreeMap::new());
        };

        rules
            .iter()
            .map(|(field, rule)| {
                serde_json::from_value::<MappingRule>(rule.clone())
                    .map(|parsed| (field.clone(), parsed))
                    .map_err(|e| MappingError::InvalidRule {
                        field: field.clone(),
                        message: e.to_string(),
                    })
            })
            .collect()
    }

    /// Validation rules for a product with `base` deep-merged underneath.
    pub fn get_validation_rules(&self, product: &str) -> Value {
        let base = self
            .validation_rules
            .get(BASE_RULES_KEY)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        match self.validation_rules.get(product) {
            Some(overlay) if product != BASE_RULES_KEY => deep_merge(&base, overlay),
            _ => base,
        }
    }

    /// Typed view of [`Self::get_validation_rules`].
    pub fn validation_rule_set(&self, product: &str) -> ConfigResult<ValidationRuleSet> {
        serde_json::from_value(self.get_validation_rules(product)).map_err(|e| ConfigError::InvalidSection {
            category: "validation rules",
            product: product.to_string(),
            message: e.to_string(),
        })
    }

    pub fn get_transformations(&self, product: &str) -> &[Transformation] {
        self.transformations.get(product).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_output_template(&self, product: &str) -> Option<&OutputTemplate> {
        self.output_templates.get(product)
    }

    /// Sorted union of products across all categories, `base` excluded.
    pub fn get_supported_products(&self) -> Vec<String> {
        let mut products: BTreeSet<String> = BTreeSet::new();
        products.extend(self.field_mappings.keys().cloned());
        products.extend(self.validation_rules.keys().cloned());
        products.extend(self.transformations.keys().cloned());
        products.extend(self.output_templates.keys().cloned());
        products.remove(BASE_RULES_KEY);
        products.into_iter().collect()
    }

    pub fn has_product(&self, product: &str) -> bool {
        product != BASE_RULES_KEY && self.get_supported_products().iter().any(|p| p == product)
    }

    /// Every field a product's configuration can produce: mapping targets,
    /// transformation outputs and template fields.
    pub fn known_target_fields(&self, product: &str) -> Vec<String> {
        let mut fields: BTreeSet<String> = BTreeSet::new();

        if let Some(Value::Object(rules)) = self.field_mappings.get(product) {
            for rule in rules.values() {
                match rule {
                    Value::String(target) => {
                        fields.insert(target.clone());
                    }
                    Value::Object(obj) => {
                        if let Some(Value::String(target)) = obj.get("target_field") {
                            fields.insert(target.clone());
                        }
                    }
                    _ => {}
                }
            }
        }

        for transformation in self.get_transformations(product) {
            fields.insert(transformation.target_field().to_string());
        }

        if let Some(template) = self.get_output_template(product) {
            for section in template.values() {
                fields.extend(section.fields.iter().cloned());
            }
        }

        fields.into_iter().collect()
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Check that every product is covered by mappings and rules.
    pub fn validate_configuration(&self) -> ConfigReport {
        let products = self.get_supported_products();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut product_coverage = BTreeMap::new();

        for product in &products {
            let has_field_mappings = matches!(
                self.field_mappings.get(product),
                Some(Value::Object(rules)) if !rules.is_empty()
            );
            let has_validation_rules = matches!(
                self.get_validation_rules(product),
                Value::Object(ref rules) if !rules.is_empty()
            );

            if !has_field_mappings {
                warnings.push(format!("No field mappings for product type: {}", product));
            }
            if !has_validation_rules {
                warnings.push(format!("No validation rules for product type: {}", product));
            }
            if let Err(e) = self.get_field_mappings(product) {
                errors.push(e.to_string());
            }
            if let Err(e) = self.validation_rule_set(product) {
                errors.push(e.to_string());
            }

            product_coverage.insert(
                product.clone(),
                ProductCoverage {
                    has_field_mappings,
                    has_validation_rules,
                    has_transformations: !self.get_transformations(product).is_empty(),
                    has_output_template: self.get_output_template(product).is_some_and(|t| !t.is_empty()),
                },
            );
        }

        if warnings.len() > products.len() {
            errors.push("Too many missing configurations".to_string());
        }

        ConfigReport {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            product_coverage,
        }
    }

    /// Describe a product's mapping rules.
    pub fn get_mapping_summary(&self, product: &str) -> Result<MappingSummary, MappingError> {
        let rules = self.get_field_mappings(product)?;

        let field_list: Vec<MappingSummaryEntry> = rules
            .iter()
            .map(|(field, rule)| match rule {
                MappingRule::SimpleRename(target) => MappingSummaryEntry {
                    fast_ui_field: field.clone(),
                    kind: "simple".to_string(),
                    target_field: target.clone(),
                    transformations: Vec::new(),
                },
                MappingRule::ComplexRule(complex) => MappingSummaryEntry {
                    fast_ui_field: field.clone(),
                    kind: "complex".to_string(),
                    target_field: complex.target_field.clone(),
                    transformations: complex.steps(),
                },
            })
            .collect();

        let simple_mappings = field_list.iter().filter(|e| e.kind == "simple").count();

        Ok(MappingSummary {
            product_type: product.to_string(),
            total_mappings: field_list.len(),
            simple_mappings,
            complex_mappings: field_list.len() - simple_mappings,
            field_list,
        })
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::defaults()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn into_category(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Recursive merge: objects merge key by key, anything else (arrays
/// included) is replaced by the overlay.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                let next = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Deserialize one product's transformation list, skipping bad entries.
fn parse_transformations(product: &str, list: Value) -> Vec<Transformation> {
    let Value::Array(items) = list else {
        log_warning(format!("Transformations for '{}' are not a list, ignoring", product));
        return Vec::new();
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<Transformation>(item) {
            Ok(t) => Some(t),
            Err(e) => {
                log_warning(format!(
                    "Skipping transformation #{} for '{}': {}",
                    idx + 1,
                    product,
                    e
                ));
                None
            }
        })
        .collect()
}

fn load_category(dir: &Path, file: &str, schema: &str) -> ConfigResult<Map<String, Value>> {
    let path = dir.join(file);
    if !path.exists() {
        log_warning(format!("Configuration file {} not found, using empty section", path.display()));
        return Ok(Map::new());
    }

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        file: file.to_string(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        file: file.to_string(),
        source,
    })?;

    check_schema(file, schema, &value)?;

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::Schema {
            file: file.to_string(),
            errors: vec!["top level must be an object".to_string()],
        }),
    }
}

fn check_schema(file: &str, schema: &str, value: &Value) -> ConfigResult<()> {
    let schema_error = |message: String| ConfigError::Schema {
        file: file.to_string(),
        errors: vec![message],
    };

    let schema: Value =
        serde_json::from_str(schema).map_err(|e| schema_error(format!("embedded schema: {}", e)))?;
    let validator =
        jsonschema::draft7::new(&schema).map_err(|e| schema_error(format!("embedded schema: {}", e)))?;

    let errors: Vec<String> = validator.iter_errors(value).map(|e| e.to_string()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Schema {
            file: file.to_string(),
            errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_cover_three_products() {
        let store = ConfigStore::defaults();
        assert_eq!(store.get_supported_products(), vec!["annuity", "health", "life"]);
        assert!(store.config_dir().is_none());
    }

    #[test]
    fn test_default_files_match_their_schemas() {
        check_schema(FIELD_MAPPINGS_FILE, FIELD_MAPPINGS_SCHEMA, &defaults::field_mappings()).unwrap();
        check_schema(VALIDATION_RULES_FILE, VALIDATION_RULES_SCHEMA, &defaults::validation_rules()).unwrap();
        check_schema(TRANSFORMATIONS_FILE, TRANSFORMATIONS_SCHEMA, &defaults::transformations()).unwrap();
        check_schema(OUTPUT_TEMPLATES_FILE, OUTPUT_TEMPLATES_SCHEMA, &defaults::output_templates()).unwrap();
    }

    #[test]
    fn test_life_mappings() {
        let store = ConfigStore::defaults();
        let rules = store.get_field_mappings("life").unwrap();
        assert_eq!(rules["applicant_first_name"].target_field(), "insured_first_name");
        assert!(matches!(rules["applicant_gender"], MappingRule::ComplexRule(_)));
        assert!(store.get_field_mappings("pet").unwrap().is_empty());
    }

    #[test]
    fn test_bad_rule_is_a_mapping_error() {
        let store = ConfigStore::from_json(
            json!({ "life": { "x": { "target_field": "y", "scale_factor": "big" } } }),
            json!({}),
            json!({}),
            json!({}),
        )
        .unwrap();
        let err = store.get_field_mappings("life").unwrap_err();
        assert!(err.to_string().contains("'x'"));
    }

    #[test]
    fn test_deep_merge_replaces_arrays_and_merges_objects() {
        let base = json!({ "a": { "x": 1, "y": [1, 2] }, "b": 1 });
        let overlay = json!({ "a": { "y": [3], "z": true } });
        assert_eq!(
            deep_merge(&base, &overlay),
            json!({ "a": { "x": 1, "y": [3], "z": true }, "b": 1 })
        );
    }

    #[test]
    fn test_product_rules_inherit_base() {
        let store = ConfigStore::defaults();
        let life = store.validation_rule_set("life").unwrap();
        assert_eq!(life.basic.required_fields.len(), 3);
        let age = life.business.age_validations.unwrap();
        assert_eq!(age.max_age, 80.0);
        assert_eq!(age.warning_age, 65.0);
        assert_eq!(age.birth_date_field, "applicant_birth_date");
        assert_eq!(life.strict.consistency_checks.len(), 1);

        // unknown product gets base only
        let pet = store.validation_rule_set("pet").unwrap();
        assert_eq!(pet.business.age_validations.unwrap().max_age, 85.0);
    }

    #[test]
    fn test_known_target_fields_include_derived_fields() {
        let store = ConfigStore::defaults();
        let known = store.known_target_fields("life");
        for field in ["insured_first_name", "applicant_age", "modal_premium", "policy_year"] {
            assert!(known.iter().any(|f| f == field), "missing {}", field);
        }
    }

    #[test]
    fn test_ensure_defaults_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let custom = dir.path().join(FIELD_MAPPINGS_FILE);
        fs::write(&custom, r#"{"pet": {"name": "pet_name"}}"#).unwrap();

        let created = ConfigStore::ensure_defaults(dir.path()).unwrap();
        assert_eq!(created.len(), 3);
        assert!(ConfigStore::ensure_defaults(dir.path()).unwrap().is_empty());

        let store = ConfigStore::load(dir.path()).unwrap();
        assert_eq!(store.get_field_mappings("pet").unwrap()["name"].target_field(), "pet_name");
        assert!(store.get_field_mappings("life").unwrap().is_empty());
        assert_eq!(store.config_dir(), Some(dir.path()));
    }

    #[test]
    fn test_missing_files_degrade_to_empty() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::load(dir.path()).unwrap();
        assert!(store.get_supported_products().is_empty());
        assert!(store.get_transformations("life").is_empty());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(OUTPUT_TEMPLATES_FILE), "{ not json").unwrap();
        assert!(matches!(
            ConfigStore::load(dir.path()),
            Err(ConfigError::Json { .. })
        ));

        fs::write(dir.path().join(OUTPUT_TEMPLATES_FILE), r#"{"life": {"info": {"fields": "x"}}}"#).unwrap();
        assert!(matches!(
            ConfigStore::load(dir.path()),
            Err(ConfigError::Schema { .. })
        ));
    }

    #[test]
    fn test_unknown_transformation_is_skipped() {
        let store = ConfigStore::from_json(
            json!({}),
            json!({}),
            json!({ "life": [ { "type": "teleport", "field": "x" }, { "type": "age" } ] }),
            json!({}),
        )
        .unwrap();
        assert_eq!(store.get_transformations("life").len(), 1);
    }

    #[test]
    fn test_validate_configuration() {
        let report = ConfigStore::defaults().validate_configuration();
        assert!(report.is_valid);
        assert!(report.warnings.is_empty());
        assert!(report.product_coverage["life"].has_transformations);
        assert!(!report.product_coverage["health"].has_transformations);

        let sparse = ConfigStore::from_json(
            json!({}),
            json!({}),
            json!({ "life": [], "pet": [] }),
            json!({}),
        )
        .unwrap();
        let report = sparse.validate_configuration();
        assert!(!report.is_valid);
        assert_eq!(report.errors, vec!["Too many missing configurations"]);
    }

    #[test]
    fn test_mapping_summary() {
        let summary = ConfigStore::defaults().get_mapping_summary("life").unwrap();
        assert_eq!(summary.total_mappings, 9);
        assert_eq!(summary.complex_mappings, 3);
        assert_eq!(summary.simple_mappings, 6);
        let gender = summary
            .field_list
            .iter()
            .find(|e| e.fast_ui_field == "applicant_gender")
            .unwrap();
        assert_eq!(gender.transformations, vec!["value_mapping"]);
    }
}
