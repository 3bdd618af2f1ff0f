//! Output Assembler - buckets mapped fields into template sections.

use std::collections::BTreeMap;

use crate::config::{ConfigStore, OutputTemplate};
use crate::logs::log_warning;
use crate::models::{FieldValue, MappedDocument, OutputDocument};

pub struct OutputAssembler<'a> {
    config: &'a ConfigStore,
}

impl<'a> OutputAssembler<'a> {
    pub fn new(config: &'a ConfigStore) -> Self {
        Self { config }
    }

    /// Assemble the product's output document. Without a template the
    /// document is empty.
    pub fn assemble(&self, mapped: &MappedDocument, product: &str) -> OutputDocument {
        let template = self.config.get_output_template(product);
        if template.is_none() {
            log_warning(format!("No output template for product '{}'", product));
        }
        assemble(mapped, template)
    }
}

/// Fill each template section from the mapped document, falling back to the
/// section's defaults. Fields with neither are omitted, never nulled.
pub fn assemble(mapped: &MappedDocument, template: Option<&OutputTemplate>) -> OutputDocument {
    let Some(template) = template else {
        return OutputDocument::default();
    };

    let sections = template
        .iter()
        .map(|(name, section)| {
            let fields: BTreeMap<String, FieldValue> = section
                .fields
                .iter()
                .filter_map(|field| {
                    let value = mapped
                        .get(field)
                        .filter(|v| !v.is_null())
                        .or_else(|| section.defaults.get(field).filter(|v| !v.is_null()))?;
                    Some((field.clone(), value.clone()))
                })
                .collect();
            (name.clone(), fields)
        })
        .collect();

    OutputDocument::from_sections(sections)
}
