//! Mapping export - tabular comparison of calculator fields against a mapping.
//!
//! One row per calculator target field, then one row per source field whose
//! target is not in the requested list:
//!
//! ```text
//! calculator_field,source_field,value,status
//! insured_first_name,applicant_first_name,,mapped
//! policy_number,,,missing
//! ,applicant_gender,,unmapped_source
//! ```

use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::config::MappingSummary;
use crate::error::ExportError;
use crate::logs::log_success;
use crate::models::MappedDocument;

/// What the comparison is built from.
#[derive(Debug, Clone, Copy)]
pub enum ExportSource<'a> {
    /// A mapped (and usually transformed) document, values included.
    Document(&'a MappedDocument),
    /// A product's configured rules, no values.
    Summary(&'a MappingSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Mapped,
    Missing,
    UnmappedSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub calculator_field: String,
    pub source_field: String,
    pub value: String,
    pub status: RowStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub mapped: usize,
    pub missing: usize,
    pub unmapped_source: usize,
}

/// Spreadsheet-export boundary.
pub trait MappingExporter {
    fn export(&self, source: ExportSource<'_>, targets: &[String], out: &mut dyn Write) -> Result<ExportReport, ExportError>;

    fn export_to_path(&self, source: ExportSource<'_>, targets: &[String], path: &Path) -> Result<ExportReport, ExportError> {
        let mut file = File::create(path)?;
        let report = self.export(source, targets, &mut file)?;
        log_success(format!("Exported mapping comparison to {}", path.display()));
        Ok(report)
    }
}

/// Build comparison rows for `targets`.
pub fn comparison_rows(source: ExportSource<'_>, targets: &[String]) -> Result<Vec<ExportRow>, ExportError> {
    if targets.is_empty() {
        return Err(ExportError::NoTargets);
    }

    let mut rows: Vec<ExportRow> = Vec::new();
    match source {
        ExportSource::Document(doc) => {
            for target in targets {
                rows.push(match doc.get(target).filter(|v| !v.is_null()) {
                    Some(value) => row(target, target, &value.to_string(), RowStatus::Mapped),
                    None => row(target, "", "", RowStatus::Missing),
                });
            }
            for (field, value) in doc.iter() {
                if !targets.contains(field) {
                    rows.push(row("", field, &value.to_string(), RowStatus::UnmappedSource));
                }
            }
        }
        ExportSource::Summary(summary) => {
            for target in targets {
                let sources: Vec<&str> = summary
                    .field_list
                    .iter()
                    .filter(|e| &e.target_field == target)
                    .map(|e| e.fast_ui_field.as_str())
                    .collect();
                rows.push(if sources.is_empty() {
                    row(target, "", "", RowStatus::Missing)
                } else {
                    row(target, &sources.join("|"), "", RowStatus::Mapped)
                });
            }
            for entry in &summary.field_list {
                if !targets.contains(&entry.target_field) {
                    rows.push(row("", &entry.fast_ui_field, "", RowStatus::UnmappedSource));
                }
            }
        }
    }
    Ok(rows)
}

fn row(calculator_field: &str, source_field: &str, value: &str, status: RowStatus) -> ExportRow {
    ExportRow {
        calculator_field: calculator_field.to_string(),
        source_field: source_field.to_string(),
        value: value.to_string(),
        status,
    }
}

/// CSV exporter
#[derive(Debug, Clone, Default)]
pub struct CsvMappingExporter;

impl MappingExporter for CsvMappingExporter {
    fn export(&self, source: ExportSource<'_>, targets: &[String], out: &mut dyn Write) -> Result<ExportReport, ExportError> {
        let rows = comparison_rows(source, targets)?;
        let mut report = ExportReport::default();

        let mut writer = csv::Writer::from_writer(out);
        for r in &rows {
            match r.status {
                RowStatus::Mapped => report.mapped += 1,
                RowStatus::Missing => report.missing += 1,
                RowStatus::UnmappedSource => report.unmapped_source += 1,
            }
            writer.serialize(r)?;
        }
        writer.flush()?;
        Ok(report)
    }
}
