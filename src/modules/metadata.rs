//! Publication metadata from LCCN-style file names.
//!
//! File names look like `sn86069873_1900-01-05_ed-1_seq-1_ocr.txt`: a
//! publication reference (letters then digits) followed by an
//! underscore-delimited ISO date.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument, warn};

use super::{FieldSchema, IntoOutputs, Module, OutputValue, Outputs, ValueType};
use crate::error::Error;
use crate::table::Table;
use crate::types::{Result, Value, DATE_COLUMN, PUB_NAME_COLUMN, PUB_REF_COLUMN};

static PUB_REF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+\d+)_\d{4}-\d{2}-\d{2}_").unwrap());

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_(\d{4}-\d{2}-\d{2})_").unwrap());

const INPUTS: &[FieldSchema] = &[
    FieldSchema::required(
        "table_input",
        ValueType::Table,
        "The corpus for which we want to extract metadata from file names.",
    ),
    FieldSchema::required(
        "column_name",
        ValueType::String,
        "The column containing metadata. File names need to comply with the LCCN pattern \
         'sn86069873_1900-01-05_' containing publication reference and date.",
    ),
    FieldSchema::optional(
        "date_column",
        ValueType::String,
        "The column the date is parsed from, defaults to 'column_name'.",
    ),
    FieldSchema::optional(
        "publication_mapping",
        ValueType::List,
        "Two lists of equal length: publication references, then publication names.",
    ),
];

const OUTPUTS: &[FieldSchema] = &[
    FieldSchema::required(
        "table_output",
        ValueType::Table,
        "Augmented table containing extracted metadata, sorted by date.",
    ),
    FieldSchema::required(
        "publications_ref",
        ValueType::List,
        "List of unique publication references in the table.",
    ),
];

/// Configuration for [`MetadataExtractor`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Column the publication reference is parsed from
    pub column_name: String,

    /// Column the date is parsed from (defaults to `column_name`)
    #[serde(default)]
    pub date_column: Option<String>,
}

impl MetadataConfig {
    pub fn new(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            date_column: None,
        }
    }

    pub fn with_date_column(mut self, date_column: impl Into<String>) -> Self {
        self.date_column = Some(date_column.into());
        self
    }
}

/// Publication references and their display names, matched by position.
///
/// Checked only when applied: a malformed mapping drops the `pub_name`
/// column and never fails the extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationMapping {
    pub refs: Vec<String>,
    pub names: Vec<String>,
}

impl PublicationMapping {
    pub fn new(refs: Vec<String>, names: Vec<String>) -> Self {
        Self { refs, names }
    }

    fn lookup(&self) -> Result<HashMap<&str, &str>> {
        if self.refs.len() != self.names.len() {
            return Err(Error::InvalidMapping(format!(
                "{} references but {} names",
                self.refs.len(),
                self.names.len()
            )));
        }
        if self.refs.is_empty() {
            return Err(Error::InvalidMapping("mapping is empty".to_string()));
        }

        let mut lookup = HashMap::with_capacity(self.refs.len());
        for (pub_ref, name) in self.refs.iter().zip(&self.names) {
            if pub_ref.trim().is_empty() {
                return Err(Error::InvalidMapping("empty publication reference".to_string()));
            }
            // First occurrence wins
            lookup.entry(pub_ref.as_str()).or_insert(name.as_str());
        }
        Ok(lookup)
    }

    /// Map each reference to its name, leaving unknown references unchanged.
    ///
    /// Returns `None` if the mapping is malformed.
    pub fn apply(&self, pub_refs: &[String]) -> Option<Vec<Value>> {
        match self.lookup() {
            Ok(lookup) => Some(
                pub_refs
                    .iter()
                    .map(|r| Value::from(lookup.get(r.as_str()).copied().unwrap_or(r.as_str())))
                    .collect(),
            ),
            Err(e) => {
                warn!(error = %e, "skipping publication names");
                None
            }
        }
    }
}

/// Input for [`MetadataExtractor`]
#[derive(Debug, Clone)]
pub struct MetadataInput {
    pub table: Table,
    pub mapping: Option<PublicationMapping>,
}

impl MetadataInput {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            mapping: None,
        }
    }

    pub fn with_mapping(mut self, mapping: PublicationMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }
}

/// Output of [`MetadataExtractor`]
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataOutput {
    pub table: Table,
    /// Distinct publication references, first seen in date order
    pub publications_ref: Vec<String>,
}

impl IntoOutputs for MetadataOutput {
    fn into_outputs(self, outputs: &mut Outputs) -> Result<()> {
        outputs.set_value("table_output", OutputValue::Table(self.table))?;
        outputs.set_value(
            "publications_ref",
            OutputValue::List(self.publications_ref.into_iter().map(JsonValue::String).collect()),
        )?;
        Ok(())
    }
}

/// Adds `date`, `pub_ref` and optionally `pub_name` columns parsed from file names
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    config: MetadataConfig,
}

impl MetadataExtractor {
    pub fn new(config: MetadataConfig) -> Result<Self> {
        if config.column_name.trim().is_empty() {
            return Err(Error::InvalidConfig("column_name must not be empty".to_string()));
        }
        if matches!(&config.date_column, Some(c) if c.trim().is_empty()) {
            return Err(Error::InvalidConfig("date_column must not be empty".to_string()));
        }
        Ok(Self { config })
    }

    fn date_column(&self) -> &str {
        self.config
            .date_column
            .as_deref()
            .unwrap_or(&self.config.column_name)
    }
}

impl Module for MetadataExtractor {
    type Input = MetadataInput;
    type Output = MetadataOutput;

    const NAME: &'static str = "dh.get_lccn_metadata";
    const DOC: &'static str =
        "Extract publication references and dates from LCCN-style file names.";

    fn inputs_schema() -> &'static [FieldSchema] {
        INPUTS
    }

    fn outputs_schema() -> &'static [FieldSchema] {
        OUTPUTS
    }

    #[instrument(skip(self, input), fields(column = %self.config.column_name, rows = input.table.num_rows()))]
    fn process(&self, input: MetadataInput) -> Result<MetadataOutput> {
        let MetadataInput { mut table, mapping } = input;

        let dates = table
            .column(self.date_column())?
            .into_iter()
            .map(extract_date)
            .collect::<Result<Vec<_>>>()?;

        let pub_refs = table
            .column(&self.config.column_name)?
            .into_iter()
            .map(extract_pub_ref)
            .collect::<Result<Vec<_>>>()?;

        table.with_column(DATE_COLUMN, dates.into_iter().map(Value::Date).collect())?;
        table.with_column(PUB_REF_COLUMN, pub_refs.into_iter().map(Value::String).collect())?;

        let date_idx = table.column_index(DATE_COLUMN)?;
        table.sort_rows_by_key(|row| row[date_idx].as_date());

        let sorted_refs: Vec<String> = table
            .column(PUB_REF_COLUMN)?
            .into_iter()
            .map(|v| v.to_string())
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let publications_ref: Vec<String> = sorted_refs
            .iter()
            .filter(|pub_ref| seen.insert(pub_ref.as_str()))
            .cloned()
            .collect();

        if let Some(names) = mapping.and_then(|m| m.apply(&sorted_refs)) {
            table.with_column(PUB_NAME_COLUMN, names)?;
            debug!("added publication names");
        }

        info!(publications = publications_ref.len(), "extracted file name metadata");

        Ok(MetadataOutput {
            table,
            publications_ref,
        })
    }
}

fn raw_identifier(value: &Value) -> Result<&str> {
    value.as_str().ok_or_else(|| Error::PatternMismatch {
        value: if value.is_null() {
            "<null>".to_string()
        } else {
            value.to_string()
        },
    })
}

/// Publication reference of a file name, e.g. `sn86069873`
pub fn extract_pub_ref(value: &Value) -> Result<String> {
    let raw = raw_identifier(value)?;
    PUB_REF_PATTERN
        .captures(raw)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| Error::PatternMismatch {
            value: raw.to_string(),
        })
}

/// Date embedded in a file name between underscores
pub fn extract_date(value: &Value) -> Result<NaiveDate> {
    let raw = raw_identifier(value)?;
    let caps = DATE_PATTERN.captures(raw).ok_or_else(|| Error::PatternMismatch {
        value: raw.to_string(),
    })?;
    NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").map_err(|_| Error::InvalidDate {
        value: raw.to_string(),
    })
}
