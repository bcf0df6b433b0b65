use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{FieldSchema, IntoOutputs, Module, OutputValue, Outputs, ValueType};
use crate::error::Error;
use crate::table::Table;
use crate::types::{Result, Value, CHARS_COUNT_COLUMN, WORDS_COUNT_COLUMN};

const INPUTS: &[FieldSchema] = &[
    FieldSchema::required("table_input", ValueType::Table, "The corpus to augment."),
    FieldSchema::required(
        "column_name",
        ValueType::String,
        "The column containing the text content.",
    ),
];

const OUTPUTS: &[FieldSchema] = &[FieldSchema::required(
    "table_output",
    ValueType::Table,
    "The corpus with 'chars_count' and 'words_count' columns.",
)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStatsConfig {
    pub column_name: String,
}

impl TextStatsConfig {
    pub fn new(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
        }
    }
}

impl IntoOutputs for Table {
    fn into_outputs(self, outputs: &mut Outputs) -> Result<()> {
        outputs.set_value("table_output", OutputValue::Table(self))
    }
}

/// Adds character and word counts for a text column
#[derive(Debug, Clone)]
pub struct TextStatsAugmenter {
    config: TextStatsConfig,
}

impl TextStatsAugmenter {
    pub fn new(config: TextStatsConfig) -> Result<Self> {
        if config.column_name.trim().is_empty() {
            return Err(Error::InvalidConfig("column_name must not be empty".to_string()));
        }
        Ok(Self { config })
    }
}

impl Module for TextStatsAugmenter {
    type Input = Table;
    type Output = Table;

    const NAME: &'static str = "dh.text_stats";
    const DOC: &'static str = "Add character and word counts for a text column.";

    fn inputs_schema() -> &'static [FieldSchema] {
        INPUTS
    }

    fn outputs_schema() -> &'static [FieldSchema] {
        OUTPUTS
    }

    #[instrument(skip(self, table), fields(column = %self.config.column_name, rows = table.num_rows()))]
    fn process(&self, mut table: Table) -> Result<Table> {
        let (chars, words): (Vec<Value>, Vec<Value>) = table
            .column(&self.config.column_name)?
            .into_iter()
            .map(|value| match value {
                Value::Null => (Value::Null, Value::Null),
                Value::String(text) => text_counts(text),
                other => text_counts(&other.to_string()),
            })
            .unzip();

        table.with_column(CHARS_COUNT_COLUMN, chars)?;
        table.with_column(WORDS_COUNT_COLUMN, words)?;
        debug!("added text statistics");

        Ok(table)
    }
}

fn text_counts(text: &str) -> (Value, Value) {
    (
        Value::Integer(chars_count(text) as i64),
        Value::Integer(words_count(text) as i64),
    )
}

/// Number of characters, whitespace included
pub fn chars_count(text: &str) -> usize {
    text.chars().count()
}

/// Number of whitespace-delimited words
pub fn words_count(text: &str) -> usize {
    text.split_whitespace().count()
}
