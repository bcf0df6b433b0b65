//! Transform modules and the interface they expose to a pipeline host.
//!
//! Each module is built from a typed configuration (validated once, at
//! construction), declares its input and output schema, and has a single
//! deterministic `process` entry point. A module either returns its full
//! output or an error; nothing is partially produced.

pub mod metadata;
pub mod phrases;
pub mod text_stats;
pub mod time_series;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::Error;
use crate::table::Table;
use crate::types::Result;

pub use metadata::{
    MetadataConfig, MetadataExtractor, MetadataInput, MetadataOutput, PublicationMapping,
};
pub use phrases::{
    BigramPhraser, PhraseParams, Phrases, PhrasesConfig, PhrasesOutput, ScoredPhrase, Scoring,
};
pub use text_stats::{TextStatsAugmenter, TextStatsConfig};
pub use time_series::{
    AggregationRecord, Distribution, TimeSeriesAggregator, TimeSeriesConfig, TimeSeriesOutput,
};

/// Semantic type of a module input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Table,
    String,
    Integer,
    Float,
    List,
    Array,
}

/// One declared input or output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSchema {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub doc: &'static str,
    pub optional: bool,
}

impl FieldSchema {
    pub const fn required(name: &'static str, value_type: ValueType, doc: &'static str) -> Self {
        Self {
            name,
            value_type,
            doc,
            optional: false,
        }
    }

    pub const fn optional(name: &'static str, value_type: ValueType, doc: &'static str) -> Self {
        Self {
            name,
            value_type,
            doc,
            optional: true,
        }
    }
}

/// Full schema of a module, as reported to a host
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSchema {
    pub name: &'static str,
    pub doc: &'static str,
    pub inputs: &'static [FieldSchema],
    pub outputs: &'static [FieldSchema],
}

/// A transform unit pluggable into a pipeline host
pub trait Module {
    type Input;
    type Output: IntoOutputs;

    /// Stable module type name
    const NAME: &'static str;
    const DOC: &'static str;

    fn inputs_schema() -> &'static [FieldSchema];
    fn outputs_schema() -> &'static [FieldSchema];

    fn process(&self, input: Self::Input) -> Result<Self::Output>;

    fn schema() -> ModuleSchema {
        ModuleSchema {
            name: Self::NAME,
            doc: Self::DOC,
            inputs: Self::inputs_schema(),
            outputs: Self::outputs_schema(),
        }
    }

    /// Run the module and hand its result back as named output values
    fn run(&self, input: Self::Input) -> Result<Outputs> {
        let output = self.process(input)?;
        let mut outputs = Outputs::new(Self::outputs_schema());
        output.into_outputs(&mut outputs)?;
        Ok(outputs)
    }
}

/// A single named output value
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    Table(Table),
    List(Vec<JsonValue>),
}

impl OutputValue {
    pub fn to_json(&self) -> JsonValue {
        match self {
            OutputValue::Table(table) => JsonValue::Array(table.to_records()),
            OutputValue::List(items) => JsonValue::Array(items.clone()),
        }
    }
}

/// Output sink that only accepts names a module declared
#[derive(Debug, Clone)]
pub struct Outputs {
    declared: &'static [FieldSchema],
    values: BTreeMap<&'static str, OutputValue>,
}

impl Outputs {
    pub fn new(declared: &'static [FieldSchema]) -> Self {
        Self {
            declared,
            values: BTreeMap::new(),
        }
    }

    pub fn set_value(&mut self, name: &str, value: OutputValue) -> Result<()> {
        let declared = self.declared;
        let field = declared
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| Error::UndeclaredOutput(name.to_string()))?;
        self.values.insert(field.name, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&OutputValue> {
        self.values.get(name)
    }

    pub fn to_json(&self) -> JsonValue {
        let map = self
            .values
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect();
        JsonValue::Object(map)
    }
}

/// Typed module output that can be published through an [`Outputs`] sink
pub trait IntoOutputs {
    fn into_outputs(self, outputs: &mut Outputs) -> Result<()>;
}

/// Schemas of every module in this crate
pub fn all_schemas() -> Vec<ModuleSchema> {
    vec![
        MetadataExtractor::schema(),
        TextStatsAugmenter::schema(),
        BigramPhraser::schema(),
        TimeSeriesAggregator::schema(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECLARED: &[FieldSchema] = &[FieldSchema::required(
        "table_output",
        ValueType::Table,
        "A table.",
    )];

    #[test]
    fn test_outputs_rejects_undeclared_name() {
        let mut outputs = Outputs::new(DECLARED);
        let result = outputs.set_value("other", OutputValue::List(Vec::new()));
        assert!(matches!(result, Err(Error::UndeclaredOutput(name)) if name == "other"));

        outputs
            .set_value("table_output", OutputValue::Table(Table::default()))
            .unwrap();
        assert!(outputs.get("table_output").is_some());
    }

    #[test]
    fn test_all_schemas_have_unique_names() {
        let schemas = all_schemas();
        let mut names: Vec<_> = schemas.iter().map(|s| s.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
        assert!(schemas.iter().all(|s| !s.inputs.is_empty() && !s.outputs.is_empty()));
    }

    #[test]
    fn test_schema_serialization() {
        let json = serde_json::to_value(MetadataExtractor::schema()).unwrap();
        assert_eq!(json["name"], "dh.get_lccn_metadata");
        assert_eq!(json["inputs"][0]["type"], "table");
    }
}
