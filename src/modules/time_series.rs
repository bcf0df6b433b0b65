//! Corpus distribution over time, for charting.
//!
//! Rows are grouped by category and calendar period and counted. Each
//! granularity is a grouping-key function over (category, date).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{info, instrument};

use super::{FieldSchema, IntoOutputs, Module, OutputValue, Outputs, ValueType};
use crate::error::Error;
use crate::inference::parse_date;
use crate::table::Table;
use crate::types::{Result, Value, DATE_COLUMN, DEFAULT_CATEGORY_LABEL};

const INPUTS: &[FieldSchema] = &[
    FieldSchema::required(
        "distribution",
        ValueType::String,
        "The wished data periodicity to display on visualization, values can be either 'day','month' or 'year'.",
    ),
    FieldSchema::required(
        "column",
        ValueType::String,
        "The column that contains publication names or ref/id.",
    ),
    FieldSchema::required(
        "table",
        ValueType::Table,
        "The table for which the distribution is needed, with a 'date' column.",
    ),
];

const OUTPUTS: &[FieldSchema] = &[FieldSchema::required(
    "viz_data",
    ValueType::List,
    "The aggregated data as a list of dicts for visualization purposes.",
)];

/// Aggregation granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    Day,
    Month,
    Year,
}

impl FromStr for Distribution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "day" => Ok(Distribution::Day),
            "month" => Ok(Distribution::Month),
            "year" => Ok(Distribution::Year),
            other => Err(Error::UnknownDistribution(other.to_string())),
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Distribution::Day => "day",
            Distribution::Month => "month",
            Distribution::Year => "year",
        };
        f.write_str(name)
    }
}

/// Calendar period a row falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Period {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
}

impl Distribution {
    fn period(self, date: NaiveDate) -> Period {
        match self {
            Distribution::Year => Period {
                year: date.year(),
                month: None,
                day: None,
            },
            Distribution::Month => Period {
                year: date.year(),
                month: Some(date.month()),
                day: None,
            },
            Distribution::Day => Period {
                year: date.year(),
                month: Some(date.month()),
                day: Some(date.day()),
            },
        }
    }
}

impl Period {
    /// Representative date of the bucket.
    ///
    /// Day buckets are labelled with the first of their month, like month
    /// buckets.
    fn start(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesConfig {
    pub distribution: Distribution,
    /// Category column
    pub column: String,
    /// Key the category is emitted under
    #[serde(default = "default_category_label")]
    pub category_label: String,
}

fn default_category_label() -> String {
    DEFAULT_CATEGORY_LABEL.to_string()
}

impl TimeSeriesConfig {
    /// Build a config from the raw distribution name
    pub fn new(distribution: &str, column: impl Into<String>) -> Result<Self> {
        Ok(Self {
            distribution: distribution.parse()?,
            column: column.into(),
            category_label: default_category_label(),
        })
    }

    pub fn with_category_label(mut self, label: impl Into<String>) -> Self {
        self.category_label = label.into();
        self
    }
}

/// One aggregated bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRecord {
    pub date: String,
    pub category: String,
    pub count: u64,
}

impl AggregationRecord {
    /// `{date, <category_label>, count}` with every value as a string
    pub fn to_json(&self, category_label: &str) -> JsonValue {
        let mut map = Map::new();
        map.insert("date".to_string(), JsonValue::String(self.date.clone()));
        map.insert(
            category_label.to_string(),
            JsonValue::String(self.category.clone()),
        );
        map.insert("count".to_string(), JsonValue::String(self.count.to_string()));
        JsonValue::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesOutput {
    pub category_label: String,
    pub records: Vec<AggregationRecord>,
}

impl TimeSeriesOutput {
    pub fn to_json(&self) -> Vec<JsonValue> {
        self.records
            .iter()
            .map(|record| record.to_json(&self.category_label))
            .collect()
    }
}

impl IntoOutputs for TimeSeriesOutput {
    fn into_outputs(self, outputs: &mut Outputs) -> Result<()> {
        outputs.set_value("viz_data", OutputValue::List(self.to_json()))
    }
}

/// Counts rows per category and calendar period
#[derive(Debug, Clone)]
pub struct TimeSeriesAggregator {
    config: TimeSeriesConfig,
}

impl TimeSeriesAggregator {
    pub fn new(config: TimeSeriesConfig) -> Result<Self> {
        if config.column.trim().is_empty() {
            return Err(Error::InvalidConfig("column must not be empty".to_string()));
        }
        if config.category_label.is_empty() || matches!(config.category_label.as_str(), "date" | "count") {
            return Err(Error::InvalidConfig(format!(
                "category_label '{}' is empty or clashes with an output key",
                config.category_label
            )));
        }
        Ok(Self { config })
    }
}

impl Module for TimeSeriesAggregator {
    type Input = Table;
    type Output = TimeSeriesOutput;

    const NAME: &'static str = "dh.viz_data_query";
    const DOC: &'static str =
        "Aggregate a corpus by period of time, as a visual aid to create a subset of a table.";

    fn inputs_schema() -> &'static [FieldSchema] {
        INPUTS
    }

    fn outputs_schema() -> &'static [FieldSchema] {
        OUTPUTS
    }

    #[instrument(skip(self, table), fields(distribution = %self.config.distribution, column = %self.config.column))]
    fn process(&self, table: Table) -> Result<TimeSeriesOutput> {
        let date_idx = table.column_index(DATE_COLUMN)?;
        let category_idx = table.column_index(&self.config.column)?;
        let distribution = self.config.distribution;

        let mut counts: BTreeMap<(String, Period), u64> = BTreeMap::new();
        for row in table.rows() {
            let date = row_date(&row[date_idx])?;
            let key = (row[category_idx].to_string(), distribution.period(date));
            *counts.entry(key).or_insert(0) += 1;
        }

        let records = counts
            .into_iter()
            .map(|((category, period), count)| -> Result<AggregationRecord> {
                let start = period.start().ok_or_else(|| Error::InvalidDate {
                    value: format!("{:?}", period),
                })?;
                Ok(AggregationRecord {
                    date: start.format("%Y-%m-%d").to_string(),
                    category,
                    count,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(buckets = records.len(), "aggregated corpus");

        Ok(TimeSeriesOutput {
            category_label: self.config.category_label.clone(),
            records,
        })
    }
}

fn row_date(value: &Value) -> Result<NaiveDate> {
    match value {
        Value::Date(date) => Ok(*date),
        Value::String(s) => parse_date(s).ok_or_else(|| Error::InvalidDate { value: s.clone() }),
        other => Err(Error::InvalidDate {
            value: other.to_string(),
        }),
    }
}
