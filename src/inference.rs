use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{DType, Value, TYPE_INFERENCE_SAMPLE_SIZE};

/// Boolean tokens (case-insensitive)
const TRUE_TOKENS: &[&str] = &["true", "yes"];
const FALSE_TOKENS: &[&str] = &["false", "no"];

/// Missing value tokens
pub const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NULL", "NaN", "None", "#N/A"];

static ISO_DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Leading ISO date of a date or datetime string (`2020-03-01`, `2020-03-01 00:00:00`)
static LEADING_DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?Z?)?$").unwrap());

/// Type inference state for a column
#[derive(Debug, Clone)]
pub struct TypeInferencer {
    /// Current inferred type
    current_type: Option<DType>,
    /// Sample values for initial inference
    samples: Vec<String>,
    /// Maximum sample size
    max_samples: usize,
    /// Whether initial inference is complete
    initial_inference_done: bool,
}

impl TypeInferencer {
    pub fn new() -> Self {
        Self {
            current_type: None,
            samples: Vec::with_capacity(TYPE_INFERENCE_SAMPLE_SIZE),
            max_samples: TYPE_INFERENCE_SAMPLE_SIZE,
            initial_inference_done: false,
        }
    }

    /// Add a value for type inference
    pub fn observe(&mut self, value: &str) {
        if is_missing(value) || is_blank(value) {
            return;
        }

        if !self.initial_inference_done {
            if self.samples.len() < self.max_samples {
                self.samples.push(value.to_string());
            }
            if self.samples.len() >= self.max_samples {
                self.perform_initial_inference();
            }
        } else {
            self.upgrade_type_if_needed(value);
        }
    }

    /// Force initial inference with current samples
    pub fn finalize_initial_inference(&mut self) {
        if !self.initial_inference_done && !self.samples.is_empty() {
            self.perform_initial_inference();
        }
    }

    /// Get the current inferred type
    pub fn inferred_type(&self) -> DType {
        self.current_type.unwrap_or(DType::String)
    }

    fn perform_initial_inference(&mut self) {
        let samples = &self.samples;
        let dtype = if samples.is_empty() {
            DType::String
        } else if samples.iter().all(|v| is_boolean(v)) {
            DType::Boolean
        } else if samples.iter().all(|v| is_integer(v)) {
            DType::Integer
        } else if samples.iter().all(|v| is_numeric(v)) {
            DType::Numeric
        } else if samples.iter().all(|v| is_date(v)) {
            DType::Date
        } else {
            DType::String
        };

        self.current_type = Some(dtype);
        self.initial_inference_done = true;
        self.samples.clear();
        self.samples.shrink_to_fit();
    }

    /// Widen the type during the full scan if a value doesn't fit
    fn upgrade_type_if_needed(&mut self, value: &str) {
        let new_type = match self.inferred_type() {
            DType::Integer if !is_integer(value) => {
                if is_numeric(value) {
                    DType::Numeric
                } else {
                    DType::String
                }
            }
            DType::Numeric if !is_numeric(value) => DType::String,
            DType::Boolean if !is_boolean(value) => DType::String,
            DType::Date if !is_date(value) => DType::String,
            _ => return,
        };

        self.current_type = Some(new_type);
    }
}

impl Default for TypeInferencer {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if a value represents a missing value.
///
/// The raw cell must equal a token exactly (ignoring ASCII case), so
/// whitespace-only text is not missing.
pub fn is_missing(value: &str) -> bool {
    MISSING_TOKENS.iter().any(|t| value.eq_ignore_ascii_case(t))
}

/// Whitespace-only cell: carries no type information, but is kept as text
/// in string columns
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn is_boolean(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    TRUE_TOKENS.contains(&lower.as_str()) || FALSE_TOKENS.contains(&lower.as_str())
}

pub fn is_integer(value: &str) -> bool {
    value.trim().parse::<i64>().is_ok()
}

pub fn is_numeric(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok()
}

/// Check if a value is an ISO calendar date
pub fn is_date(value: &str) -> bool {
    let trimmed = value.trim();
    ISO_DATE_PATTERN.is_match(trimmed) && NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok()
}

/// Parse an ISO date, ignoring any trailing time part
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let caps = LEADING_DATE_PATTERN.captures(value.trim())?;
    NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()
}

/// Convert a raw cell into a typed value for a column of the given type
pub fn convert(value: &str, dtype: DType) -> Value {
    if is_missing(value) || (dtype != DType::String && is_blank(value)) {
        return Value::Null;
    }

    let trimmed = value.trim();
    let converted = match dtype {
        DType::Boolean => Some(Value::Boolean(
            TRUE_TOKENS.contains(&trimmed.to_lowercase().as_str()),
        )),
        DType::Integer => trimmed.parse::<i64>().ok().map(Value::Integer),
        DType::Numeric => trimmed.parse::<f64>().ok().map(Value::Float),
        DType::Date => parse_date(trimmed).map(Value::Date),
        DType::String => None,
    };

    converted.unwrap_or_else(|| Value::String(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_missing() {
        assert!(is_missing(""));
        assert!(is_missing("NA"));
        assert!(is_missing("null"));
        assert!(!is_missing("  "));
        assert!(!is_missing(" NA"));
        assert!(!is_missing("0"));
        assert!(!is_missing("text"));
    }

    #[test]
    fn test_convert_keeps_whitespace_only_text() {
        assert_eq!(convert("   ", DType::String), Value::String("   ".to_string()));
        assert_eq!(convert("   ", DType::Integer), Value::Null);
        assert_eq!(convert("None", DType::String), Value::Null);
    }

    #[test]
    fn test_blank_cells_do_not_change_inferred_type() {
        let mut inferencer = TypeInferencer::new();
        for value in ["1", "  ", "3"] {
            inferencer.observe(value);
        }
        inferencer.finalize_initial_inference();
        assert_eq!(inferencer.inferred_type(), DType::Integer);
    }

    #[test]
    fn test_is_date() {
        assert!(is_date("1900-01-05"));
        assert!(!is_date("1900-13-05"));
        assert!(!is_date("01/05/1900"));
    }

    #[test]
    fn test_parse_date_accepts_datetime_strings() {
        let expected = NaiveDate::from_ymd_opt(2020, 3, 1);
        assert_eq!(parse_date("2020-03-01"), expected);
        assert_eq!(parse_date("2020-03-01 00:00:00"), expected);
        assert_eq!(parse_date("2020-03-01T10:30:00Z"), expected);
        assert_eq!(parse_date("March 2020"), None);
    }

    #[test]
    fn test_type_inferencer_integer() {
        let mut inf = TypeInferencer::new();
        inf.observe("1");
        inf.observe("NA");
        inf.observe("3");
        inf.finalize_initial_inference();

        assert_eq!(inf.inferred_type(), DType::Integer);
    }

    #[test]
    fn test_type_inferencer_date() {
        let mut inf = TypeInferencer::new();
        inf.observe("2024-01-15");
        inf.observe("2024-02-20");
        inf.finalize_initial_inference();

        assert_eq!(inf.inferred_type(), DType::Date);
    }

    #[test]
    fn test_type_inferencer_file_names_stay_strings() {
        let mut inf = TypeInferencer::new();
        inf.observe("sn86069873_1900-01-05_ed-1_seq-1_ocr.txt");
        inf.finalize_initial_inference();

        assert_eq!(inf.inferred_type(), DType::String);
    }

    #[test]
    fn test_type_inferencer_upgrade_integer_to_numeric() {
        let mut inf = TypeInferencer::new();
        inf.observe("1");
        inf.finalize_initial_inference();
        inf.observe("3.5");
        assert_eq!(inf.inferred_type(), DType::Numeric);

        inf.observe("abc");
        assert_eq!(inf.inferred_type(), DType::String);
    }

    #[test]
    fn test_convert() {
        assert_eq!(convert("42", DType::Integer), Value::Integer(42));
        assert_eq!(convert("", DType::Integer), Value::Null);
        assert_eq!(convert("yes", DType::Boolean), Value::Boolean(true));
        assert_eq!(
            convert("2020-07-15", DType::Date),
            Value::Date(NaiveDate::from_ymd_opt(2020, 7, 15).unwrap())
        );
        assert_eq!(convert(" ab cd ", DType::String), Value::from(" ab cd "));
    }
}
