use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::Error;
use crate::modules::{OutputValue, Outputs};
use crate::table::Table;
use crate::types::Result;

/// Write a value to a JSON file
pub fn write_json_file<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

/// Write a value to a JSON string
pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write a value to stdout as JSON
pub fn write_json_stdout<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = to_json_string(value)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json)?;
    Ok(())
}

/// Write a table as CSV, cells in their display form
pub fn write_table_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(table.column_names())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|value| value.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write module outputs to a file, or to stdout when no path is given.
///
/// A `.csv` path writes the table output named `table_name` as CSV; any
/// other path gets every output as JSON.
pub fn write_outputs(outputs: &Outputs, table_name: &str, out: Option<&Path>) -> Result<()> {
    let Some(path) = out else {
        return write_json_stdout(&outputs.to_json());
    };

    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        match outputs.get(table_name) {
            Some(OutputValue::Table(table)) => write_table_csv(table, path),
            _ => Err(Error::InvalidInput(format!(
                "No table output '{}' to write as CSV",
                table_name
            ))),
        }
    } else {
        write_json_file(&outputs.to_json(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{FieldSchema, ValueType};
    use crate::types::Value;
    use tempfile::NamedTempFile;

    const DECLARED: &[FieldSchema] = &[
        FieldSchema::required("table_output", ValueType::Table, "A table."),
        FieldSchema::required("refs", ValueType::List, "A list."),
    ];

    fn outputs() -> Outputs {
        let table = Table::from_rows(
            vec!["file_name".to_string(), "chars_count".to_string()],
            vec![vec![Value::from("a, b"), Value::Integer(4)]],
        )
        .unwrap();
        let mut outputs = Outputs::new(DECLARED);
        outputs.set_value("table_output", OutputValue::Table(table)).unwrap();
        outputs
            .set_value("refs", OutputValue::List(vec![serde_json::json!("sn1")]))
            .unwrap();
        outputs
    }

    #[test]
    fn test_write_outputs_csv() {
        let file = NamedTempFile::with_suffix(".csv").unwrap();
        write_outputs(&outputs(), "table_output", Some(file.path())).unwrap();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(written, "file_name,chars_count\n\"a, b\",4\n");
    }

    #[test]
    fn test_write_outputs_json() {
        let file = NamedTempFile::with_suffix(".json").unwrap();
        write_outputs(&outputs(), "table_output", Some(file.path())).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(written["table_output"][0]["chars_count"], 4);
        assert_eq!(written["refs"][0], "sn1");
    }

    #[test]
    fn test_csv_requires_table_output() {
        let file = NamedTempFile::with_suffix(".csv").unwrap();
        let result = write_outputs(&outputs(), "viz_data", Some(file.path()));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
