pub mod csv;
pub mod excel;

use std::path::Path;

use tracing::debug;

use crate::inference::{convert, TypeInferencer};
use crate::table::Table;
use crate::types::{FileFormat, Result};

/// Common trait for table file readers
pub trait DataReader {
    /// Read the file into a typed table
    fn read(&mut self) -> Result<Table>;
}

/// Create a reader for the given file path
pub fn create_reader(path: &Path) -> Result<Box<dyn DataReader>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let format = FileFormat::from_extension(ext).ok_or_else(|| {
        crate::error::Error::UnsupportedFormat(format!(
            "Unsupported file extension: .{}",
            ext
        ))
    })?;

    match format {
        FileFormat::Csv => Ok(Box::new(csv::CsvReader::new(path)?)),
        FileFormat::Tsv => Ok(Box::new(csv::CsvReader::new_tsv(path)?)),
        FileFormat::Excel => Ok(Box::new(excel::ExcelReader::new(path)?)),
    }
}

/// Read a table from any supported file
pub fn read_table(path: &Path) -> Result<Table> {
    let mut reader = create_reader(path)?;
    reader.read()
}

/// Infer a type per column from raw cells and convert every cell.
///
/// Short rows are padded with empty cells, extra cells are dropped.
pub(crate) fn build_table(headers: Vec<String>, raw_rows: Vec<Vec<String>>) -> Result<Table> {
    let num_cols = headers.len();
    let mut type_inferencers: Vec<TypeInferencer> =
        (0..num_cols).map(|_| TypeInferencer::new()).collect();

    for row in &raw_rows {
        for (col_idx, field) in row.iter().take(num_cols).enumerate() {
            type_inferencers[col_idx].observe(field);
        }
    }

    for inf in &mut type_inferencers {
        inf.finalize_initial_inference();
    }

    let dtypes: Vec<_> = type_inferencers.iter().map(|inf| inf.inferred_type()).collect();
    debug!(columns = ?headers, dtypes = ?dtypes, rows = raw_rows.len(), "inferred column types");

    let mut table = Table::new(headers);
    for row in raw_rows {
        let values = (0..num_cols)
            .map(|col_idx| convert(row.get(col_idx).map(String::as_str).unwrap_or(""), dtypes[col_idx]))
            .collect();
        table.push_row(values)?;
    }

    Ok(table)
}
