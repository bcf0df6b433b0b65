use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader, Sheets};

use crate::error::Error;
use crate::table::Table;
use crate::types::Result;

use super::{build_table, DataReader};

/// Excel file reader (supports .xlsx, .xls, .xlsm, .xlsb).
///
/// Reads the first worksheet; the first row holds the column names.
pub struct ExcelReader {
    path: PathBuf,
}

impl ExcelReader {
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Convert Excel Data to string representation
    fn data_to_string(dt: &Data) -> String {
        match dt {
            Data::Empty => String::new(),
            Data::String(s) => s.clone(),
            Data::Float(f) => f.to_string(),
            Data::Int(i) => i.to_string(),
            Data::Bool(b) => b.to_string(),
            Data::DateTime(d) => Self::excel_serial_to_date_string(d.as_f64()),
            Data::DateTimeIso(s) => s.clone(),
            Data::DurationIso(s) => s.clone(),
            Data::Error(_) => String::new(),
        }
    }

    /// Convert Excel serial date to ISO date string
    fn excel_serial_to_date_string(serial: f64) -> String {
        // Excel epoch is 1899-12-30 (with the 1900 leap year bug)
        let days = serial as i64;
        chrono::NaiveDate::from_ymd_opt(1899, 12, 30)
            .and_then(|base| base.checked_add_signed(chrono::Duration::days(days)))
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| serial.to_string())
    }
}

impl DataReader for ExcelReader {
    fn read(&mut self) -> Result<Table> {
        let mut workbook: Sheets<std::io::BufReader<std::fs::File>> =
            open_workbook_auto(&self.path)?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| Error::InvalidInput("Workbook has no sheets".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name).map_err(Error::Excel)?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .map(|row| row.iter().map(Self::data_to_string).collect())
            .unwrap_or_default();

        let raw_rows: Vec<Vec<String>> = rows
            .map(|row| row.iter().map(Self::data_to_string).collect())
            .collect();

        build_table(headers, raw_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_to_string() {
        assert_eq!(ExcelReader::data_to_string(&Data::Empty), "");
        assert_eq!(
            ExcelReader::data_to_string(&Data::String("sn86069873".to_string())),
            "sn86069873"
        );
        assert_eq!(ExcelReader::data_to_string(&Data::Int(42)), "42");
        assert_eq!(ExcelReader::data_to_string(&Data::Bool(true)), "true");
    }

    #[test]
    fn test_excel_serial_to_date() {
        // Excel serial date 44927 should be 2023-01-01
        let result = ExcelReader::excel_serial_to_date_string(44927.0);
        assert_eq!(result, "2023-01-01");
    }
}
