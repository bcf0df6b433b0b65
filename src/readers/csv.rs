use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{Reader, ReaderBuilder};

use crate::table::Table;
use crate::types::Result;

use super::{build_table, DataReader};

/// CSV/TSV file reader
pub struct CsvReader {
    path: PathBuf,
    delimiter: u8,
}

impl CsvReader {
    /// Create a new CSV reader
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            delimiter: b',',
        })
    }

    /// Create a new TSV reader
    pub fn new_tsv(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            delimiter: b'\t',
        })
    }

    fn create_reader(&self) -> Result<Reader<BufReader<File>>> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let csv_reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        Ok(csv_reader)
    }
}

impl DataReader for CsvReader {
    fn read(&mut self) -> Result<Table> {
        let mut reader = self.create_reader()?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut raw_rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            raw_rows.push(record.iter().map(|field| field.to_string()).collect());
        }

        build_table(headers, raw_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(suffix).unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_basic_csv_read() {
        let file = create_test_file(
            ".csv",
            "file_name,content\nsn86069873_1900-01-05_ed-1_seq-1_ocr.txt,ab cd\nsn86069873_1900-01-06_ed-1_seq-1_ocr.txt,\"x, y\"\n",
        );

        let table = CsvReader::new(file.path()).unwrap().read().unwrap();

        assert_eq!(table.column_names(), &["file_name", "content"]);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column("content").unwrap()[1], &Value::from("x, y"));
    }

    #[test]
    fn test_tsv_read_with_types() {
        let file = create_test_file(".tsv", "id\tdate\n1\t2020-03-01\n2\t\n");

        let table = CsvReader::new_tsv(file.path()).unwrap().read().unwrap();

        assert_eq!(table.column("id").unwrap(), vec![&Value::Integer(1), &Value::Integer(2)]);
        let dates = table.column("date").unwrap();
        assert!(dates[0].as_date().is_some());
        assert!(dates[1].is_null());
    }

    #[test]
    fn test_missing_file() {
        let mut reader = CsvReader::new(Path::new("/nonexistent/corpus.csv")).unwrap();
        assert!(reader.read().is_err());
    }
}
