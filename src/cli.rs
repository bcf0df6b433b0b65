use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use corpus_modules::error::Error;
use corpus_modules::modules::PublicationMapping;
use corpus_modules::readers::read_table;
use corpus_modules::types::{Result, DEFAULT_CATEGORY_LABEL};

/// Run corpus transform modules over table files
#[derive(Parser, Debug)]
#[command(name = "corpus-modules")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract publication references and dates from file names
    Metadata {
        /// Input table (CSV, TSV or Excel)
        #[arg(short, long)]
        input: PathBuf,

        /// Column holding the file names
        #[arg(short, long)]
        column: String,

        /// Column the date is parsed from (defaults to --column)
        #[arg(long)]
        date_column: Option<String>,

        /// Table of publication references and names, in that column order
        #[arg(long)]
        mapping: Option<PathBuf>,

        /// Output path, `.csv` for the table only (stdout JSON if not specified)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Add character and word counts for a text column
    TextStats {
        #[arg(short, long)]
        input: PathBuf,

        /// Column holding the text content
        #[arg(short, long)]
        column: String,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Detect and merge frequent token pairs
    Phrases {
        /// JSON file holding a list of token lists
        #[arg(short, long)]
        input: PathBuf,

        /// Ignore pairs seen fewer times than this
        #[arg(long)]
        min_count: u64,

        /// Score threshold (a higher score means fewer phrases)
        #[arg(long, allow_hyphen_values = true)]
        threshold: f64,

        /// Scoring function: default or npmi
        #[arg(long, default_value = "default")]
        scoring: String,

        /// Minimum count for a second, trigram pass
        #[arg(long, requires = "trigram_threshold")]
        trigram_min_count: Option<u64>,

        /// Threshold for a second, trigram pass
        #[arg(long, requires = "trigram_min_count", allow_hyphen_values = true)]
        trigram_threshold: Option<f64>,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Count rows per category and day, month or year
    Viz {
        /// Input table with a `date` column
        #[arg(short, long)]
        input: PathBuf,

        /// Category column
        #[arg(short, long)]
        column: String,

        /// day, month or year
        #[arg(short, long)]
        distribution: String,

        /// Output key for the category
        #[arg(long, default_value = DEFAULT_CATEGORY_LABEL)]
        label: String,

        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the input and output schema of every module
    Describe,
}

/// Load a publication mapping from a two-column table
pub fn load_mapping(path: &Path) -> Result<PublicationMapping> {
    let table = read_table(path)?;
    if table.column_names().len() < 2 {
        return Err(Error::InvalidMapping(format!(
            "{} needs a reference column and a name column",
            path.display()
        )));
    }

    let (refs, names) = table
        .rows()
        .iter()
        .map(|row| (row[0].to_string(), row[1].to_string()))
        .unzip();
    Ok(PublicationMapping::new(refs, names))
}

/// Load a tokenized corpus from a JSON list of token lists
pub fn load_corpus(path: &Path) -> Result<Vec<Vec<String>>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_metadata_command() {
        let cli = Cli::try_parse_from([
            "corpus-modules",
            "metadata",
            "--input",
            "corpus.csv",
            "--column",
            "file_name",
            "--mapping",
            "names.csv",
        ])
        .unwrap();

        match cli.command {
            Commands::Metadata {
                column,
                date_column,
                mapping,
                ..
            } => {
                assert_eq!(column, "file_name");
                assert!(date_column.is_none());
                assert_eq!(mapping, Some(PathBuf::from("names.csv")));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_phrases_negative_threshold() {
        let cli = Cli::try_parse_from([
            "corpus-modules",
            "phrases",
            "-i",
            "tokens.json",
            "--min-count",
            "2",
            "--threshold",
            "-1",
        ])
        .unwrap();

        match cli.command {
            Commands::Phrases { threshold, trigram_min_count, .. } => {
                assert_eq!(threshold, -1.0);
                assert!(trigram_min_count.is_none());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_trigram_arguments_go_together() {
        let result = Cli::try_parse_from([
            "corpus-modules",
            "phrases",
            "-i",
            "tokens.json",
            "--min-count",
            "2",
            "--threshold",
            "10",
            "--trigram-min-count",
            "2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_mapping() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        write!(file, "ref,name\nsn86069873,The Sun\nsn83030214,New-York Tribune\n").unwrap();

        let mapping = load_mapping(file.path()).unwrap();
        assert_eq!(mapping.refs, vec!["sn86069873", "sn83030214"]);
        assert_eq!(mapping.names, vec!["The Sun", "New-York Tribune"]);
    }

    #[test]
    fn test_load_mapping_needs_two_columns() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        write!(file, "ref\nsn86069873\n").unwrap();
        assert!(matches!(load_mapping(file.path()), Err(Error::InvalidMapping(_))));
    }

    #[test]
    fn test_load_corpus() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        write!(file, r#"[["new", "york"], []]"#).unwrap();

        let corpus = load_corpus(file.path()).unwrap();
        assert_eq!(corpus, vec![vec!["new".to_string(), "york".to_string()], vec![]]);
    }
}
