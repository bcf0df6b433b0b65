mod cli;

use std::path::Path;

use clap::Parser;
use cli::{Cli, Commands};
use corpus_modules::modules::{
    all_schemas, BigramPhraser, MetadataConfig, MetadataExtractor, MetadataInput, Module, Outputs,
    PhrasesConfig, TextStatsAugmenter, TextStatsConfig, TimeSeriesAggregator, TimeSeriesConfig,
};
use corpus_modules::output;
use corpus_modules::readers::read_table;
use corpus_modules::types::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Metadata {
            input,
            column,
            date_column,
            mapping,
            out,
        } => {
            let mut config = MetadataConfig::new(column);
            if let Some(date_column) = date_column {
                config = config.with_date_column(date_column);
            }
            let extractor = MetadataExtractor::new(config)?;

            let mut module_input = MetadataInput::new(read_table(&input)?);
            if let Some(path) = mapping {
                match cli::load_mapping(&path) {
                    Ok(mapping) => module_input = module_input.with_mapping(mapping),
                    Err(e) => warn!(path = %path.display(), error = %e, "ignoring publication mapping"),
                }
            }

            let outputs = extractor.run(module_input)?;
            finish(&outputs, "table_output", out.as_deref())?;
        }
        Commands::TextStats { input, column, out } => {
            let augmenter = TextStatsAugmenter::new(TextStatsConfig::new(column))?;
            let outputs = augmenter.run(read_table(&input)?)?;
            finish(&outputs, "table_output", out.as_deref())?;
        }
        Commands::Phrases {
            input,
            min_count,
            threshold,
            scoring,
            trigram_min_count,
            trigram_threshold,
            out,
        } => {
            let mut config = PhrasesConfig::new(min_count, threshold).with_scoring(scoring.parse()?);
            if let (Some(min_count), Some(threshold)) = (trigram_min_count, trigram_threshold) {
                config = config.with_trigrams(min_count, threshold);
            }
            let phraser = BigramPhraser::new(config)?;
            let outputs = phraser.run(cli::load_corpus(&input)?)?;
            finish(&outputs, "tokens_array", out.as_deref())?;
        }
        Commands::Viz {
            input,
            column,
            distribution,
            label,
            out,
        } => {
            let config = TimeSeriesConfig::new(&distribution, column)?.with_category_label(label);
            let aggregator = TimeSeriesAggregator::new(config)?;
            let outputs = aggregator.run(read_table(&input)?)?;
            finish(&outputs, "viz_data", out.as_deref())?;
        }
        Commands::Describe => {
            output::write_json_stdout(&all_schemas())?;
        }
    }

    Ok(())
}

fn finish(outputs: &Outputs, table_name: &str, out: Option<&Path>) -> Result<()> {
    output::write_outputs(outputs, table_name, out)?;
    if let Some(path) = out {
        info!(path = %path.display(), "outputs written");
    }
    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`)
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
