//! Collocation detection over a tokenized corpus.
//!
//! Learning counts every token and adjacent token pair across the whole
//! corpus and keeps pairs whose association score exceeds a threshold.
//! Applying the learned phrases merges those pairs left to right, without
//! overlap. Two scorers are supported:
//!
//! - `default`, Mikolov et al. (2013), "Distributed Representations of Words
//!   and Phrases and their Compositionality":
//!   `(count(ab) - min_count) / (count(a) * count(b)) * vocab_size`
//! - `npmi`, Bouma (2009), normalized pointwise mutual information:
//!   `ln(p(ab) / (p(a) * p(b))) / -ln(p(ab))`, in `[-1, 1]`

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument};

use super::{FieldSchema, IntoOutputs, Module, OutputValue, Outputs, ValueType};
use crate::error::Error;
use crate::types::Result;

pub const DEFAULT_DELIMITER: &str = "_";

const INPUTS: &[FieldSchema] = &[
    FieldSchema::required("tokens", ValueType::Array, "The array containing the tokens."),
    FieldSchema::required(
        "bigrams_threshold",
        ValueType::Float,
        "Score threshold for forming the phrases (a higher score means fewer phrases).",
    ),
    FieldSchema::required(
        "bigrams_min_count",
        ValueType::Integer,
        "Ignore phrases with total collected count lower than this value.",
    ),
    FieldSchema::optional(
        "scoring",
        ValueType::String,
        "Phrase scoring function, either 'default' or 'npmi'.",
    ),
    FieldSchema::optional(
        "trigrams_threshold",
        ValueType::Float,
        "Score threshold for the second (trigram) pass.",
    ),
    FieldSchema::optional(
        "trigrams_min_count",
        ValueType::Integer,
        "Minimum count for the second (trigram) pass.",
    ),
];

const OUTPUTS: &[FieldSchema] = &[
    FieldSchema::required("tokens_array", ValueType::Array, "The modified tokens with bigrams."),
    FieldSchema::required(
        "phrases",
        ValueType::List,
        "The detected phrases with their scores, highest first.",
    ),
];

/// Phrase scoring function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scoring {
    #[default]
    Default,
    Npmi,
}

impl FromStr for Scoring {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Scoring::Default),
            "npmi" => Ok(Scoring::Npmi),
            other => Err(Error::InvalidConfig(format!(
                "unknown scoring '{}', expected 'default' or 'npmi'",
                other
            ))),
        }
    }
}

/// Tuning parameters for one phrase detection pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhraseParams {
    /// Pairs seen fewer times than this are never phrases
    pub min_count: u64,
    /// Pairs must score strictly above this
    pub threshold: f64,
}

impl PhraseParams {
    pub fn new(min_count: u64, threshold: f64) -> Self {
        Self {
            min_count,
            threshold,
        }
    }

    fn validate(&self, scoring: Scoring, pass: &str) -> Result<()> {
        if self.min_count == 0 {
            return Err(Error::InvalidConfig(format!("{} min_count must be at least 1", pass)));
        }
        if !self.threshold.is_finite() {
            return Err(Error::InvalidConfig(format!("{} threshold must be finite", pass)));
        }
        if scoring == Scoring::Npmi && !(-1.0..=1.0).contains(&self.threshold) {
            return Err(Error::InvalidConfig(format!(
                "{} threshold must be within [-1, 1] for npmi scoring",
                pass
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhrasesConfig {
    pub bigrams: PhraseParams,
    #[serde(default)]
    pub scoring: Scoring,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Second pass over the bigram output, producing trigrams
    #[serde(default)]
    pub trigrams: Option<PhraseParams>,
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

impl PhrasesConfig {
    pub fn new(min_count: u64, threshold: f64) -> Self {
        Self {
            bigrams: PhraseParams::new(min_count, threshold),
            scoring: Scoring::Default,
            delimiter: default_delimiter(),
            trigrams: None,
        }
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_trigrams(mut self, min_count: u64, threshold: f64) -> Self {
        self.trigrams = Some(PhraseParams::new(min_count, threshold));
        self
    }
}

/// A learned phrase and its score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPhrase {
    pub phrase: String,
    pub score: f64,
}

/// Phrases learned from a corpus
#[derive(Debug, Clone, Default)]
pub struct Phrases {
    /// First token, then second token, to score
    pairs: HashMap<String, HashMap<String, f64>>,
    delimiter: String,
}

impl Phrases {
    /// Count tokens and adjacent pairs over the corpus and keep the pairs
    /// scoring above the threshold
    pub fn learn(
        corpus: &[Vec<String>],
        params: PhraseParams,
        scoring: Scoring,
        delimiter: &str,
    ) -> Self {
        let mut word_counts: HashMap<&str, u64> = HashMap::new();
        let mut pair_counts: HashMap<(&str, &str), u64> = HashMap::new();
        let mut corpus_word_count: u64 = 0;

        for doc in corpus {
            for token in doc {
                *word_counts.entry(token.as_str()).or_insert(0) += 1;
                corpus_word_count += 1;
            }
            for pair in doc.windows(2) {
                *pair_counts.entry((pair[0].as_str(), pair[1].as_str())).or_insert(0) += 1;
            }
        }

        let vocab_size = (word_counts.len() + pair_counts.len()) as f64;
        let mut pairs: HashMap<String, HashMap<String, f64>> = HashMap::new();
        let mut learned = 0usize;

        for (&(a, b), &pair_count) in &pair_counts {
            if pair_count < params.min_count {
                continue;
            }
            let count_a = word_counts[a];
            let count_b = word_counts[b];

            let score = match scoring {
                Scoring::Default => {
                    (pair_count as f64 - params.min_count as f64)
                        / (count_a as f64 * count_b as f64)
                        * vocab_size
                }
                Scoring::Npmi => {
                    let total = corpus_word_count as f64;
                    let p_a = count_a as f64 / total;
                    let p_b = count_b as f64 / total;
                    let p_ab = pair_count as f64 / total;
                    (p_ab / (p_a * p_b)).ln() / -p_ab.ln()
                }
            };

            if score > params.threshold {
                pairs
                    .entry(a.to_string())
                    .or_default()
                    .insert(b.to_string(), score);
                learned += 1;
            }
        }

        debug!(
            tokens = corpus_word_count,
            vocab = vocab_size as u64,
            phrases = learned,
            "learned phrases"
        );

        Self {
            pairs,
            delimiter: delimiter.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.values().map(|followers| followers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn contains(&self, a: &str, b: &str) -> bool {
        self.pairs
            .get(a)
            .is_some_and(|followers| followers.contains_key(b))
    }

    /// Merge learned pairs in a document, scanning left to right.
    ///
    /// A merged pair consumes both tokens, so pairs never overlap.
    pub fn apply(&self, doc: &[String]) -> Vec<String> {
        let mut merged = Vec::with_capacity(doc.len());
        let mut i = 0;
        while i < doc.len() {
            if i + 1 < doc.len() && self.contains(&doc[i], &doc[i + 1]) {
                merged.push(format!("{}{}{}", doc[i], self.delimiter, doc[i + 1]));
                i += 2;
            } else {
                merged.push(doc[i].clone());
                i += 1;
            }
        }
        merged
    }

    /// Learned phrases, highest score first
    pub fn scored(&self) -> Vec<ScoredPhrase> {
        let mut scored: Vec<ScoredPhrase> = self
            .pairs
            .iter()
            .flat_map(|(a, followers)| {
                followers.iter().map(move |(b, &score)| ScoredPhrase {
                    phrase: format!("{}{}{}", a, self.delimiter, b),
                    score,
                })
            })
            .collect();
        scored.sort_by(|x, y| {
            y.score
                .total_cmp(&x.score)
                .then_with(|| x.phrase.cmp(&y.phrase))
        });
        scored
    }
}

/// Output of [`BigramPhraser`]
#[derive(Debug, Clone, PartialEq)]
pub struct PhrasesOutput {
    /// Documents with phrases merged, aligned 1:1 with the input
    pub documents: Vec<Vec<String>>,
    pub phrases: Vec<ScoredPhrase>,
}

impl IntoOutputs for PhrasesOutput {
    fn into_outputs(self, outputs: &mut Outputs) -> Result<()> {
        let documents = self
            .documents
            .into_iter()
            .map(|doc| JsonValue::Array(doc.into_iter().map(JsonValue::String).collect()))
            .collect();
        outputs.set_value("tokens_array", OutputValue::List(documents))?;

        let phrases = self
            .phrases
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        outputs.set_value("phrases", OutputValue::List(phrases))?;
        Ok(())
    }
}

/// Merges frequent adjacent token pairs into single tokens
#[derive(Debug, Clone)]
pub struct BigramPhraser {
    config: PhrasesConfig,
}

impl BigramPhraser {
    pub fn new(config: PhrasesConfig) -> Result<Self> {
        if config.delimiter.is_empty() {
            return Err(Error::InvalidConfig("delimiter must not be empty".to_string()));
        }
        config.bigrams.validate(config.scoring, "bigrams")?;
        if let Some(trigrams) = &config.trigrams {
            trigrams.validate(config.scoring, "trigrams")?;
        }
        Ok(Self { config })
    }
}

impl Module for BigramPhraser {
    type Input = Vec<Vec<String>>;
    type Output = PhrasesOutput;

    const NAME: &'static str = "dh.get_bigrams";
    const DOC: &'static str = "Compute bigrams and, optionally, trigrams over tokenized documents.";

    fn inputs_schema() -> &'static [FieldSchema] {
        INPUTS
    }

    fn outputs_schema() -> &'static [FieldSchema] {
        OUTPUTS
    }

    #[instrument(skip(self, corpus), fields(documents = corpus.len()))]
    fn process(&self, corpus: Vec<Vec<String>>) -> Result<PhrasesOutput> {
        let config = &self.config;

        let bigrams = Phrases::learn(&corpus, config.bigrams, config.scoring, &config.delimiter);
        let mut documents: Vec<Vec<String>> = corpus.iter().map(|doc| bigrams.apply(doc)).collect();
        let mut phrases = bigrams.scored();

        if let Some(params) = config.trigrams {
            let trigrams = Phrases::learn(&documents, params, config.scoring, &config.delimiter);
            documents = documents.iter().map(|doc| trigrams.apply(doc)).collect();
            phrases.extend(trigrams.scored());
        }

        info!(phrases = phrases.len(), "applied phrases");

        Ok(PhrasesOutput { documents, phrases })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|doc| doc.iter().map(|t| t.to_string()).collect())
            .collect()
    }

    fn run(config: PhrasesConfig, corpus: Vec<Vec<String>>) -> PhrasesOutput {
        BigramPhraser::new(config).unwrap().process(corpus).unwrap()
    }

    #[test]
    fn test_merges_frequent_pair() {
        let corpus = docs(&[&["new", "york", "city"], &["new", "york", "times"]]);

        let output = run(PhrasesConfig::new(2, -1.0), corpus.clone());
        assert_eq!(
            output.documents,
            docs(&[&["new_york", "city"], &["new_york", "times"]])
        );

        let output = run(PhrasesConfig::new(1, 1.0), corpus);
        assert_eq!(
            output.documents,
            docs(&[&["new_york", "city"], &["new_york", "times"]])
        );
        assert_eq!(output.phrases.len(), 1);
        assert_eq!(output.phrases[0].phrase, "new_york");
        assert!((output.phrases[0].score - 1.75).abs() < 1e-9);
    }

    #[test]
    fn test_min_count_excludes_pairs() {
        let corpus = docs(&[&["new", "york", "city"], &["new", "york", "times"]]);
        let output = run(PhrasesConfig::new(3, -100.0), corpus.clone());
        assert_eq!(output.documents, corpus);
        assert!(output.phrases.is_empty());
    }

    #[test]
    fn test_pairs_sharing_first_token() {
        let corpus = docs(&[&["a", "b"], &["a", "c"], &["a", "b"], &["a", "c"]]);
        let phrases = Phrases::learn(&corpus, PhraseParams::new(1, -100.0), Scoring::Default, "_");

        assert_eq!(phrases.len(), 2);
        assert!(phrases.contains("a", "b"));
        assert!(phrases.contains("a", "c"));
        assert!(!phrases.contains("b", "a"));
        let names: Vec<_> = phrases.scored().into_iter().map(|p| p.phrase).collect();
        assert_eq!(names, vec!["a_b", "a_c"]);
    }

    #[test]
    fn test_merges_do_not_overlap() {
        let corpus = docs(&[&["a", "b", "c"], &["a", "b", "c"]]);
        let phrases = Phrases::learn(&corpus, PhraseParams::new(1, 0.0), Scoring::Default, "_");

        assert!(phrases.contains("a", "b"));
        assert!(phrases.contains("b", "c"));
        assert_eq!(phrases.apply(&corpus[0]), vec!["a_b", "c"]);
    }

    #[test]
    fn test_preserves_document_count_and_order() {
        let corpus = docs(&[&["new", "york"], &[], &["york"], &["new", "york"]]);
        let output = run(PhrasesConfig::new(1, 0.0), corpus);
        assert_eq!(
            output.documents,
            docs(&[&["new_york"], &[], &["york"], &["new_york"]])
        );
    }

    #[test]
    fn test_npmi_scoring() {
        let corpus = docs(&[&["new", "york"], &["new", "york"], &["big", "apple"]]);
        let config = PhrasesConfig::new(2, 0.5).with_scoring(Scoring::Npmi);

        let output = run(config, corpus);

        assert_eq!(
            output.documents,
            docs(&[&["new_york"], &["new_york"], &["big", "apple"]])
        );
        assert!((output.phrases[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_trigram_pass() {
        let corpus = docs(&[
            &["new", "york", "city"],
            &["new", "york", "city"],
            &["new", "york", "city"],
        ]);
        let config = PhrasesConfig::new(1, 1.0).with_trigrams(1, 0.5);

        let output = run(config, corpus);

        assert_eq!(output.documents, docs(&[&["new_york_city"], &["new_york_city"], &["new_york_city"]]));
        let names: Vec<_> = output.phrases.iter().map(|p| p.phrase.as_str()).collect();
        assert_eq!(names, vec!["new_york", "york_city", "new_york_city"]);
    }

    #[test]
    fn test_config_validation() {
        assert!(BigramPhraser::new(PhrasesConfig::new(0, 1.0)).is_err());
        assert!(BigramPhraser::new(PhrasesConfig::new(1, f64::NAN)).is_err());
        assert!(BigramPhraser::new(PhrasesConfig::new(1, 2.0).with_scoring(Scoring::Npmi)).is_err());
        assert!(BigramPhraser::new(PhrasesConfig::new(1, 2.0).with_trigrams(0, 1.0)).is_err());

        let mut config = PhrasesConfig::new(1, 1.0);
        config.delimiter = String::new();
        assert!(BigramPhraser::new(config).is_err());
    }

    #[test]
    fn test_scoring_from_str() {
        assert_eq!("NPMI".parse::<Scoring>().unwrap(), Scoring::Npmi);
        assert_eq!("default".parse::<Scoring>().unwrap(), Scoring::Default);
        assert!("pmi".parse::<Scoring>().is_err());
    }

    #[test]
    fn test_run_outputs_nested_lists() {
        let corpus = docs(&[&["new", "york"], &["new", "york"]]);
        let outputs = BigramPhraser::new(PhrasesConfig::new(1, 0.0))
            .unwrap()
            .run(corpus)
            .unwrap();

        let json = outputs.to_json();
        assert_eq!(json["tokens_array"], serde_json::json!([["new_york"], ["new_york"]]));
        assert_eq!(json["phrases"][0]["phrase"], "new_york");
    }
}
