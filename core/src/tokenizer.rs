use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Runs of characters for which `char::is_alphanumeric` holds.
    static ref RE: Regex = Regex::new(r"[\p{Alphabetic}\p{N}]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could","couldn",
            "did","didn","do","does","doesn","doing","don","down","during",
            "each","few","for","from","further",
            "had","hadn","has","hasn","have","haven","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","isn","it","its","itself",
            "just","ll","me","more","most","mustn","my","myself",
            "no","nor","not","now","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "re","s","same","she","should","shouldn","so","some","such",
            "t","than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","ve","very",
            "was","wasn","we","were","weren","what","when","where","which","while","who","whom","why","will","with","won","would","wouldn",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Optional normalization steps layered on top of the base split.
///
/// Everything is off by default: the default tokenizer only lowercases and
/// splits on non-alphanumeric runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Apply NFKC normalization before lowercasing.
    pub unicode_normalize: bool,
    /// Drop English stop words.
    pub remove_stopwords: bool,
    /// Reduce tokens to their English Snowball stem.
    pub stem: bool,
    /// Tokens with fewer characters than this are discarded.
    pub min_token_len: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { unicode_normalize: false, remove_stopwords: false, stem: false, min_token_len: 1 }
    }
}

/// Turns raw text into index terms.
///
/// One value is stored inside every built index and reused for queries, so
/// documents and queries always go through the same pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self { Self { config } }

    pub fn config(&self) -> &TokenizerConfig { &self.config }

    /// Lowercase `text`, split it on runs of non-alphanumeric characters and
    /// apply the configured filters. Never fails; empty input gives no terms.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = if self.config.unicode_normalize {
            text.nfkc().collect::<String>().to_lowercase()
        } else {
            text.to_lowercase()
        };
        let mut terms = Vec::new();
        for mat in RE.find_iter(&lowered) {
            let token = mat.as_str();
            if token.chars().count() < self.config.min_token_len { continue; }
            if self.config.remove_stopwords && is_stopword(token) { continue; }
            if self.config.stem {
                terms.push(STEMMER.stem(token).into_owned());
            } else {
                terms.push(token.to_string());
            }
        }
        terms
    }
}

/// Tokenize with the default configuration.
pub fn tokenize(text: &str) -> Vec<String> {
    Tokenizer::default().tokenize(text)
}
