use crate::error::{Result, SearchError};
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DocId = u32;

/// Field that holds the body of a markdown document.
pub const CONTENT_FIELD: &str = "content";
/// Keyword every document carries implicitly.
pub const FILENAME_KEYWORD: &str = "filename";

/// A document as handed over by the ingestion layer, before ids are assigned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub filename: String,
    /// Tokenized, scored text fields.
    pub fields: BTreeMap<String, String>,
    /// Exact-match fields usable as query filters.
    #[serde(default)]
    pub keywords: BTreeMap<String, String>,
}

impl RawDocument {
    pub fn new(filename: impl Into<String>) -> Self {
        Self { filename: filename.into(), ..Default::default() }
    }

    /// Single-field document with the whole text under `content`.
    pub fn markdown(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(filename).with_field(CONTENT_FIELD, text)
    }

    pub fn with_field(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.insert(name.into(), text.into());
        self
    }

    pub fn with_keyword(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }
}

/// An ingested document with its stable id. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: DocId,
    pub filename: String,
    pub fields: BTreeMap<String, String>,
    pub keywords: BTreeMap<String, String>,
}

impl Document {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Keyword lookup; `filename` resolves to the document's filename unless
    /// overridden explicitly.
    pub fn keyword(&self, name: &str) -> Option<&str> {
        match self.keywords.get(name) {
            Some(v) => Some(v.as_str()),
            None if name == FILENAME_KEYWORD => Some(self.filename.as_str()),
            None => None,
        }
    }
}

/// True when at least one of `texts` yields a term.
pub(crate) fn has_indexable_text<'a>(mut texts: impl Iterator<Item = &'a String>, tokenizer: &Tokenizer) -> bool {
    texts.any(|text| !tokenizer.tokenize(text).is_empty())
}

/// Assign ids in ingestion order, skipping documents that yield no terms in
/// any field. Ids stay dense, so they double as positions in the store.
pub fn load(raws: Vec<RawDocument>, tokenizer: &Tokenizer) -> Result<Vec<Document>> {
    let total = raws.len();
    let mut docs = Vec::with_capacity(total);
    for raw in raws {
        let indexable = has_indexable_text(raw.fields.values(), tokenizer);
        if !indexable {
            tracing::debug!(filename = %raw.filename, "skipping document without indexable text");
            continue;
        }
        let id = docs.len() as DocId;
        docs.push(Document { id, filename: raw.filename, fields: raw.fields, keywords: raw.keywords });
    }
    if docs.is_empty() {
        return Err(SearchError::EmptyCorpus);
    }
    tracing::info!(loaded = docs.len(), skipped = total - docs.len(), "loaded corpus");
    Ok(docs)
}
