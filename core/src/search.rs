use crate::corpus::{DocId, Document};
use crate::error::{Result, SearchError};
use crate::index::{FieldId, Index, TermId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_SNIPPET_LENGTH: usize = 1500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub text: String,
    /// Per-field weight; fields not listed weigh 1.0, a weight of 0 disables the field.
    #[serde(default)]
    pub boosts: BTreeMap<String, f32>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_snippet_length")]
    pub snippet_length: usize,
    /// Exact-match keyword filters; every entry must match.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}
fn default_top_k() -> usize { DEFAULT_TOP_K }
fn default_snippet_length() -> usize { DEFAULT_SNIPPET_LENGTH }

impl QuerySpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            boosts: BTreeMap::new(),
            top_k: DEFAULT_TOP_K,
            snippet_length: DEFAULT_SNIPPET_LENGTH,
            filters: BTreeMap::new(),
        }
    }

    pub fn with_boost(mut self, field: impl Into<String>, weight: f32) -> Self {
        self.boosts.insert(field.into(), weight);
        self
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    pub fn with_snippet_length(mut self, len: usize) -> Self {
        self.snippet_length = len;
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    pub fn boost(&self, field: &str) -> f32 {
        self.boosts.get(field).copied().unwrap_or(1.0)
    }

    fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(SearchError::InvalidQuery("top_k must be positive".into()));
        }
        for (field, w) in &self.boosts {
            if !w.is_finite() || *w < 0.0 {
                return Err(SearchError::InvalidQuery(format!("boost for field '{field}' must be a non-negative number")));
            }
        }
        Ok(())
    }
}

impl Default for QuerySpec {
    fn default() -> Self { Self::new("") }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub doc_id: DocId,
    pub score: f32,
    pub filename: String,
    pub snippet: String,
}

/// Rank every document against `spec`.
///
/// Score is the sum over query terms and scored fields of
/// `tf * idf * boost`. Ties go to the lower document id.
pub fn search(index: &Index, spec: &QuerySpec) -> Result<Vec<ScoredResult>> {
    spec.validate()?;
    let start = std::time::Instant::now();

    // Query terms with multiplicity, in first-occurrence order. Unknown terms
    // can never match and are dropped here.
    let mut query_terms: Vec<(TermId, u32)> = Vec::new();
    for term in index.tokenizer().tokenize(&spec.text) {
        let Some(tid) = index.term_id(&term) else { continue };
        match query_terms.iter_mut().find(|(t, _)| *t == tid) {
            Some((_, n)) => *n += 1,
            None => query_terms.push((tid, 1)),
        }
    }
    if query_terms.is_empty() {
        return Ok(Vec::new());
    }

    let scored_fields: Vec<(FieldId, f32)> = index
        .fields()
        .iter()
        .enumerate()
        .map(|(fid, name)| (fid as FieldId, spec.boost(name)))
        .filter(|(_, boost)| *boost > 0.0)
        .collect();

    // Accumulation order is fixed by the term and field vectors, so repeated
    // calls produce bit-identical scores.
    let mut scores: HashMap<DocId, f32> = HashMap::new();
    for &(tid, qtf) in &query_terms {
        for &(fid, boost) in &scored_fields {
            let Some(list) = index.posting_list(tid, fid) else { continue };
            for p in &list.postings {
                let contrib = qtf as f32 * p.tf as f32 * list.idf * boost;
                *scores.entry(p.doc_id).or_insert(0.0) += contrib;
            }
        }
    }

    let mut ranked: Vec<(DocId, f32)> = scores
        .into_iter()
        .filter(|(doc_id, _)| index.document(*doc_id).is_some_and(|d| passes_filters(d, &spec.filters)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let total_hits = ranked.len();
    ranked.truncate(spec.top_k);

    let field_names: Vec<&str> = scored_fields.iter().map(|(fid, _)| index.fields()[*fid as usize].as_str()).collect();
    let mut results = Vec::with_capacity(ranked.len());
    for (doc_id, score) in ranked {
        if let Some(doc) = index.document(doc_id) {
            let snippet = build_snippet(doc, &field_names, spec.snippet_length);
            results.push(ScoredResult { doc_id, score, filename: doc.filename.clone(), snippet });
        }
    }

    tracing::debug!(query = %spec.text, total_hits, returned = results.len(), took_us = start.elapsed().as_micros() as u64, "search");
    Ok(results)
}

fn passes_filters(doc: &Document, filters: &BTreeMap<String, String>) -> bool {
    filters.iter().all(|(key, want)| doc.keyword(key) == Some(want.as_str()))
}

/// Raw text of `fields` joined by newlines, cut to `max_chars` characters.
/// The cut ignores word and field boundaries.
fn build_snippet(doc: &Document, fields: &[&str], max_chars: usize) -> String {
    let mut names: Vec<&str> = fields.to_vec();
    names.sort_unstable();
    let joined = names.iter().filter_map(|name| doc.field(name)).collect::<Vec<_>>().join("\n");
    joined.chars().take(max_chars).collect()
}

/// Text block handed to tool callers for one result.
pub fn format_result(result: &ScoredResult) -> String {
    format!("--- SOURCE: {} ---\n{}...", result.filename, result.snippet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::RawDocument;
    use crate::index::{build_index, IndexConfig};

    fn scenario() -> Index {
        build_index(
            vec![RawDocument::markdown("a.md", "alpha beta"), RawDocument::markdown("b.md", "alpha alpha gamma")],
            &IndexConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn higher_tf_ranks_first() {
        let results = search(&scenario(), &QuerySpec::new("alpha")).unwrap();
        let names: Vec<_> = results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["b.md", "a.md"]);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn unknown_term_yields_nothing() {
        assert!(search(&scenario(), &QuerySpec::new("delta")).unwrap().is_empty());
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let err = search(&scenario(), &QuerySpec::new("alpha").with_top_k(0)).unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery(_)));
    }

    #[test]
    fn negative_boost_is_rejected() {
        let err = search(&scenario(), &QuerySpec::new("alpha").with_boost("content", -1.0)).unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery(_)));
    }

    #[test]
    fn snippet_keeps_original_text() {
        let index = build_index(vec![RawDocument::markdown("x.md", "# Hello, World!")], &IndexConfig::default()).unwrap();
        let results = search(&index, &QuerySpec::new("hello").with_snippet_length(7)).unwrap();
        assert_eq!(results[0].snippet, "# Hello");
        let results = search(&index, &QuerySpec::new("hello").with_snippet_length(0)).unwrap();
        assert_eq!(results[0].snippet, "");
        assert_eq!(results[0].filename, "x.md");
    }

    #[test]
    fn multi_field_snippet_joins_in_field_name_order() {
        let doc = RawDocument::new("x.md").with_field("title", "Guide").with_field("content", "Body text");
        let index = build_index(vec![doc], &IndexConfig::default()).unwrap();

        let results = search(&index, &QuerySpec::new("guide")).unwrap();
        assert_eq!(results[0].snippet, "Body text\nGuide");

        // the cut runs straight across the field separator
        let results = search(&index, &QuerySpec::new("guide").with_snippet_length(11)).unwrap();
        assert_eq!(results[0].snippet, "Body text\nG");

        // a disabled field drops out of the snippet too
        let results = search(&index, &QuerySpec::new("guide").with_boost("content", 0.0)).unwrap();
        assert_eq!(results[0].snippet, "Guide");
    }

    #[test]
    fn format_result_matches_tool_layout() {
        let r = ScoredResult { doc_id: 0, score: 1.0, filename: "docs/a.md".into(), snippet: "body".into() };
        assert_eq!(format_result(&r), "--- SOURCE: docs/a.md ---\nbody...");
    }
}
