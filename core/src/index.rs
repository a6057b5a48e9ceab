use crate::corpus::{self, DocId, Document, RawDocument};
use crate::error::{Result, SearchError};
use crate::tokenizer::{Tokenizer, TokenizerConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TermId = u32;
pub type FieldId = u32;

/// Inverse document frequency variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdfMode {
    /// `ln(N / df)`; zero for terms present in every document.
    Standard,
    /// `ln(1 + N / df)`; always positive.
    #[default]
    Smoothed,
}

impl IdfMode {
    pub fn idf(self, num_docs: u32, df: u32) -> f32 {
        let ratio = num_docs as f32 / df.max(1) as f32;
        match self {
            IdfMode::Standard => ratio.ln(),
            IdfMode::Smoothed => (1.0 + ratio).ln(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub tokenizer: TokenizerConfig,
    pub idf: IdfMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32,
}

/// Postings of one (term, field) pair, sorted by doc_id.
#[derive(Debug, Clone)]
pub struct PostingList {
    pub df: u32,
    pub idf: f32,
    pub postings: Vec<Posting>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub num_docs: u32,
    pub num_terms: usize,
    pub num_postings: usize,
    pub fields: Vec<String>,
    pub idf: IdfMode,
}

/// Immutable in-memory TF-IDF index. A new corpus means a new `Index`.
#[derive(Debug)]
pub struct Index {
    tokenizer: Tokenizer,
    idf_mode: IdfMode,
    dictionary: HashMap<String, TermId>,
    fields: Vec<String>,
    field_ids: HashMap<String, FieldId>,
    postings: HashMap<(TermId, FieldId), PostingList>,
    docs: Vec<Document>,
}

/// Load and index raw documents in one go.
pub fn build_index(raws: Vec<RawDocument>, config: &IndexConfig) -> Result<Index> {
    let tokenizer = Tokenizer::new(config.tokenizer.clone());
    let docs = corpus::load(raws, &tokenizer)?;
    Index::build(docs, tokenizer, config.idf)
}

impl Index {
    pub fn build(mut docs: Vec<Document>, tokenizer: Tokenizer, idf_mode: IdfMode) -> Result<Index> {
        // same admission rule as the loader, for hand-built documents
        docs.retain(|d| corpus::has_indexable_text(d.fields.values(), &tokenizer));
        if docs.is_empty() {
            return Err(SearchError::EmptyCorpus);
        }
        let start = std::time::Instant::now();
        let mut dictionary: HashMap<String, TermId> = HashMap::new();
        let mut fields: Vec<String> = Vec::new();
        let mut field_ids: HashMap<String, FieldId> = HashMap::new();
        let mut postings: HashMap<(TermId, FieldId), PostingList> = HashMap::new();

        for (pos, doc) in docs.iter_mut().enumerate() {
            // ids are positions in the store
            doc.id = pos as DocId;
            for (name, text) in &doc.fields {
                let fid = match field_ids.get(name) {
                    Some(&fid) => fid,
                    None => {
                        let fid = fields.len() as FieldId;
                        fields.push(name.clone());
                        field_ids.insert(name.clone(), fid);
                        fid
                    }
                };

                // first-occurrence order keeps term ids reproducible
                let mut tf_counts: Vec<(TermId, u32)> = Vec::new();
                let mut slot: HashMap<TermId, usize> = HashMap::new();
                for term in tokenizer.tokenize(text) {
                    let next = dictionary.len() as TermId;
                    let tid = *dictionary.entry(term).or_insert(next);
                    match slot.get(&tid) {
                        Some(&i) => tf_counts[i].1 += 1,
                        None => {
                            slot.insert(tid, tf_counts.len());
                            tf_counts.push((tid, 1));
                        }
                    }
                }

                for (tid, tf) in tf_counts {
                    let list = postings.entry((tid, fid)).or_insert_with(|| PostingList { df: 0, idf: 0.0, postings: Vec::new() });
                    list.df += 1;
                    list.postings.push(Posting { doc_id: doc.id, tf });
                }
            }
        }

        let n = docs.len() as u32;
        for list in postings.values_mut() {
            list.idf = idf_mode.idf(n, list.df);
        }

        let index = Index { tokenizer, idf_mode, dictionary, fields, field_ids, postings, docs };
        let stats = index.stats();
        tracing::info!(
            num_docs = stats.num_docs,
            num_terms = stats.num_terms,
            num_postings = stats.num_postings,
            took_ms = start.elapsed().as_millis() as u64,
            "index build complete"
        );
        Ok(index)
    }

    pub fn tokenizer(&self) -> &Tokenizer { &self.tokenizer }

    pub fn idf_mode(&self) -> IdfMode { self.idf_mode }

    pub fn num_docs(&self) -> u32 { self.docs.len() as u32 }

    pub fn vocabulary_len(&self) -> usize { self.dictionary.len() }

    /// Indexed field names in first-seen order; position is the `FieldId`.
    pub fn fields(&self) -> &[String] { &self.fields }

    pub fn field_id(&self, name: &str) -> Option<FieldId> { self.field_ids.get(name).copied() }

    pub fn term_id(&self, term: &str) -> Option<TermId> { self.dictionary.get(term).copied() }

    pub fn document(&self, id: DocId) -> Option<&Document> { self.docs.get(id as usize) }

    pub fn documents(&self) -> &[Document] { &self.docs }

    pub(crate) fn posting_list(&self, tid: TermId, fid: FieldId) -> Option<&PostingList> {
        self.postings.get(&(tid, fid))
    }

    pub fn postings(&self, term: &str, field: &str) -> &[Posting] {
        self.lookup(term, field).map(|l| l.postings.as_slice()).unwrap_or(&[])
    }

    /// Number of documents containing `term` in `field`; 0 if it never occurs.
    pub fn df(&self, term: &str, field: &str) -> u32 {
        self.lookup(term, field).map(|l| l.df).unwrap_or(0)
    }

    pub fn idf(&self, term: &str, field: &str) -> Option<f32> {
        self.lookup(term, field).map(|l| l.idf)
    }

    fn lookup(&self, term: &str, field: &str) -> Option<&PostingList> {
        let tid = self.term_id(term)?;
        let fid = self.field_id(field)?;
        self.posting_list(tid, fid)
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            num_docs: self.num_docs(),
            num_terms: self.dictionary.len(),
            num_postings: self.postings.values().map(|l| l.postings.len()).sum(),
            fields: self.fields.clone(),
            idf: self.idf_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> Index {
        build_index(
            vec![
                RawDocument::markdown("a.md", "alpha beta").with_field("title", "Alpha"),
                RawDocument::markdown("b.md", "alpha alpha gamma"),
            ],
            &IndexConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn counts_tf_and_df_per_field() {
        let index = tiny();
        assert_eq!(index.num_docs(), 2);
        assert_eq!(index.df("alpha", "content"), 2);
        assert_eq!(index.df("alpha", "title"), 1);
        assert_eq!(index.df("gamma", "content"), 1);
        assert_eq!(index.df("delta", "content"), 0);
        assert_eq!(index.postings("alpha", "content"), &[Posting { doc_id: 0, tf: 1 }, Posting { doc_id: 1, tf: 2 }]);
        assert_eq!(index.vocabulary_len(), 3);
    }

    #[test]
    fn idf_is_finite_and_rarer_terms_weigh_more() {
        let index = tiny();
        let common = index.idf("alpha", "content").unwrap();
        let rare = index.idf("gamma", "content").unwrap();
        assert!(common.is_finite() && rare.is_finite());
        assert!(common > 0.0);
        assert!(rare > common);
        assert_eq!(index.idf("delta", "content"), None);
    }

    #[test]
    fn standard_idf_is_zero_for_ubiquitous_terms() {
        assert_eq!(IdfMode::Standard.idf(4, 4), 0.0);
        assert!(IdfMode::Standard.idf(4, 1) > 0.0);
        assert!((IdfMode::Smoothed.idf(4, 4) - 2f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn empty_input_fails_before_building() {
        let err = Index::build(Vec::new(), Tokenizer::default(), IdfMode::default()).unwrap_err();
        assert_eq!(err, SearchError::EmptyCorpus);
        assert_eq!(build_index(Vec::new(), &IndexConfig::default()).unwrap_err(), SearchError::EmptyCorpus);
    }

    fn hand_built(filename: &str, text: &str) -> Document {
        Document {
            id: 0,
            filename: filename.into(),
            fields: [("content".to_string(), text.to_string())].into_iter().collect(),
            keywords: Default::default(),
        }
    }

    #[test]
    fn build_drops_hand_built_documents_without_text() {
        let docs = vec![hand_built("blank.md", " -- "), hand_built("a.md", "alpha"), hand_built("empty.md", "")];
        let index = Index::build(docs, Tokenizer::default(), IdfMode::default()).unwrap();
        assert_eq!(index.num_docs(), 1);
        assert_eq!(index.document(0).unwrap().filename, "a.md");
        assert_eq!(index.document(0).unwrap().id, 0);

        let err = Index::build(vec![hand_built("blank.md", "  ")], Tokenizer::default(), IdfMode::default()).unwrap_err();
        assert_eq!(err, SearchError::EmptyCorpus);
    }

    #[test]
    fn field_ids_stay_distinct_past_u16_range() {
        let mut wide = RawDocument::markdown("a.md", "hay");
        for i in 0..65_536u32 {
            wide = wide.with_field(format!("f{i:05}"), "x");
        }
        let raws = vec![wide, RawDocument::markdown("b.md", "hay").with_field("zzz", "needle")];
        let index = build_index(raws, &IndexConfig::default()).unwrap();

        assert_eq!(index.fields().len(), 65_538);
        assert_eq!(index.field_id("f65535"), Some(65_536));
        assert_ne!(index.field_id("f65535"), index.field_id("content"));
        assert_eq!(index.field_id("zzz"), Some(65_537));
        assert_eq!(index.df("needle", "content"), 0);
        assert_eq!(index.df("needle", "zzz"), 1);

        let hits = crate::search::search(&index, &crate::search::QuerySpec::new("needle").with_boost("zzz", 0.0)).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn stats_report_fields_in_first_seen_order() {
        let stats = tiny().stats();
        assert_eq!(stats.fields, vec!["content".to_string(), "title".to_string()]);
        assert_eq!(stats.num_postings, 5);
    }
}
