//! In-memory TF-IDF search over a corpus of text documents.
//!
//! Raw documents go through [`corpus::load`], are indexed once by
//! [`Index::build`] and queried any number of times with [`search()`].
//! [`IndexHandle`] holds the published index for concurrent readers and
//! swaps in rebuilt ones.

pub mod corpus;
pub mod error;
pub mod handle;
pub mod index;
pub mod ingest;
pub mod search;
pub mod tokenizer;

pub use corpus::{DocId, Document, RawDocument, CONTENT_FIELD};
pub use error::SearchError;
pub use handle::IndexHandle;
pub use index::{build_index, IdfMode, Index, IndexConfig, IndexStats, Posting};
pub use search::{format_result, search, QuerySpec, ScoredResult};
pub use tokenizer::{tokenize, Tokenizer, TokenizerConfig};
