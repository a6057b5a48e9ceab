use docsearch_core::tokenizer::{tokenize, Tokenizer, TokenizerConfig};

#[test]
fn it_lowercases_and_splits_on_punctuation() {
    let words = tokenize("Running Runners RUN! The café's menu.");
    assert_eq!(words, vec!["running", "runners", "run", "the", "café", "s", "menu"]);
}

#[test]
fn it_keeps_stopwords_by_default() {
    let words = tokenize("The quick brown fox and the lazy dog");
    assert!(words.contains(&"the".to_string()));
    assert!(words.contains(&"and".to_string()));
}

#[test]
fn it_filters_stopwords_when_asked() {
    let tok = Tokenizer::new(TokenizerConfig { remove_stopwords: true, ..Default::default() });
    let words = tok.tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(words.contains(&"fox".to_string()));
}

#[test]
fn it_normalizes_compatibility_forms() {
    let tok = Tokenizer::new(TokenizerConfig { unicode_normalize: true, ..Default::default() });
    // U+FB01 LATIN SMALL LIGATURE FI
    assert_eq!(tok.tokenize("\u{FB01}le"), vec!["file"]);
}

#[test]
fn it_drops_short_tokens() {
    let tok = Tokenizer::new(TokenizerConfig { min_token_len: 2, ..Default::default() });
    assert_eq!(tok.tokenize("a bb c dd"), vec!["bb", "dd"]);
}

#[test]
fn it_is_deterministic() {
    let text = "Context, tools & resources: FastMCP 2.0 ~ déjà vu!";
    assert_eq!(tokenize(text), tokenize(text));
    assert_eq!(tokenize(text), vec!["context", "tools", "resources", "fastmcp", "2", "0", "déjà", "vu"]);
}
