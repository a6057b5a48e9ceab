use criterion::{criterion_group, criterion_main, Criterion};
use docsearch_core::{build_index, search, tokenize, IndexConfig, QuerySpec, RawDocument};

const WORDS: &[&str] = &[
    "server", "client", "context", "tool", "resource", "prompt", "transport", "http", "stdio", "auth",
    "middleware", "proxy", "sampling", "logging", "progress", "elicitation", "schema", "decorator",
];

fn corpus(n: usize) -> Vec<RawDocument> {
    (0..n)
        .map(|i| {
            let body: Vec<&str> = (0..400).map(|j| WORDS[(i * 7 + j * 13) % WORDS.len()]).collect();
            RawDocument::markdown(format!("docs/{i}.md"), body.join(" "))
        })
        .collect()
}

fn bench_search(c: &mut Criterion) {
    let text = corpus(1).remove(0).fields.remove("content").unwrap_or_default();
    c.bench_function("tokenize_doc", |b| b.iter(|| tokenize(&text)));

    c.bench_function("build_500_docs", |b| b.iter(|| build_index(corpus(500), &IndexConfig::default())));

    let index = build_index(corpus(500), &IndexConfig::default()).expect("non-empty corpus");
    let spec = QuerySpec::new("context tool transport");
    c.bench_function("search_500_docs", |b| b.iter(|| search(&index, &spec)));
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
