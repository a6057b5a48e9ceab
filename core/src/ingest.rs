use crate::corpus::RawDocument;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

pub fn is_markdown(name: &str) -> bool {
    name.ends_with(".md") || name.ends_with(".mdx")
}

/// Drop the leading directory an archive wraps everything in,
/// e.g. `fastmcp-main/docs/intro.md` -> `docs/intro.md`.
/// Returns `None` when nothing is left (the root directory entry itself).
pub fn strip_archive_root(name: &str) -> Option<&str> {
    let rest = match name.split_once('/') {
        Some((_, rest)) => rest,
        None => name,
    };
    if rest.is_empty() { None } else { Some(rest) }
}

/// Read every markdown file under `root` as a single-field document.
///
/// Filenames are `/`-separated paths relative to `root`. Invalid UTF-8 is
/// replaced rather than rejected. Output is sorted by filename so document
/// ids do not depend on directory iteration order. Symlinks are followed;
/// entries that cannot be read (dangling links, loops) are logged and skipped.
pub fn read_markdown_dir(root: &Path) -> Result<Vec<RawDocument>> {
    if !root.is_dir() {
        anyhow::bail!("docs directory {} does not exist", root.display());
    }
    let mut docs = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, path = ?e.path(), "skipping unreadable entry");
                continue;
            }
        };
        let p = entry.path();
        if !p.is_file() { continue; }
        let rel = match p.strip_prefix(root) {
            Ok(rel) => rel.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/"),
            Err(_) => continue,
        };
        if !is_markdown(&rel) { continue; }
        let bytes = fs::read(p).with_context(|| format!("reading {}", p.display()))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        docs.push(RawDocument::markdown(rel, text));
    }
    docs.sort_by(|a, b| a.filename.cmp(&b.filename));
    tracing::info!(root = %root.display(), files = docs.len(), "read markdown files");
    Ok(docs)
}

/// Like [`read_markdown_dir`] for a directory holding one extracted archive:
/// filenames lose their first component.
pub fn read_extracted_archive(root: &Path) -> Result<Vec<RawDocument>> {
    let docs = read_markdown_dir(root)?
        .into_iter()
        .filter_map(|mut d| {
            let stripped = strip_archive_root(&d.filename)?.to_string();
            d.filename = stripped;
            Some(d)
        })
        .collect();
    Ok(docs)
}
