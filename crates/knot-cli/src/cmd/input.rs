//! Loading objects and embeddings from disk.

use anyhow::{Context as _, Result};
use knot_core::CanonicalObject;
use knot_core::error::ErrorCode;
use knot_infer::EmbeddingIndex;
use std::path::Path;

/// Read objects from a JSON array, or from JSON Lines when the file ends in
/// `.jsonl`. Blank lines are skipped.
pub fn load_objects(path: &Path) -> Result<Vec<CanonicalObject>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if is_json_lines(path) {
        parse_json_lines(&content, path)
    } else {
        serde_json::from_str(&content).with_context(|| {
            format!("{}: Failed to parse {}", ErrorCode::InputParseError, path.display())
        })
    }
}

fn is_json_lines(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"))
}

fn parse_json_lines(content: &str, path: &Path) -> Result<Vec<CanonicalObject>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| {
                format!(
                    "{}: Failed to parse {} line {}",
                    ErrorCode::InputParseError,
                    path.display(),
                    idx + 1
                )
            })
        })
        .collect()
}

/// Read an embeddings file: a JSON object mapping object ids to vectors.
pub fn load_embeddings(path: &Path) -> Result<EmbeddingIndex> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| {
        format!("{}: Failed to parse {}", ErrorCode::InputParseError, path.display())
    })
}

/// Set `semantic_hash` from title and body wherever it is missing.
/// Returns how many objects were filled in.
pub fn fill_fingerprints(objects: &mut [CanonicalObject]) -> usize {
    let mut filled = 0;
    for obj in objects.iter_mut().filter(|o| o.semantic_hash().is_none()) {
        obj.semantic_hash = Some(obj.content_fingerprint());
        filled += 1;
    }
    filled
}
