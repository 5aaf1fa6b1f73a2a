//! Citation handling for grounded search results
//!
//! Grounded responses reference long redirect URLs. Each batch gets compact
//! short URLs, markdown links are spliced into the text at the supported
//! byte offsets, and the final answer swaps the short forms back.

use crate::types::{CitationAnnotation, SourceRecord};
use delve_llm::{GroundedResponse, GroundingChunk};
use std::collections::HashMap;

pub const SHORT_URL_PREFIX: &str = "https://vertexaisearch.cloud.google.com/id/";

/// Map each chunk URL to `{prefix}{id}-{idx}`, `idx` being its first position
///
/// Chunks without a web URI are skipped but still take up an index.
pub fn resolve_urls(chunks: &[GroundingChunk], id: usize) -> HashMap<String, String> {
    let mut resolved = HashMap::new();
    for (idx, chunk) in chunks.iter().enumerate() {
        let Some(uri) = chunk.web.as_ref().and_then(|w| w.uri.as_ref()) else {
            continue;
        };
        resolved
            .entry(uri.clone())
            .or_insert_with(|| format!("{}{}-{}", SHORT_URL_PREFIX, id, idx));
    }
    resolved
}

/// Leading dot-separated component of a page title such as `"example.com"`
///
/// Titles with no dot have no label.
pub fn source_label(title: &str) -> Option<String> {
    let mut parts = title.split('.');
    let first = parts.next()?;
    parts.next().map(|_| first.to_string())
}

/// Build one annotation per grounding support that has an end offset
pub fn get_citations(
    response: &GroundedResponse,
    resolved_urls: &HashMap<String, String>,
) -> Vec<CitationAnnotation> {
    let Some(metadata) = response.grounding() else {
        return Vec::new();
    };

    let mut citations = Vec::new();
    for support in &metadata.grounding_supports {
        let Some(segment) = &support.segment else {
            continue;
        };
        let Some(end_index) = segment.end_index else {
            continue;
        };

        let segments = support
            .grounding_chunk_indices
            .iter()
            .filter_map(|&idx| {
                let web = metadata.grounding_chunks.get(idx)?.web.as_ref()?;
                let uri = web.uri.as_ref()?;
                let label = source_label(web.title.as_deref()?)?;
                let short_url = resolved_urls.get(uri)?;
                Some(SourceRecord {
                    label,
                    short_url: short_url.clone(),
                    value: uri.clone(),
                })
            })
            .collect();

        citations.push(CitationAnnotation {
            start_index: segment.start_index.unwrap_or(0),
            end_index,
            segments,
        });
    }
    citations
}

/// Splice ` [label](short_url)` markers in before each annotation's end offset
///
/// Annotations are applied from the highest `(end_index, start_index)` down,
/// so earlier insertions never move the offsets still to be processed.
/// Offsets past the end clamp to the text length; offsets inside a multi-byte
/// character move back to its start.
pub fn insert_citation_markers(text: &str, citations: &[CitationAnnotation]) -> String {
    let mut ordered: Vec<&CitationAnnotation> = citations.iter().collect();
    ordered.sort_by(|a, b| {
        (b.end_index, b.start_index).cmp(&(a.end_index, a.start_index))
    });

    let mut modified = text.to_string();
    for citation in ordered {
        let marker: String = citation
            .segments
            .iter()
            .map(|s| format!(" [{}]({})", s.label, s.short_url))
            .collect();
        if marker.is_empty() {
            continue;
        }

        let mut at = citation.end_index.min(text.len());
        while !text.is_char_boundary(at) {
            at -= 1;
        }
        modified.insert_str(at, &marker);
    }
    modified
}

/// Replace gathered short URLs in `answer` with their originals
///
/// Returns the restored text and the sources it cites, once each, in
/// gathering order. Longer short URLs are substituted first so `…/1-1`
/// never matches inside `…/1-10`.
pub fn restore_short_urls(answer: &str, sources: &[SourceRecord]) -> (String, Vec<SourceRecord>) {
    let mut by_length: Vec<usize> = (0..sources.len()).collect();
    by_length.sort_by(|a, b| sources[*b].short_url.len().cmp(&sources[*a].short_url.len()));

    let mut restored = answer.to_string();
    let mut used = vec![false; sources.len()];
    for idx in by_length {
        let source = &sources[idx];
        if source.short_url.is_empty() || !restored.contains(&source.short_url) {
            continue;
        }
        restored = restored.replace(&source.short_url, &source.value);
        used[idx] = true;
    }

    let cited = sources
        .iter()
        .zip(used)
        .filter_map(|(source, was_used)| was_used.then(|| source.clone()))
        .collect();

    (restored, cited)
}
