use crate::SearchHit;
use std::path::Path;

pub const UNKNOWN_SOURCE: &str = "Unknown Source";

pub fn extract_citation(hits: &[SearchHit]) -> String {
    hits.first()
        .and_then(source_label)
        .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
}

pub fn cited_sources(hits: &[SearchHit]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for label in hits.iter().filter_map(source_label) {
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

fn source_label(hit: &SearchHit) -> Option<String> {
    let source = hit.metadata.source_id.as_deref()?.trim();
    if source.is_empty() {
        return None;
    }
    let name = Path::new(source)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| source.to_string());
    Some(name)
}
