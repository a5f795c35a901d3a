use crate::{Document, IngestError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

pub fn discover_text_files(root: &Path, extension: &str) -> Result<Vec<PathBuf>, IngestError> {
    fs::metadata(root)?;
    let extension = extension.trim_start_matches('.');
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));

        if matches {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    Ok(files)
}

pub fn load_corpus(root: &Path, extension: &str) -> Result<Vec<Document>, IngestError> {
    let files = discover_text_files(root, extension)?;

    if files.is_empty() {
        return Err(IngestError::EmptyCorpus {
            root: root.to_path_buf(),
            extension: extension.to_string(),
        });
    }

    files
        .into_iter()
        .map(|path| {
            let bytes = fs::read(&path)?;
            let text = String::from_utf8(bytes)
                .map_err(|_| IngestError::InvalidUtf8 { path: path.clone() })?;
            debug!(path = %path.display(), chars = text.chars().count(), "loaded document");
            Ok(Document {
                text,
                source_id: path.to_string_lossy().to_string(),
            })
        })
        .collect()
}
