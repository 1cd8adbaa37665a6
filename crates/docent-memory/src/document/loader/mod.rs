mod pdf;
mod text;

use std::path::Path;

pub use pdf::PdfLoader;
pub use text::TextLoader;

use super::{Document, DocumentLoader};

/// Load every file in `dir` whose extension matches one of the loaders.
///
/// Per-file failures are logged and skipped so one bad file cannot abort the
/// batch. A missing directory or one with no matching files yields an empty
/// vector, not an error; callers only learn about skipped files from the
/// warnings.
pub async fn scan_documents(dir: &Path, loaders: &[&dyn DocumentLoader]) -> Vec<Document> {
    let mut documents = Vec::new();

    for loader in loaders {
        for ext in loader.supported_extensions() {
            let pattern = format!("{}/*.{ext}", dir.display());
            let paths = match glob::glob(&pattern) {
                Ok(paths) => paths,
                Err(e) => {
                    tracing::warn!(pattern, "invalid scan pattern: {e}");
                    continue;
                }
            };

            for entry in paths {
                let path = match entry {
                    Ok(path) => path,
                    Err(e) => {
                        tracing::warn!("unreadable directory entry: {e}");
                        continue;
                    }
                };
                tracing::info!(path = %path.display(), "loading");
                match loader.load(&path).await {
                    Ok(docs) => {
                        tracing::info!(
                            path = %path.display(),
                            documents = docs.len(),
                            "loaded"
                        );
                        documents.extend(docs);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), "skipping file: {e}");
                    }
                }
            }
        }
    }

    documents
}
