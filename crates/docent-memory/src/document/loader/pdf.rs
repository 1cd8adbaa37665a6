use std::path::{Path, PathBuf};
use std::pin::Pin;

use super::super::{
    DEFAULT_MAX_FILE_SIZE, Document, DocumentError, DocumentLoader, DocumentMetadata,
};

/// PDF loader with a two-tier parser: `pdf-extract` first (better font
/// handling), `lopdf` page-by-page when that fails or comes back empty.
pub struct PdfLoader {
    pub max_file_size: u64,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for PdfLoader {
    fn load(
        &self,
        path: &Path,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<Document>, DocumentError>> + Send + '_>>
    {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let path = std::fs::canonicalize(&path)?;

            let meta = tokio::fs::metadata(&path).await?;
            if meta.len() > max_size {
                return Err(DocumentError::FileTooLarge(meta.len()));
            }

            let source = path.display().to_string();

            let primary_path = path.clone();
            let primary = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text(&primary_path).map_err(|e| e.to_string())
            })
            .await
            .map_err(|e| DocumentError::Io(std::io::Error::other(e)))?;

            match primary {
                Ok(content) if !content.trim().is_empty() => Ok(vec![Document {
                    content,
                    metadata: DocumentMetadata {
                        source,
                        content_type: "application/pdf".to_owned(),
                        page: None,
                    },
                }]),
                Ok(_) => {
                    tracing::warn!(
                        path = %path.display(),
                        "pdf-extract produced no text, trying lopdf"
                    );
                    fallback_extract(path, source).await
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), "pdf-extract failed ({e}), trying lopdf");
                    fallback_extract(path, source).await
                }
            }
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}

/// Secondary parser: extract text per page, keeping page numbers.
async fn fallback_extract(path: PathBuf, source: String) -> Result<Vec<Document>, DocumentError> {
    let pages = tokio::task::spawn_blocking(move || -> Result<Vec<(u32, String)>, DocumentError> {
        let doc = lopdf::Document::load(&path).map_err(|e| DocumentError::Pdf(e.to_string()))?;
        let mut pages = Vec::new();
        for page_number in doc.get_pages().keys() {
            let text = doc
                .extract_text(&[*page_number])
                .map_err(|e| DocumentError::Pdf(e.to_string()))?;
            if !text.trim().is_empty() {
                pages.push((*page_number, text));
            }
        }
        Ok(pages)
    })
    .await
    .map_err(|e| DocumentError::Io(std::io::Error::other(e)))??;

    if pages.is_empty() {
        return Err(DocumentError::Pdf("no extractable text".into()));
    }

    Ok(pages
        .into_iter()
        .map(|(page, content)| Document {
            content,
            metadata: DocumentMetadata {
                source: source.clone(),
                content_type: "application/pdf".to_owned(),
                page: Some(page),
            },
        })
        .collect())
}
