//! Document loading for batch ingestion.
//!
//! Reads `.txt` and `.pdf` files from a data directory. Unreadable or empty
//! files are reported and skipped so one bad file never aborts a run.

use crate::types::{AppError, Result, SourceDocument};
use std::path::{Path, PathBuf};

/// Source name used for the built-in sample when a data directory is empty.
pub const SAMPLE_HANDBOOK_NAME: &str = "Handbook.pdf";

/// Demo corpus ingested when no documents are found, so a fresh deployment
/// can answer something.
pub const SAMPLE_HANDBOOK: &str = "
Company Leave Policy:
- Employees get 12 paid leaves per year.
- Leave requests must be applied 2 days in advance.
- Sick leaves can be applied on the same day with manager approval.

Overtime Policy:
- Standard work week is 40 hours.
- Overtime is paid only if pre-approved by manager.
- Overtime rate: 1.5x hourly pay for extra hours.

Security:
- Never share passwords or OTP.
- Report suspicious emails to IT immediately.
";

pub fn sample_document() -> SourceDocument {
    SourceDocument {
        name: SAMPLE_HANDBOOK_NAME.to_string(),
        text: SAMPLE_HANDBOOK.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Text,
    Pdf,
}

fn document_kind(path: &Path) -> Option<DocumentKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" => Some(DocumentKind::Text),
        "pdf" => Some(DocumentKind::Pdf),
        _ => None,
    }
}

/// Load every supported document in `data_dir`, in file-name order.
///
/// A missing directory yields an empty list.
pub async fn load_documents(data_dir: &Path) -> Result<Vec<SourceDocument>> {
    if !data_dir.exists() {
        tracing::warn!(path = %data_dir.display(), "Data folder not found");
        return Ok(Vec::new());
    }

    let mut entries = tokio::fs::read_dir(data_dir).await?;
    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if document_kind(&path).is_none() {
            continue;
        }
        // Follows symlinks; dangling links are skipped
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipped unreadable entry"),
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match read_document(&path).await {
            Ok(text) if text.trim().is_empty() => {
                tracing::warn!(file = %name, "Skipped (empty text)");
            }
            Ok(text) => documents.push(SourceDocument { name, text }),
            Err(e) => {
                tracing::error!(file = %name, error = %e, "Failed to read document");
            }
        }
    }

    Ok(documents)
}

/// Read one supported file as text.
pub async fn read_document(path: &Path) -> Result<String> {
    match document_kind(path) {
        Some(DocumentKind::Text) => read_txt(path).await,
        Some(DocumentKind::Pdf) => read_pdf(path).await,
        None => Err(AppError::InvalidInput(format!(
            "Unsupported document type: {}",
            path.display()
        ))),
    }
}

async fn read_txt(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(feature = "pdf")]
async fn read_pdf(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;

    // PDF parsing is CPU-bound
    let pages = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem_by_pages(&bytes)
    })
    .await
    .map_err(|e| AppError::Internal(format!("PDF task failed: {}", e)))?
    .map_err(|e| AppError::InvalidInput(format!("PDF extraction error: {}", e)))?;

    Ok(join_pages(&pages))
}

/// Join non-blank pages with newlines.
#[cfg(feature = "pdf")]
fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(not(feature = "pdf"))]
async fn read_pdf(path: &Path) -> Result<String> {
    Err(AppError::Configuration(format!(
        "Cannot read {}: PDF support not compiled in. Rebuild with --features pdf",
        path.display()
    )))
}
