//! Document Text Extractor: raw text out of uploaded RFP files.
//!
//! Dispatch is on the stored path's extension: `.docx` and `.pdf` are read,
//! everything else is skipped without error. Parsing is synchronous; async
//! callers run it on the blocking pool.

pub mod docx;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::models::rfp::RfpFileRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Docx,
    Pdf,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "docx" => Some(DocumentKind::Docx),
            "pdf" => Some(DocumentKind::Pdf),
            _ => None,
        }
    }
}

/// Concatenates the text of every readable file, each preceded by a
/// `Content of file {filename}:` header.
pub fn extract_rfp_text(files: &[RfpFileRow]) -> Result<String> {
    let mut text = String::new();

    for file in files {
        let path = Path::new(&file.filepath);
        let content = match DocumentKind::from_path(path) {
            Some(DocumentKind::Docx) => docx::extract_text(path)?,
            Some(DocumentKind::Pdf) => extract_pdf_text(path)?,
            None => {
                debug!("Skipping {} (unsupported extension)", file.filename);
                continue;
            }
        };
        text.push_str(&format!("\n\nContent of file {}:\n{}", file.filename, content));
    }

    Ok(text)
}

/// Per-page text joined with newlines; a page without text contributes "".
pub fn extract_pdf_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read PDF: {}", path.display()))?;

    match lopdf::Document::load_mem(&bytes) {
        Ok(doc) => {
            let pages: Vec<String> = doc
                .get_pages()
                .keys()
                .map(|page| doc.extract_text(&[*page]).unwrap_or_default())
                .collect();
            Ok(pages.join("\n"))
        }
        Err(e) => {
            warn!(
                "lopdf could not load {} ({e}), falling back to whole-document extraction",
                path.display()
            );
            pdf_extract::extract_text_from_mem(&bytes)
                .with_context(|| format!("Failed to extract text from PDF: {}", path.display()))
        }
    }
}
