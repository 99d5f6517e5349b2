//! Local-disk file store for uploaded RFP documents and proposal attachments.

use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::Multipart,
    http::header,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::errors::AppError;
use crate::render::DOCX_CONTENT_TYPE;

/// Multipart field that carries the uploaded document.
pub const FILE_FIELD: &str = "file";

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// Reads the `file` field of a multipart body. Other fields are ignored.
pub async fn read_file_field(mut multipart: Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart inválido: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(sanitize_filename)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::Validation("Arquivo enviado sem nome".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Falha ao ler arquivo enviado: {e}")))?;
        return Ok(UploadedFile { filename, bytes });
    }

    Err(AppError::Validation(format!("Campo '{FILE_FIELD}' ausente no formulário")))
}

/// Keeps only the last path component of a client-supplied name.
pub fn sanitize_filename(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Writes `bytes` to `dir/name`, creating `dir` when needed.
pub async fn save(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, AppError> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;
    let path = dir.join(name);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write upload {}", path.display()))?;
    info!("Stored upload at {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// Best-effort removal; a file already gone is not an error.
pub async fn remove(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::debug!("Could not remove {}: {e}", path.display());
    }
}

/// Streams a stored file back as an attachment named `filename`.
pub async fn attachment(path: &Path, filename: &str) -> Result<Response, AppError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("Arquivo não encontrado no servidor".to_string()))
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to read {}", path.display()))
                .into())
        }
    };
    Ok(bytes_attachment(bytes, content_type_for(filename), filename))
}

pub fn bytes_attachment(bytes: Vec<u8>, content_type: &'static str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(filename)),
        ],
        bytes,
    )
        .into_response()
}

pub fn content_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => DOCX_CONTENT_TYPE,
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// `attachment` header with an ASCII fallback name and an RFC 5987 UTF-8 name.
pub fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' { c } else { '_' })
        .collect();
    if fallback == filename {
        return format!("attachment; filename=\"{filename}\"");
    }
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\ana\\edital.pdf"), "edital.pdf");
        assert_eq!(sanitize_filename(" edital final.docx "), "edital final.docx");
        assert_eq!(sanitize_filename("pasta/"), "");
    }

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type_for("a.PDF"), "application/pdf");
        assert_eq!(content_type_for("a.docx"), DOCX_CONTENT_TYPE);
        assert_eq!(content_type_for("a.xlsx"), "application/octet-stream");
    }

    #[test]
    fn test_content_disposition_ascii_and_utf8() {
        assert_eq!(
            content_disposition("proposta_tecnica_rfp_3.docx"),
            "attachment; filename=\"proposta_tecnica_rfp_3.docx\""
        );
        assert_eq!(
            content_disposition("edição.pdf"),
            "attachment; filename=\"edi__o.pdf\"; filename*=UTF-8''edi%C3%A7%C3%A3o.pdf"
        );
        assert_eq!(
            content_disposition("proposta técnica (v2).docx"),
            "attachment; filename=\"proposta t_cnica (v2).docx\"; filename*=UTF-8''proposta%20t%C3%A9cnica%20%28v2%29.docx"
        );
    }

    #[tokio::test]
    async fn test_save_then_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = save(&dir.path().join("nested"), "1_abc_edital.pdf", b"%PDF-1.4")
            .await
            .unwrap();
        assert!(path.ends_with("nested/1_abc_edital.pdf"));

        let response = attachment(&path, "edital.pdf").await.unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"edital.pdf\""
        );
    }

    #[tokio::test]
    async fn test_attachment_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = attachment(&dir.path().join("nada.pdf"), "nada.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        remove(&dir.path().join("nada.pdf")).await;
    }
}
