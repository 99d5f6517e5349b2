//! Files attached to an RFP.
//!
//! Uploads are stored as `{rfp_id}_{uuid}_{filename}` under the configured
//! upload directory; the database keeps the original name and storage path.

use std::path::Path as FsPath;

use axum::{
    extract::{Multipart, Path, State},
    response::Response,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::rfp::{RfpFileRow, RfpRow};
use crate::rfps::repo;
use crate::state::AppState;
use crate::storage;

pub fn stored_name(rfp_id: i32, filename: &str) -> String {
    format!("{rfp_id}_{}_{filename}", Uuid::new_v4().simple())
}

/// File endpoints look the file up first, then check ownership (403, not 404).
async fn owned_file(
    state: &AppState,
    user: &CurrentUser,
    rfp_id: i32,
    file_id: i32,
) -> Result<RfpFileRow, AppError> {
    let file = repo::find_file(&state.db, rfp_id, file_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Arquivo não encontrado".to_string()))?;
    let rfp: Option<RfpRow> = repo::find(&state.db, rfp_id).await?;
    match rfp {
        Some(rfp) if user.can_access(&rfp) => Ok(file),
        _ => Err(AppError::Forbidden("Permissão negada".to_string())),
    }
}

/// GET /rfps/:id/files (alias /rfps/:id/list)
pub async fn handle_list_files(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rfp_id): Path<i32>,
) -> Result<Json<Vec<RfpFileRow>>, AppError> {
    repo::find_visible(&state.db, rfp_id, &user).await?;
    Ok(Json(repo::list_files(&state.db, rfp_id).await?))
}

/// POST /rfps/:id/files (alias /rfps/:id/upload)
pub async fn handle_upload_file(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rfp_id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<RfpFileRow>, AppError> {
    repo::find_visible(&state.db, rfp_id, &user).await?;
    let upload = storage::read_file_field(multipart).await?;

    let path = storage::save(
        &state.config.upload_dir,
        &stored_name(rfp_id, &upload.filename),
        &upload.bytes,
    )
    .await?;

    let file = repo::insert_file(&state.db, rfp_id, &upload.filename, &path.to_string_lossy()).await?;
    Ok(Json(file))
}

/// GET /rfps/:id/files/:file_id/download
pub async fn handle_download_file(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((rfp_id, file_id)): Path<(i32, i32)>,
) -> Result<Response, AppError> {
    let file = owned_file(&state, &user, rfp_id, file_id).await?;
    storage::attachment(FsPath::new(&file.filepath), &file.filename).await
}

/// DELETE /rfps/:id/files/:file_id
///
/// The row is removed even when the stored file is already gone.
pub async fn handle_delete_file(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((rfp_id, file_id)): Path<(i32, i32)>,
) -> Result<Json<Value>, AppError> {
    let file = owned_file(&state, &user, rfp_id, file_id).await?;
    storage::remove(FsPath::new(&file.filepath)).await;
    repo::delete_file(&state.db, file.id).await?;
    Ok(Json(json!({ "ok": true })))
}

/// GET /rfps/:id/download
///
/// Legacy single-file download through `arquivo_url`.
pub async fn handle_download_legacy(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rfp_id): Path<i32>,
) -> Result<Response, AppError> {
    let rfp = repo::find_visible(&state.db, rfp_id, &user).await?;
    let path = rfp
        .arquivo_url
        .ok_or_else(|| AppError::Validation("Nenhum arquivo enviado para esta RFP".to_string()))?;
    let path = FsPath::new(&path);
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("rfp_{rfp_id}"));
    storage::attachment(path, &filename).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_name_is_unique_and_keeps_original() {
        let a = stored_name(7, "edital.pdf");
        let b = stored_name(7, "edital.pdf");
        assert_ne!(a, b);
        assert!(a.starts_with("7_"));
        assert!(a.ends_with("_edital.pdf"));
        // 7_ + 32 hex chars + _ + name
        assert_eq!(a.len(), 2 + 32 + 1 + "edital.pdf".len());
    }
}
