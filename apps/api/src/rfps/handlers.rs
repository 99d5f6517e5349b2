//! Axum route handlers for RFPs.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::rfp::{RfpRow, STATUS_CREATED};
use crate::rfps::{analysis, matching, repo};
use crate::state::AppState;
use crate::vendors;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateRfpRequest {
    pub nome: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRfpRequest {
    pub nome: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub resumo: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveVendorAnalysisRequest {
    pub analise: String,
}

#[derive(Debug, Deserialize)]
pub struct ChosenVendorRequest {
    pub fabricante_escolhido_id: i32,
}

// ────────────────────────────────────────────────────────────────────────────
// CRUD
// ────────────────────────────────────────────────────────────────────────────

/// GET /rfps
///
/// Admins see every RFP, editors only their own.
pub async fn handle_list_rfps(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<RfpRow>>, AppError> {
    Ok(Json(repo::list_for(&state.db, &user).await?))
}

/// POST /rfps
pub async fn handle_create_rfp(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateRfpRequest>,
) -> Result<Json<RfpRow>, AppError> {
    if req.nome.trim().is_empty() {
        return Err(AppError::Validation("nome é obrigatório".to_string()));
    }
    let status = req
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(STATUS_CREATED);
    let rfp = repo::insert(&state.db, &req.nome, status, user.id).await?;
    Ok(Json(rfp))
}

/// GET /rfps/:id
pub async fn handle_get_rfp(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<RfpRow>, AppError> {
    Ok(Json(repo::find_visible(&state.db, id, &user).await?))
}

/// PUT /rfps/:id
///
/// Any status string is accepted; the lifecycle is not enforced.
pub async fn handle_update_rfp(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(req): Json<UpdateRfpRequest>,
) -> Result<Json<RfpRow>, AppError> {
    repo::find_visible(&state.db, id, &user).await?;
    let rfp = repo::update(&state.db, id, req.nome.as_deref(), req.status.as_deref()).await?;
    Ok(Json(rfp))
}

/// DELETE /rfps/:id
///
/// Admin only. Files, BoM, scopes and proposals go with it.
pub async fn handle_delete_rfp(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    repo::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("RFP não encontrada".to_string()))?;
    if !user.is_admin() {
        return Err(AppError::Forbidden(
            "Apenas administradores podem remover RFPs".to_string(),
        ));
    }
    repo::delete(&state.db, id).await?;
    info!("RFP {id} deleted by {} ({})", user.nome, user.id);
    Ok(Json(json!({ "ok": true })))
}

// ────────────────────────────────────────────────────────────────────────────
// Pipelines
// ────────────────────────────────────────────────────────────────────────────

/// POST /rfps/:id/analyze
///
/// Extracts text from every attached file, summarizes it with the selected
/// provider, stores `resumo_ia` and moves the status to "Análise IA".
pub async fn handle_analyze(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let rfp = repo::find_visible(&state.db, id, &user).await?;
    let resumo = analysis::analyze(&state.db, state.llm.as_ref(), &rfp).await?;
    Ok(Json(AnalyzeResponse { resumo }))
}

/// GET /rfps/:id/vendors-matching
///
/// Returns the scored vendor array, or the `erro` payload when the reply
/// could not be parsed.
pub async fn handle_vendors_matching(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let rfp = repo::find_visible(&state.db, id, &user).await?;
    Ok(Json(matching::run(&state.db, state.llm.as_ref(), &rfp).await?))
}

/// POST /rfps/:id/save-vendor-analysis
pub async fn handle_save_vendor_analysis(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(req): Json<SaveVendorAnalysisRequest>,
) -> Result<Json<Value>, AppError> {
    repo::find_visible(&state.db, id, &user).await?;
    repo::save_vendor_analysis(&state.db, id, &req.analise).await?;
    Ok(Json(json!({ "msg": "Análise dos vendors salva com sucesso" })))
}

/// POST /rfps/:id/set-fabricante-escolhido
pub async fn handle_set_chosen_vendor(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(req): Json<ChosenVendorRequest>,
) -> Result<Json<Value>, AppError> {
    repo::find_visible(&state.db, id, &user).await?;
    vendors::find(&state.db, req.fabricante_escolhido_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Fabricante não encontrado".to_string()))?;
    repo::set_chosen_vendor(&state.db, id, req.fabricante_escolhido_id).await?;
    Ok(Json(json!({ "msg": "Fabricante escolhido atualizado com sucesso" })))
}
