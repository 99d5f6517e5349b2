use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::scope::EscopoServicoRow;
use crate::rfps;
use crate::scopes::suggestion::{self, ScopeSuggestion};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScopeRequest {
    pub titulo: String,
    pub descricao: Option<String>,
}

impl ScopeRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.titulo.trim().is_empty() {
            return Err(AppError::Validation("titulo é obrigatório".to_string()));
        }
        Ok(())
    }
}

async fn visible_scope(state: &AppState, user: &CurrentUser, id: i32) -> Result<EscopoServicoRow, AppError> {
    let scope = sqlx::query_as::<_, EscopoServicoRow>("SELECT * FROM escopo_servico WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Escopo não encontrado".to_string()))?;
    rfps::repo::find_visible(&state.db, scope.rfp_id, user).await?;
    Ok(scope)
}

/// GET /escopos/rfp/:id
pub async fn handle_list_scopes(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rfp_id): Path<i32>,
) -> Result<Json<Vec<EscopoServicoRow>>, AppError> {
    rfps::repo::find_visible(&state.db, rfp_id, &user).await?;
    Ok(Json(super::list_for_rfp(&state.db, rfp_id).await?))
}

/// POST /escopos/rfp/:id
pub async fn handle_create_scope(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rfp_id): Path<i32>,
    Json(req): Json<ScopeRequest>,
) -> Result<Json<EscopoServicoRow>, AppError> {
    req.validate()?;
    rfps::repo::find_visible(&state.db, rfp_id, &user).await?;
    let scope = sqlx::query_as::<_, EscopoServicoRow>(
        "INSERT INTO escopo_servico (rfp_id, titulo, descricao) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(rfp_id)
    .bind(&req.titulo)
    .bind(&req.descricao)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(scope))
}

/// PUT /escopos/:id
///
/// Full replacement: a missing `descricao` clears it.
pub async fn handle_update_scope(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(req): Json<ScopeRequest>,
) -> Result<Json<EscopoServicoRow>, AppError> {
    req.validate()?;
    visible_scope(&state, &user, id).await?;
    let scope = sqlx::query_as::<_, EscopoServicoRow>(
        r#"
        UPDATE escopo_servico
        SET titulo = $2, descricao = $3, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.titulo)
    .bind(&req.descricao)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(scope))
}

/// DELETE /escopos/:id
pub async fn handle_delete_scope(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    visible_scope(&state, &user, id).await?;
    sqlx::query("DELETE FROM escopo_servico WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    Ok(Json(json!({ "ok": true })))
}

/// POST /escopos/rfp/:id/sugerir
pub async fn handle_suggest_scope(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rfp_id): Path<i32>,
) -> Result<Json<ScopeSuggestion>, AppError> {
    let rfp = rfps::repo::find_visible(&state.db, rfp_id, &user).await?;
    Ok(Json(suggestion::run(&state.db, state.llm.as_ref(), &rfp).await?))
}
