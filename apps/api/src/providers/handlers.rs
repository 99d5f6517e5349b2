//! Admin surface for AI providers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::ai::AiProviderRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProviderInput {
    pub name: String,
    pub model: String,
    pub api_key: String,
}

/// GET /admin/config/providers
pub async fn handle_list_providers(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<AiProviderRow>>, AppError> {
    user.require_admin()?;
    let providers = sqlx::query_as::<_, AiProviderRow>("SELECT * FROM ai_providers ORDER BY id")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(providers))
}

/// POST /admin/config/providers
///
/// New providers start unselected.
pub async fn handle_create_provider(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<ProviderInput>,
) -> Result<Json<AiProviderRow>, AppError> {
    user.require_admin()?;
    let provider = sqlx::query_as::<_, AiProviderRow>(
        r#"
        INSERT INTO ai_providers (name, model, api_key, is_selected)
        VALUES ($1, $2, $3, FALSE)
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.model)
    .bind(&input.api_key)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(provider))
}

/// PUT /admin/config/providers/:id
pub async fn handle_update_provider(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(input): Json<ProviderInput>,
) -> Result<Json<AiProviderRow>, AppError> {
    user.require_admin()?;
    let provider = sqlx::query_as::<_, AiProviderRow>(
        r#"
        UPDATE ai_providers
        SET name = $2, model = $3, api_key = $4, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.model)
    .bind(&input.api_key)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Provedor não encontrado".to_string()))?;
    Ok(Json(provider))
}

/// PATCH /admin/config/providers/:id/select
pub async fn handle_select_provider(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    user.require_admin()?;
    super::select(&state.db, id).await?;
    Ok(Json(json!({ "ok": true })))
}
