//! Admin CRUD for prompt templates. `by_name` is readable by anyone.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::auth::CurrentUser;
use crate::errors::{is_unique_violation, AppError};
use crate::models::ai::AiPromptRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePromptRequest {
    pub name: String,
    pub description: Option<String>,
    pub prompt_text: String,
}

/// Partial update: absent fields keep their stored value.
#[derive(Debug, Deserialize)]
pub struct UpdatePromptRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub prompt_text: Option<String>,
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Prompt com ID {id} não encontrado."))
}

fn name_taken(name: &str) -> AppError {
    AppError::Validation(format!("Um prompt com o nome '{name}' já existe."))
}

/// A write that lost the race to the unique name index reports the same 400
/// as the pre-check.
fn name_conflict(e: sqlx::Error, name: &str) -> AppError {
    if is_unique_violation(&e) {
        name_taken(name)
    } else {
        e.into()
    }
}

async fn ensure_name_free(pool: &PgPool, name: &str, except_id: Option<i32>) -> Result<(), AppError> {
    let taken: Option<i32> = sqlx::query_scalar("SELECT id FROM ai_prompts WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    match taken {
        Some(id) if Some(id) != except_id => Err(name_taken(name)),
        _ => Ok(()),
    }
}

async fn insert_prompt(pool: &PgPool, req: &CreatePromptRequest) -> Result<AiPromptRow, AppError> {
    sqlx::query_as::<_, AiPromptRow>(
        r#"
        INSERT INTO ai_prompts (name, description, prompt_text)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.prompt_text)
    .fetch_one(pool)
    .await
    .map_err(|e| name_conflict(e, &req.name))
}

async fn update_prompt(pool: &PgPool, id: i32, req: &UpdatePromptRequest) -> Result<AiPromptRow, AppError> {
    sqlx::query_as::<_, AiPromptRow>(
        r#"
        UPDATE ai_prompts
        SET name        = COALESCE($2, name),
            description = COALESCE($3, description),
            prompt_text = COALESCE($4, prompt_text),
            updated_at  = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(&req.prompt_text)
    .fetch_optional(pool)
    .await
    .map_err(|e| name_conflict(e, req.name.as_deref().unwrap_or_default()))?
    .ok_or_else(|| not_found(id))
}

/// GET /admin/config/prompts
pub async fn handle_list_prompts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<AiPromptRow>>, AppError> {
    user.require_admin()?;
    let prompts = sqlx::query_as::<_, AiPromptRow>("SELECT * FROM ai_prompts ORDER BY id")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(prompts))
}

/// POST /admin/config/prompts
pub async fn handle_create_prompt(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreatePromptRequest>,
) -> Result<Json<AiPromptRow>, AppError> {
    user.require_admin()?;
    ensure_name_free(&state.db, &req.name, None).await?;
    Ok(Json(insert_prompt(&state.db, &req).await?))
}

/// GET /admin/config/prompts/:id
pub async fn handle_get_prompt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<AiPromptRow>, AppError> {
    user.require_admin()?;
    let prompt = sqlx::query_as::<_, AiPromptRow>("SELECT * FROM ai_prompts WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(prompt))
}

/// GET /admin/config/prompts/by_name/:name
pub async fn handle_get_prompt_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<AiPromptRow>, AppError> {
    let prompt = sqlx::query_as::<_, AiPromptRow>("SELECT * FROM ai_prompts WHERE name = $1")
        .bind(&name)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Prompt com nome '{name}' não encontrado.")))?;
    Ok(Json(prompt))
}

/// PUT /admin/config/prompts/:id
pub async fn handle_update_prompt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(req): Json<UpdatePromptRequest>,
) -> Result<Json<AiPromptRow>, AppError> {
    user.require_admin()?;
    if let Some(name) = &req.name {
        ensure_name_free(&state.db, name, Some(id)).await?;
    }
    Ok(Json(update_prompt(&state.db, id, &req).await?))
}

/// DELETE /admin/config/prompts/:id
pub async fn handle_delete_prompt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    user.require_admin()?;
    let deleted = sqlx::query("DELETE FROM ai_prompts WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(not_found(id));
    }
    Ok(Json(json!({ "ok": true, "detail": "Prompt excluído com sucesso." })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str) -> CreatePromptRequest {
        CreatePromptRequest {
            name: name.to_string(),
            description: None,
            prompt_text: "Resumo: {rfp_summary}".to_string(),
        }
    }

    fn assert_name_taken(err: AppError, name: &str) {
        match err {
            AppError::Validation(msg) => assert_eq!(msg, format!("Um prompt com o nome '{name}' já existe.")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_insert_duplicate_name_is_validation_error(pool: PgPool) {
        insert_prompt(&pool, &create("bom_extra")).await.unwrap();

        let err = insert_prompt(&pool, &create("bom_extra")).await.unwrap_err();
        assert_name_taken(err, "bom_extra");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_rename_onto_existing_name_is_validation_error(pool: PgPool) {
        let second = insert_prompt(&pool, &create("bom_extra")).await.unwrap();
        let rename = UpdatePromptRequest {
            name: Some("rfp_analysis_system_role".to_string()),
            description: None,
            prompt_text: None,
        };

        let err = update_prompt(&pool, second.id, &rename).await.unwrap_err();
        assert_name_taken(err, "rfp_analysis_system_role");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_missing_prompt_is_not_found(pool: PgPool) {
        let req = UpdatePromptRequest {
            name: None,
            description: Some("x".to_string()),
            prompt_text: None,
        };
        assert!(matches!(update_prompt(&pool, 9999, &req).await, Err(AppError::NotFound(_))));
    }
}
