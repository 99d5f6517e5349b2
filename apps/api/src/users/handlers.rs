//! User administration. Credentials are managed by the identity gateway;
//! this surface only keeps the profile rows that `X-User-Id` resolves to.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::errors::{is_unique_violation, AppError};
use crate::models::user::{UserRow, PERFIL_ADMIN, PERFIL_EDITOR};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub nome: String,
    pub email: String,
    pub perfil: String,
}

impl CreateUserRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.nome.trim().is_empty() || self.email.trim().is_empty() {
            return Err(AppError::Validation("nome e email são obrigatórios".to_string()));
        }
        if self.perfil != PERFIL_ADMIN && self.perfil != PERFIL_EDITOR {
            return Err(AppError::Validation(format!(
                "perfil deve ser '{PERFIL_ADMIN}' ou '{PERFIL_EDITOR}'"
            )));
        }
        Ok(())
    }
}

/// GET /users
pub async fn handle_list_users(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<UserRow>>, AppError> {
    user.require_admin()?;
    let users = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY id")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(users))
}

/// POST /users
pub async fn handle_create_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<UserRow>, AppError> {
    user.require_admin()?;
    req.validate()?;

    let taken: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(&state.db)
        .await?;
    if taken.is_some() {
        return Err(AppError::Validation("E-mail já cadastrado".to_string()));
    }

    let created = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (nome, email, perfil) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&req.nome)
    .bind(&req.email)
    .bind(&req.perfil)
    .fetch_one(&state.db)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Validation("E-mail já cadastrado".to_string())
        } else {
            e.into()
        }
    })?;
    Ok(Json(created))
}

/// DELETE /users/:id
pub async fn handle_delete_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    user.require_admin()?;
    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(AppError::NotFound("Usuário não encontrado".to_string()));
    }
    Ok(Json(json!({ "ok": true })))
}
