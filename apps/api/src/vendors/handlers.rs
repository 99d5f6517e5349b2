use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::vendor::VendorRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateVendorRequest {
    pub nome: String,
    pub tecnologias: Option<String>,
    pub produtos: Option<String>,
    pub certificacoes: Option<String>,
    pub requisitos_atendidos: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateVendorRequest {
    pub nome: Option<String>,
    pub tecnologias: Option<String>,
    pub produtos: Option<String>,
    pub certificacoes: Option<String>,
    pub requisitos_atendidos: Option<String>,
}

fn not_found() -> AppError {
    AppError::NotFound("Fornecedor não encontrado".to_string())
}

/// GET /vendors
pub async fn handle_list_vendors(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<VendorRow>>, AppError> {
    Ok(Json(super::list_all(&state.db).await?))
}

/// POST /vendors
pub async fn handle_create_vendor(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(req): Json<CreateVendorRequest>,
) -> Result<Json<VendorRow>, AppError> {
    if req.nome.trim().is_empty() {
        return Err(AppError::Validation("nome é obrigatório".to_string()));
    }
    let vendor = sqlx::query_as::<_, VendorRow>(
        r#"
        INSERT INTO vendors (nome, tecnologias, produtos, certificacoes, requisitos_atendidos)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&req.nome)
    .bind(&req.tecnologias)
    .bind(&req.produtos)
    .bind(&req.certificacoes)
    .bind(&req.requisitos_atendidos)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(vendor))
}

/// GET /vendors/:id
pub async fn handle_get_vendor(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<VendorRow>, AppError> {
    let vendor = super::find(&state.db, id).await?.ok_or_else(not_found)?;
    Ok(Json(vendor))
}

/// PUT /vendors/:id
pub async fn handle_update_vendor(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i32>,
    Json(req): Json<UpdateVendorRequest>,
) -> Result<Json<VendorRow>, AppError> {
    let vendor = sqlx::query_as::<_, VendorRow>(
        r#"
        UPDATE vendors
        SET nome                 = COALESCE($2, nome),
            tecnologias          = COALESCE($3, tecnologias),
            produtos             = COALESCE($4, produtos),
            certificacoes        = COALESCE($5, certificacoes),
            requisitos_atendidos = COALESCE($6, requisitos_atendidos)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.nome)
    .bind(&req.tecnologias)
    .bind(&req.produtos)
    .bind(&req.certificacoes)
    .bind(&req.requisitos_atendidos)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(not_found)?;
    Ok(Json(vendor))
}

/// DELETE /vendors/:id
///
/// RFPs that chose this vendor keep existing with `fabricante_escolhido_id` cleared.
pub async fn handle_delete_vendor(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    let deleted = sqlx::query("DELETE FROM vendors WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?
        .rows_affected();
    if deleted == 0 {
        return Err(not_found());
    }
    Ok(Json(json!({ "ok": true })))
}
