use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::bom::generation::{self, NewBomItem};
use crate::bom::repo;
use crate::errors::AppError;
use crate::models::bom::BomItemRow;
use crate::rfps;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateBomItemRequest {
    pub descricao: Option<String>,
    pub modelo: Option<String>,
    pub part_number: Option<String>,
    pub quantidade: Option<i32>,
}

/// Loads an item whose RFP the caller can see.
async fn visible_item(state: &AppState, user: &CurrentUser, id: i32) -> Result<BomItemRow, AppError> {
    let item = repo::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Item de BoM não encontrado".to_string()))?;
    rfps::repo::find_visible(&state.db, item.rfp_id, user).await?;
    Ok(item)
}

/// GET /bom/rfp/:id
pub async fn handle_list_items(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rfp_id): Path<i32>,
) -> Result<Json<Vec<BomItemRow>>, AppError> {
    rfps::repo::find_visible(&state.db, rfp_id, &user).await?;
    Ok(Json(repo::list_for_rfp(&state.db, rfp_id).await?))
}

/// POST /bom/rfp/:id
pub async fn handle_create_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rfp_id): Path<i32>,
    Json(item): Json<NewBomItem>,
) -> Result<Json<BomItemRow>, AppError> {
    rfps::repo::find_visible(&state.db, rfp_id, &user).await?;
    Ok(Json(repo::insert(&state.db, rfp_id, &item).await?))
}

/// GET /bom/item/:item_id
pub async fn handle_get_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<BomItemRow>, AppError> {
    Ok(Json(visible_item(&state, &user, id).await?))
}

/// PUT /bom/item/:item_id
pub async fn handle_update_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(req): Json<UpdateBomItemRequest>,
) -> Result<Json<BomItemRow>, AppError> {
    visible_item(&state, &user, id).await?;
    let item = repo::update(
        &state.db,
        id,
        req.descricao.as_deref(),
        req.modelo.as_deref(),
        req.part_number.as_deref(),
        req.quantidade,
    )
    .await?;
    Ok(Json(item))
}

/// DELETE /bom/item/:item_id
pub async fn handle_delete_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    visible_item(&state, &user, id).await?;
    repo::delete(&state.db, id).await?;
    Ok(Json(json!({ "ok": true })))
}

/// POST /bom/rfp/:id/generate
///
/// Requires `resumo_ia` and a chosen vendor. Replaces the whole BoM.
pub async fn handle_generate(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rfp_id): Path<i32>,
) -> Result<Json<Vec<BomItemRow>>, AppError> {
    let rfp = rfps::repo::find_visible(&state.db, rfp_id, &user).await?;
    let items = generation::run(&state.db, state.llm.as_ref(), &rfp).await?;
    Ok(Json(items))
}
