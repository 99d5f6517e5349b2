//! Axum route handlers for proposals and technical proposals.

use axum::{
    extract::{Multipart, Path, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::proposal::Proposta;
use crate::parsing::Sections;
use crate::proposals::repo::{self, Attachment};
use crate::proposals::technical;
use crate::render::DOCX_CONTENT_TYPE;
use crate::rfps;
use crate::state::AppState;
use crate::storage;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CreateProposalRequest {
    pub dados_json: Option<Value>,
    pub arquivo_pdf: Option<String>,
    pub arquivo_docx: Option<String>,
}

/// Partial update. An absent field is left alone; an explicit `null` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProposalRequest {
    #[serde(default, deserialize_with = "present")]
    pub dados_json: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub arquivo_pdf: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub arquivo_docx: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl UpdateProposalRequest {
    fn apply(self, proposta: &mut Proposta) {
        if let Some(dados) = self.dados_json {
            proposta.dados_json = (!dados.is_null()).then_some(dados);
        }
        if let Some(pdf) = self.arquivo_pdf {
            proposta.arquivo_pdf = pdf;
        }
        if let Some(docx) = self.arquivo_docx {
            proposta.arquivo_docx = docx;
        }
    }
}

async fn visible_proposal(state: &AppState, user: &CurrentUser, id: i32) -> Result<Proposta, AppError> {
    let proposta = repo::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Proposta não encontrada".to_string()))?;
    rfps::repo::find_visible(&state.db, proposta.rfp_id, user).await?;
    Ok(proposta)
}

// ────────────────────────────────────────────────────────────────────────────
// Proposals CRUD
// ────────────────────────────────────────────────────────────────────────────

/// GET /propostas/rfp/:id
pub async fn handle_list_proposals(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rfp_id): Path<i32>,
) -> Result<Json<Vec<Proposta>>, AppError> {
    rfps::repo::find_visible(&state.db, rfp_id, &user).await?;
    Ok(Json(repo::list_for_rfp(&state.db, rfp_id).await?))
}

/// POST /propostas/rfp/:id
pub async fn handle_create_proposal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rfp_id): Path<i32>,
    Json(req): Json<CreateProposalRequest>,
) -> Result<Json<Proposta>, AppError> {
    rfps::repo::find_visible(&state.db, rfp_id, &user).await?;
    let proposta = repo::insert(
        &state.db,
        rfp_id,
        req.dados_json.as_ref(),
        req.arquivo_pdf.as_deref(),
        req.arquivo_docx.as_deref(),
    )
    .await?;
    Ok(Json(proposta))
}

/// GET /propostas/item/:id
pub async fn handle_get_proposal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Proposta>, AppError> {
    Ok(Json(visible_proposal(&state, &user, id).await?))
}

/// PUT /propostas/item/:id
pub async fn handle_update_proposal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(req): Json<UpdateProposalRequest>,
) -> Result<Json<Proposta>, AppError> {
    let mut proposta = visible_proposal(&state, &user, id).await?;
    req.apply(&mut proposta);
    Ok(Json(repo::update(&state.db, &proposta).await?))
}

/// DELETE /propostas/item/:id
pub async fn handle_delete_proposal(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Value>, AppError> {
    visible_proposal(&state, &user, id).await?;
    repo::delete(&state.db, id).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn upload_attachment(
    state: &AppState,
    user: &CurrentUser,
    id: i32,
    multipart: Multipart,
    kind: Attachment,
) -> Result<String, AppError> {
    visible_proposal(state, user, id).await?;
    let upload = storage::read_file_field(multipart).await?;
    let path = storage::save(
        &state.config.proposal_upload_dir,
        &format!("proposta_{id}_{}", upload.filename),
        &upload.bytes,
    )
    .await?;
    let path = path.to_string_lossy().into_owned();
    repo::set_attachment(&state.db, id, kind, &path).await?;
    Ok(path)
}

/// POST /propostas/item/:id/upload_pdf
pub async fn handle_upload_pdf(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let path = upload_attachment(&state, &user, id, multipart, Attachment::Pdf).await?;
    Ok(Json(json!({ "msg": "Arquivo PDF enviado com sucesso", "arquivo_pdf": path })))
}

/// POST /propostas/item/:id/upload_docx
pub async fn handle_upload_docx(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let path = upload_attachment(&state, &user, id, multipart, Attachment::Docx).await?;
    Ok(Json(json!({ "msg": "Arquivo DOCX enviado com sucesso", "arquivo_docx": path })))
}

// ────────────────────────────────────────────────────────────────────────────
// Technical proposal
// ────────────────────────────────────────────────────────────────────────────

/// POST /propostas_tecnicas/rfp/:id/gerar
///
/// Returns the heading → body map, in the order the headings first appeared.
pub async fn handle_generate_technical(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rfp_id): Path<i32>,
) -> Result<Json<Sections>, AppError> {
    let rfp = rfps::repo::find_visible(&state.db, rfp_id, &user).await?;
    let sections = technical::run(&state.db, state.llm.as_ref(), &rfp).await?;
    Ok(Json(sections))
}

/// GET /propostas_tecnicas/rfp/:id/download
pub async fn handle_download_technical(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(rfp_id): Path<i32>,
) -> Result<Response, AppError> {
    rfps::repo::find_visible(&state.db, rfp_id, &user).await?;
    let bytes =
        technical::render_docx(&state.db, &state.config.proposal_template_path, rfp_id).await?;
    Ok(storage::bytes_attachment(
        bytes,
        DOCX_CONTENT_TYPE,
        &format!("proposta_tecnica_rfp_{rfp_id}.docx"),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn proposta() -> Proposta {
        Proposta {
            id: 1,
            rfp_id: 2,
            dados_json: Some(json!({"CLIENTE": "ACME"})),
            arquivo_pdf: Some("uploaded_propostas/proposta_1_a.pdf".to_string()),
            arquivo_docx: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_update_absent_fields_are_kept() {
        let req: UpdateProposalRequest = serde_json::from_str(r#"{"arquivo_docx": "b.docx"}"#).unwrap();
        let mut p = proposta();
        req.apply(&mut p);
        assert_eq!(p.dados_json, Some(json!({"CLIENTE": "ACME"})));
        assert_eq!(p.arquivo_pdf.as_deref(), Some("uploaded_propostas/proposta_1_a.pdf"));
        assert_eq!(p.arquivo_docx.as_deref(), Some("b.docx"));
    }

    #[test]
    fn test_update_explicit_null_clears() {
        let req: UpdateProposalRequest =
            serde_json::from_str(r#"{"dados_json": null, "arquivo_pdf": null}"#).unwrap();
        let mut p = proposta();
        req.apply(&mut p);
        assert_eq!(p.dados_json, None);
        assert_eq!(p.arquivo_pdf, None);
    }

    #[test]
    fn test_update_replaces_data_wholesale() {
        let req: UpdateProposalRequest =
            serde_json::from_str(r#"{"dados_json": {"BOM": "tabela"}}"#).unwrap();
        let mut p = proposta();
        req.apply(&mut p);
        assert_eq!(p.dados_json, Some(json!({"BOM": "tabela"})));
    }
}
