//! `dados_json` is a `json` column. Writes bind the serialized text and cast
//! it; reads cast back to text so the stored key order reaches the client.

use serde_json::Value;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::proposal::{Proposta, PropostaRecord};
use crate::parsing::Sections;

const COLUMNS: &str =
    "id, rfp_id, dados_json::text AS dados_json, arquivo_pdf, arquivo_docx, created_at";

fn into_proposta(record: PropostaRecord) -> Result<Proposta, AppError> {
    Proposta::try_from(record)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("stored dados_json is not valid JSON: {e}")))
}

fn to_json_text(value: Option<&Value>) -> Result<Option<String>, AppError> {
    value
        .filter(|v| !v.is_null())
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| AppError::Internal(e.into()))
}

pub async fn list_for_rfp(pool: &PgPool, rfp_id: i32) -> Result<Vec<Proposta>, AppError> {
    let records = sqlx::query_as::<_, PropostaRecord>(&format!(
        "SELECT {COLUMNS} FROM propostas WHERE rfp_id = $1 ORDER BY id"
    ))
    .bind(rfp_id)
    .fetch_all(pool)
    .await?;
    records.into_iter().map(into_proposta).collect()
}

pub async fn find(pool: &PgPool, id: i32) -> Result<Option<Proposta>, AppError> {
    sqlx::query_as::<_, PropostaRecord>(&format!("SELECT {COLUMNS} FROM propostas WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(into_proposta)
        .transpose()
}

/// The technical proposal of an RFP: its oldest proposal row.
pub async fn find_by_rfp(pool: &PgPool, rfp_id: i32) -> Result<Option<Proposta>, AppError> {
    sqlx::query_as::<_, PropostaRecord>(&format!(
        "SELECT {COLUMNS} FROM propostas WHERE rfp_id = $1 ORDER BY id LIMIT 1"
    ))
    .bind(rfp_id)
    .fetch_optional(pool)
    .await?
    .map(into_proposta)
    .transpose()
}

pub async fn insert(
    pool: &PgPool,
    rfp_id: i32,
    dados_json: Option<&Value>,
    arquivo_pdf: Option<&str>,
    arquivo_docx: Option<&str>,
) -> Result<Proposta, AppError> {
    let record = sqlx::query_as::<_, PropostaRecord>(&format!(
        r#"
        INSERT INTO propostas (rfp_id, dados_json, arquivo_pdf, arquivo_docx)
        VALUES ($1, $2::text::json, $3, $4)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(rfp_id)
    .bind(to_json_text(dados_json)?)
    .bind(arquivo_pdf)
    .bind(arquivo_docx)
    .fetch_one(pool)
    .await?;
    into_proposta(record)
}

/// Writes every mutable column of `proposta`.
pub async fn update(pool: &PgPool, proposta: &Proposta) -> Result<Proposta, AppError> {
    let record = sqlx::query_as::<_, PropostaRecord>(&format!(
        r#"
        UPDATE propostas
        SET dados_json = $2::text::json, arquivo_pdf = $3, arquivo_docx = $4
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(proposta.id)
    .bind(to_json_text(proposta.dados_json.as_ref())?)
    .bind(&proposta.arquivo_pdf)
    .bind(&proposta.arquivo_docx)
    .fetch_one(pool)
    .await?;
    into_proposta(record)
}

pub async fn delete(pool: &PgPool, id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM propostas WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_attachment(
    pool: &PgPool,
    id: i32,
    column: Attachment,
    path: &str,
) -> Result<(), sqlx::Error> {
    let sql = match column {
        Attachment::Pdf => "UPDATE propostas SET arquivo_pdf = $2 WHERE id = $1",
        Attachment::Docx => "UPDATE propostas SET arquivo_docx = $2 WHERE id = $1",
    };
    sqlx::query(sql).bind(id).bind(path).execute(pool).await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Pdf,
    Docx,
}

/// Overwrites the sections of the RFP's technical proposal, creating it when absent.
pub async fn upsert_sections(pool: &PgPool, rfp_id: i32, sections: &Sections) -> Result<(), AppError> {
    let text = serde_json::to_string(sections).map_err(|e| AppError::Internal(e.into()))?;
    let mut tx = pool.begin().await?;

    // Serializes concurrent generations for the same RFP.
    sqlx::query("SELECT id FROM rfps WHERE id = $1 FOR UPDATE")
        .bind(rfp_id)
        .execute(&mut *tx)
        .await?;

    let existing: Option<i32> =
        sqlx::query_scalar("SELECT id FROM propostas WHERE rfp_id = $1 ORDER BY id LIMIT 1")
            .bind(rfp_id)
            .fetch_optional(&mut *tx)
            .await?;

    match existing {
        Some(id) => {
            sqlx::query("UPDATE propostas SET dados_json = $2::text::json WHERE id = $1")
                .bind(id)
                .bind(&text)
                .execute(&mut *tx)
                .await?;
        }
        None => {
            sqlx::query("INSERT INTO propostas (rfp_id, dados_json) VALUES ($1, $2::text::json)")
                .bind(rfp_id)
                .bind(&text)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    Ok(())
}
