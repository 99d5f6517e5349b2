use sqlx::PgPool;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::rfp::{RfpFileRow, RfpRow, STATUS_AI_ANALYSIS, STATUS_VENDOR_ANALYSIS};

fn rfp_not_found() -> AppError {
    AppError::NotFound("RFP não encontrada".to_string())
}

pub async fn find(pool: &PgPool, id: i32) -> Result<Option<RfpRow>, sqlx::Error> {
    sqlx::query_as::<_, RfpRow>("SELECT * FROM rfps WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Loads an RFP the caller may see. Someone else's RFP answers 404, as if absent.
pub async fn find_visible(pool: &PgPool, id: i32, user: &CurrentUser) -> Result<RfpRow, AppError> {
    find(pool, id)
        .await?
        .filter(|rfp| user.can_access(rfp))
        .ok_or_else(rfp_not_found)
}

pub async fn list_for(pool: &PgPool, user: &CurrentUser) -> Result<Vec<RfpRow>, sqlx::Error> {
    if user.is_admin() {
        sqlx::query_as::<_, RfpRow>("SELECT * FROM rfps ORDER BY id")
            .fetch_all(pool)
            .await
    } else {
        sqlx::query_as::<_, RfpRow>("SELECT * FROM rfps WHERE user_id = $1 ORDER BY id")
            .bind(user.id)
            .fetch_all(pool)
            .await
    }
}

pub async fn insert(pool: &PgPool, nome: &str, status: &str, user_id: i32) -> Result<RfpRow, sqlx::Error> {
    sqlx::query_as::<_, RfpRow>(
        "INSERT INTO rfps (nome, status, user_id) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(nome)
    .bind(status)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

/// Empty strings count as "not supplied" for both fields.
pub async fn update(
    pool: &PgPool,
    id: i32,
    nome: Option<&str>,
    status: Option<&str>,
) -> Result<RfpRow, sqlx::Error> {
    sqlx::query_as::<_, RfpRow>(
        r#"
        UPDATE rfps
        SET nome       = COALESCE(NULLIF($2, ''), nome),
            status     = COALESCE(NULLIF($3, ''), status),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(nome)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM rfps WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn save_summary(pool: &PgPool, id: i32, resumo: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE rfps SET resumo_ia = $2, status = $3, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(resumo)
        .bind(STATUS_AI_ANALYSIS)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn save_vendor_analysis(pool: &PgPool, id: i32, analise: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE rfps SET analise_vendors = $2, status = $3, updated_at = now() WHERE id = $1",
    )
    .bind(id)
    .bind(analise)
    .bind(STATUS_VENDOR_ANALYSIS)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_chosen_vendor(pool: &PgPool, id: i32, vendor_id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE rfps SET fabricante_escolhido_id = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(vendor_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Files
// ────────────────────────────────────────────────────────────────────────────

pub async fn list_files(pool: &PgPool, rfp_id: i32) -> Result<Vec<RfpFileRow>, sqlx::Error> {
    sqlx::query_as::<_, RfpFileRow>("SELECT * FROM rfp_files WHERE rfp_id = $1 ORDER BY id")
        .bind(rfp_id)
        .fetch_all(pool)
        .await
}

pub async fn find_file(
    pool: &PgPool,
    rfp_id: i32,
    file_id: i32,
) -> Result<Option<RfpFileRow>, sqlx::Error> {
    sqlx::query_as::<_, RfpFileRow>("SELECT * FROM rfp_files WHERE id = $1 AND rfp_id = $2")
        .bind(file_id)
        .bind(rfp_id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_file(
    pool: &PgPool,
    rfp_id: i32,
    filename: &str,
    filepath: &str,
) -> Result<RfpFileRow, sqlx::Error> {
    sqlx::query_as::<_, RfpFileRow>(
        "INSERT INTO rfp_files (rfp_id, filename, filepath) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(rfp_id)
    .bind(filename)
    .bind(filepath)
    .fetch_one(pool)
    .await
}

pub async fn delete_file(pool: &PgPool, file_id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM rfp_files WHERE id = $1")
        .bind(file_id)
        .execute(pool)
        .await?;
    Ok(())
}
