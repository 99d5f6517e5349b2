//! AI provider records and the "selected provider" switch.

pub mod handlers;

use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::ProviderConfig;
use crate::models::ai::AiProviderRow;

/// Reads the selected provider once; the result is passed explicitly into every gateway call.
pub async fn selected_provider(pool: &PgPool) -> Result<ProviderConfig, AppError> {
    let row = sqlx::query_as::<_, AiProviderRow>(
        "SELECT * FROM ai_providers WHERE is_selected ORDER BY id LIMIT 1",
    )
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Nenhum provedor IA selecionado".to_string()))?;

    Ok(row.into())
}

/// Makes `provider_id` the only selected provider.
///
/// A single UPDATE flips every row, so concurrent selects resolve to
/// last-write-wins and never leave two rows selected.
pub async fn select(pool: &PgPool, provider_id: i32) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let exists: Option<i32> =
        sqlx::query_scalar("SELECT id FROM ai_providers WHERE id = $1 FOR UPDATE")
            .bind(provider_id)
            .fetch_optional(&mut *tx)
            .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Provedor não encontrado".to_string()));
    }

    sqlx::query("UPDATE ai_providers SET is_selected = (id = $1), updated_at = now()")
        .bind(provider_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!("AI provider {provider_id} selected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures;

    async fn selected_ids(pool: &PgPool) -> Vec<i32> {
        sqlx::query_scalar("SELECT id FROM ai_providers WHERE is_selected ORDER BY id")
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_select_leaves_exactly_one_selected(pool: PgPool) {
        let openai = fixtures::provider(&pool, "openai", true).await;
        let anthropic = fixtures::provider(&pool, "anthropic", false).await;
        fixtures::provider(&pool, "openai", false).await;

        select(&pool, anthropic).await.unwrap();
        assert_eq!(selected_ids(&pool).await, vec![anthropic]);
        assert_eq!(selected_provider(&pool).await.unwrap().name, "anthropic");

        select(&pool, openai).await.unwrap();
        assert_eq!(selected_ids(&pool).await, vec![openai]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_select_missing_provider_keeps_selection(pool: PgPool) {
        let openai = fixtures::provider(&pool, "openai", true).await;

        let err = select(&pool, openai + 100).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(selected_ids(&pool).await, vec![openai]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_no_selected_provider_is_not_found(pool: PgPool) {
        fixtures::provider(&pool, "openai", false).await;
        assert!(matches!(selected_provider(&pool).await, Err(AppError::NotFound(_))));
    }
}
