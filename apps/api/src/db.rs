use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates a PostgreSQL connection pool and applies pending migrations.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied");

    Ok(pool)
}

/// Row builders for `#[sqlx::test]` tests.
#[cfg(test)]
pub mod fixtures {
    use sqlx::PgPool;
    use uuid::Uuid;

    use crate::models::rfp::{RfpRow, STATUS_CREATED};

    pub async fn user(pool: &PgPool, perfil: &str) -> i32 {
        sqlx::query_scalar("INSERT INTO users (nome, email, perfil) VALUES ($1, $2, $3) RETURNING id")
            .bind("Ana")
            .bind(format!("{}@example.com", Uuid::new_v4().simple()))
            .bind(perfil)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    pub async fn rfp(pool: &PgPool, owner: i32) -> RfpRow {
        crate::rfps::repo::insert(pool, "Rede Campus", STATUS_CREATED, owner)
            .await
            .unwrap()
    }

    pub async fn vendor(pool: &PgPool, nome: &str) -> i32 {
        sqlx::query_scalar(
            "INSERT INTO vendors (nome, tecnologias, produtos) VALUES ($1, 'WLAN', 'AP-635') RETURNING id",
        )
        .bind(nome)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    pub async fn provider(pool: &PgPool, name: &str, selected: bool) -> i32 {
        sqlx::query_scalar(
            "INSERT INTO ai_providers (name, model, api_key, is_selected) VALUES ($1, 'gpt-4o-mini', 'sk-test', $2) RETURNING id",
        )
        .bind(name)
        .bind(selected)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    /// An RFP with an AI summary and a chosen vendor, ready for BoM and proposal generation.
    pub async fn analyzed_rfp(pool: &PgPool) -> RfpRow {
        let owner = user(pool, "admin").await;
        let rfp = rfp(pool, owner).await;
        let vendor_id = vendor(pool, "Aruba").await;
        crate::rfps::repo::save_summary(pool, rfp.id, "Wi-Fi em 3 prédios").await.unwrap();
        crate::rfps::repo::set_chosen_vendor(pool, rfp.id, vendor_id).await.unwrap();
        crate::rfps::repo::find(pool, rfp.id).await.unwrap().unwrap()
    }
}
