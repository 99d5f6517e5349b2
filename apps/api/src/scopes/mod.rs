//! Service-scope entries (escopo de serviço) attached to an RFP.

pub mod handlers;
pub mod suggestion;

use sqlx::PgPool;

use crate::models::scope::EscopoServicoRow;

pub async fn list_for_rfp(pool: &PgPool, rfp_id: i32) -> Result<Vec<EscopoServicoRow>, sqlx::Error> {
    sqlx::query_as::<_, EscopoServicoRow>(
        "SELECT * FROM escopo_servico WHERE rfp_id = $1 ORDER BY id",
    )
    .bind(rfp_id)
    .fetch_all(pool)
    .await
}
