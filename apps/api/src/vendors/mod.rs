//! Vendor (fabricante) catalogue.

pub mod handlers;

use sqlx::PgPool;

use crate::models::vendor::VendorRow;

/// All vendors in id order, so name matching picks the oldest duplicate.
pub async fn list_all(pool: &PgPool) -> Result<Vec<VendorRow>, sqlx::Error> {
    sqlx::query_as::<_, VendorRow>("SELECT * FROM vendors ORDER BY id")
        .fetch_all(pool)
        .await
}

pub async fn find(pool: &PgPool, id: i32) -> Result<Option<VendorRow>, sqlx::Error> {
    sqlx::query_as::<_, VendorRow>("SELECT * FROM vendors WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}
