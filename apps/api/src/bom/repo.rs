use sqlx::PgPool;

use crate::bom::generation::NewBomItem;
use crate::models::bom::BomItemRow;

pub async fn list_for_rfp(pool: &PgPool, rfp_id: i32) -> Result<Vec<BomItemRow>, sqlx::Error> {
    sqlx::query_as::<_, BomItemRow>("SELECT * FROM bom_items WHERE rfp_id = $1 ORDER BY id")
        .bind(rfp_id)
        .fetch_all(pool)
        .await
}

pub async fn find(pool: &PgPool, id: i32) -> Result<Option<BomItemRow>, sqlx::Error> {
    sqlx::query_as::<_, BomItemRow>("SELECT * FROM bom_items WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert<'e, E>(executor: E, rfp_id: i32, item: &NewBomItem) -> Result<BomItemRow, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, BomItemRow>(
        r#"
        INSERT INTO bom_items (rfp_id, descricao, modelo, part_number, quantidade)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(rfp_id)
    .bind(&item.descricao)
    .bind(&item.modelo)
    .bind(&item.part_number)
    .bind(item.quantidade)
    .fetch_one(executor)
    .await
}

/// Deletes every BoM item of the RFP and inserts `items`, in one transaction.
pub async fn replace_for_rfp(
    pool: &PgPool,
    rfp_id: i32,
    items: &[NewBomItem],
) -> Result<Vec<BomItemRow>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM bom_items WHERE rfp_id = $1")
        .bind(rfp_id)
        .execute(&mut *tx)
        .await?;

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        rows.push(insert(&mut *tx, rfp_id, item).await?);
    }

    tx.commit().await?;
    Ok(rows)
}

pub async fn update(
    pool: &PgPool,
    id: i32,
    descricao: Option<&str>,
    modelo: Option<&str>,
    part_number: Option<&str>,
    quantidade: Option<i32>,
) -> Result<BomItemRow, sqlx::Error> {
    sqlx::query_as::<_, BomItemRow>(
        r#"
        UPDATE bom_items
        SET descricao   = COALESCE($2, descricao),
            modelo      = COALESCE($3, modelo),
            part_number = COALESCE($4, part_number),
            quantidade  = COALESCE($5, quantidade)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(descricao)
    .bind(modelo)
    .bind(part_number)
    .bind(quantidade)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i32) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM bom_items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
