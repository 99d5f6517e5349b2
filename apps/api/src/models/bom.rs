use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BomItemRow {
    pub id: i32,
    pub rfp_id: i32,
    pub descricao: Option<String>,
    pub modelo: Option<String>,
    pub part_number: Option<String>,
    pub quantidade: Option<i32>,
}
