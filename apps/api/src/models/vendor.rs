use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VendorRow {
    pub id: i32,
    pub nome: String,
    pub tecnologias: Option<String>,
    pub produtos: Option<String>,
    pub certificacoes: Option<String>,
    pub requisitos_atendidos: Option<String>,
}
