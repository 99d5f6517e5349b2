use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Status labels written by the pipelines. Status is free text: any endpoint may overwrite it.
pub const STATUS_CREATED: &str = "Criado";
pub const STATUS_AI_ANALYSIS: &str = "Análise IA";
pub const STATUS_VENDOR_ANALYSIS: &str = "Analise Vendors";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RfpRow {
    pub id: i32,
    pub nome: String,
    pub status: String,
    pub user_id: Option<i32>,
    pub arquivo_url: Option<String>,
    pub resumo_ia: Option<String>,
    pub fabricante_escolhido_id: Option<i32>,
    pub analise_vendors: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RfpFileRow {
    pub id: i32,
    pub rfp_id: i32,
    pub filename: String,
    /// Storage path on local disk. Never serialized to clients.
    #[serde(skip_serializing)]
    pub filepath: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
