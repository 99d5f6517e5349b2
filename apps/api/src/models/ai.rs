use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::llm_client::ProviderConfig;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiProviderRow {
    pub id: i32,
    pub name: String,
    pub model: String,
    pub api_key: String,
    pub is_selected: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AiProviderRow> for ProviderConfig {
    fn from(row: AiProviderRow) -> Self {
        ProviderConfig {
            name: row.name,
            model: row.model,
            api_key: row.api_key,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiPromptRow {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub prompt_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
