//! AI BoM generation.
//!
//! Unlike vendor matching, an unusable reply here fails the request with a
//! 500 and leaves the stored BoM untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;

use crate::bom::{prompts::bom_prompt, repo};
use crate::errors::AppError;
use crate::llm_client::{ChatMessage, GenerationParams, LlmGateway, ProviderConfig};
use crate::models::bom::BomItemRow;
use crate::models::rfp::RfpRow;
use crate::models::vendor::VendorRow;
use crate::parsing::{extract_json_array, ExtractError};
use crate::providers;
use crate::vendors;

pub const BOM_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 1500,
    temperature: 0.2,
};

pub const NO_JSON_MESSAGE: &str = "Resposta da IA não contém JSON válido";
pub const INVALID_JSON_MESSAGE: &str = "Falha ao processar JSON gerado pela IA";

/// One parsed line of the generated BoM, before it has an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBomItem {
    pub descricao: String,
    pub modelo: String,
    pub part_number: String,
    pub quantidade: i32,
}

impl NewBomItem {
    /// Missing text fields become "", a missing or unreadable quantity becomes 1.
    fn from_json(value: Value) -> Option<Self> {
        let Value::Object(map) = value else {
            return None;
        };
        let text = |key: &str| match map.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        Some(NewBomItem {
            descricao: text("descricao"),
            modelo: text("modelo"),
            part_number: text("part_number"),
            quantidade: map.get("quantidade").and_then(quantity).unwrap_or(1),
        })
    }
}

fn quantity(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn parse_items(raw: &str) -> Result<Vec<NewBomItem>, AppError> {
    let items = extract_json_array(raw).map_err(|e| match e {
        ExtractError::NoJsonArray => AppError::LlmOutput(NO_JSON_MESSAGE.to_string()),
        _ => AppError::LlmOutput(INVALID_JSON_MESSAGE.to_string()),
    })?;
    items
        .into_iter()
        .map(|item| {
            NewBomItem::from_json(item)
                .ok_or_else(|| AppError::LlmOutput(INVALID_JSON_MESSAGE.to_string()))
        })
        .collect()
}

pub async fn generate_items(
    llm: &dyn LlmGateway,
    provider: &ProviderConfig,
    resumo_ia: &str,
    vendor: &VendorRow,
) -> Result<Vec<NewBomItem>, AppError> {
    let messages = [ChatMessage::user(bom_prompt(resumo_ia, vendor))];
    let raw = llm.complete(provider, &messages, BOM_PARAMS).await?;
    parse_items(&raw)
}

/// Generates a BoM for `rfp` and replaces the stored one.
pub async fn run(pool: &PgPool, llm: &dyn LlmGateway, rfp: &RfpRow) -> Result<Vec<BomItemRow>, AppError> {
    let (Some(resumo), Some(vendor_id)) = (
        rfp.resumo_ia.as_deref().filter(|r| !r.is_empty()),
        rfp.fabricante_escolhido_id,
    ) else {
        return Err(AppError::Validation(
            "RFP precisa de resumo da IA e fabricante selecionado".to_string(),
        ));
    };

    let vendor = vendors::find(pool, vendor_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Fabricante não encontrado".to_string()))?;
    let provider = providers::selected_provider(pool).await?;

    info!("Generating BoM for RFP {} with vendor {}", rfp.id, vendor.nome);
    let items = generate_items(llm, &provider, resumo, &vendor).await?;

    let rows = repo::replace_for_rfp(pool, rfp.id, &items).await?;
    info!("BoM for RFP {} replaced with {} items", rfp.id, rows.len());
    Ok(rows)
}
