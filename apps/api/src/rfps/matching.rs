//! Vendor matching: score every catalogued vendor against the RFP summary.
//!
//! A reply that does not contain a usable JSON array is not an error here:
//! the caller gets `{"erro": ..., "raw": ...}` with status 200. BoM
//! generation treats the same condition as a hard failure.

use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::{ChatMessage, GenerationParams, LlmGateway, ProviderConfig};
use crate::models::rfp::RfpRow;
use crate::models::vendor::VendorRow;
use crate::parsing::{extract_json_array, ExtractError};
use crate::prompts::{self, VENDOR_MATCHING_SYSTEM_ROLE, VENDOR_MATCHING_USER_PROMPT};
use crate::providers;
use crate::vendors;

pub const MATCHING_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 4096,
    temperature: 0.2,
};

pub const PARSE_FAILURE_MESSAGE: &str = "Falha ao processar resposta da IA";

/// Full pipeline. The RFP must already have a summary.
pub async fn run(pool: &PgPool, llm: &dyn LlmGateway, rfp: &RfpRow) -> Result<Value, AppError> {
    let resumo = rfp
        .resumo_ia
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::NotFound("RFP não encontrada ou sem análise IA".to_string()))?;

    let vendors = vendors::list_all(pool).await?;
    if vendors.is_empty() {
        return Ok(json!([]));
    }

    let provider = providers::selected_provider(pool).await?;
    let system_role = prompts::lookup(pool, VENDOR_MATCHING_SYSTEM_ROLE).await?;
    let user_template = prompts::lookup(pool, VENDOR_MATCHING_USER_PROMPT).await?;

    info!("Matching {} vendors against RFP {}", vendors.len(), rfp.id);
    match_vendors(llm, &provider, &system_role, &user_template, resumo, &vendors).await
}

pub async fn match_vendors(
    llm: &dyn LlmGateway,
    provider: &ProviderConfig,
    system_role: &str,
    user_template: &str,
    resumo: &str,
    vendors: &[VendorRow],
) -> Result<Value, AppError> {
    if vendors.is_empty() {
        return Ok(json!([]));
    }

    let info = vendors_info(vendors);
    let user_prompt = prompts::substitute(
        user_template,
        &[("rfp_summary", resumo), ("vendors_info", &info)],
    )?;
    let messages = [ChatMessage::system(system_role), ChatMessage::user(user_prompt)];
    let raw = llm.complete(provider, &messages, MATCHING_PARAMS).await?;

    Ok(matching_payload(&raw, vendors))
}

/// One block per vendor, blocks separated by a newline.
pub fn vendors_info(vendors: &[VendorRow]) -> String {
    vendors
        .iter()
        .map(|v| {
            format!(
                "Vendor: {}\nTecnologias: {}\nProdutos: {}\nCertificacoes: {}\nRequisitos_Atendidos: {}",
                v.nome,
                v.tecnologias.as_deref().unwrap_or_default(),
                v.produtos.as_deref().unwrap_or_default(),
                v.certificacoes.as_deref().unwrap_or_default(),
                v.requisitos_atendidos.as_deref().unwrap_or_default(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Adds `vendor_id` to every item whose `vendor` equals a vendor name exactly.
/// Unmatched items pass through untouched.
pub fn merge_vendor_ids(items: Vec<Value>, vendors: &[VendorRow]) -> Result<Vec<Value>, ExtractError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let Value::Object(mut map) = item else {
                return Err(ExtractError::NotAnObject(i));
            };
            let matched = map
                .get("vendor")
                .and_then(Value::as_str)
                .and_then(|name| vendors.iter().find(|v| v.nome == name));
            if let Some(vendor) = matched {
                map.insert("vendor_id".to_string(), json!(vendor.id));
            }
            Ok(Value::Object(map))
        })
        .collect()
}

pub fn matching_payload(raw: &str, vendors: &[VendorRow]) -> Value {
    match extract_json_array(raw).and_then(|items| merge_vendor_ids(items, vendors)) {
        Ok(items) => Value::Array(items),
        Err(e) => {
            warn!("Vendor matching reply unusable: {e}");
            json!({ "erro": PARSE_FAILURE_MESSAGE, "raw": raw })
        }
    }
}
