//! Technical proposal pipeline.
//!
//! Context (name, attached files, summary, chosen vendor, BoM, scopes) is
//! substituted into `technical_proposal_user_prompt`; the reply is split on
//! `### ` headings and the resulting section map is upserted on the RFP's
//! proposal. Download renders those sections into the DOCX template.

use std::path::Path;

use anyhow::anyhow;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::bom;
use crate::errors::AppError;
use crate::llm_client::{ChatMessage, GenerationParams, LlmGateway, ProviderConfig};
use crate::models::bom::BomItemRow;
use crate::models::rfp::{RfpFileRow, RfpRow};
use crate::models::scope::EscopoServicoRow;
use crate::models::vendor::VendorRow;
use crate::parsing::{split_heading_sections, Sections};
use crate::prompts::{self, TECHNICAL_PROPOSAL_USER_PROMPT};
use crate::proposals::repo;
use crate::render::render_template;
use crate::rfps;
use crate::{providers, scopes, vendors};

pub const PROPOSAL_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 10_000,
    temperature: 0.3,
};

const NO_FILES: &str = "Nenhum arquivo anexado";
const NO_VENDOR: &str = "Nenhum fabricante selecionado";
const NO_BOM: &str = "Nenhum BoM gerado";

/// Values for the `technical_proposal_user_prompt` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalContext {
    pub rfp_nome: String,
    pub arquivos_text: String,
    pub rfp_resumo_ia: String,
    pub vendor_info: String,
    pub bom_text: String,
    pub escopos_text: String,
}

fn or_empty(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

impl ProposalContext {
    pub fn build(
        rfp: &RfpRow,
        files: &[RfpFileRow],
        vendor: Option<&VendorRow>,
        bom: &[BomItemRow],
        escopos: &[EscopoServicoRow],
    ) -> Self {
        let arquivos_text = files
            .iter()
            .map(|f| format!("- {}", f.filename))
            .collect::<Vec<_>>()
            .join("\n");

        let vendor_info = match vendor {
            Some(v) => format!(
                "Nome: {}\nTecnologias: {}\nProdutos: {}\nCertificações: {}\nRequisitos Atendidos: {}",
                v.nome,
                or_empty(&v.tecnologias),
                or_empty(&v.produtos),
                or_empty(&v.certificacoes),
                or_empty(&v.requisitos_atendidos),
            ),
            None => NO_VENDOR.to_string(),
        };

        let bom_text = bom
            .iter()
            .map(|item| {
                format!(
                    "- {} (modelo: {}, part_number: {}, quantidade: {})",
                    or_empty(&item.descricao),
                    or_empty(&item.modelo),
                    or_empty(&item.part_number),
                    item.quantidade.map(|q| q.to_string()).unwrap_or_default(),
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let escopos_text = escopos
            .iter()
            .map(|e| format!("- {}: {}", e.titulo, or_empty(&e.descricao)))
            .collect::<Vec<_>>()
            .join("\n");

        ProposalContext {
            rfp_nome: rfp.nome.clone(),
            arquivos_text: if arquivos_text.is_empty() { NO_FILES.to_string() } else { arquivos_text },
            rfp_resumo_ia: or_empty(&rfp.resumo_ia).to_string(),
            vendor_info,
            bom_text: if bom_text.is_empty() { NO_BOM.to_string() } else { bom_text },
            escopos_text,
        }
    }

    fn values(&self) -> [(&str, &str); 6] {
        [
            ("rfp_nome", self.rfp_nome.as_str()),
            ("arquivos_text", self.arquivos_text.as_str()),
            ("rfp_resumo_ia", self.rfp_resumo_ia.as_str()),
            ("vendor_info", self.vendor_info.as_str()),
            ("bom_text", self.bom_text.as_str()),
            ("escopos_text", self.escopos_text.as_str()),
        ]
    }
}

pub async fn generate_sections(
    llm: &dyn LlmGateway,
    provider: &ProviderConfig,
    template: &str,
    context: &ProposalContext,
) -> Result<Sections, AppError> {
    let prompt = prompts::substitute(template, &context.values())?;
    let raw = llm
        .complete(provider, &[ChatMessage::user(prompt)], PROPOSAL_PARAMS)
        .await?;

    let sections = split_heading_sections(&raw);
    if sections.is_empty() {
        warn!("Technical proposal reply contained no '### ' headings");
    }
    Ok(sections)
}

async fn load_context(pool: &PgPool, rfp: &RfpRow) -> Result<ProposalContext, AppError> {
    let files = rfps::repo::list_files(pool, rfp.id).await?;
    let vendor = match rfp.fabricante_escolhido_id {
        Some(id) => vendors::find(pool, id).await?,
        None => None,
    };
    let bom = bom::repo::list_for_rfp(pool, rfp.id).await?;
    let escopos = scopes::list_for_rfp(pool, rfp.id).await?;
    Ok(ProposalContext::build(rfp, &files, vendor.as_ref(), &bom, &escopos))
}

/// Generates the section map for `rfp` and stores it on its proposal.
pub async fn run(pool: &PgPool, llm: &dyn LlmGateway, rfp: &RfpRow) -> Result<Sections, AppError> {
    if rfp.resumo_ia.as_deref().map_or(true, str::is_empty) {
        return Err(AppError::NotFound(
            "RFP não encontrada ou sem resumo IA".to_string(),
        ));
    }

    let provider = providers::selected_provider(pool).await?;
    let template = prompts::lookup(pool, TECHNICAL_PROPOSAL_USER_PROMPT).await?;
    let context = load_context(pool, rfp).await?;

    info!("Generating technical proposal for RFP {}", rfp.id);
    let sections = generate_sections(llm, &provider, &template, &context).await?;

    repo::upsert_sections(pool, rfp.id, &sections).await?;
    info!("Technical proposal for RFP {} stored ({} sections)", rfp.id, sections.len());
    Ok(sections)
}

/// Renders the stored sections of the RFP's proposal into the DOCX template.
pub async fn render_docx(pool: &PgPool, template_path: &Path, rfp_id: i32) -> Result<Vec<u8>, AppError> {
    let sections = match repo::find_by_rfp(pool, rfp_id).await?.and_then(|p| p.dados_json) {
        Some(serde_json::Value::Object(map)) if !map.is_empty() => map,
        _ => {
            return Err(AppError::NotFound(
                "Proposta não encontrada. Gere antes via IA.".to_string(),
            ))
        }
    };

    let template = tokio::fs::read(template_path).await.map_err(|e| {
        AppError::Render(format!("template {} indisponível: {e}", template_path.display()))
    })?;

    tokio::task::spawn_blocking(move || render_template(&template, &sections))
        .await
        .map_err(|e| anyhow!("render task failed: {e}"))?
        .map_err(|e| AppError::Render(e.to_string()))
}
