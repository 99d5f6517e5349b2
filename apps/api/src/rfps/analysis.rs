//! RFP analysis: extract document text, ask the LLM for a Markdown summary,
//! store it as `resumo_ia`.

use anyhow::anyhow;
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::extract::extract_rfp_text;
use crate::llm_client::{ChatMessage, GenerationParams, LlmGateway, ProviderConfig};
use crate::models::rfp::{RfpFileRow, RfpRow};
use crate::prompts::{self, RFP_ANALYSIS_SYSTEM_ROLE, RFP_ANALYSIS_USER_PROMPT};
use crate::providers;
use crate::rfps::repo;

pub const ANALYSIS_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 10_000,
    temperature: 0.3,
};

/// Full pipeline for one RFP. Returns the stored summary.
pub async fn analyze(pool: &PgPool, llm: &dyn LlmGateway, rfp: &RfpRow) -> Result<String, AppError> {
    let files = repo::list_files(pool, rfp.id).await?;
    if files.is_empty() {
        return Err(AppError::Validation(
            "Nenhum arquivo enviado para esta RFP".to_string(),
        ));
    }

    let provider = providers::selected_provider(pool).await?;
    info!("Analyzing RFP {} ({} files) with {}", rfp.id, files.len(), provider.model);

    let text = extract_blocking(files).await?;
    let system_role = prompts::lookup(pool, RFP_ANALYSIS_SYSTEM_ROLE).await?;
    let user_template = prompts::lookup(pool, RFP_ANALYSIS_USER_PROMPT).await?;

    let resumo = summarize(llm, &provider, &system_role, &user_template, &text).await?;

    repo::save_summary(pool, rfp.id, &resumo).await?;
    info!("RFP {} analysis stored ({} chars)", rfp.id, resumo.len());
    Ok(resumo)
}

/// Document parsing is synchronous, so it runs on the blocking pool.
async fn extract_blocking(files: Vec<RfpFileRow>) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || extract_rfp_text(&files))
        .await
        .map_err(|e| anyhow!("text extraction task failed: {e}"))?
        .map_err(AppError::Internal)
}

pub async fn summarize(
    llm: &dyn LlmGateway,
    provider: &ProviderConfig,
    system_role: &str,
    user_template: &str,
    text: &str,
) -> Result<String, AppError> {
    let user_prompt = prompts::substitute(user_template, &[("text", text)])?;
    let messages = [ChatMessage::system(system_role), ChatMessage::user(user_prompt)];
    Ok(llm.complete(provider, &messages, ANALYSIS_PARAMS).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{provider, StubGateway};
    use crate::llm_client::Role;
    use crate::prompts::PromptError;

    #[tokio::test]
    async fn test_summarize_sends_system_then_user() {
        let stub = StubGateway::replying(&["## 1. Identificação Geral\n- Cliente: ACME"]);
        let resumo = summarize(
            &stub,
            &provider(),
            "Você é um analista.",
            "Conteúdo da RFP:\n{text}",
            "\n\nContent of file edital.pdf:\nrede wifi",
        )
        .await
        .unwrap();
        assert!(resumo.starts_with("## 1."));

        let calls = stub.calls.lock().unwrap();
        let (messages, params) = &calls[0];
        assert_eq!(*params, ANALYSIS_PARAMS);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "Você é um analista.");
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            "Conteúdo da RFP:\n\n\nContent of file edital.pdf:\nrede wifi"
        );
    }

    #[tokio::test]
    async fn test_summarize_template_without_text_placeholder_value() {
        let stub = StubGateway::replying(&["nunca"]);
        let err = summarize(&stub, &provider(), "sys", "{texto}", "x").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Prompt(PromptError::MissingPlaceholder(ref name)) if name == "texto"
        ));
        assert!(stub.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summarize_propagates_gateway_failure() {
        let stub = StubGateway::failing();
        let err = summarize(&stub, &provider(), "sys", "{text}", "x").await.unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }
}
