//! LLM-suggested scope entry. The suggestion is returned, never stored.

use serde::Serialize;
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::{ChatMessage, GenerationParams, LlmGateway, ProviderConfig};
use crate::models::rfp::RfpRow;
use crate::providers;

pub const SUGGESTION_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 1000,
    temperature: 0.3,
};

pub const FALLBACK_TITLE: &str = "Sugestão de Escopo";
const TITLE_MARKER: &str = "TÍTULO:";
const DESCRIPTION_MARKER: &str = "DESCRICAO:";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeSuggestion {
    pub titulo: String,
    pub descricao: String,
}

pub fn suggestion_prompt(resumo_ia: &str) -> String {
    format!(
        "\nConsiderando o seguinte resumo de uma RFP, gere uma sugestão de escopo de serviços (em português, formato Markdown):\n\n\
         Resumo:\n{resumo_ia}\n\n\
         Sugira um título objetivo e um texto descritivo para o escopo de serviços.\n\n\
         Formato de resposta:\n{TITLE_MARKER} <título>\n{DESCRIPTION_MARKER} <descrição detalhada em Markdown>"
    )
}

/// Reads `TÍTULO:` / `DESCRICAO:` markers. Without both markers the whole
/// reply becomes the description under a fixed title.
pub fn parse_suggestion(raw: &str) -> ScopeSuggestion {
    if raw.contains(TITLE_MARKER) && raw.contains(DESCRIPTION_MARKER) {
        let titulo = raw
            .split(TITLE_MARKER)
            .nth(1)
            .and_then(|after| after.split(DESCRIPTION_MARKER).next())
            .unwrap_or_default()
            .trim();
        let descricao = raw.split(DESCRIPTION_MARKER).nth(1).unwrap_or_default().trim();
        return ScopeSuggestion {
            titulo: titulo.to_string(),
            descricao: descricao.to_string(),
        };
    }

    ScopeSuggestion {
        titulo: FALLBACK_TITLE.to_string(),
        descricao: raw.to_string(),
    }
}

pub async fn suggest(
    llm: &dyn LlmGateway,
    provider: &ProviderConfig,
    resumo_ia: &str,
) -> Result<ScopeSuggestion, AppError> {
    let messages = [ChatMessage::user(suggestion_prompt(resumo_ia))];
    let raw = llm.complete(provider, &messages, SUGGESTION_PARAMS).await?;
    Ok(parse_suggestion(&raw))
}

pub async fn run(pool: &PgPool, llm: &dyn LlmGateway, rfp: &RfpRow) -> Result<ScopeSuggestion, AppError> {
    let resumo = rfp
        .resumo_ia
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::NotFound("RFP não encontrada ou sem resumo IA".to_string()))?;
    let provider = providers::selected_provider(pool).await?;
    info!("Suggesting service scope for RFP {}", rfp.id);
    suggest(llm, &provider, resumo).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{provider, StubGateway};

    #[test]
    fn test_parse_suggestion_with_markers() {
        let raw = "TÍTULO: Implantação de rede Wi-Fi\nDESCRICAO: ## Atividades\n- Site survey\n- Instalação\n";
        assert_eq!(
            parse_suggestion(raw),
            ScopeSuggestion {
                titulo: "Implantação de rede Wi-Fi".to_string(),
                descricao: "## Atividades\n- Site survey\n- Instalação".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_suggestion_fallback_keeps_raw_text() {
        let raw = "**Título:** Rede\n\nDescrição livre";
        assert_eq!(
            parse_suggestion(raw),
            ScopeSuggestion {
                titulo: FALLBACK_TITLE.to_string(),
                descricao: raw.to_string(),
            }
        );
    }

    #[test]
    fn test_parse_suggestion_needs_both_markers() {
        let suggestion = parse_suggestion("TÍTULO: só o título");
        assert_eq!(suggestion.titulo, FALLBACK_TITLE);
    }

    #[test]
    fn test_prompt_mentions_summary_and_format() {
        let prompt = suggestion_prompt("Rede campus");
        assert!(prompt.contains("Resumo:\nRede campus\n"));
        assert!(prompt.ends_with("TÍTULO: <título>\nDESCRICAO: <descrição detalhada em Markdown>"));
    }

    #[tokio::test]
    async fn test_suggest_uses_scope_params() {
        let stub = StubGateway::replying(&["TÍTULO: A\nDESCRICAO: B"]);
        let suggestion = suggest(&stub, &provider(), "resumo").await.unwrap();
        assert_eq!(suggestion.titulo, "A");
        assert_eq!(suggestion.descricao, "B");
        assert_eq!(stub.calls.lock().unwrap()[0].1, SUGGESTION_PARAMS);
    }
}
