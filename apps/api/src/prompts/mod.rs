//! Prompt Store: named, admin-editable templates with `{placeholder}` substitution.
//!
//! Templates are database rows, so an edit changes pipeline behaviour on the
//! next request. There is no versioning.

pub mod handlers;

use sqlx::PgPool;
use thiserror::Error;

use crate::errors::AppError;

pub const RFP_ANALYSIS_SYSTEM_ROLE: &str = "rfp_analysis_system_role";
pub const RFP_ANALYSIS_USER_PROMPT: &str = "rfp_analysis_user_prompt";
pub const VENDOR_MATCHING_SYSTEM_ROLE: &str = "vendor_matching_system_role";
pub const VENDOR_MATCHING_USER_PROMPT: &str = "vendor_matching_user_prompt";
pub const TECHNICAL_PROPOSAL_USER_PROMPT: &str = "technical_proposal_user_prompt";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("template references placeholder '{{{0}}}' but no value was supplied")]
    MissingPlaceholder(String),

    #[error("malformed template: {0}")]
    Malformed(&'static str),
}

/// Returns the template text stored under `name`.
pub async fn lookup(pool: &PgPool, name: &str) -> Result<String, AppError> {
    sqlx::query_scalar::<_, String>("SELECT prompt_text FROM ai_prompts WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Prompt com nome '{name}' não encontrado.")))
}

/// Replaces every `{name}` in `template` with its value.
///
/// `{{` and `}}` produce literal braces. Unused values are ignored; a
/// placeholder without a value is an error, never an empty string.
pub fn substitute(template: &str, values: &[(&str, &str)]) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => return Err(PromptError::Malformed("unexpected '{' in field name")),
                        Some(ch) => name.push(ch),
                        None => return Err(PromptError::Malformed("expected '}' before end of string")),
                    }
                }
                let value = values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or(PromptError::MissingPlaceholder(name))?;
                out.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(PromptError::Malformed("single '}' encountered in format string")),
            other => out.push(other),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_named_values() {
        let out = substitute(
            "Resumo:\n{rfp_summary}\n\nVendors:\n{vendors_info}",
            &[("rfp_summary", "rede wifi"), ("vendors_info", "Vendor: Cisco")],
        )
        .unwrap();
        assert_eq!(out, "Resumo:\nrede wifi\n\nVendors:\nVendor: Cisco");
    }

    #[test]
    fn test_substitute_missing_value_fails() {
        let err = substitute("Conteúdo da RFP:\n{text}", &[("other", "x")]).unwrap_err();
        assert_eq!(err, PromptError::MissingPlaceholder("text".to_string()));
    }

    #[test]
    fn test_substitute_unescaped_json_example_fails() {
        let err = substitute("[{'vendor': <nome>}]", &[]).unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingPlaceholder("'vendor': <nome>".to_string())
        );
    }

    #[test]
    fn test_substitute_escaped_braces_are_literal() {
        let out = substitute(r#"[{{"vendor": "{name}"}}]"#, &[("name", "Cisco")]).unwrap();
        assert_eq!(out, r#"[{"vendor": "Cisco"}]"#);
    }

    #[test]
    fn test_substitute_extra_values_ignored() {
        let out = substitute("sem placeholders", &[("text", "x")]).unwrap();
        assert_eq!(out, "sem placeholders");
    }

    #[test]
    fn test_substitute_value_braces_not_reinterpreted() {
        let out = substitute("{text}", &[("text", "{nested}")]).unwrap();
        assert_eq!(out, "{nested}");
    }

    #[test]
    fn test_substitute_malformed_templates() {
        assert!(matches!(substitute("abc {text", &[("text", "x")]), Err(PromptError::Malformed(_))));
        assert!(matches!(substitute("abc } def", &[]), Err(PromptError::Malformed(_))));
    }

    #[test]
    fn test_seeded_prompts_substitute_cleanly() {
        let seed = include_str!("../../migrations/0002_seed_ai_prompts.sql");
        let vendor_prompt = seed
            .split("'vendor_matching_user_prompt',")
            .nth(1)
            .and_then(|rest| rest.split("$prompt$").nth(1))
            .unwrap();
        let out = substitute(
            vendor_prompt,
            &[("rfp_summary", "resumo"), ("vendors_info", "Vendor: X")],
        )
        .unwrap();
        assert!(out.contains(r#"[{"vendor": <nome>"#));
        assert!(out.contains("Vendor: X"));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_lookup_seeded_and_missing(pool: PgPool) {
        let text = lookup(&pool, RFP_ANALYSIS_SYSTEM_ROLE).await.unwrap();
        assert!(!text.is_empty());

        match lookup(&pool, "nao_existe").await {
            Err(AppError::NotFound(msg)) => {
                assert_eq!(msg, "Prompt com nome 'nao_existe' não encontrado.")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
