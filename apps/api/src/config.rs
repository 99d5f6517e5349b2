use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173,http://localhost:3001";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Where uploaded RFP documents are written. Also served at `/uploaded_rfps`.
    pub upload_dir: PathBuf,
    pub proposal_upload_dir: PathBuf,
    pub proposal_template_path: PathBuf,
    /// Request body cap for the multipart upload routes.
    pub max_upload_bytes: usize,
    pub openai_base_url: String,
    pub anthropic_base_url: String,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            upload_dir: env_or("UPLOAD_DIR", "uploaded_rfps").into(),
            proposal_upload_dir: env_or("PROPOSAL_UPLOAD_DIR", "uploaded_propostas").into(),
            proposal_template_path: env_or(
                "PROPOSAL_TEMPLATE_PATH",
                "templates/proposta_template.docx",
            )
            .into(),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("MAX_UPLOAD_BYTES must be a byte count")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            openai_base_url: env_or("OPENAI_BASE_URL", crate::llm_client::OPENAI_BASE_URL),
            anthropic_base_url: env_or("ANTHROPIC_BASE_URL", crate::llm_client::ANTHROPIC_BASE_URL),
            cors_origins: parse_origins(&env_or("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
