use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::llm_client::LlmGateway;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Pluggable gateway. Default: HttpLlmGateway. Tests swap in a scripted stub.
    pub llm: Arc<dyn LlmGateway>,
    pub config: Config,
}
