pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::state::AppState;
use crate::{bom, prompts, proposals, providers, rfps, scopes, users, vendors};

/// GET /
async fn banner() -> Json<Value> {
    Json(json!({ "msg": "RFP Automation API online" }))
}

/// Body cap for the multipart routes, replacing axum's 2 MiB default.
fn upload_limit(config: &Config) -> DefaultBodyLimit {
    DefaultBodyLimit::max(config.max_upload_bytes)
}

pub fn build_router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);
    let limit = upload_limit(&state.config);

    Router::new()
        .route("/", get(banner))
        .route("/health", get(health::health_handler))
        // RFPs
        .route(
            "/rfps",
            get(rfps::handlers::handle_list_rfps).post(rfps::handlers::handle_create_rfp),
        )
        .route(
            "/rfps/:id",
            get(rfps::handlers::handle_get_rfp)
                .put(rfps::handlers::handle_update_rfp)
                .delete(rfps::handlers::handle_delete_rfp),
        )
        .route("/rfps/:id/analyze", post(rfps::handlers::handle_analyze))
        .route(
            "/rfps/:id/vendors-matching",
            get(rfps::handlers::handle_vendors_matching),
        )
        .route(
            "/rfps/:id/save-vendor-analysis",
            post(rfps::handlers::handle_save_vendor_analysis),
        )
        .route(
            "/rfps/:id/set-fabricante-escolhido",
            post(rfps::handlers::handle_set_chosen_vendor),
        )
        // RFP files
        .route(
            "/rfps/:id/files",
            get(rfps::files::handle_list_files)
                .post(rfps::files::handle_upload_file)
                .layer(limit.clone()),
        )
        .route("/rfps/:id/list", get(rfps::files::handle_list_files))
        .route(
            "/rfps/:id/upload",
            post(rfps::files::handle_upload_file).layer(limit.clone()),
        )
        .route(
            "/rfps/:id/files/:file_id",
            axum::routing::delete(rfps::files::handle_delete_file),
        )
        .route(
            "/rfps/:id/files/:file_id/download",
            get(rfps::files::handle_download_file),
        )
        .route("/rfps/:id/download", get(rfps::files::handle_download_legacy))
        // Vendors
        .route(
            "/vendors",
            get(vendors::handlers::handle_list_vendors).post(vendors::handlers::handle_create_vendor),
        )
        .route(
            "/vendors/:id",
            get(vendors::handlers::handle_get_vendor)
                .put(vendors::handlers::handle_update_vendor)
                .delete(vendors::handlers::handle_delete_vendor),
        )
        // Bill of materials
        .route(
            "/bom/rfp/:id",
            get(bom::handlers::handle_list_items).post(bom::handlers::handle_create_item),
        )
        .route("/bom/rfp/:id/generate", post(bom::handlers::handle_generate))
        .route(
            "/bom/item/:item_id",
            get(bom::handlers::handle_get_item)
                .put(bom::handlers::handle_update_item)
                .delete(bom::handlers::handle_delete_item),
        )
        // Service scope
        .route(
            "/escopos/rfp/:id",
            get(scopes::handlers::handle_list_scopes).post(scopes::handlers::handle_create_scope),
        )
        .route(
            "/escopos/rfp/:id/sugerir",
            post(scopes::handlers::handle_suggest_scope),
        )
        .route(
            "/escopos/:id",
            put(scopes::handlers::handle_update_scope).delete(scopes::handlers::handle_delete_scope),
        )
        // Proposals
        .route(
            "/propostas/rfp/:id",
            get(proposals::handlers::handle_list_proposals)
                .post(proposals::handlers::handle_create_proposal),
        )
        .route(
            "/propostas/item/:id",
            get(proposals::handlers::handle_get_proposal)
                .put(proposals::handlers::handle_update_proposal)
                .delete(proposals::handlers::handle_delete_proposal),
        )
        .route(
            "/propostas/item/:id/upload_pdf",
            post(proposals::handlers::handle_upload_pdf).layer(limit.clone()),
        )
        .route(
            "/propostas/item/:id/upload_docx",
            post(proposals::handlers::handle_upload_docx).layer(limit),
        )
        .route(
            "/propostas_tecnicas/rfp/:id/gerar",
            post(proposals::handlers::handle_generate_technical),
        )
        .route(
            "/propostas_tecnicas/rfp/:id/download",
            get(proposals::handlers::handle_download_technical),
        )
        // Admin
        .route(
            "/admin/config/providers",
            get(providers::handlers::handle_list_providers)
                .post(providers::handlers::handle_create_provider),
        )
        .route(
            "/admin/config/providers/:id",
            put(providers::handlers::handle_update_provider),
        )
        .route(
            "/admin/config/providers/:id/select",
            patch(providers::handlers::handle_select_provider),
        )
        .route(
            "/admin/config/prompts",
            get(prompts::handlers::handle_list_prompts).post(prompts::handlers::handle_create_prompt),
        )
        .route(
            "/admin/config/prompts/by_name/:name",
            get(prompts::handlers::handle_get_prompt_by_name),
        )
        .route(
            "/admin/config/prompts/:id",
            get(prompts::handlers::handle_get_prompt)
                .put(prompts::handlers::handle_update_prompt)
                .delete(prompts::handlers::handle_delete_prompt),
        )
        .route(
            "/users",
            get(users::handlers::handle_list_users).post(users::handlers::handle_create_user),
        )
        .route("/users/:id", axum::routing::delete(users::handlers::handle_delete_user))
        .nest_service("/uploaded_rfps", uploads)
        .with_state(state)
}
