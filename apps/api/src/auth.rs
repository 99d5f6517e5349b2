//! Caller identity.
//!
//! Credentials are issued and verified upstream; the gateway in front of this
//! API forwards the authenticated user id in `X-User-Id`. This module only
//! resolves that id to an active user and answers authorization questions.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::errors::AppError;
use crate::models::rfp::RfpRow;
use crate::models::user::{UserRow, PERFIL_ADMIN};
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub nome: String,
    pub perfil: String,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.perfil == PERFIL_ADMIN
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Permissão negada. Acesso restrito a administradores.".to_string(),
            ))
        }
    }

    /// Admins see every RFP; editors only their own.
    pub fn can_access(&self, rfp: &RfpRow) -> bool {
        self.is_admin() || rfp.user_id == Some(self.id)
    }
}

fn user_id_from_headers(headers: &HeaderMap) -> Result<i32, AppError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i32>().ok())
        .ok_or(AppError::Unauthorized)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = user_id_from_headers(&parts.headers)?;

        let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1 AND ativo")
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser {
            id: user.id,
            nome: user.nome,
            perfil: user.perfil,
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use chrono::Utc;

    use super::*;

    fn user(perfil: &str) -> CurrentUser {
        CurrentUser {
            id: 3,
            nome: "Ana".to_string(),
            perfil: perfil.to_string(),
        }
    }

    fn rfp_owned_by(user_id: Option<i32>) -> RfpRow {
        RfpRow {
            id: 1,
            nome: "Rede campus".to_string(),
            status: "Criado".to_string(),
            user_id,
            arquivo_url: None,
            resumo_ia: None,
            fabricante_escolhido_id: None,
            analise_vendors: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_id_header_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(user_id_from_headers(&headers), Err(AppError::Unauthorized)));

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("abc"));
        assert!(matches!(user_id_from_headers(&headers), Err(AppError::Unauthorized)));

        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" 42 "));
        assert_eq!(user_id_from_headers(&headers).unwrap(), 42);
    }

    #[test]
    fn test_require_admin() {
        assert!(user("admin").require_admin().is_ok());
        assert!(matches!(user("editor").require_admin(), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_can_access_owner_or_admin() {
        assert!(user("editor").can_access(&rfp_owned_by(Some(3))));
        assert!(!user("editor").can_access(&rfp_owned_by(Some(4))));
        assert!(!user("editor").can_access(&rfp_owned_by(None)));
        assert!(user("admin").can_access(&rfp_owned_by(Some(4))));
    }
}
