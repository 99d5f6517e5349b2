use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const PERFIL_ADMIN: &str = "admin";
pub const PERFIL_EDITOR: &str = "editor";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub nome: String,
    pub email: String,
    /// `"admin"` or `"editor"`.
    pub perfil: String,
    pub ativo: bool,
    pub created_at: DateTime<Utc>,
}
