//! RFPs: CRUD, attached files and the analysis / vendor-matching pipelines.

pub mod analysis;
pub mod files;
pub mod handlers;
pub mod matching;
pub mod repo;
