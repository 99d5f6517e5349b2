//! Bill of materials per RFP: manual CRUD plus AI generation.

pub mod generation;
pub mod handlers;
pub mod prompts;
pub mod repo;
