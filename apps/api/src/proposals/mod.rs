//! Proposals: manual CRUD with file attachments, and the AI technical proposal
//! (generation into sections, DOCX download).

pub mod handlers;
pub mod repo;
pub mod technical;
