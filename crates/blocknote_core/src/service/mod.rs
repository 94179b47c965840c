//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, editor and media calls into use-case level APIs.
//! - Keep UI layers decoupled from storage details.

pub mod export;
pub mod note_service;
