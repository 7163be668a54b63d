//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep the domain caller decoupled from storage details.

pub mod ordering_service;
