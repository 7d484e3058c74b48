//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate lifecycle transitions into transactional operations.
//! - Keep callers decoupled from storage details.

pub mod scheduling_service;
