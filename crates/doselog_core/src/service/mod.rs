//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into journal-level APIs.
//! - Keep CLI and other front ends decoupled from storage details.

pub mod dose_service;
pub mod dose_stats;
