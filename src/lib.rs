//! copyforge - resilient marketing-content generation engine (EN/AR).
//!
//! Core pipeline: tool registry + prompt builder → Gemini transport with
//! bounded retry → response normalizer → orchestrator, with append-only
//! per-user history in SQLite.

pub mod cli;
pub mod config;
pub mod errors;
pub mod history;
pub mod identity;
pub mod normalize;
pub mod provider;
pub mod runner;
pub mod tools;
