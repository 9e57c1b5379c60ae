//! Shared types, error model, and configuration for LexForge.
//!
//! This crate is the foundation depended on by all other LexForge crates.
//! It provides:
//! - [`LexForgeError`] — the unified error type
//! - Domain types ([`RawDocument`], [`ProcessingRecord`], [`RunId`])
//! - The stage capability model ([`DocumentStage`], [`BatchStage`], [`Stage`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod stage;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ProcessingConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{LexForgeError, Result};
pub use stage::{BatchStage, Disposition, DocumentStage, Stage, StagePhase};
pub use types::{
    CURRENT_SCHEMA_VERSION, INITIAL_IMPORT_STEP, ProcessingRecord, RawDocument, RunId,
};
