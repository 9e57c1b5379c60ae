//! Core pipeline orchestration for LexForge.
//!
//! This crate ties the stage crates together: [`pipeline`] sequences
//! stages over documents and batches, and [`run`] chains collection →
//! processing → storage into an end-to-end run.

pub mod pipeline;
pub mod run;
