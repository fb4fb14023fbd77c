#![doc = "repo-scribe-core: core pipeline for repo-scribe."]

//! This crate holds the data model, the adapter contracts and the orchestrator that turns a
//! hosted repository into published documentation pages. Vendor-specific text generation and
//! publishing clients live in the `repo-scribe` crate.
//!
//! # Usage
//! Implement (or pick) one adapter per contract in [`contract`], then call
//! [`pipeline::document_repository`] and convert the returned state with [`RunResult::from`].

pub mod config;
pub mod contract;
pub mod error;
pub mod github;
pub mod harness;
pub mod pipeline;
pub mod result;
pub mod state;

pub use pipeline::{document_repository, DocumentationPipeline};
pub use result::RunResult;
pub use state::{RunState, RunStatus};
