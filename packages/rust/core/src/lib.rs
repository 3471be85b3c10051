//! Core pipeline orchestration for docweave.
//!
//! This crate ties together loading, markdown parsing, navigation indexing
//! and HTML rendering into the end-to-end `build` workflow.

pub mod assembler;
pub mod index;
pub mod loader;
pub mod pipeline;
pub mod render;
pub mod search;
