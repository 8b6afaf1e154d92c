//! calibre-filter: language and tag scoped views over a Calibre library.
//!
//! The heart of this crate is [`CalibreFilter`], which turns an optional
//! language ID and an optional tag ID into a SQL source that stands in for
//! the `books` table of a Calibre `metadata.db`. Catalog queries splice
//! that source in place of `books` and bind the `:lang` / `:tag`
//! placeholders it references.
//!
//! # Features
//!
//! - Placeholder-only filter expressions (no inlined values)
//! - Read-only Calibre store: paging, recent books, title search
//! - Language and tag lookups for resolving selectors
//! - TOML or JSON configuration with numeric error codes

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Calibre library access and filtering.
pub mod calibre;
/// Configuration and CLI.
pub mod config;
/// Error types.
pub mod error;


pub use calibre::{CalibreBook, CalibreFilter, CalibreLibrary, compose};
pub use config::{Cli, Command, Config};
pub use error::{AppError, ErrorCode, Result};
