//! AST providers turning source text into declaration events.
//!
//! Each language gets its own module implementing [`DeclarationProvider`], so
//! the tree builder and renderer never depend on a concrete parser.

mod cpp;

pub use cpp::CppProvider;

use std::path::Path;

use crate::error::{HdrdocError, Result};
use super::DeclarationEvent;

/// Trait that all AST providers must implement
pub trait DeclarationProvider: Send {
    /// Parse source code into declaration events in depth-first document order
    fn parse(&mut self, content: &str, file_path: &Path) -> Result<Vec<DeclarationEvent>>;

    /// Get the file extensions this provider handles by default
    fn file_extensions(&self) -> &[&str];

    /// Get the language name
    fn language_name(&self) -> &str;
}

/// Create the provider registered for `language`
pub fn provider_for(language: &str) -> Result<Box<dyn DeclarationProvider>> {
    match language {
        "c" | "cpp" | "c++" => Ok(Box::new(CppProvider::new()?)),
        other => Err(HdrdocError::Parser(format!("Unsupported language: {}", other))),
    }
}
