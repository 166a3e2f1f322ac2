use std::collections::HashSet;
use std::path::{Path, PathBuf};
use ignore::WalkBuilder;
use tracing::debug;

use crate::config::ParsingConfig;
use crate::error::{HdrdocError, Result};
use super::languages::{provider_for, DeclarationProvider};
use super::{DeclarationEvent, LineStore};

/// A source file reduced to its lines and declaration events
#[derive(Debug, Clone)]
pub struct ParsedHeader {
    /// File path as given on the command line or found while walking
    pub path: PathBuf,

    /// Raw source lines
    pub lines: LineStore,

    /// Declarations in depth-first document order
    pub events: Vec<DeclarationEvent>,
}

/// Reads source files and feeds them to a declaration provider
pub struct CodeParser {
    config: ParsingConfig,
    provider: Box<dyn DeclarationProvider>,
}

impl CodeParser {
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        Ok(Self::with_provider(config, provider_for("cpp")?))
    }

    pub fn with_provider(config: &ParsingConfig, provider: Box<dyn DeclarationProvider>) -> Self {
        Self {
            config: config.clone(),
            provider,
        }
    }

    /// Expand the given inputs into the list of files to document.
    ///
    /// Files are taken as given. Directories are walked (respecting ignore
    /// files) and filtered by the configured extensions, or by the provider's
    /// own list when none are configured. Repeated inputs are kept once, at
    /// their first position.
    pub fn discover(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input in inputs {
            if input.is_file() {
                files.push(input.clone());
                continue;
            }
            if !input.is_dir() {
                return Err(HdrdocError::FileSystem(format!(
                    "input '{}' does not exist",
                    input.display()
                )));
            }

            let walker = WalkBuilder::new(input)
                .hidden(false)
                .git_ignore(true)
                .build();

            let mut found = Vec::new();
            for entry in walker {
                let entry = entry.map_err(|e| HdrdocError::FileSystem(e.to_string()))?;
                let path = entry.path();
                if path.is_file() && self.has_header_extension(path) {
                    found.push(path.to_path_buf());
                }
            }
            found.sort();
            debug!("Found {} headers under {}", found.len(), input.display());
            files.extend(found);
        }

        let mut seen = HashSet::new();
        files.retain(|file| seen.insert(file.clone()));
        Ok(files)
    }

    /// Parse a single source file
    pub fn parse_file<P: AsRef<Path>>(&mut self, file_path: P) -> Result<ParsedHeader> {
        let path = file_path.as_ref();

        let metadata = std::fs::metadata(path)?;
        if metadata.len() as usize > self.config.max_file_size {
            return Err(HdrdocError::FileTooLarge {
                path: path.to_path_buf(),
                limit: self.config.max_file_size,
            });
        }

        let content = std::fs::read_to_string(path)?;
        self.parse_source(path, &content)
    }

    /// Parse already loaded source text.
    ///
    /// Preprocessor lines are dropped before parsing and line numbering, so a
    /// comment above `#ifdef`-guarded code still documents the declaration.
    pub fn parse_source(&mut self, path: &Path, content: &str) -> Result<ParsedHeader> {
        let kept: Vec<String> = content
            .lines()
            .filter(|line| !line.trim_start_matches([' ', '\t']).starts_with('#'))
            .map(str::to_string)
            .collect();
        let mut source = kept.join("\n");
        source.push('\n');

        let events = self.provider.parse(&source, path)?;
        debug!(
            "{} parser reported {} declarations in {}",
            self.provider.language_name(),
            events.len(),
            path.display()
        );

        Ok(ParsedHeader {
            path: path.to_path_buf(),
            lines: LineStore::new(kept),
            events,
        })
    }

    /// Determine if a file should be picked up while walking a directory
    fn has_header_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        if self.config.file_extensions.is_empty() {
            self.provider
                .file_extensions()
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        } else {
            self.config
                .file_extensions
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        }
    }
}
