use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HdrdocError, Result};

/// Default configuration file name written by `hdrdoc init`
pub const CONFIG_FILE_NAME: &str = "hdrdoc.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source file discovery and parsing
    pub parsing: ParsingConfig,

    /// Markdown rendering settings
    pub rendering: RenderConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// File extensions picked up when walking directories
    pub file_extensions: Vec<String>,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Whether to include private member declarations
    pub include_private: bool,

    /// Whether to emit a table of contents at the top of each document
    pub build_toc: bool,

    /// Info string used on fenced code blocks
    pub code_language: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the generated markdown (current directory if unset)
    pub output_dir: Option<PathBuf>,

    /// Prefix removed from input paths before building output file names
    pub trim_path_prefix: Option<String>,

    /// Also write the declaration tree as JSON next to each document
    pub emit_tree: bool,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            file_extensions: ["h", "hh", "hpp", "hxx", "h++", "inl"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_file_size: 1024 * 1024, // 1MB
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            include_private: false,
            build_toc: true,
            code_language: "cpp".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| HdrdocError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HdrdocError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Err(HdrdocError::Config(format!(
                        "configuration file '{}' does not exist",
                        p.as_ref().display()
                    )))
                }
            }
            None => {
                let candidates = [CONFIG_FILE_NAME, "Hdrdoc.toml", ".hdrdoc.toml"];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}
