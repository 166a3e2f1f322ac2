// src/core/engine.rs
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{anyhow, Result};
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace, warn};

use crate::config::{Config, CONFIG_FILE_NAME};
use crate::error::HdrdocError;
use super::{
    render_document, CodeParser, ContentDiffer, DeclarationTree, Document, IngestOutcome,
    ParsedHeader, RenderOptions, TreeBuilder,
};

/// Command line overrides for one `generate` run
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub inputs: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub include_private: bool,
    pub no_toc: bool,
    pub trim_path: Option<String>,
    pub emit_tree: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    Written,
    Unchanged,
}

/// Result of documenting one header
#[derive(Debug, Clone)]
pub struct UnitReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub status: UnitStatus,
    pub declarations: usize,
}

#[derive(Debug, Default)]
pub struct GenerateSummary {
    pub written: usize,
    pub unchanged: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl GenerateSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Main orchestration engine
pub struct Engine {
    config: Config,
}

impl Engine {
    /// Create a new engine instance
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        debug!("Loaded configuration: {:?}", config);
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Write a default configuration file
    pub async fn init(&self, path: Option<PathBuf>) -> Result<()> {
        let dir = path.unwrap_or_else(|| PathBuf::from("."));
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            warn!("{} already exists, leaving it untouched", config_path.display());
            return Ok(());
        }

        Config::default().save(&config_path)?;
        info!("Wrote {}", config_path.display());
        Ok(())
    }

    /// Generate one markdown document per input header.
    ///
    /// Command line overrides apply to this run only.
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateSummary> {
        let config = self.config_for(&request);

        let output_dir = config
            .output
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        validate_output_dir(&output_dir)?;

        if request.inputs.is_empty() {
            return Err(anyhow!("missing input"));
        }
        let files = CodeParser::new(&config.parsing)?.discover(&request.inputs)?;
        if files.is_empty() {
            warn!("No headers found in the given inputs");
        }

        info!("Documenting {} headers into {}", files.len(), output_dir.display());

        let mut summary = GenerateSummary::default();

        // Each output path has exactly one writer; later inputs mapping to a
        // claimed name fail instead of racing on the file.
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();
        let mut units = Vec::new();
        for file in files {
            let name = output_file_name(&file, config.output.trim_path_prefix.as_deref());
            if let Some(first) = claimed.get(&name) {
                let err = HdrdocError::OutputCollision {
                    path: file.clone(),
                    output: output_dir.join(&name),
                    first: first.clone(),
                };
                error!("Could not document {}: {}", file.display(), err);
                summary.failed.push((file, err.to_string()));
                continue;
            }
            units.push((file.clone(), output_dir.join(&name)));
            claimed.insert(name, file);
        }

        let config = Arc::new(config);
        let mut tasks = JoinSet::new();

        for (file, output) in units {
            let config = Arc::clone(&config);
            tasks.spawn_blocking(move || {
                let result = process_unit(&file, &config, &output);
                (file, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (file, result) = joined.map_err(|e| anyhow!("Worker task failed: {}", e))?;
            match result {
                Ok(report) => {
                    debug!(
                        "{} -> {} ({} declarations, {:?})",
                        report.source.display(),
                        report.output.display(),
                        report.declarations,
                        report.status
                    );
                    match report.status {
                        UnitStatus::Written => summary.written += 1,
                        UnitStatus::Unchanged => summary.unchanged += 1,
                    }
                }
                Err(e) => {
                    error!("Could not document {}: {}", file.display(), e);
                    summary.failed.push((file, e.to_string()));
                }
            }
        }
        summary.failed.sort();

        info!(
            "Done: {} written, {} unchanged, {} failed",
            summary.written,
            summary.unchanged,
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Loaded configuration with the request's overrides applied
    fn config_for(&self, request: &GenerateRequest) -> Config {
        let mut config = self.config.clone();
        if request.include_private {
            config.rendering.include_private = true;
        }
        if request.no_toc {
            config.rendering.build_toc = false;
        }
        if request.emit_tree {
            config.output.emit_tree = true;
        }
        if let Some(output) = &request.output {
            config.output.output_dir = Some(output.clone());
        }
        if let Some(prefix) = &request.trim_path {
            config.output.trim_path_prefix = Some(prefix.clone());
        }
        config
    }
}

fn validate_output_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Err(HdrdocError::FileSystem(format!(
            "output directory '{}' does not exist",
            dir.display()
        ))
        .into());
    }
    if !dir.is_dir() {
        return Err(HdrdocError::FileSystem(format!(
            "output path '{}' is not a directory",
            dir.display()
        ))
        .into());
    }
    Ok(())
}

/// Build the declaration tree of a parsed header and render it
pub fn document_header(parsed: &ParsedHeader, options: &RenderOptions) -> (Document, DeclarationTree) {
    let title = parsed.path.display().to_string();
    let mut builder = TreeBuilder::new(&parsed.lines);

    for event in parsed.events.iter().cloned() {
        debug!(
            "{} [{}]: {} {}",
            title, event.range, event.kind, event.qualified_name
        );
        if let IngestOutcome::Skipped(reason) = builder.ingest(event) {
            trace!("skipped: {:?}", reason);
        }
    }

    let tree = builder.finish();
    let document = render_document(&title, &tree, &parsed.lines, options);
    (document, tree)
}

/// Output file name for `path`: the optional prefix removed, path separators
/// flattened to `_`, and `.md` appended
pub fn output_file_name(path: &Path, trim_prefix: Option<&str>) -> String {
    let mut name = path.to_string_lossy().to_string();
    if let Some(prefix) = trim_prefix.filter(|prefix| !prefix.is_empty()) {
        if let Some(position) = name.find(prefix) {
            name.replace_range(position..position + prefix.len(), "");
        }
    }
    format!("{}.md", name.replace(['/', '\\'], "_"))
}

/// Parse, render and write one header to `output`. Runs on a blocking worker.
fn process_unit(path: &Path, config: &Config, output: &Path) -> crate::error::Result<UnitReport> {
    let mut parser = CodeParser::new(&config.parsing)?;
    let parsed = parser.parse_file(path)?;

    let options = RenderOptions::from(&config.rendering);
    let (document, tree) = document_header(&parsed, &options);
    let markdown = document.into_string();

    let differ = ContentDiffer::new();
    let status = if differ.has_content_changed(output, &markdown)? {
        std::fs::write(output, &markdown)?;
        UnitStatus::Written
    } else {
        UnitStatus::Unchanged
    };

    if config.output.emit_tree {
        let json = serde_json::to_string_pretty(&tree.snapshot())?;
        std::fs::write(output.with_extension("json"), json)?;
    }

    Ok(UnitReport {
        source: path.to_path_buf(),
        output: output.to_path_buf(),
        status,
        declarations: tree.len(),
    })
}
