use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::{bail, Result};

use crate::core::{Engine, GenerateRequest};

#[derive(Parser)]
#[command(name = "hdrdoc")]
#[command(about = "Markdown API reference pages from C++ headers")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default hdrdoc.toml
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Generate one markdown document per header
    Generate {
        /// Header files or directories to document
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory for documentation
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also document private members
        #[arg(long)]
        include_private: bool,

        /// Skip the table of contents
        #[arg(long)]
        no_toc: bool,

        /// Prefix removed from input paths when naming output files
        #[arg(long, value_name = "PREFIX")]
        trim_path: Option<String>,

        /// Write the declaration tree as JSON next to each document
        #[arg(long)]
        emit_tree: bool,
    },
}

impl Cli {
    pub async fn execute(self, engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path } => engine.init(path).await,
            Commands::Generate {
                inputs,
                output,
                include_private,
                no_toc,
                trim_path,
                emit_tree,
            } => {
                let summary = engine
                    .generate(GenerateRequest {
                        inputs,
                        output,
                        include_private,
                        no_toc,
                        trim_path,
                        emit_tree,
                    })
                    .await?;

                if !summary.is_success() {
                    bail!("{} of the inputs could not be documented", summary.failed.len());
                }
                Ok(())
            }
        }
    }
}
