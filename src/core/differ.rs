use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::Result;

/// Detects whether a generated document differs from what is already on disk
#[derive(Debug, Default)]
pub struct ContentDiffer;

impl ContentDiffer {
    pub fn new() -> Self {
        Self
    }

    /// SHA256 of `content` as lowercase hex
    pub fn hash(&self, content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// True when `path` is missing or holds something other than `content`
    pub fn has_content_changed(&self, path: &Path, content: &str) -> Result<bool> {
        if !path.exists() {
            return Ok(true);
        }
        let existing = std::fs::read_to_string(path)?;
        Ok(self.hash(&existing) != self.hash(content))
    }
}
