//! Common test fixtures and helpers
//!
//! Usage in test files:
//! ```ignore
//! mod common;
//! use common::TestVault;
//! ```

use std::fs;
use std::path::Path;

use tasq::TaskEngine;
use tempfile::TempDir;

/// A vault directory on disk with automatic cleanup, for CLI tests and
/// scan tests that need real files.
pub struct TestVault {
    dir: TempDir,
}

impl TestVault {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a markdown document with the given frontmatter under a
    /// vault-relative path, creating parent directories as needed.
    pub fn write_doc(&self, rel: &str, frontmatter: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&path, frontmatter_doc(frontmatter)).expect("Failed to write doc");
    }
}

/// A complete markdown document around the given frontmatter body.
pub fn frontmatter_doc(frontmatter: &str) -> String {
    format!("---\n{}\n---\n\nBody text.\n", frontmatter.trim())
}

/// A ready engine scanned from in-memory documents, each given as
/// (identity, frontmatter).
pub fn engine_from(docs: &[(&str, &str)]) -> TaskEngine {
    let mut engine = TaskEngine::new();
    engine.initial_scan(
        docs.iter()
            .map(|(id, fm)| (id.to_string(), frontmatter_doc(fm))),
    );
    engine
}
