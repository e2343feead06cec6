//! File-backed credential stores.
//!
//! One JSON document per scope under a root directory.

pub mod credentials_store;
pub mod format;

use std::path::{Path, PathBuf};

pub use credentials_store::{FileCredentialsStore, LoadReport};
pub use format::{StoreDocument, FORMAT_VERSION};

use crate::domain::models::credential::Scope;

/// Maps scopes to store files under a root directory.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `global.json`, `folder-<path>.json` or `item-<path>.json`, with the
    /// path escaped so it stays a single file name.
    pub fn path_for(&self, scope: &Scope) -> PathBuf {
        let name = match scope.path() {
            None => "global.json".to_string(),
            Some(path) => format!("{}-{}.json", scope.as_str(), escape(path)),
        };
        self.root.join(name)
    }

    /// Existing store files, sorted by name.
    pub fn discover(&self) -> std::io::Result<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let visible = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with('.'));
            if visible && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

fn escape(path: &str) -> String {
    path.replace('%', "%25").replace('/', "%2F")
}
