use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use tracing::debug;

/// Load-once, path-keyed cache of prompt templates
///
/// Entries are never invalidated. Share one repository between pipelines with `Arc`.
#[derive(Debug, Default)]
pub struct PromptRepository {
    cache: RwLock<HashMap<PathBuf, Arc<str>>>,
}

impl PromptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against the current directory
    fn resolve(path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        Ok(cwd.join(path))
    }

    fn cached(&self, key: &Path) -> Option<Arc<str>> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(key).cloned())
    }

    /// Return the template at `path`, reading it from disk on first use
    pub async fn load(&self, path: &Path) -> Result<Arc<str>> {
        let key = Self::resolve(path)?;
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let content = tokio::fs::read_to_string(&key)
            .await
            .with_context(|| format!("Failed to read prompt template: {:?}", key))?;
        debug!("Loaded prompt template {:?} ({} bytes)", key, content.len());

        let content: Arc<str> = Arc::from(content);
        if let Ok(mut cache) = self.cache.write() {
            // a concurrent loader may have won; keep the first entry
            return Ok(cache.entry(key).or_insert(content).clone());
        }
        Ok(content)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_caches_by_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Classify carefully.").unwrap();

        let repo = PromptRepository::new();
        let first = repo.load(file.path()).await.unwrap();
        assert_eq!(&*first, "Classify carefully.");

        // later edits are not observed
        std::fs::write(file.path(), "changed").unwrap();
        let second = repo.load(file.path()).await.unwrap();
        assert_eq!(&*second, "Classify carefully.");
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = PromptRepository::new();
        let err = repo.load(&dir.path().join("nope.txt")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read prompt template"));
        assert!(repo.is_empty());
    }
}
