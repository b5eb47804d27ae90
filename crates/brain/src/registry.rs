//! The brain's long-term memory: a directory of model artifacts.
//!
//! The registry only reads and deletes. New artifacts are written by
//! [`weapons::Weapon::save`], which never reuses a file name.

use std::fs;
use std::path::{Path, PathBuf};
use std::vec;
use tracing::{info, warn};

use weapons::{ModelArtifact, is_artifact_path, read_artifact};

use crate::error::{BrainError, Result};

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    memory_path: PathBuf,
}

impl ModelRegistry {
    /// Open the registry at `path`, creating the directory if needed.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let memory_path = path.into();
        fs::create_dir_all(&memory_path).map_err(|source| BrainError::Registry {
            path: memory_path.clone(),
            source,
        })?;
        Ok(Self { memory_path })
    }

    pub fn memory_path(&self) -> &Path {
        &self.memory_path
    }

    /// Artifact files in the directory, sorted by path.
    pub fn artifact_paths(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.memory_path).map_err(|source| BrainError::Registry {
            path: self.memory_path.clone(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_artifact_path(path))
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Number of artifact files currently remembered.
    pub fn len(&self) -> usize {
        self.artifact_paths().map_or(0, |paths| paths.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazily decode every artifact in memory.
    ///
    /// Files are read one at a time as the scan advances. A file that fails
    /// to decode is logged and skipped. An unreadable directory yields an
    /// empty scan.
    pub fn load_all_models(&self) -> ArtifactScan {
        let paths = match self.artifact_paths() {
            Ok(paths) => paths,
            Err(e) => {
                warn!(error = %e, "Cannot list memory directory");
                Vec::new()
            }
        };
        if paths.is_empty() {
            info!(path = %self.memory_path.display(), "Memory is empty");
        } else {
            info!(files = paths.len(), "Scanning memory files");
        }
        ArtifactScan {
            paths: paths.into_iter(),
        }
    }

    /// Delete every file in the memory directory.
    ///
    /// A failed deletion is logged and the rest continue. Returns the number
    /// of files removed.
    pub fn clear_memory(&self) -> usize {
        let entries = match fs::read_dir(&self.memory_path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.memory_path.display(), error = %e, "Cannot list memory directory");
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!(file = %path.display(), "Deleted");
                    removed += 1;
                }
                Err(e) => warn!(file = %path.display(), error = %e, "Failed to delete"),
            }
        }
        removed
    }
}

/// Single-pass iterator over decoded artifacts.
#[derive(Debug)]
pub struct ArtifactScan {
    paths: vec::IntoIter<PathBuf>,
}

impl Iterator for ArtifactScan {
    type Item = ModelArtifact;

    fn next(&mut self) -> Option<Self::Item> {
        for path in self.paths.by_ref() {
            match read_artifact(&path) {
                Ok(artifact) => return Some(artifact),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Corrupted memory file");
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.paths.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use types::Frame;
    use weapons::arsenal;

    fn saved_linear(dir: &Path) -> PathBuf {
        let x = Frame::with_names(["a"], vec![vec![0.0], vec![1.0], vec![2.0]]).unwrap();
        let mut weapon = arsenal::linear_regression();
        weapon.fit(&x, &[1.0, 3.0, 5.0]).unwrap();
        weapon.save(dir).unwrap().unwrap()
    }

    #[test]
    fn test_creates_directory_idempotently() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("memory");
        ModelRegistry::new(&path).unwrap();
        let registry = ModelRegistry::new(&path).unwrap();
        assert!(path.is_dir());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_scan_skips_corrupt_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();
        saved_linear(dir.path());
        fs::write(dir.path().join("broken.json"), "{ nope").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a model").unwrap();

        assert_eq!(registry.len(), 2);
        let names: Vec<String> = registry.load_all_models().map(|a| a.name).collect();
        assert_eq!(names, vec!["LinearRegression".to_string()]);
    }

    #[test]
    fn test_scan_is_lazy() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();
        saved_linear(dir.path());
        let scan = registry.load_all_models();
        // Deleting after the scan starts means the file is never read
        registry.clear_memory();
        assert_eq!(scan.count(), 0);
    }

    #[test]
    fn test_clear_memory() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();
        saved_linear(dir.path());
        saved_linear(dir.path());
        fs::write(dir.path().join("stray.txt"), "x").unwrap();

        assert_eq!(registry.clear_memory(), 3);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(registry.clear_memory(), 0);
    }
}
