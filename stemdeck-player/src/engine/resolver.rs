//! Maps manifest file names to readable sources

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Resolves a manifest file name to a decodable file
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, filename: &str) -> Result<PathBuf>;
}

/// Resolves names against a single asset directory
///
/// Names must be relative and stay inside the directory.
#[derive(Debug, Clone)]
pub struct BundleResolver {
    root: PathBuf,
}

impl BundleResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetResolver for BundleResolver {
    fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let not_found = || Error::ResourceNotFound {
            filename: filename.to_string(),
        };

        let relative = Path::new(filename);
        if filename.is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(not_found());
        }

        let path = self.root.join(relative);
        if path.is_file() {
            Ok(path)
        } else {
            Err(not_found())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bs_10.wav"), b"x").unwrap();

        let resolver = BundleResolver::new(dir.path());
        assert_eq!(
            resolver.resolve("bs_10.wav").unwrap(),
            dir.path().join("bs_10.wav")
        );
    }

    #[test]
    fn test_names_with_spaces_resolve() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Audio 10_07.wav"), b"x").unwrap();

        let resolver = BundleResolver::new(dir.path());
        assert!(resolver.resolve("Audio 10_07.wav").is_ok());
    }

    #[test]
    fn test_missing_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = BundleResolver::new(dir.path());

        match resolver.resolve("syn_34.wav") {
            Err(Error::ResourceNotFound { filename }) => assert_eq!(filename, "syn_34.wav"),
            other => panic!("Expected ResourceNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_escaping_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("stems")).unwrap();
        std::fs::write(dir.path().join("secret.wav"), b"x").unwrap();

        let resolver = BundleResolver::new(dir.path().join("stems"));
        assert!(resolver.resolve("../secret.wav").is_err());
        assert!(resolver.resolve("").is_err());
        assert!(resolver.resolve("/etc/passwd").is_err());
    }

    #[test]
    fn test_directory_is_not_a_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        let resolver = BundleResolver::new(dir.path());
        assert!(resolver.resolve("nested").is_err());
    }
}
