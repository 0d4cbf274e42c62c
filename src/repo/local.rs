//! Local model repository
//!
//! A local repository is a flat directory holding model artifacts
//! (`<signature>[-<checksum>].th|.ort|.onnx`) and optional bag definition
//! files (`<name>.json`, same schema as the bundled bag index entries).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, StemprepError};
use crate::repo::bag::BagDef;

/// File extensions recognized as model artifacts
const MODEL_EXTENSIONS: [&str; 3] = ["th", "ort", "onnx"];

/// Single-model lookups against a local directory
#[derive(Debug, Clone)]
pub struct LocalRepo {
    root: PathBuf,
    models: BTreeMap<String, PathBuf>,
}

impl LocalRepo {
    /// Scan a directory for model artifacts.
    ///
    /// The signature is the file stem up to the first hyphen. Two artifacts
    /// with the same signature are a fatal configuration error.
    pub fn scan(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(StemprepError::ConfigError(format!(
                "{} must exist and be a directory",
                dir.display()
            )));
        }

        let mut models = BTreeMap::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            if !MODEL_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let signature = stem.split('-').next().unwrap_or(stem).to_string();

            debug!("Local model {} at {}", signature, path.display());
            if models.insert(signature.clone(), path).is_some() {
                return Err(StemprepError::DuplicateSignature { signature });
            }
        }

        Ok(Self {
            root: dir.to_path_buf(),
            models,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.models.contains_key(signature)
    }

    /// Artifact path for a signature, if present
    pub fn artifact(&self, signature: &str) -> Option<&Path> {
        self.models.get(signature).map(|p| p.as_path())
    }

    /// Known signatures, in sorted order
    pub fn signatures(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// Parse the bag definition files alongside the artifacts
    pub fn bags(&self) -> Result<BTreeMap<String, BagDef>> {
        let mut bags = BTreeMap::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = std::fs::read_to_string(&path)?;
            let def: BagDef = serde_json::from_str(&text).map_err(|e| {
                StemprepError::ConfigError(format!("bag definition {}: {}", path.display(), e))
            })?;
            bags.insert(name.to_string(), def);
        }
        Ok(bags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_collects_signatures() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("abcd-1a2b3c4d.th"), b"x").expect("write");
        std::fs::write(dir.path().join("efgh.ort"), b"x").expect("write");
        std::fs::write(dir.path().join("notes.txt"), b"x").expect("write");

        let repo = LocalRepo::scan(dir.path()).expect("scan");
        assert_eq!(repo.signatures(), vec!["abcd".to_string(), "efgh".to_string()]);
        assert!(repo.artifact("abcd").is_some());
        assert!(!repo.contains("notes"));
    }

    #[test]
    fn test_duplicate_signature_in_directory_fails() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("abcd-one.th"), b"x").expect("write");
        std::fs::write(dir.path().join("abcd-two.onnx"), b"x").expect("write");

        let err = LocalRepo::scan(dir.path()).unwrap_err();
        assert!(matches!(err, StemprepError::DuplicateSignature { .. }));
    }

    #[test]
    fn test_missing_directory_is_config_error() {
        let err = LocalRepo::scan(Path::new("/no/such/repo")).unwrap_err();
        assert!(matches!(err, StemprepError::ConfigError(_)));
    }

    #[test]
    fn test_bag_files_are_parsed() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("abcd.th"), b"x").expect("write");
        std::fs::write(
            dir.path().join("mybag.json"),
            br#"{"models": ["abcd"], "weights": [2.0]}"#,
        )
        .expect("write");

        let repo = LocalRepo::scan(dir.path()).expect("scan");
        let bags = repo.bags().expect("bags");
        let def = bags.get("mybag").expect("mybag present");
        assert_eq!(def.models, vec!["abcd".to_string()]);
        assert_eq!(def.weights, Some(vec![2.0]));
    }

    #[test]
    fn test_malformed_bag_file_is_config_error() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("broken.json"), b"{not json").expect("write");

        let repo = LocalRepo::scan(dir.path()).expect("scan");
        assert!(matches!(repo.bags(), Err(StemprepError::ConfigError(_))));
    }
}
