//! Remote model manifest parsing
//!
//! The manifest is plain text, one artifact per line. Blank lines and `#`
//! comments are skipped, `root: <prefix>` sets a shared URL prefix for the
//! entries that follow, and every other line is `<signature>-<suffix>` where
//! the signature is the text before the first hyphen. Signatures must be
//! unique; a duplicate is a fatal configuration error at parse time, never a
//! silently-overwritten entry.

use std::collections::BTreeMap;

use crate::error::{Result, StemprepError};

/// Base URL all manifest entries are resolved against
pub const ROOT_URL: &str = "https://dl.fbaipublicfiles.com/demucs/";

/// Bundled manifest describing remotely downloadable models
const DEFAULT_MANIFEST: &str = include_str!("remote_files.txt");

/// Parsed remote index: signature -> download URL
#[derive(Debug, Clone)]
pub struct RemoteIndex {
    models: BTreeMap<String, String>,
}

impl RemoteIndex {
    /// Parse a manifest document
    pub fn parse(text: &str) -> Result<Self> {
        let mut root = String::new();
        let mut models = BTreeMap::new();

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(prefix) = line.strip_prefix("root:") {
                root = prefix.trim().to_string();
                continue;
            }

            let signature = line.split('-').next().unwrap_or(line).to_string();
            let url = format!("{}{}{}", ROOT_URL, root, line);

            if models.insert(signature.clone(), url).is_some() {
                return Err(StemprepError::DuplicateSignature { signature });
            }
        }

        Ok(Self { models })
    }

    /// Parse the manifest bundled with the crate
    pub fn bundled() -> Result<Self> {
        Self::parse(DEFAULT_MANIFEST)
    }

    /// Download URL for a signature, if present
    pub fn url(&self, signature: &str) -> Option<&str> {
        self.models.get(signature).map(|s| s.as_str())
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.models.contains_key(signature)
    }

    /// All known signatures, in sorted order
    pub fn signatures(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
