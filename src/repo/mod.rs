//! Pretrained-model repositories and resolution
//!
//! A model name resolves against up to three sources: a user-supplied local
//! directory of artifact files, the bundled remote index, and named bag
//! (ensemble) definitions. Resolution is metadata-only; the actual artifact
//! download and inference-runtime load happen later, so listing and
//! suggestion paths never touch the network.

pub mod bag;
pub mod local;
pub mod manifest;
pub mod network;
pub mod remote;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, StemprepError};
use crate::suggest::suggest;
use crate::types::default_sources;

pub use bag::{BagDef, BagOnlyRepo};
pub use local::LocalRepo;
pub use manifest::{RemoteIndex, ROOT_URL};
pub use network::{load, resolve_device, LoadedAny, LoadedModel, Network};
pub use remote::RemoteRepo;

/// Model requested when the user names none
pub const DEFAULT_MODEL: &str = "htdemucs";

/// Where a resolved model's weights live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Downloadable from the remote repository
    Remote { url: String },
    /// Already on disk in a local repository
    Local { path: PathBuf },
}

/// One resolved single model: its signature, where its artifact lives, and
/// the stems it produces
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub signature: String,
    pub artifact: Artifact,
    pub sources: Vec<String>,
}

/// The result of resolving a model name
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedModel {
    Single(ModelSpec),
    Bag {
        name: String,
        models: Vec<ModelSpec>,
        weights: Vec<f32>,
        sources: Vec<String>,
    },
}

impl ResolvedModel {
    /// The name this model resolves under
    pub fn name(&self) -> &str {
        match self {
            ResolvedModel::Single(spec) => &spec.signature,
            ResolvedModel::Bag { name, .. } => name,
        }
    }

    /// Stem names this model produces, in output order
    pub fn sources(&self) -> &[String] {
        match self {
            ResolvedModel::Single(spec) => &spec.sources,
            ResolvedModel::Bag { sources, .. } => sources,
        }
    }
}

/// Combined repository: local directory (optional), bundled remote index,
/// and merged bag definitions.
pub struct AnyModelRepo {
    local: Option<LocalRepo>,
    remote: RemoteRepo,
    bags: BTreeMap<String, BagDef>,
}

impl AnyModelRepo {
    /// Build the combined repository, merging bundled bag definitions with
    /// any found in the local directory.
    ///
    /// A bag name defined in both places is a configuration error rather
    /// than a silent override.
    pub fn new(local: Option<&Path>) -> Result<Self> {
        let remote = RemoteRepo::new(RemoteIndex::bundled()?);
        let local = match local {
            Some(dir) => Some(LocalRepo::scan(dir)?),
            None => None,
        };

        let bundled = BagOnlyRepo::bundled()?;
        let mut merged: BTreeMap<String, BagDef> = bundled
            .names()
            .into_iter()
            .filter_map(|n| bundled.get(&n).cloned().map(|d| (n, d)))
            .collect();

        if let Some(repo) = &local {
            for (name, def) in repo.bags()? {
                if merged.contains_key(&name) {
                    return Err(StemprepError::ResolutionAmbiguous {
                        name,
                        sources: vec!["local repository".to_string(), "remote repository".to_string()],
                    });
                }
                merged.insert(name, def);
            }
        }

        Ok(Self {
            local,
            remote,
            bags: merged,
        })
    }

    /// Resolve a name to a single model or a bag.
    ///
    /// Signatures are checked before bag names; a signature present in both
    /// the local and remote repositories is ambiguous and refuses to pick.
    pub fn resolve(&self, name: &str) -> Result<ResolvedModel> {
        if let Some(spec) = self.resolve_signature(name)? {
            debug!("Resolved '{}' as a single model ({:?})", name, spec.artifact);
            return Ok(ResolvedModel::Single(spec));
        }

        if let Some(def) = self.bags.get(name) {
            let sources = def.sources.clone().unwrap_or_else(default_sources);
            let mut models = Vec::with_capacity(def.models.len());
            for signature in &def.models {
                let mut spec = self.resolve_signature(signature)?.ok_or_else(|| {
                    StemprepError::ConfigError(format!(
                        "bag '{}' references unknown model signature '{}'",
                        name, signature
                    ))
                })?;
                spec.sources = sources.clone();
                models.push(spec);
            }
            let weights = bag::effective_weights(name, models.len(), def.weights.as_deref())?;
            debug!("Resolved '{}' as a bag of {} models", name, models.len());
            return Ok(ResolvedModel::Bag {
                name: name.to_string(),
                models,
                weights,
                sources,
            });
        }

        let available = self.list_models();
        let suggestions = suggest(name, &available);
        Err(StemprepError::ModelNotFound {
            name: name.to_string(),
            available,
            suggestions,
        })
    }

    /// Look up one signature across the local and remote sources
    fn resolve_signature(&self, signature: &str) -> Result<Option<ModelSpec>> {
        let local_path = self
            .local
            .as_ref()
            .and_then(|repo| repo.artifact(signature).map(Path::to_path_buf));
        let remote_url = self.remote.url(signature).map(str::to_string);

        match (local_path, remote_url) {
            (Some(_), Some(_)) => Err(StemprepError::ResolutionAmbiguous {
                name: signature.to_string(),
                sources: vec!["local repository".to_string(), "remote repository".to_string()],
            }),
            (Some(path), None) => Ok(Some(ModelSpec {
                signature: signature.to_string(),
                artifact: Artifact::Local { path },
                sources: default_sources(),
            })),
            (None, Some(url)) => Ok(Some(ModelSpec {
                signature: signature.to_string(),
                artifact: Artifact::Remote { url },
                sources: default_sources(),
            })),
            (None, None) => Ok(None),
        }
    }

    /// Every resolvable name: bag names plus signatures from both sources,
    /// sorted and deduplicated
    pub fn list_models(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bags.keys().cloned().collect();
        names.extend(self.remote.signatures());
        if let Some(repo) = &self.local {
            names.extend(repo.signatures());
        }
        names.sort();
        names.dedup();
        names
    }
}

/// Resolve one model name against the combined repository
pub fn get_model(name: &str, local: Option<&Path>) -> Result<ResolvedModel> {
    AnyModelRepo::new(local)?.resolve(name)
}

/// All resolvable model names
pub fn list_models(local: Option<&Path>) -> Result<Vec<String>> {
    Ok(AnyModelRepo::new(local)?.list_models())
}
