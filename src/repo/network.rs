//! Opaque inference capability for separation models
//!
//! The network layer treats a model as a black box that maps an audio buffer
//! to one buffer per stem. The concrete implementation runs through ONNX
//! Runtime and is gated behind the `stems` cargo feature; without it, loading
//! surfaces `OptionalDependencyMissing` with the exact rebuild command.
//!
//! Execution-provider selection goes through an explicit strategy table keyed
//! by detected platform capability rather than nested fallbacks.

use crate::error::{Result, StemprepError};
use crate::provider::Device;
use crate::repo::ResolvedModel;
use crate::types::StereoBuffer;

#[cfg(feature = "stems")]
use crate::repo::Artifact;

/// A loaded model: audio in, one buffer per stem out.
///
/// Implementations are owned by a single caller; interior synchronization
/// (if any) is the implementation's concern.
pub trait Network: Send {
    /// Stem names this network produces, in output order
    fn sources(&self) -> &[String];

    /// Run inference over the full mix
    fn apply(&self, mix: &StereoBuffer) -> Result<Vec<StereoBuffer>>;
}

/// A resolved model loaded and ready for inference
pub struct LoadedModel {
    pub signature: String,
    pub network: Box<dyn Network>,
}

/// A loaded single model or weighted ensemble
pub enum LoadedAny {
    Single(LoadedModel),
    Bag {
        name: String,
        models: Vec<LoadedModel>,
        weights: Vec<f32>,
        sources: Vec<String>,
    },
}

impl LoadedAny {
    /// Stem names produced by this model or bag
    pub fn sources(&self) -> &[String] {
        match self {
            LoadedAny::Single(model) => model.network.sources(),
            LoadedAny::Bag { sources, .. } => sources,
        }
    }

    /// Run inference; bag outputs are combined by weighted average
    pub fn apply(&self, mix: &StereoBuffer) -> Result<Vec<StereoBuffer>> {
        match self {
            LoadedAny::Single(model) => model.network.apply(mix),
            LoadedAny::Bag { models, weights, .. } => {
                let mut outputs = Vec::with_capacity(models.len());
                for model in models {
                    outputs.push(model.network.apply(mix)?);
                }
                crate::repo::bag::mix_stems(&outputs, weights)
            }
        }
    }
}

// =============================================================================
// Execution-provider strategy table
// =============================================================================

/// One concrete execution strategy and whether this build can use it
#[derive(Debug, Clone, Copy)]
pub struct EpStrategy {
    pub device: Device,
    pub name: &'static str,
    pub available: bool,
}

/// The strategy table, in preference order for `Device::Auto`
pub fn strategies() -> [EpStrategy; 3] {
    [
        EpStrategy {
            device: Device::CoreMl,
            name: "CoreML",
            available: cfg!(target_os = "macos"),
        },
        EpStrategy {
            device: Device::DirectMl,
            name: "DirectML",
            available: cfg!(target_os = "windows"),
        },
        EpStrategy {
            device: Device::Cpu,
            name: "CPU",
            available: true,
        },
    ]
}

/// Resolve a requested device to a concrete available strategy.
///
/// `Auto` picks the first available entry in the table; an explicitly
/// requested but unavailable device fails fast with the available options.
pub fn resolve_device(requested: Device) -> Result<Device> {
    let table = strategies();
    match requested {
        Device::Auto => table
            .iter()
            .find(|s| s.available)
            .map(|s| s.device)
            .ok_or_else(|| StemprepError::ConfigError("no execution provider available".to_string())),
        explicit => {
            let entry = table
                .iter()
                .find(|s| s.device == explicit)
                .ok_or_else(|| StemprepError::ConfigError(format!("unknown device {:?}", explicit)))?;
            if entry.available {
                Ok(explicit)
            } else {
                let available: Vec<&str> = table
                    .iter()
                    .filter(|s| s.available)
                    .map(|s| s.name)
                    .collect();
                Err(StemprepError::ConfigError(format!(
                    "execution provider {} is not available on this platform (available: {})",
                    entry.name,
                    available.join(", ")
                )))
            }
        }
    }
}

// =============================================================================
// Model loading
// =============================================================================

/// Load a resolved model or bag onto the requested device.
#[cfg(feature = "stems")]
pub fn load(resolved: &ResolvedModel, device: Device) -> Result<LoadedAny> {
    let device = resolve_device(device)?;
    match resolved {
        ResolvedModel::Single(spec) => Ok(LoadedAny::Single(load_single(
            &spec.signature,
            &spec.artifact,
            resolved.sources(),
            device,
        )?)),
        ResolvedModel::Bag {
            name,
            models,
            weights,
            sources,
        } => {
            let mut loaded = Vec::with_capacity(models.len());
            for spec in models {
                loaded.push(load_single(&spec.signature, &spec.artifact, sources, device)?);
            }
            Ok(LoadedAny::Bag {
                name: name.clone(),
                models: loaded,
                weights: weights.clone(),
                sources: sources.to_vec(),
            })
        }
    }
}

/// Without the `stems` feature there is no inference runtime to load into.
#[cfg(not(feature = "stems"))]
pub fn load(_resolved: &ResolvedModel, _device: Device) -> Result<LoadedAny> {
    Err(StemprepError::OptionalDependencyMissing {
        dependency: "onnxruntime (ort)".to_string(),
        hint: "cargo build --release --features stems".to_string(),
    })
}

#[cfg(feature = "stems")]
fn load_single(
    signature: &str,
    artifact: &Artifact,
    sources: &[String],
    device: Device,
) -> Result<LoadedModel> {
    let path = match artifact {
        Artifact::Local { path } => path.clone(),
        Artifact::Remote { url } => crate::repo::remote::fetch_artifact(url)?,
    };
    let network = ort_backend::OrtNetwork::load(&path, sources.to_vec(), device)?;
    Ok(LoadedModel {
        signature: signature.to_string(),
        network: Box::new(network),
    })
}

#[cfg(feature = "stems")]
mod ort_backend {
    use std::path::Path;
    use std::sync::Mutex;

    use ndarray::Array3;
    use ort::session::Session;
    use ort::value::Tensor;
    use tracing::{debug, info};

    use super::{Device, Network};
    use crate::error::{Result, StemprepError};
    use crate::types::StereoBuffer;

    /// ONNX Runtime backed network
    pub struct OrtNetwork {
        // ort sessions need &mut for run(); a Mutex gives the trait's &self
        // signature interior mutability, matching single-caller ownership
        session: Mutex<Session>,
        sources: Vec<String>,
    }

    impl OrtNetwork {
        pub fn load(path: &Path, sources: Vec<String>, device: Device) -> Result<Self> {
            let builder = Session::builder().map_err(|e| StemprepError::InferenceError {
                reason: format!("Failed to create session builder: {}", e),
            })?;

            let session = Self::with_execution_provider(builder, device)?
                .commit_from_file(path)
                .map_err(|e| StemprepError::InferenceError {
                    reason: format!("Failed to load model {}: {}", path.display(), e),
                })?;

            info!("Loaded model {} on {:?}", path.display(), device);
            Ok(Self {
                session: Mutex::new(session),
                sources,
            })
        }

        fn with_execution_provider(
            builder: ort::session::builder::SessionBuilder,
            device: Device,
        ) -> Result<ort::session::builder::SessionBuilder> {
            use ort::execution_providers::CPUExecutionProvider;

            let configured = match device {
                #[cfg(target_os = "macos")]
                Device::CoreMl => {
                    use ort::execution_providers::CoreMLExecutionProvider;
                    builder.with_execution_providers([
                        CoreMLExecutionProvider::default().build(),
                        CPUExecutionProvider::default().build(),
                    ])
                }
                #[cfg(target_os = "windows")]
                Device::DirectMl => {
                    use ort::execution_providers::DirectMLExecutionProvider;
                    builder.with_execution_providers([
                        DirectMLExecutionProvider::default().build(),
                        CPUExecutionProvider::default().build(),
                    ])
                }
                _ => builder.with_execution_providers([CPUExecutionProvider::default().build()]),
            };

            configured.map_err(|e| StemprepError::InferenceError {
                reason: format!("Failed to configure execution provider: {}", e),
            })
        }
    }

    impl Network for OrtNetwork {
        fn sources(&self) -> &[String] {
            &self.sources
        }

        fn apply(&self, mix: &StereoBuffer) -> Result<Vec<StereoBuffer>> {
            let mut session = self.session.lock().map_err(|_| StemprepError::InferenceError {
                reason: "Failed to acquire session lock".to_string(),
            })?;

            let frames = mix.len();
            let mut input = Array3::<f32>::zeros((1, 2, frames));
            input
                .slice_mut(ndarray::s![0, 0, ..])
                .assign(&ndarray::ArrayView1::from(&mix.left));
            input
                .slice_mut(ndarray::s![0, 1, ..])
                .assign(&ndarray::ArrayView1::from(&mix.right));

            let tensor = Tensor::from_array(input).map_err(|e| StemprepError::InferenceError {
                reason: format!("Failed to create input tensor: {}", e),
            })?;

            let input_name = session
                .inputs
                .first()
                .map(|i| i.name.clone())
                .ok_or_else(|| StemprepError::InferenceError {
                    reason: "Model has no input tensors defined".to_string(),
                })?;

            let outputs = session
                .run(ort::inputs![input_name.as_str() => tensor])
                .map_err(|e| StemprepError::InferenceError {
                    reason: format!("Inference failed: {}", e),
                })?;

            let output = outputs
                .iter()
                .next()
                .map(|(_, v)| v)
                .ok_or_else(|| StemprepError::InferenceError {
                    reason: "No output tensor from model".to_string(),
                })?;

            let (shape, data) =
                output
                    .try_extract_tensor::<f32>()
                    .map_err(|e| StemprepError::InferenceError {
                        reason: format!("Failed to extract output tensor: {}", e),
                    })?;

            let dims: Vec<i64> = shape.iter().copied().collect();
            debug!("Model output shape {:?}", dims);

            // Expect (batch=1, stems, channels=2, samples)
            if dims.len() != 4 || dims[0] != 1 || dims[2] != 2 || dims.iter().any(|d| *d < 0) {
                return Err(StemprepError::InferenceError {
                    reason: format!("Unexpected output tensor shape {:?}", dims),
                });
            }
            let stems = dims[1] as usize;
            let samples = dims[3] as usize;

            if stems != self.sources.len() {
                return Err(StemprepError::InferenceError {
                    reason: format!(
                        "Model produced {} stems, expected {} ({})",
                        stems,
                        self.sources.len(),
                        self.sources.join(", ")
                    ),
                });
            }

            let expected_len = stems
                .checked_mul(2)
                .and_then(|v| v.checked_mul(samples))
                .ok_or_else(|| StemprepError::InferenceError {
                    reason: format!("Output shape {:?} overflows", dims),
                })?;
            if data.len() != expected_len {
                return Err(StemprepError::InferenceError {
                    reason: format!(
                        "Output buffer length {} does not match shape {:?}",
                        data.len(),
                        dims
                    ),
                });
            }

            // Row-major layout: stem s occupies [s*2*N, (s+1)*2*N), left then right
            let mut result = Vec::with_capacity(stems);
            for s in 0..stems {
                let offset = s * 2 * samples;
                let left = data[offset..offset + samples].to_vec();
                let right = data[offset + samples..offset + 2 * samples].to_vec();
                result.push(StereoBuffer::new(left, right, mix.sample_rate));
            }
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_is_always_available() {
        assert_eq!(resolve_device(Device::Cpu).expect("cpu"), Device::Cpu);
    }

    #[test]
    fn test_auto_resolves_to_something() {
        let device = resolve_device(Device::Auto).expect("auto");
        assert_ne!(device, Device::Auto);
    }

    #[test]
    fn test_table_always_has_cpu_fallback() {
        assert!(strategies().iter().any(|s| s.device == Device::Cpu && s.available));
    }

    #[cfg(not(feature = "stems"))]
    #[test]
    fn test_load_without_feature_names_dependency() {
        use crate::repo::{Artifact, ModelSpec};
        let resolved = ResolvedModel::Single(ModelSpec {
            signature: "abcd".to_string(),
            artifact: Artifact::Remote {
                url: "https://example.com/abcd-model.th".to_string(),
            },
            sources: crate::types::default_sources(),
        });
        let err = load(&resolved, Device::Cpu).map(|_| ()).unwrap_err();
        assert!(matches!(err, StemprepError::OptionalDependencyMissing { .. }));
    }
}
