//! Bag (ensemble) definitions and stem mixing
//!
//! A bag is an ordered collection of model signatures with per-model mixing
//! weights. Weights default to uniform, must be non-negative, and need not
//! sum to 1; normalization happens at mixing time. Empty and all-zero bags
//! are rejected at construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StemprepError};
use crate::types::StereoBuffer;

/// Bundled bag definitions (name -> constituents)
const DEFAULT_BAGS: &str = include_str!("remote_bags.json");

/// A named ensemble definition as stored in a repository source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BagDef {
    /// Constituent model signatures, in mixing order
    pub models: Vec<String>,
    /// Optional per-model weights; uniform when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f32>>,
    /// Optional extended stem vocabulary (defaults to the four sources)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

/// Named-ensemble lookups within one repository source
#[derive(Debug, Clone)]
pub struct BagOnlyRepo {
    bags: BTreeMap<String, BagDef>,
}

impl BagOnlyRepo {
    pub fn new(bags: BTreeMap<String, BagDef>) -> Self {
        Self { bags }
    }

    /// Bag definitions bundled with the crate
    pub fn bundled() -> Result<Self> {
        let bags: BTreeMap<String, BagDef> = serde_json::from_str(DEFAULT_BAGS)
            .map_err(|e| StemprepError::ConfigError(format!("bundled bag definitions: {}", e)))?;
        Ok(Self::new(bags))
    }

    pub fn get(&self, name: &str) -> Option<&BagDef> {
        self.bags.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bags.contains_key(name)
    }

    /// Bag names, in sorted order
    pub fn names(&self) -> Vec<String> {
        self.bags.keys().cloned().collect()
    }
}

/// Validate declared bag weights against the constituent count.
///
/// Returns the effective weight vector: uniform `1.0` per model when no
/// weights were declared. Rejects empty bags, length mismatches, negative
/// weights, and all-zero weight vectors.
pub fn effective_weights(name: &str, models: usize, declared: Option<&[f32]>) -> Result<Vec<f32>> {
    if models == 0 {
        return Err(StemprepError::ConfigError(format!(
            "bag '{}' has no constituent models",
            name
        )));
    }

    let weights = match declared {
        None => vec![1.0; models],
        Some(w) => {
            if w.len() != models {
                return Err(StemprepError::ConfigError(format!(
                    "bag '{}' declares {} weights for {} models",
                    name,
                    w.len(),
                    models
                )));
            }
            if w.iter().any(|v| *v < 0.0 || !v.is_finite()) {
                return Err(StemprepError::ConfigError(format!(
                    "bag '{}' has a negative or non-finite weight",
                    name
                )));
            }
            w.to_vec()
        }
    };

    if weights.iter().sum::<f32>() <= 0.0 {
        return Err(StemprepError::ConfigError(format!(
            "bag '{}' weights sum to zero",
            name
        )));
    }

    Ok(weights)
}

/// Combine per-model stem outputs by weighted average.
///
/// `outputs[m][s]` is model `m`'s buffer for stem `s`. All models must agree
/// on stem count, length, and sample rate. The total weight is guaranteed
/// positive by [`effective_weights`].
pub fn mix_stems(outputs: &[Vec<StereoBuffer>], weights: &[f32]) -> Result<Vec<StereoBuffer>> {
    let first = outputs.first().ok_or_else(|| StemprepError::InferenceError {
        reason: "bag produced no outputs to mix".to_string(),
    })?;

    if outputs.len() != weights.len() {
        return Err(StemprepError::InferenceError {
            reason: format!(
                "bag mixing got {} outputs for {} weights",
                outputs.len(),
                weights.len()
            ),
        });
    }

    let stems = first.len();
    let frames = first.first().map(|b| b.len()).unwrap_or(0);
    let sample_rate = first.first().map(|b| b.sample_rate).unwrap_or(44100);

    for (m, out) in outputs.iter().enumerate() {
        if out.len() != stems || out.iter().any(|b| b.len() != frames) {
            return Err(StemprepError::InferenceError {
                reason: format!("bag constituent {} produced mismatched stem shapes", m),
            });
        }
    }

    let total: f64 = weights.iter().map(|w| *w as f64).sum();

    let mut mixed = Vec::with_capacity(stems);
    for s in 0..stems {
        // Accumulate in f64 so large bags stay numerically stable
        let mut left = vec![0.0f64; frames];
        let mut right = vec![0.0f64; frames];

        for (out, weight) in outputs.iter().zip(weights.iter()) {
            let w = *weight as f64;
            if w == 0.0 {
                continue;
            }
            for (acc, sample) in left.iter_mut().zip(out[s].left.iter()) {
                *acc += w * *sample as f64;
            }
            for (acc, sample) in right.iter_mut().zip(out[s].right.iter()) {
                *acc += w * *sample as f64;
            }
        }

        mixed.push(StereoBuffer::new(
            left.into_iter().map(|v| (v / total) as f32).collect(),
            right.into_iter().map(|v| (v / total) as f32).collect(),
            sample_rate,
        ));
    }

    Ok(mixed)
}
