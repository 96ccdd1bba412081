use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::features::FEATURE_DIMS;
use crate::{FreshnessHead, ModelError};

/// Pretrained classifier head: one weight row and one bias per class over the
/// pooled image features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearWeights {
    pub class_names: Vec<String>,
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

impl LinearWeights {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "failed reading freshness model weights at {}",
                path.as_ref().display()
            )
        })?;
        let weights: Self =
            serde_json::from_str(&raw).context("invalid freshness model weights json")?;
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let classes = self.class_names.len();
        if classes == 0 {
            return Err(ModelError::InvalidWeights(
                "model declares zero classes".to_string(),
            ));
        }
        if self.weights.len() != classes || self.bias.len() != classes {
            return Err(ModelError::InvalidWeights(format!(
                "{} classes but {} weight rows and {} biases",
                classes,
                self.weights.len(),
                self.bias.len()
            )));
        }
        if let Some(row) = self.weights.iter().find(|row| row.len() != FEATURE_DIMS) {
            return Err(ModelError::InvalidWeights(format!(
                "weight row has {} inputs, expected {}",
                row.len(),
                FEATURE_DIMS
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LinearHead {
    weights: LinearWeights,
}

impl LinearHead {
    pub fn new(weights: LinearWeights) -> Result<Self, ModelError> {
        weights.validate()?;
        Ok(Self { weights })
    }
}

impl FreshnessHead for LinearHead {
    fn model_name(&self) -> &'static str {
        "linear-freshness"
    }

    fn class_names(&self) -> &[String] {
        &self.weights.class_names
    }

    fn probabilities(&self, features: &[f32]) -> Result<Vec<f32>, ModelError> {
        if features.len() != FEATURE_DIMS {
            return Err(ModelError::Inference(format!(
                "expected {} features, got {}",
                FEATURE_DIMS,
                features.len()
            )));
        }

        let logits = self
            .weights
            .weights
            .iter()
            .zip(&self.weights.bias)
            .map(|(row, bias)| {
                row.iter()
                    .zip(features)
                    .map(|(weight, value)| weight * value)
                    .sum::<f32>()
                    + bias
            })
            .collect::<Vec<_>>();

        Ok(softmax(&logits))
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps = logits.iter().map(|v| (v - max).exp()).collect::<Vec<_>>();
    let total = exps.iter().sum::<f32>();
    exps.into_iter().map(|v| v / total).collect()
}
