mod features;
mod freshness;
mod generator;
mod linear;

#[cfg(feature = "burn-ml")]
mod burn_impl;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tracing::info;

pub use features::{decode_image, extract_features, FEATURE_DIMS};
pub use freshness::{FreshnessReport, PredictionPayload, Quality, DEFAULT_CLASS_NAMES};
pub use generator::{
    extract_output_text, Generator, HttpGeneratorConfig, HttpTextGenerator, TextGenerator,
    DEFAULT_MAX_OUTPUT_TOKENS,
};
pub use linear::{LinearHead, LinearWeights};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("could not decode image: {0}")]
    Decode(String),
    #[error("invalid model weights: {0}")]
    InvalidWeights(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Maps pooled image features to a probability per class.
pub trait FreshnessHead: Send + Sync {
    fn model_name(&self) -> &'static str;
    fn class_names(&self) -> &[String];
    fn probabilities(&self, features: &[f32]) -> Result<Vec<f32>, ModelError>;
}

#[derive(Clone)]
pub struct FreshnessModel {
    head: Arc<dyn FreshnessHead>,
    pub burn_enabled: bool,
}

impl FreshnessModel {
    pub fn from_weights(weights: LinearWeights) -> Result<Self, ModelError> {
        #[cfg(feature = "burn-ml")]
        {
            let head = burn_impl::BurnLinearHead::new(weights)?;
            return Ok(Self {
                head: Arc::new(head),
                burn_enabled: true,
            });
        }

        #[cfg(not(feature = "burn-ml"))]
        {
            let head = LinearHead::new(weights)?;
            Ok(Self {
                head: Arc::new(head),
                burn_enabled: false,
            })
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let weights = LinearWeights::from_json_file(path.as_ref())?;
        let model = Self::from_weights(weights)?;
        info!(
            path = %path.as_ref().display(),
            model = model.model_name(),
            classes = model.class_names().len(),
            "freshness model loaded"
        );
        Ok(model)
    }

    pub fn model_name(&self) -> &'static str {
        self.head.model_name()
    }

    pub fn class_names(&self) -> &[String] {
        self.head.class_names()
    }

    /// Decodes an uploaded image and scores it. CPU-bound; run it off the
    /// async executor.
    pub fn classify_image(&self, bytes: &[u8]) -> Result<FreshnessReport, ModelError> {
        let image = decode_image(bytes)?;
        let features = extract_features(&image);
        let probabilities = self.head.probabilities(&features)?;
        FreshnessReport::from_probabilities(self.head.class_names(), &probabilities)
    }
}
