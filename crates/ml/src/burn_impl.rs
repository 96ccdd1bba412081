use burn::tensor::activation::softmax;
use burn::tensor::{Tensor, TensorData};
use burn_ndarray::{NdArray, NdArrayDevice};

use crate::features::FEATURE_DIMS;
use crate::linear::LinearWeights;
use crate::{FreshnessHead, ModelError};

type Backend = NdArray<f32>;

/// Linear head evaluated on burn's ndarray backend. Weights are stored
/// transposed (`[inputs, classes]`) so a single matmul yields the logits.
#[derive(Debug, Clone)]
pub struct BurnLinearHead {
    class_names: Vec<String>,
    weights_t: Vec<f32>,
    bias: Vec<f32>,
}

impl BurnLinearHead {
    pub fn new(weights: LinearWeights) -> Result<Self, ModelError> {
        weights.validate()?;

        let classes = weights.class_names.len();
        let mut weights_t = vec![0.0_f32; FEATURE_DIMS * classes];
        for (class_idx, row) in weights.weights.iter().enumerate() {
            for (input_idx, value) in row.iter().enumerate() {
                weights_t[input_idx * classes + class_idx] = *value;
            }
        }

        Ok(Self {
            class_names: weights.class_names,
            weights_t,
            bias: weights.bias,
        })
    }
}

impl FreshnessHead for BurnLinearHead {
    fn model_name(&self) -> &'static str {
        "burn-linear-freshness"
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn probabilities(&self, features: &[f32]) -> Result<Vec<f32>, ModelError> {
        if features.len() != FEATURE_DIMS {
            return Err(ModelError::Inference(format!(
                "expected {} features, got {}",
                FEATURE_DIMS,
                features.len()
            )));
        }

        let classes = self.class_names.len();
        let device = NdArrayDevice::default();

        let input = Tensor::<Backend, 2>::from_data(
            TensorData::new(features.to_vec(), [1, FEATURE_DIMS]),
            &device,
        );
        let weights = Tensor::<Backend, 2>::from_data(
            TensorData::new(self.weights_t.clone(), [FEATURE_DIMS, classes]),
            &device,
        );
        let bias =
            Tensor::<Backend, 2>::from_data(TensorData::new(self.bias.clone(), [1, classes]), &device);

        let probabilities = softmax(input.matmul(weights) + bias, 1);
        probabilities
            .into_data()
            .to_vec::<f32>()
            .map_err(|err| ModelError::Inference(format!("{err:?}")))
    }
}
