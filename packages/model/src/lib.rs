#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pre-trained regression pipeline.
//!
//! The model is trained elsewhere (a scikit-learn `StandardScaler` followed
//! by an `MLPRegressor`) and exported as JSON: the input feature names in
//! training order, the scaler statistics, and one weight matrix and bias
//! vector per dense layer. This crate loads that export, checks every
//! shape once at startup, and runs the forward pass.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Errors that can occur while loading or running the pipeline.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Reading the model file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The model file is not valid JSON for a pipeline.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configured model file does not exist.
    #[error("Model file not found at {}", .path.display())]
    MissingFile {
        /// Expected location.
        path: PathBuf,
    },

    /// The exported weights do not fit together.
    #[error("Invalid model shape: {message}")]
    InvalidShape {
        /// Description of the mismatch.
        message: String,
    },

    /// The input vector has the wrong number of features.
    #[error("Expected {expected} input features, got {actual}")]
    InputLength {
        /// Number of features the pipeline was trained on.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// A non-finite number appeared during inference.
    #[error("Non-finite value in {stage}")]
    NonFinite {
        /// Where the value appeared (`input` or `output`).
        stage: &'static str,
    },
}

/// A fitted model that maps one feature row to a scalar.
pub trait Regressor: Send + Sync {
    /// Input feature names, in the order `predict` expects them.
    fn feature_names(&self) -> &[String];

    /// Predicts the target for one feature row.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the row does not match the model's inputs
    /// or the computation produces a non-finite value.
    fn predict(&self, input: &[f64]) -> Result<f64, ModelError>;
}

/// Neuron activation function.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Activation {
    /// `f(x) = x`
    #[default]
    Identity,
    /// `f(x) = max(0, x)`
    Relu,
    /// Hyperbolic tangent.
    Tanh,
    /// Logistic sigmoid.
    Logistic,
}

impl Activation {
    fn apply(self, values: &mut [f64]) {
        for v in values {
            *v = match self {
                Self::Identity => *v,
                Self::Relu => v.max(0.0),
                Self::Tanh => v.tanh(),
                Self::Logistic => 1.0 / (1.0 + (-*v).exp()),
            };
        }
    }
}

/// Per-feature standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Training mean per feature.
    pub mean: Vec<f64>,
    /// Training standard deviation per feature.
    pub scale: Vec<f64>,
}

/// A fully connected layer. `weights[i][j]` connects input `i` to output `j`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weight matrix, one row per input.
    pub weights: Vec<Vec<f64>>,
    /// Bias per output.
    pub bias: Vec<f64>,
    /// Activation applied to the layer output.
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut out = self.bias.clone();
        for (x, row) in input.iter().zip(&self.weights) {
            for (o, w) in out.iter_mut().zip(row) {
                *o += x * w;
            }
        }
        self.activation.apply(&mut out);
        out
    }
}

/// A scaler plus a stack of dense layers ending in a single output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Optional identifier of the exported model.
    #[serde(default)]
    pub name: Option<String>,
    /// Input feature names in training order.
    pub features: Vec<String>,
    /// Input standardization, if the pipeline had one.
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    /// Dense layers, input to output.
    pub layers: Vec<DenseLayer>,
}

impl Pipeline {
    /// Loads and validates a pipeline export.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::MissingFile`] if the file does not exist, or a
    /// JSON or shape error if the export is malformed.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::MissingFile {
                path: path.to_path_buf(),
            });
        }

        let body = std::fs::read_to_string(path)?;
        let pipeline = Self::from_json_str(&body)?;

        log::info!(
            "Loaded model {} from {} ({} features, {} layers)",
            pipeline.name.as_deref().unwrap_or("<unnamed>"),
            path.display(),
            pipeline.features.len(),
            pipeline.layers.len()
        );
        Ok(pipeline)
    }

    /// Parses and validates a pipeline export from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a JSON or shape error if the export is malformed.
    pub fn from_json_str(body: &str) -> Result<Self, ModelError> {
        let pipeline: Self = serde_json::from_str(body)?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// A linear regression: one identity layer, no scaler.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidShape`] if the coefficient count does
    /// not match the feature count.
    pub fn linear(
        features: &[&str],
        coefficients: &[f64],
        intercept: f64,
    ) -> Result<Self, ModelError> {
        let pipeline = Self {
            name: Some("linear".to_string()),
            features: features.iter().map(ToString::to_string).collect(),
            scaler: None,
            layers: vec![DenseLayer {
                weights: coefficients.iter().map(|c| vec![*c]).collect(),
                bias: vec![intercept],
                activation: Activation::Identity,
            }],
        };
        pipeline.validate()?;
        Ok(pipeline)
    }

    fn validate(&self) -> Result<(), ModelError> {
        let n = self.features.len();
        if n == 0 {
            return Err(shape_error("model declares no input features"));
        }

        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err(shape_error(format!(
                    "scaler has {} means and {} scales for {n} features",
                    scaler.mean.len(),
                    scaler.scale.len()
                )));
            }
            if scaler.mean.iter().any(|m| !m.is_finite())
                || scaler.scale.iter().any(|s| !s.is_finite() || *s == 0.0)
            {
                return Err(shape_error("scaler statistics must be finite and non-zero"));
            }
        }

        if self.layers.is_empty() {
            return Err(shape_error("model has no layers"));
        }

        let mut width = n;
        for (i, layer) in self.layers.iter().enumerate() {
            let outputs = layer.bias.len();
            if outputs == 0 {
                return Err(shape_error(format!("layer {i} has no outputs")));
            }
            if layer.weights.len() != width {
                return Err(shape_error(format!(
                    "layer {i} expects {} inputs, previous width is {width}",
                    layer.weights.len()
                )));
            }
            if let Some(row) = layer.weights.iter().find(|row| row.len() != outputs) {
                return Err(shape_error(format!(
                    "layer {i} has a weight row of width {} for {outputs} outputs",
                    row.len()
                )));
            }
            if layer
                .weights
                .iter()
                .flatten()
                .chain(&layer.bias)
                .any(|w| !w.is_finite())
            {
                return Err(shape_error(format!("layer {i} has non-finite weights")));
            }
            width = outputs;
        }

        if width != 1 {
            return Err(shape_error(format!(
                "final layer has {width} outputs, expected 1"
            )));
        }
        Ok(())
    }
}

fn shape_error(message: impl Into<String>) -> ModelError {
    ModelError::InvalidShape {
        message: message.into(),
    }
}

impl Regressor for Pipeline {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, input: &[f64]) -> Result<f64, ModelError> {
        if input.len() != self.features.len() {
            return Err(ModelError::InputLength {
                expected: self.features.len(),
                actual: input.len(),
            });
        }
        if input.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite { stage: "input" });
        }

        let mut activations: Vec<f64> = match &self.scaler {
            Some(scaler) => input
                .iter()
                .zip(scaler.mean.iter().zip(&scaler.scale))
                .map(|(x, (mean, scale))| (x - mean) / scale)
                .collect(),
            None => input.to_vec(),
        };

        for layer in &self.layers {
            activations = layer.forward(&activations);
        }

        match activations.first() {
            Some(y) if y.is_finite() => Ok(*y),
            _ => Err(ModelError::NonFinite { stage: "output" }),
        }
    }
}
