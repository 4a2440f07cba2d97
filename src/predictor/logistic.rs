//! Binary logistic model loaded from a JSON export.
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "model_type": "logistic",
//!   "model_name": "signals_v1",
//!   "n_features": 8,
//!   "coefficients": [...8 weights...],
//!   "intercept": -0.25
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::ProbabilityModel;
use crate::error::PipelineError;
use crate::Result;

#[derive(Debug, Deserialize)]
struct LogisticModelJson {
    model_type: String,
    model_name: String,
    n_features: usize,
    #[serde(alias = "weights")]
    coefficients: Vec<f64>,
    #[serde(alias = "bias")]
    intercept: f64,
}

/// `sigmoid(w·x + b)`
#[derive(Debug, Clone)]
pub struct LogisticModel {
    name: String,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LogisticModel {
    pub fn new(name: impl Into<String>, coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            name: name.into(),
            coefficients,
            intercept,
        }
    }

    /// Load a model from a JSON file.
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::Model(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Load a model from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let parsed: LogisticModelJson = serde_json::from_str(json)?;

        if parsed.model_type != "logistic" {
            return Err(PipelineError::Model(format!(
                "Expected model_type 'logistic', got '{}'",
                parsed.model_type
            )));
        }

        if parsed.coefficients.len() != parsed.n_features {
            return Err(PipelineError::Model(format!(
                "Model has {} coefficients, expected {}",
                parsed.coefficients.len(),
                parsed.n_features
            )));
        }

        Ok(Self::new(
            format!("Logistic_{}", parsed.model_name),
            parsed.coefficients,
            parsed.intercept,
        ))
    }
}

impl ProbabilityModel for LogisticModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(PipelineError::Model(format!(
                "{} expects {} features, got {}",
                self.name,
                self.coefficients.len(),
                features.len()
            )));
        }

        let z = self
            .coefficients
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;

        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "model_type": "logistic",
            "model_name": "signals_v1",
            "n_features": 3,
            "coefficients": [1.0, -1.0, 0.5],
            "intercept": 0.0
        }"#
    }

    #[test]
    fn test_load_and_predict() {
        let model = LogisticModel::from_json_str(sample_json()).unwrap();
        assert_eq!(model.name(), "Logistic_signals_v1");
        assert_eq!(model.n_features(), 3);

        // z = 0 → 0.5
        let p = model.predict_proba(&[1.0, 1.0, 0.0]).unwrap();
        assert!((p - 0.5).abs() < 1e-12);

        // z = 2 → sigmoid(2)
        let p = model.predict_proba(&[2.0, 0.0, 0.0]).unwrap();
        assert!((p - 0.880_797_077_977_882_3).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_wrong_model_type() {
        let json = sample_json().replace("\"logistic\"", "\"tree\"");
        let err = LogisticModel::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("Expected model_type"));
    }

    #[test]
    fn test_rejects_dimension_mismatch() {
        let json = sample_json().replace("\"n_features\": 3", "\"n_features\": 4");
        assert!(LogisticModel::from_json_str(&json).is_err());

        let model = LogisticModel::from_json_str(sample_json()).unwrap();
        assert!(model.predict_proba(&[1.0]).is_err());
    }

    #[test]
    fn test_missing_file_is_model_error() {
        let err = LogisticModel::from_json("does/not/exist/model.json").unwrap_err();
        assert!(matches!(err, PipelineError::Model(_)));
    }
}
