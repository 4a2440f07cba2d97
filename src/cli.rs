//! Command-line front ends
//!
//! The `optimizer` and `predict` binaries are thin wrappers over these
//! functions: stdout carries exactly one JSON object, the exit status says
//! whether it is a result or an error.

use serde::Serialize;
use serde_json::Value;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::PipelineError;
use crate::models::{OutputPayload, Prediction, RawRecord};
use crate::pipeline::{render, SignalPipeline};
use crate::predictor::{LogisticModel, SignalPredictor};
use crate::validator::batch_from_value;
use crate::Result;

/// One JSON object for stdout plus the outcome
#[derive(Debug, Clone, PartialEq)]
pub struct CliOutput {
    pub payload: Value,
    pub success: bool,
}

impl CliOutput {
    fn from_payload<T: Serialize>(payload: &T, success: bool) -> Self {
        match serde_json::to_value(payload) {
            Ok(payload) => Self { payload, success },
            Err(e) => Self::failure(&PipelineError::from(e)),
        }
    }

    fn failure(error: &PipelineError) -> Self {
        Self {
            payload: serde_json::json!({ "error": error.to_string() }),
            success: false,
        }
    }

    /// Print the payload and map the outcome to a process exit code
    pub fn emit(&self) -> ExitCode {
        println!("{}", self.payload);

        if self.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Parse the optimizer's stdin; anything but a JSON array is rejected.
pub fn parse_records(raw: &str) -> Result<Vec<RawRecord>> {
    let value: Value = serde_json::from_str(raw)?;
    batch_from_value(value)
}

/// Optimizer entry point over raw stdin text
pub fn optimize(raw: &str) -> CliOutput {
    let records = match parse_records(raw) {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "Failed to read input");
            return CliOutput::from_payload(
                &OutputPayload::Error {
                    error: format!("Failed to read input JSON: {}", e),
                },
                false,
            );
        }
    };

    info!(records = records.len(), "Optimizing portfolio");

    let result = SignalPipeline::default().run(&records);
    CliOutput::from_payload(&render(&result), result.is_ok())
}

/// `predict <model_path> <features_json>`
pub fn predict(args: &[String]) -> CliOutput {
    match predict_from_args(args) {
        Ok(prediction) => CliOutput::from_payload(&prediction, true),
        Err(e) => {
            error!(error = %e, "Prediction failed");
            CliOutput::failure(&e)
        }
    }
}

fn predict_from_args(args: &[String]) -> Result<Prediction> {
    let [model_path, features_json] = args else {
        return Err(PipelineError::InvalidInput(
            "usage: predict <model_path> <features_json>".to_string(),
        ));
    };

    let model = LogisticModel::from_json(model_path)?;
    let features: RawRecord = serde_json::from_str(features_json)?;

    SignalPredictor::new(Arc::new(model)).predict_features(&features)
}
