//! Pipeline orchestrator
//!
//! VALIDATE → ALLOCATE → VERIFY → RENDER
//!
//! Recommendation labels arrive already assigned by the probability producer;
//! nothing here re-runs the classifier.

use crate::allocation::AllocationEngine;
use crate::error::PipelineError;
use crate::models::{EmptyResult, OutputPayload, PipelineOutcome, RawRecord};
use crate::validator::RecordValidator;
use crate::verification::{create_default_verification_engine, VerificationEngine};
use crate::Result;
use tracing::{debug, info, warn};

/// Sequences validation, allocation and verification over one batch
pub struct SignalPipeline {
    validator: RecordValidator,
    allocator: AllocationEngine,
    verifier: VerificationEngine,
}

impl SignalPipeline {
    pub fn new(
        validator: RecordValidator,
        allocator: AllocationEngine,
        verifier: VerificationEngine,
    ) -> Self {
        Self {
            validator,
            allocator,
            verifier,
        }
    }

    /// Run one batch.
    ///
    /// `Err(Schema)` aborts with no partial output. A batch with no usable
    /// rows is `Ok(PipelineOutcome::Empty)`, never an empty allocation.
    pub fn run(&self, records: &[RawRecord]) -> Result<PipelineOutcome> {
        info!(records = records.len(), "Pipeline: starting run");

        let table = self.validator.validate(records)?;

        if table.is_empty() {
            info!(
                rejected = table.rejected.len(),
                "Pipeline: no usable rows after validation"
            );
            return Ok(PipelineOutcome::Empty(EmptyResult::default()));
        }

        let allocation = self.allocator.allocate(&table);
        debug!(entries = allocation.entries.len(), "Pipeline: verifying allocation");

        let report = self.verifier.verify(&allocation);
        if !report.verified {
            warn!(issues = ?report.issues, "Pipeline: allocation failed verification");
            return Err(PipelineError::Computation(report.issues.join("; ")));
        }

        info!(
            policy = ?allocation.policy,
            entries = allocation.entries.len(),
            "Pipeline: run completed"
        );

        Ok(PipelineOutcome::Allocated(allocation))
    }
}

impl Default for SignalPipeline {
    fn default() -> Self {
        Self::new(
            RecordValidator::default(),
            AllocationEngine::new(),
            create_default_verification_engine(),
        )
    }
}

/// Render a pipeline result into the output-channel shape
pub fn render(result: &Result<PipelineOutcome>) -> OutputPayload {
    match result {
        Ok(outcome) => OutputPayload::from(outcome),
        Err(e) => OutputPayload::Error {
            error: e.to_string(),
        },
    }
}

impl From<&PipelineOutcome> for OutputPayload {
    fn from(outcome: &PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Empty(empty) => OutputPayload::Message {
                message: empty.message.clone(),
                count: empty.count,
            },
            PipelineOutcome::Allocated(allocation) => {
                OutputPayload::Entries(allocation.entries.clone())
            }
        }
    }
}
