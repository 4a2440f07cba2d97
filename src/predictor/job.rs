//! Daily prediction job: FETCH pending → PREDICT → SAVE

use super::SignalPredictor;
use crate::models::PredictionSummary;
use crate::store::SignalStore;
use crate::Result;
use std::sync::Arc;
use tracing::info;

pub struct PredictionJob {
    store: Arc<dyn SignalStore>,
    predictor: SignalPredictor,
}

impl PredictionJob {
    pub fn new(store: Arc<dyn SignalStore>, predictor: SignalPredictor) -> Self {
        Self { store, predictor }
    }

    pub async fn run(&self) -> Result<PredictionSummary> {
        let pending = self.store.fetch_pending().await?;
        info!(pending = pending.len(), "Fetched rows awaiting prediction");

        if pending.is_empty() {
            return Ok(PredictionSummary {
                message: "No rows need prediction".to_string(),
                count: 0,
            });
        }

        let predictions = self.predictor.predict_batch(&pending)?;
        let written = self.store.upsert_predictions(&predictions).await?;

        info!(
            model = self.predictor.model_name(),
            written,
            "Predictions saved"
        );

        Ok(PredictionSummary {
            message: "Prediction completed".to_string(),
            count: written,
        })
    }
}
