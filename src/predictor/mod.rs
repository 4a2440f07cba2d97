//! Probability producer
//!
//! Scores feature rows with a [`ProbabilityModel`] and labels the result with
//! the [`RecommendationClassifier`]. This is the stage that assigns the
//! `ai_recommendation` label the allocation engine later filters on.

pub mod job;
pub mod logistic;

pub use job::PredictionJob;
pub use logistic::LogisticModel;

use crate::classifier::RecommendationClassifier;
use crate::error::PipelineError;
use crate::models::{Prediction, PredictedSignal, RawRecord, DATE_FIELD, SYMBOL_FIELD};
use crate::validator::{coerce_date, coerce_symbol};
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Model inputs, in the order the model was trained on
pub const FEATURE_COLUMNS: &[&str] = &[
    "close",
    "volume",
    "ma20",
    "rsi",
    "bb_upper",
    "bb_lower",
    "foreign_buy_value",
    "foreign_sell_value",
];

/// Black-box probability model
pub trait ProbabilityModel: Send + Sync {
    fn name(&self) -> &str;

    fn n_features(&self) -> usize;

    /// Probability of the favourable class
    fn predict_proba(&self, features: &[f64]) -> Result<f64>;
}

#[derive(Clone)]
pub struct SignalPredictor {
    model: Arc<dyn ProbabilityModel>,
    classifier: RecommendationClassifier,
}

impl SignalPredictor {
    pub fn new(model: Arc<dyn ProbabilityModel>) -> Self {
        Self {
            model,
            classifier: RecommendationClassifier::default(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Score one ordered feature vector
    pub fn predict(&self, features: &[f64]) -> Result<Prediction> {
        if features.len() != self.model.n_features() {
            return Err(PipelineError::Model(format!(
                "{} expects {} features, got {}",
                self.model.name(),
                self.model.n_features(),
                features.len()
            )));
        }

        let probability = self.model.predict_proba(features)?;

        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(PipelineError::Model(format!(
                "{} produced an invalid probability: {}",
                self.model.name(),
                probability
            )));
        }

        Ok(Prediction {
            probability,
            recommendation: self.classifier.classify(probability),
        })
    }

    /// Score a single feature object; every feature must be present and numeric.
    pub fn predict_features(&self, features: &RawRecord) -> Result<Prediction> {
        let mut vector = Vec::with_capacity(FEATURE_COLUMNS.len());
        let mut invalid = Vec::new();

        for column in FEATURE_COLUMNS {
            match features.get(*column).and_then(numeric_value) {
                Some(v) => vector.push(v),
                None => invalid.push(*column),
            }
        }

        if !invalid.is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "Missing or non-numeric features: {}",
                invalid.join(", ")
            )));
        }

        self.predict(&vector)
    }

    /// Score a batch of stored rows.
    ///
    /// A feature column absent from the whole batch is a schema error; an
    /// individual missing value is filled with zero.
    pub fn predict_batch(&self, records: &[RawRecord]) -> Result<Vec<PredictedSignal>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let missing: Vec<String> = FEATURE_COLUMNS
            .iter()
            .filter(|column| !records.iter().any(|r| r.contains_key(**column)))
            .map(|column| column.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(PipelineError::Schema { missing });
        }

        let mut predictions = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let Some(symbol) = coerce_symbol(record.get(SYMBOL_FIELD)) else {
                warn!(index, "Skipping row without symbol");
                continue;
            };

            let vector: Vec<f64> = FEATURE_COLUMNS
                .iter()
                .map(|column| record.get(*column).and_then(numeric_value).unwrap_or(0.0))
                .collect();

            let prediction = self.predict(&vector)?;
            debug!(
                symbol = %symbol,
                probability = prediction.probability,
                recommendation = %prediction.recommendation,
                "Scored row"
            );

            predictions.push(PredictedSignal {
                symbol,
                date: coerce_date(record.get(DATE_FIELD)),
                ai_predicted_probability: prediction.probability,
                ai_recommendation: prediction.recommendation,
            });
        }

        info!(
            model = self.model.name(),
            rows = predictions.len(),
            "Batch prediction completed"
        );

        Ok(predictions)
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Recommendation;
    use serde_json::json;

    /// Returns the first feature as the probability
    pub(crate) struct FirstFeatureModel;

    impl ProbabilityModel for FirstFeatureModel {
        fn name(&self) -> &str {
            "first_feature"
        }

        fn n_features(&self) -> usize {
            FEATURE_COLUMNS.len()
        }

        fn predict_proba(&self, features: &[f64]) -> Result<f64> {
            Ok(features[0])
        }
    }

    fn predictor() -> SignalPredictor {
        SignalPredictor::new(Arc::new(FirstFeatureModel))
    }

    fn full_features(close: f64) -> RawRecord {
        serde_json::from_value(json!({
            "close": close, "volume": 1200, "ma20": 0.5, "rsi": 48.0,
            "bb_upper": 0.6, "bb_lower": 0.4,
            "foreign_buy_value": 10, "foreign_sell_value": 12
        }))
        .unwrap()
    }

    #[test]
    fn test_predict_features_labels_result() {
        let prediction = predictor().predict_features(&full_features(0.72)).unwrap();
        assert_eq!(prediction.recommendation, Recommendation::Buy);
        assert!((prediction.probability - 0.72).abs() < 1e-12);

        let hold = predictor().predict_features(&full_features(0.6)).unwrap();
        assert_eq!(hold.recommendation, Recommendation::Hold);
    }

    #[test]
    fn test_predict_features_requires_every_feature() {
        let mut features = full_features(0.5);
        features.remove("rsi");
        features.insert("volume".to_string(), json!("lots"));

        let err = predictor().predict_features(&features).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: Missing or non-numeric features: volume, rsi"
        );
    }

    #[test]
    fn test_out_of_range_model_output_is_rejected() {
        let err = predictor().predict_features(&full_features(1.7)).unwrap_err();
        assert!(matches!(err, PipelineError::Model(_)));
    }

    #[test]
    fn test_batch_fills_missing_values_with_zero() {
        let records: Vec<RawRecord> = serde_json::from_value(json!([
            {"symbol": "VCB", "date": "2024-06-03", "close": 0.2, "volume": 1, "ma20": 1,
             "rsi": 1, "bb_upper": 1, "bb_lower": 1, "foreign_buy_value": 1, "foreign_sell_value": 1},
            {"symbol": "FPT", "date": "2024-06-03", "close": null}
        ]))
        .unwrap();

        let predictions = predictor().predict_batch(&records).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].ai_recommendation, Recommendation::Sell);
        assert_eq!(predictions[1].symbol, "FPT");
        assert_eq!(predictions[1].ai_predicted_probability, 0.0);
        assert_eq!(predictions[1].date.as_deref(), Some("2024-06-03"));
    }

    #[test]
    fn test_batch_accepts_numeric_symbols() {
        let mut numeric = full_features(0.7);
        numeric.insert("symbol".to_string(), json!(1301));
        let mut blank = full_features(0.7);
        blank.insert("symbol".to_string(), json!("  "));
        let mut named = full_features(0.1);
        named.insert("symbol".to_string(), json!("VCB"));
        let records = vec![numeric, blank, named];

        let predictions = predictor().predict_batch(&records).unwrap();
        let symbols: Vec<&str> = predictions.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["1301", "VCB"]);
        assert_eq!(predictions[0].ai_recommendation, Recommendation::Buy);
    }

    #[test]
    fn test_batch_missing_column_is_schema_error() {
        let records: Vec<RawRecord> =
            serde_json::from_value(json!([{"symbol": "VCB", "close": 0.4}])).unwrap();

        match predictor().predict_batch(&records) {
            Err(PipelineError::Schema { missing }) => {
                assert_eq!(missing.len(), FEATURE_COLUMNS.len() - 1);
                assert!(!missing.contains(&"close".to_string()));
            }
            other => panic!("expected schema error, got {:?}", other.map(|v| v.len())),
        }
    }
}
