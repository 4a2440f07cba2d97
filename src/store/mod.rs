//! Signal store
//!
//! Where per-symbol signal rows live between the prediction job and the
//! optimizer. Currently in-memory; a remote table can implement the same trait.

use crate::models::{
    PredictedSignal, RawRecord, DATE_FIELD, PROBABILITY_FIELD, RECOMMENDATION_FIELD, SYMBOL_FIELD,
};
use crate::validator::{coerce_date, coerce_symbol};
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Trait for signal persistence
#[async_trait::async_trait]
pub trait SignalStore: Send + Sync {
    /// Rows whose probability has not been predicted yet
    async fn fetch_pending(&self) -> Result<Vec<RawRecord>>;

    /// Write predictions, keyed by (symbol, date)
    async fn upsert_predictions(&self, predictions: &[PredictedSignal]) -> Result<usize>;

    async fn load_all(&self) -> Result<Vec<RawRecord>>;
}

/// In-memory signal store for development and tests
pub struct InMemorySignalStore {
    rows: Arc<RwLock<Vec<RawRecord>>>,
}

impl InMemorySignalStore {
    pub fn new() -> Self {
        Self::with_rows(Vec::new())
    }

    pub fn with_rows(rows: Vec<RawRecord>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
        }
    }
}

impl Default for InMemorySignalStore {
    fn default() -> Self {
        Self::new()
    }
}

fn is_pending(row: &RawRecord) -> bool {
    matches!(row.get(PROBABILITY_FIELD), None | Some(Value::Null))
}

fn same_key(row: &RawRecord, prediction: &PredictedSignal) -> bool {
    let symbol_matches =
        coerce_symbol(row.get(SYMBOL_FIELD)).as_deref() == Some(prediction.symbol.as_str());
    let date_matches = coerce_date(row.get(DATE_FIELD)) == prediction.date;
    symbol_matches && date_matches
}

#[async_trait::async_trait]
impl SignalStore for InMemorySignalStore {

    async fn fetch_pending(&self) -> Result<Vec<RawRecord>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|row| is_pending(row)).cloned().collect())
    }

    async fn upsert_predictions(&self, predictions: &[PredictedSignal]) -> Result<usize> {
        let mut rows = self.rows.write().await;

        for prediction in predictions {
            let probability = Value::from(prediction.ai_predicted_probability);
            let label = Value::from(prediction.ai_recommendation.as_str());

            match rows.iter_mut().find(|row| same_key(row, prediction)) {
                Some(row) => {
                    row.insert(PROBABILITY_FIELD.to_string(), probability);
                    row.insert(RECOMMENDATION_FIELD.to_string(), label);
                }
                None => {
                    let mut row = RawRecord::new();
                    row.insert(SYMBOL_FIELD.to_string(), Value::from(prediction.symbol.clone()));
                    row.insert(
                        DATE_FIELD.to_string(),
                        prediction.date.clone().map(Value::from).unwrap_or(Value::Null),
                    );
                    row.insert(PROBABILITY_FIELD.to_string(), probability);
                    row.insert(RECOMMENDATION_FIELD.to_string(), label);
                    rows.push(row);
                }
            }
        }

        Ok(predictions.len())
    }

    async fn load_all(&self) -> Result<Vec<RawRecord>> {
        Ok(self.rows.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recommendation;
    use serde_json::json;

    fn seeded() -> InMemorySignalStore {
        InMemorySignalStore::with_rows(
            serde_json::from_value(json!([
                {"symbol": "VCB", "date": "2024-06-03", "ai_predicted_probability": null, "close": 91.2},
                {"symbol": "FPT", "date": "2024-06-03", "ai_predicted_probability": 0.71, "ai_recommendation": "BUY"},
                {"symbol": "HPG", "date": "2024-06-03"}
            ]))
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_fetch_pending_returns_unscored_rows() {
        let store = seeded();
        let pending = store.fetch_pending().await.unwrap();

        let symbols: Vec<&str> = pending
            .iter()
            .filter_map(|r| r.get("symbol").and_then(Value::as_str))
            .collect();
        assert_eq!(symbols, vec!["VCB", "HPG"]);
    }

    #[tokio::test]
    async fn test_upsert_replaces_on_key_and_inserts_otherwise() {
        let store = seeded();

        let written = store
            .upsert_predictions(&[
                PredictedSignal {
                    symbol: "VCB".to_string(),
                    date: Some("2024-06-03".to_string()),
                    ai_predicted_probability: 0.42,
                    ai_recommendation: Recommendation::Hold,
                },
                PredictedSignal {
                    symbol: "VCB".to_string(),
                    date: Some("2024-06-04".to_string()),
                    ai_predicted_probability: 0.2,
                    ai_recommendation: Recommendation::Sell,
                },
            ])
            .await
            .unwrap();
        assert_eq!(written, 2);

        let rows = store.load_all().await.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].get("ai_predicted_probability"), Some(&json!(0.42)));
        assert_eq!(rows[0].get("ai_recommendation"), Some(&json!("HOLD")));
        assert_eq!(rows[0].get("close"), Some(&json!(91.2)));
        assert_eq!(rows[3].get("date"), Some(&json!("2024-06-04")));

        assert_eq!(store.fetch_pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_matches_numeric_symbol_rows() {
        let store = InMemorySignalStore::with_rows(
            serde_json::from_value(json!([{"symbol": 1301, "date": "2024-06-03"}])).unwrap(),
        );

        store
            .upsert_predictions(&[PredictedSignal {
                symbol: "1301".to_string(),
                date: Some("2024-06-03".to_string()),
                ai_predicted_probability: 0.55,
                ai_recommendation: Recommendation::Hold,
            }])
            .await
            .unwrap();

        let rows = store.load_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("ai_predicted_probability"), Some(&json!(0.55)));
    }
}
