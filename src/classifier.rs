//! Recommendation Classifier
//!
//! Maps a predicted probability onto the BUY / SELL / HOLD vocabulary:
//! - BUY:  probability strictly above the buy threshold
//! - SELL: probability strictly below the sell threshold
//! - HOLD: everything in between, both bounds included
//!
//! The allocation engine never calls this; it trusts the label that was
//! attached when the probability was produced.

use crate::models::Recommendation;

pub const BUY_THRESHOLD: f64 = 0.6;
pub const SELL_THRESHOLD: f64 = 0.4;

/// Threshold-band classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationClassifier {
    buy_above: f64,
    sell_below: f64,
}

impl RecommendationClassifier {
    pub fn new() -> Self {
        Self {
            buy_above: BUY_THRESHOLD,
            sell_below: SELL_THRESHOLD,
        }
    }

    /// Classify a probability
    pub fn classify(&self, probability: f64) -> Recommendation {
        if probability > self.buy_above {
            Recommendation::Buy
        } else if probability < self.sell_below {
            Recommendation::Sell
        } else {
            Recommendation::Hold
        }
    }
}

impl Default for RecommendationClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify with the default bands
pub fn classify(probability: f64) -> Recommendation {
    RecommendationClassifier::new().classify(probability)
}
