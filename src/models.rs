//! Core data models for the signal allocation engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

//
// ================= Record Schema =================
//

/// Loosely-typed input record (one row of the signals table).
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

pub const SYMBOL_FIELD: &str = "symbol";
pub const PROBABILITY_FIELD: &str = "ai_predicted_probability";
pub const RECOMMENDATION_FIELD: &str = "ai_recommendation";
pub const DATE_FIELD: &str = "date";

/// Fields every allocation batch must carry.
pub const REQUIRED_FIELDS: &[&str] = &[SYMBOL_FIELD, PROBABILITY_FIELD, RECOMMENDATION_FIELD];

//
// ================= Enums =================
//

/// Classifier vocabulary, assigned by the probability producer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

/// Allocator vocabulary. Intentionally not comparable with [`Recommendation`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum AllocationTag {
    Buy,
    Watch,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AllocationPolicy {
    /// BUY rows weighted by probability
    ProbabilityWeighted,
    /// No BUY rows: equal weight over the top candidates
    EqualWeightFallback,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    MissingProbability,
    NonNumericProbability,
    NonFiniteProbability,
    ProbabilityOutOfRange,
    MissingSymbol,
}

//
// ================= Validated Table =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidatedSignal {
    pub symbol: String,
    pub probability: f64,
    /// Label as delivered upstream, case preserved.
    pub label: String,
    pub date: Option<String>,
    /// Auxiliary columns, never inspected by the core.
    #[serde(default)]
    pub features: RawRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RejectedRecord {
    /// Position in the input batch
    pub index: usize,
    pub symbol: Option<String>,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidatedTable {
    pub rows: Vec<ValidatedSignal>,
    pub rejected: Vec<RejectedRecord>,
}

impl ValidatedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

//
// ================= Allocation =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllocationEntry {
    pub symbol: String,
    pub probability: f64,
    pub recommendation: AllocationTag,
    pub allocation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Allocation {
    pub policy: AllocationPolicy,
    pub entries: Vec<AllocationEntry>,
}

//
// ================= Pipeline Outcome =================
//

pub const EMPTY_RESULT_MESSAGE: &str = "No valid data to optimize";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmptyResult {
    pub message: String,
    pub count: usize,
}

impl Default for EmptyResult {
    fn default() -> Self {
        Self {
            message: EMPTY_RESULT_MESSAGE.to_string(),
            count: 0,
        }
    }
}

/// Successful pipeline outcomes. Schema failures travel as `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Empty(EmptyResult),
    Allocated(Allocation),
}

/// Wire shape written to the output channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OutputPayload {
    Error { error: String },
    Message { message: String, count: usize },
    Entries(Vec<AllocationEntry>),
}

//
// ================= Prediction =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub probability: f64,
    pub recommendation: Recommendation,
}

/// Row written back to the signal store after scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictedSignal {
    pub symbol: String,
    pub date: Option<String>,
    pub ai_predicted_probability: f64,
    pub ai_recommendation: Recommendation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionSummary {
    pub message: String,
    pub count: usize,
}

//
// ================= Display / Parsing =================
//

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Buy => "BUY",
            Recommendation::Sell => "SELL",
            Recommendation::Hold => "HOLD",
        }
    }
}

impl AllocationTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationTag::Buy => "BUY",
            AllocationTag::Watch => "WATCH",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for AllocationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Recommendation {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Recommendation::Buy),
            "SELL" => Ok(Recommendation::Sell),
            "HOLD" => Ok(Recommendation::Hold),
            other => Err(PipelineError::InvalidInput(format!(
                "Unknown recommendation label: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectionReason::MissingProbability => "missing probability",
            RejectionReason::NonNumericProbability => "non-numeric probability",
            RejectionReason::NonFiniteProbability => "non-finite probability",
            RejectionReason::ProbabilityOutOfRange => "probability outside [0, 1]",
            RejectionReason::MissingSymbol => "missing symbol",
        };
        write!(f, "{}", s)
    }
}
