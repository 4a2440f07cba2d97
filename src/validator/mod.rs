//! Record validation
//!
//! Turns loosely-typed input rows into a homogeneous [`ValidatedTable`].
//! Schema problems (a required column absent from the whole batch) are fatal;
//! problems with individual rows are recorded as [`RejectedRecord`]s and the
//! row is dropped.

use crate::error::PipelineError;
use crate::models::{
    RawRecord, RejectedRecord, RejectionReason, ValidatedSignal, ValidatedTable, DATE_FIELD,
    PROBABILITY_FIELD, RECOMMENDATION_FIELD, REQUIRED_FIELDS, SYMBOL_FIELD,
};
use crate::Result;
use serde_json::Value;
use tracing::{debug, info};

/// Unpack a decoded request body into raw records; only a JSON array of
/// objects is accepted.
pub fn batch_from_value(value: Value) -> Result<Vec<RawRecord>> {
    if !value.is_array() {
        return Err(PipelineError::InvalidInput(
            "input must be a list of records".to_string(),
        ));
    }

    Ok(serde_json::from_value(value)?)
}

pub struct RecordValidator {
    required: Vec<String>,
}

impl RecordValidator {
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    /// Check the batch schema and coerce every row.
    ///
    /// An empty batch is valid and yields an empty table.
    pub fn validate(&self, records: &[RawRecord]) -> Result<ValidatedTable> {
        if !records.is_empty() {
            self.check_schema(records)?;
        }

        let mut table = ValidatedTable::default();

        for (index, record) in records.iter().enumerate() {
            match coerce_record(record) {
                Ok(row) => table.rows.push(row),
                Err(reason) => {
                    let symbol = coerce_symbol(record.get(SYMBOL_FIELD));
                    debug!(index, ?symbol, %reason, "Dropping record");
                    table.rejected.push(RejectedRecord {
                        index,
                        symbol,
                        reason,
                    });
                }
            }
        }

        info!(
            input = records.len(),
            accepted = table.rows.len(),
            rejected = table.rejected.len(),
            "Validation completed"
        );

        Ok(table)
    }

    fn check_schema(&self, records: &[RawRecord]) -> Result<()> {
        let mut missing: Vec<String> = self
            .required
            .iter()
            .filter(|field| !records.iter().any(|r| r.contains_key(field.as_str())))
            .cloned()
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        missing.sort();
        Err(PipelineError::Schema { missing })
    }
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new(REQUIRED_FIELDS.iter().copied())
    }
}

fn coerce_record(record: &RawRecord) -> std::result::Result<ValidatedSignal, RejectionReason> {
    let probability = coerce_probability(record.get(PROBABILITY_FIELD))?;
    let symbol = coerce_symbol(record.get(SYMBOL_FIELD)).ok_or(RejectionReason::MissingSymbol)?;

    let features = record
        .iter()
        .filter(|(key, _)| {
            !matches!(
                key.as_str(),
                SYMBOL_FIELD | PROBABILITY_FIELD | RECOMMENDATION_FIELD | DATE_FIELD
            )
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(ValidatedSignal {
        symbol,
        probability,
        label: coerce_label(record.get(RECOMMENDATION_FIELD)),
        date: coerce_date(record.get(DATE_FIELD)),
        features,
    })
}

/// Numeric coercion of the probability column.
pub fn coerce_probability(value: Option<&Value>) -> std::result::Result<f64, RejectionReason> {
    let parsed = match value {
        None | Some(Value::Null) => return Err(RejectionReason::MissingProbability),
        Some(Value::Number(n)) => n.as_f64().ok_or(RejectionReason::NonNumericProbability)?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| RejectionReason::NonNumericProbability)?,
        Some(_) => return Err(RejectionReason::NonNumericProbability),
    };

    if !parsed.is_finite() {
        return Err(RejectionReason::NonFiniteProbability);
    }
    if !(0.0..=1.0).contains(&parsed) {
        return Err(RejectionReason::ProbabilityOutOfRange);
    }

    // -0.0 would sort below 0.0 under a total order
    Ok(parsed + 0.0)
}

/// Symbol as text; numeric tickers are accepted, blank strings are not.
pub(crate) fn coerce_symbol(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// String form of the label, case preserved.
fn coerce_label(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}

pub(crate) fn coerce_date(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
