//! Audit log of optimizer runs
//!
//! Every run served through the API is recorded with a fingerprint of its
//! input so identical batches can be matched and replayed.

use crate::error::PipelineError;
use crate::models::{AllocationPolicy, OutputPayload, PipelineOutcome, RawRecord};
use crate::pipeline::render;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Runs kept in memory before the oldest are evicted
pub const DEFAULT_AUDIT_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Allocated,
    Empty,
    SchemaError,
    ComputationError,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub run_id: Uuid,
    pub input_hash: String,
    pub input_rows: usize,
    pub outcome: OutcomeKind,
    pub policy: Option<AllocationPolicy>,
    pub payload: OutputPayload,
    pub created_at: DateTime<Utc>,
}

impl AllocationRecord {
    pub fn new(records: &[RawRecord], result: &Result<PipelineOutcome>) -> Self {
        let (outcome, policy) = match result {
            Ok(PipelineOutcome::Allocated(allocation)) => {
                (OutcomeKind::Allocated, Some(allocation.policy))
            }
            Ok(PipelineOutcome::Empty(_)) => (OutcomeKind::Empty, None),
            Err(PipelineError::Schema { .. }) => (OutcomeKind::SchemaError, None),
            Err(PipelineError::Computation(_)) => (OutcomeKind::ComputationError, None),
            Err(_) => (OutcomeKind::Failed, None),
        };

        Self {
            run_id: Uuid::new_v4(),
            input_hash: compute_input_hash(records),
            input_rows: records.len(),
            outcome,
            policy,
            payload: render(result),
            created_at: Utc::now(),
        }
    }
}

#[derive(Default)]
struct AuditEntries {
    records: HashMap<Uuid, AllocationRecord>,
    /// Insertion order, oldest at the front
    order: VecDeque<Uuid>,
}

/// Bounded audit trail storage
pub struct AuditLog {
    entries: Arc<RwLock<AuditEntries>>,
    capacity: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }

    /// Keep at most `capacity` runs (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(AuditEntries::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store a run record, evicting the oldest past capacity
    pub async fn record(&self, record: AllocationRecord) -> Uuid {
        let run_id = record.run_id;
        let mut entries = self.entries.write().await;

        if entries.records.insert(run_id, record).is_none() {
            entries.order.push_back(run_id);
        }

        while entries.order.len() > self.capacity {
            if let Some(evicted) = entries.order.pop_front() {
                entries.records.remove(&evicted);
                debug!(run_id = %evicted, "Evicted audit record");
            }
        }

        run_id
    }

    /// Retrieve a record by run ID
    pub async fn get(&self, run_id: Uuid) -> Option<AllocationRecord> {
        let entries = self.entries.read().await;
        entries.records.get(&run_id).cloned()
    }

    /// All records in the order they were recorded
    pub async fn list(&self) -> Vec<AllocationRecord> {
        let entries = self.entries.read().await;

        entries
            .order
            .iter()
            .filter_map(|run_id| entries.records.get(run_id).cloned())
            .collect()
    }

    /// Earlier runs over byte-identical input
    pub async fn find_by_input(&self, input_hash: &str) -> Vec<Uuid> {
        self.list()
            .await
            .into_iter()
            .filter(|record| record.input_hash == input_hash)
            .map(|record| record.run_id)
            .collect()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA256 of the serialized input batch
/// Streams JSON straight into the hasher
pub fn compute_input_hash(records: &[RawRecord]) -> String {
    let mut hasher = Sha256::new();

    if serde_json::to_writer(&mut HashWriter(&mut hasher), records).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SignalPipeline;
    use serde_json::json;

    fn batch() -> Vec<RawRecord> {
        serde_json::from_value(json!([
            {"symbol": "A", "ai_predicted_probability": 0.8, "ai_recommendation": "BUY"},
            {"symbol": "B", "ai_predicted_probability": 0.3, "ai_recommendation": "SELL"}
        ]))
        .unwrap()
    }

    #[test]
    fn test_input_hash_is_stable() {
        let first = compute_input_hash(&batch());
        let second = compute_input_hash(&batch());
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert_ne!(first, compute_input_hash(&[]));
    }

    #[tokio::test]
    async fn test_record_and_lookup() {
        let log = AuditLog::new();
        let input = batch();
        let result = SignalPipeline::default().run(&input);

        let record = AllocationRecord::new(&input, &result);
        assert_eq!(record.outcome, OutcomeKind::Allocated);
        assert_eq!(record.policy, Some(AllocationPolicy::ProbabilityWeighted));

        let run_id = log.record(record.clone()).await;
        let stored = log.get(run_id).await.expect("record stored");
        assert_eq!(stored.input_hash, record.input_hash);

        let again = AllocationRecord::new(&input, &SignalPipeline::default().run(&input));
        log.record(again).await;

        assert_eq!(log.find_by_input(&record.input_hash).await.len(), 2);
        assert!(log.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_list_keeps_record_order_and_evicts_oldest() {
        let log = AuditLog::with_capacity(2);
        let input = batch();
        let result = SignalPipeline::default().run(&input);

        // same input, recorded back to back, may share a timestamp
        let mut ids = Vec::new();
        for _ in 0..3 {
            let mut record = AllocationRecord::new(&input, &result);
            record.created_at = DateTime::<Utc>::UNIX_EPOCH;
            ids.push(log.record(record).await);
        }

        let listed: Vec<Uuid> = log.list().await.iter().map(|r| r.run_id).collect();
        assert_eq!(listed, vec![ids[1], ids[2]]);
        assert!(log.get(ids[0]).await.is_none());
        assert_eq!(log.capacity(), 2);
    }

    #[test]
    fn test_schema_error_outcome() {
        let input: Vec<RawRecord> = serde_json::from_value(json!([{"symbol": "A"}])).unwrap();
        let record = AllocationRecord::new(&input, &SignalPipeline::default().run(&input));
        assert_eq!(record.outcome, OutcomeKind::SchemaError);
        assert!(matches!(record.payload, OutputPayload::Error { .. }));
    }
}
