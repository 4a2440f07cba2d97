//! Allocation engine
//!
//! Turns a validated signals table into capital weights.
//!
//! ```text
//! sort by probability (desc, stable)
//!   ├─ any BUY labels?  → weight each BUY row by probability / Σ probability
//!   │                     (rows at probability 0 are dropped unless all are 0)
//!   └─ none             → equal weight over the top FALLBACK_TOP_N rows, tagged WATCH
//! ```

use crate::models::{
    Allocation, AllocationEntry, AllocationPolicy, AllocationTag, ValidatedSignal, ValidatedTable,
};
use tracing::info;

/// Rows taken by the fallback policy when nothing is labelled BUY
pub const FALLBACK_TOP_N: usize = 3;

const BUY_LABEL: &str = "BUY";

/// Deterministic capital allocator
#[derive(Debug, Clone, Default)]
pub struct AllocationEngine;

impl AllocationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Allocate over a validated table. Total: never fails.
    pub fn allocate(&self, table: &ValidatedTable) -> Allocation {
        let ranked = rank_by_probability(&table.rows);

        let buys: Vec<&ValidatedSignal> = ranked
            .iter()
            .copied()
            .filter(|row| is_buy_label(&row.label))
            .collect();

        let allocation = if buys.is_empty() {
            watch_fallback(&ranked)
        } else {
            probability_weighted(&buys)
        };

        info!(
            policy = ?allocation.policy,
            candidates = table.rows.len(),
            selected = allocation.entries.len(),
            "Allocation computed"
        );

        allocation
    }
}

/// Stable sort, highest probability first
fn rank_by_probability(rows: &[ValidatedSignal]) -> Vec<&ValidatedSignal> {
    let mut ranked: Vec<&ValidatedSignal> = rows.iter().collect();
    ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    ranked
}

fn is_buy_label(label: &str) -> bool {
    label.trim().eq_ignore_ascii_case(BUY_LABEL)
}

fn probability_weighted(buys: &[&ValidatedSignal]) -> Allocation {
    let total: f64 = buys.iter().map(|row| row.probability).sum();

    // All-zero BUY probabilities: split evenly instead of dividing by zero
    if total <= 0.0 {
        let weight = 1.0 / buys.len() as f64;
        return Allocation {
            policy: AllocationPolicy::ProbabilityWeighted,
            entries: buys
                .iter()
                .map(|row| entry(row, AllocationTag::Buy, weight))
                .collect(),
        };
    }

    // Zero-probability BUY rows would receive no capital; leave them out
    Allocation {
        policy: AllocationPolicy::ProbabilityWeighted,
        entries: buys
            .iter()
            .filter(|row| row.probability > 0.0)
            .map(|row| entry(row, AllocationTag::Buy, row.probability / total))
            .collect(),
    }
}

fn watch_fallback(ranked: &[&ValidatedSignal]) -> Allocation {
    let picked = &ranked[..ranked.len().min(FALLBACK_TOP_N)];
    let weight = if picked.is_empty() {
        0.0
    } else {
        1.0 / picked.len() as f64
    };

    Allocation {
        policy: AllocationPolicy::EqualWeightFallback,
        entries: picked
            .iter()
            .map(|row| entry(row, AllocationTag::Watch, weight))
            .collect(),
    }
}

fn entry(row: &ValidatedSignal, tag: AllocationTag, allocation: f64) -> AllocationEntry {
    AllocationEntry {
        symbol: row.symbol.clone(),
        probability: row.probability,
        recommendation: tag,
        allocation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, probability: f64, label: &str) -> ValidatedSignal {
        ValidatedSignal {
            symbol: symbol.to_string(),
            probability,
            label: label.to_string(),
            date: None,
            features: Default::default(),
        }
    }

    fn table(rows: Vec<ValidatedSignal>) -> ValidatedTable {
        ValidatedTable {
            rows,
            rejected: vec![],
        }
    }

    fn symbols(allocation: &Allocation) -> Vec<&str> {
        allocation.entries.iter().map(|e| e.symbol.as_str()).collect()
    }

    #[test]
    fn test_primary_policy_weights_by_probability() {
        let result = AllocationEngine::new().allocate(&table(vec![
            row("A", 0.8, "BUY"),
            row("B", 0.3, "SELL"),
            row("C", 0.7, "BUY"),
        ]));

        assert_eq!(result.policy, AllocationPolicy::ProbabilityWeighted);
        assert_eq!(symbols(&result), vec!["A", "C"]);
        assert!((result.entries[0].allocation - 0.8 / 1.5).abs() < 1e-12);
        assert!((result.entries[1].allocation - 0.7 / 1.5).abs() < 1e-12);
        assert!(result
            .entries
            .iter()
            .all(|e| e.recommendation == AllocationTag::Buy));
    }

    #[test]
    fn test_buy_label_is_case_insensitive() {
        let result = AllocationEngine::new().allocate(&table(vec![
            row("A", 0.65, "buy"),
            row("B", 0.9, "Hold"),
            row("C", 0.62, " Buy "),
        ]));

        assert_eq!(symbols(&result), vec!["A", "C"]);
        let sum: f64 = result.entries.iter().map(|e| e.allocation).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_takes_top_three_equal_weight() {
        let result = AllocationEngine::new().allocate(&table(vec![
            row("A", 0.5, "HOLD"),
            row("B", 0.3, "SELL"),
            row("C", 0.55, "HOLD"),
            row("D", 0.45, "HOLD"),
            row("E", 0.1, "SELL"),
        ]));

        assert_eq!(result.policy, AllocationPolicy::EqualWeightFallback);
        assert_eq!(symbols(&result), vec!["C", "A", "D"]);
        for e in &result.entries {
            assert_eq!(e.recommendation, AllocationTag::Watch);
            assert!((e.allocation - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_fallback_with_fewer_rows() {
        let result = AllocationEngine::new().allocate(&table(vec![
            row("A", 0.5, "HOLD"),
            row("B", 0.3, "HOLD"),
        ]));

        assert_eq!(symbols(&result), vec!["A", "B"]);
        assert!(result.entries.iter().all(|e| e.allocation == 0.5));
    }

    #[test]
    fn test_empty_table_yields_empty_fallback() {
        let result = AllocationEngine::new().allocate(&table(vec![]));
        assert_eq!(result.policy, AllocationPolicy::EqualWeightFallback);
        assert!(result.entries.is_empty());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let result = AllocationEngine::new().allocate(&table(vec![
            row("X", 0.5, "HOLD"),
            row("Y", 0.7, "HOLD"),
            row("Z", 0.5, "HOLD"),
            row("W", 0.5, "HOLD"),
        ]));

        assert_eq!(symbols(&result), vec!["Y", "X", "Z"]);
    }

    #[test]
    fn test_zero_probability_buys_split_evenly() {
        let result = AllocationEngine::new().allocate(&table(vec![
            row("A", 0.0, "BUY"),
            row("B", 0.0, "BUY"),
        ]));

        assert_eq!(result.policy, AllocationPolicy::ProbabilityWeighted);
        assert!(result.entries.iter().all(|e| e.allocation == 0.5));
    }

    #[test]
    fn test_zero_probability_buy_is_left_out() {
        let result = AllocationEngine::new().allocate(&table(vec![
            row("A", 0.0, "BUY"),
            row("B", 0.7, "BUY"),
        ]));

        assert_eq!(symbols(&result), vec!["B"]);
        assert_eq!(result.entries[0].allocation, 1.0);
        assert!(result.entries.iter().all(|e| e.allocation > 0.0));
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let input = table(vec![
            row("A", 0.61, "BUY"),
            row("B", 0.61, "BUY"),
            row("C", 0.93, "BUY"),
        ]);
        let engine = AllocationEngine::new();

        let first = serde_json::to_string(&engine.allocate(&input)).unwrap();
        let second = serde_json::to_string(&engine.allocate(&input)).unwrap();
        assert_eq!(first, second);
    }
}
