//! Verification engine for allocation invariants
//!
//! Rules-based verification before an allocation leaves the pipeline.
//! Deterministic enforcement.

use crate::allocation::FALLBACK_TOP_N;
use crate::models::{Allocation, AllocationPolicy, AllocationTag};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Tolerance for the sum-to-one check
pub const ALLOCATION_SUM_TOLERANCE: f64 = 1e-9;

/// Trait for verification rules
pub trait AllocationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn verify(&self, allocation: &Allocation) -> VerificationCheckResult;
}

pub struct VerificationCheckResult {
    pub passed: bool,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCheck {
    pub rule_name: String,
    pub passed: bool,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub verified: bool,
    pub checks: Vec<RuleCheck>,
    pub issues: Vec<String>,
}

/// Verification engine that enforces rules
pub struct VerificationEngine {
    rules: Vec<Box<dyn AllocationRule>>,
}

impl VerificationEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Box<dyn AllocationRule>) {
        self.rules.push(rule);
    }

    /// Run every rule; never short-circuits
    pub fn verify(&self, allocation: &Allocation) -> VerificationReport {
        let mut checks = Vec::with_capacity(self.rules.len());
        let mut issues = Vec::new();

        for rule in &self.rules {
            let result = rule.verify(allocation);

            if !result.passed {
                warn!(rule = rule.name(), details = %result.details, "Allocation rule failed");
                issues.push(format!("{}: {}", rule.name(), result.details));
            }

            checks.push(RuleCheck {
                rule_name: rule.name().to_string(),
                passed: result.passed,
                details: result.details,
            });
        }

        let verified = issues.is_empty();

        info!(
            rule_count = self.rules.len(),
            verified = verified,
            "Verification completed"
        );

        VerificationReport {
            verified,
            checks,
            issues,
        }
    }
}

impl Default for VerificationEngine {
    fn default() -> Self {
        Self::new()
    }
}

//
// ========== Allocation Rules ==========
//

/// Rule: weights of a non-empty allocation sum to one
pub struct SumToOneRule;

impl AllocationRule for SumToOneRule {
    fn name(&self) -> &'static str {
        "allocation_sum_to_one"
    }

    fn verify(&self, allocation: &Allocation) -> VerificationCheckResult {
        if allocation.entries.is_empty() {
            return VerificationCheckResult {
                passed: true,
                details: "No entries".to_string(),
            };
        }

        let sum: f64 = allocation.entries.iter().map(|e| e.allocation).sum();

        VerificationCheckResult {
            passed: (sum - 1.0).abs() <= ALLOCATION_SUM_TOLERANCE,
            details: format!("Allocation sum: {:.12}", sum),
        }
    }
}

/// Rule: every weight is finite and strictly positive
pub struct PositiveWeightRule;

impl AllocationRule for PositiveWeightRule {
    fn name(&self) -> &'static str {
        "allocation_positive"
    }

    fn verify(&self, allocation: &Allocation) -> VerificationCheckResult {
        let bad: Vec<&str> = allocation
            .entries
            .iter()
            .filter(|e| !e.allocation.is_finite() || e.allocation <= 0.0)
            .map(|e| e.symbol.as_str())
            .collect();

        VerificationCheckResult {
            passed: bad.is_empty(),
            details: if bad.is_empty() {
                "All weights positive".to_string()
            } else {
                format!("Invalid weights for: {}", bad.join(", "))
            },
        }
    }
}

/// Rule: entries ordered by probability, highest first
pub struct DescendingProbabilityRule;

impl AllocationRule for DescendingProbabilityRule {
    fn name(&self) -> &'static str {
        "probability_descending"
    }

    fn verify(&self, allocation: &Allocation) -> VerificationCheckResult {
        let out_of_order = allocation
            .entries
            .windows(2)
            .position(|pair| pair[0].probability < pair[1].probability);

        VerificationCheckResult {
            passed: out_of_order.is_none(),
            details: match out_of_order {
                None => "Entries in descending probability order".to_string(),
                Some(i) => format!("Order broken at position {}", i + 1),
            },
        }
    }
}

/// Rule: tags and size match the policy that produced them
pub struct PolicyConsistencyRule;

impl AllocationRule for PolicyConsistencyRule {
    fn name(&self) -> &'static str {
        "policy_consistency"
    }

    fn verify(&self, allocation: &Allocation) -> VerificationCheckResult {
        let expected = match allocation.policy {
            AllocationPolicy::ProbabilityWeighted => AllocationTag::Buy,
            AllocationPolicy::EqualWeightFallback => AllocationTag::Watch,
        };

        let tags_match = allocation
            .entries
            .iter()
            .all(|e| e.recommendation == expected);

        let size_ok = allocation.policy != AllocationPolicy::EqualWeightFallback
            || allocation.entries.len() <= FALLBACK_TOP_N;

        VerificationCheckResult {
            passed: tags_match && size_ok,
            details: format!(
                "Expected tag {} for {:?} ({} entries)",
                expected,
                allocation.policy,
                allocation.entries.len()
            ),
        }
    }
}

/// Create a default verification engine with the allocation invariants
pub fn create_default_verification_engine() -> VerificationEngine {
    let mut engine = VerificationEngine::new();
    engine.add_rule(Box::new(SumToOneRule));
    engine.add_rule(Box::new(PositiveWeightRule));
    engine.add_rule(Box::new(DescendingProbabilityRule));
    engine.add_rule(Box::new(PolicyConsistencyRule));
    engine
}

//
// ================= Tests =================
//
