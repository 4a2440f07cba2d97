//! Signal Allocation Engine
//!
//! Turns per-instrument model probabilities into:
//! - a discrete BUY / SELL / HOLD recommendation
//! - a normalized capital allocation across the candidate set
//!
//! PIPELINE:
//! VALIDATE → ALLOCATE (BUY-weighted | WATCH fallback) → VERIFY → RENDER
//!
//! The core (validator, classifier, allocation, pipeline) is synchronous and
//! pure; the store, audit log and API wrap it for service use.

pub mod allocation;
pub mod api;
pub mod audit;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod predictor;
pub mod store;
pub mod validator;
pub mod verification;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use allocation::{AllocationEngine, FALLBACK_TOP_N};
pub use classifier::RecommendationClassifier;
pub use pipeline::{render, SignalPipeline};
