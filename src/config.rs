//! Process configuration
//!
//! Read once at startup from the environment (after `.env` is loaded) and
//! passed explicitly to the collaborators that need it.

use crate::audit::DEFAULT_AUDIT_CAPACITY;
use crate::error::PipelineError;
use crate::Result;
use std::env;
use std::path::PathBuf;

const DEFAULT_MODEL_PATH: &str = "scripts/model.json";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub port: u16,
    pub log_filter: String,
    /// Optimizer runs kept by the in-memory audit log
    pub audit_capacity: usize,
}

impl AppConfig {
    /// Build from process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (tests pass a map here)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_path = lookup("MODEL_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));

        let port = match lookup("PORT").or_else(|| lookup("API_PORT")) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                PipelineError::Config(format!("Invalid port '{}': {}", raw, e))
            })?,
            None => DEFAULT_PORT,
        };

        let log_filter = lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let audit_capacity = match lookup("AUDIT_CAPACITY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(PipelineError::Config(format!(
                        "Invalid audit capacity '{}'",
                        raw
                    )))
                }
            },
            None => DEFAULT_AUDIT_CAPACITY,
        };

        Ok(Self {
            model_path,
            port,
            log_filter,
            audit_capacity,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            port: DEFAULT_PORT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }
}
