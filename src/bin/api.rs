use signal_allocation_engine::{
    api::{start_server, ApiState},
    audit::AuditLog,
    config::AppConfig,
    predictor::{LogisticModel, SignalPredictor},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_writer(std::io::stderr)
        .init();

    info!("Signal Allocation Engine - API Server");
    info!("Port: {}", config.port);

    let predictor = match LogisticModel::from_json(&config.model_path) {
        Ok(model) => {
            info!(model_path = %config.model_path.display(), "Model loaded");
            Some(SignalPredictor::new(Arc::new(model)))
        }
        Err(e) => {
            warn!(error = %e, "Serving without a model; /api/v1/predict disabled");
            None
        }
    };

    let state =
        ApiState::new(predictor).with_audit_log(AuditLog::with_capacity(config.audit_capacity));

    start_server(state, config.port).await?;

    Ok(())
}
