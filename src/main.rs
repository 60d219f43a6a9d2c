//! Automated trading-signal pipeline for a binary-outcome prediction-market
//! exchange: orderbook-void detection, news/LLM analysis, and cross-venue
//! arbitrage feed a fee-aware Kelly sizer that either journals paper trades
//! or submits signed limit orders.

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use kalshi_signal_suite::config::Config;
use kalshi_signal_suite::error::GatewayError;
use kalshi_signal_suite::gateway::{ExchangeGateway, GatewayAuth};
use kalshi_signal_suite::llm::{LlmClient, OpenAiLlmClient};
use kalshi_signal_suite::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_tracing(&cfg) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(paper_trading = cfg.paper_trading, "starting signal-and-execution engine");

    let gateway = match build_gateway(&cfg) {
        Ok(gw) => gw,
        Err(e) => {
            tracing::error!(error = %e, "failed to construct exchange gateway");
            return ExitCode::FAILURE;
        }
    };

    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiLlmClient::new(cfg.llm_api_key.clone(), cfg.llm_model.clone()));

    let orchestrator = Orchestrator::new(cfg, gateway, llm).await;
    orchestrator.run().await;

    tracing::info!("shutdown complete");
    ExitCode::SUCCESS
}

/// Loads the Ed25519 signing key from a base64 seed or a raw 32-byte seed
/// file path, preferring the inline value when both are set. The path
/// variant expects the raw seed bytes, not a PEM-encoded key.
fn build_gateway(cfg: &Config) -> Result<ExchangeGateway, GatewayError> {
    let auth = if let Some(encoded) = &cfg.exchange_private_key_b64 {
        GatewayAuth::from_base64_seed(cfg.exchange_access_key_id.clone(), encoded)?
    } else if let Some(path) = &cfg.exchange_private_key_path {
        let bytes = std::fs::read(path)
            .map_err(|e| GatewayError::Config(format!("failed to read private key file {}: {e}", path.display())))?;
        GatewayAuth::from_seed_bytes(cfg.exchange_access_key_id.clone(), &bytes)?
    } else {
        return Err(GatewayError::Config(
            "no signing key configured: set EXCHANGE_PRIVATE_KEY_B64 or EXCHANGE_PRIVATE_KEY_PATH".into(),
        ));
    };
    ExchangeGateway::new(cfg.exchange_base_url.clone(), auth)
}

/// Mirrors suite output to stdout and `{log_dir}/suite.log`.
fn init_tracing(cfg: &Config) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(&cfg.log_dir)?;
    let file_appender = tracing_appender::rolling::never(&cfg.log_dir, "suite.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kalshi_signal_suite=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}
