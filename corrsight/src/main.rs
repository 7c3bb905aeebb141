//! Corrsight service binary.
//!
//! Two entry points behind one binary:
//! - `corrsight correlation` - the tiered correlation analyzer with its
//!   background analysis loop and read API
//! - `corrsight rca` - the RCA narrative engine with its on-demand
//!   /analyze API
//!
//! Each service runs single-instance: one background loop, one HTTP
//! server, graceful shutdown on SIGTERM/ctrl-c.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use corrsight_api::{
    correlation_router, exposition, rca_router, ApiConfig, CorrelationApiState, RcaApiState,
};
use corrsight_core::catalog::MetricCatalog;
use corrsight_core::config::{AnalyzerConfig, RcaConfig};
use corrsight_detection::prelude::*;
use corrsight_ingestion::fetch::SeriesFetcher;
use corrsight_ingestion::store::{MetricsStoreClient, MetricsStoreConfig};
use corrsight_rca::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Corrsight CLI arguments
#[derive(Debug, Parser)]
#[clap(name = "corrsight", version, about = "Metric correlation analysis and RCA narratives")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[clap(long, env = "CORRSIGHT_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging
    #[clap(long, env = "CORRSIGHT_LOG_JSON", global = true)]
    log_json: bool,

    #[clap(subcommand)]
    command: Commands,
}

/// Available services
#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the correlation analyzer service
    Correlation {
        /// Metrics store base URL
        #[clap(long, env = "CORRSIGHT_METRICS_STORE_URL", default_value = "http://prometheus:9090")]
        metrics_store_url: String,

        /// Seconds between analysis ticks
        #[clap(long, env = "CORRSIGHT_ANALYSIS_INTERVAL_SECS", default_value_t = 60)]
        analysis_interval_secs: u64,

        /// Lookback window per tick, in minutes
        #[clap(long, env = "CORRSIGHT_LOOKBACK_MINUTES", default_value_t = 15)]
        lookback_minutes: i64,

        /// API bind address
        #[clap(long, env = "CORRSIGHT_CORRELATION_BIND", default_value = "0.0.0.0:5025")]
        bind: String,
    },
    /// Start the RCA narrative service
    Rca {
        /// Correlation analyzer base URL
        #[clap(
            long,
            env = "CORRSIGHT_CORRELATION_ENGINE_URL",
            default_value = "http://event-correlation-engine:5025"
        )]
        correlation_engine_url: String,

        /// Metrics store base URL
        #[clap(long, env = "CORRSIGHT_METRICS_STORE_URL", default_value = "http://prometheus:9090")]
        metrics_store_url: String,

        /// Reasoning service base URL
        #[clap(long, env = "CORRSIGHT_REASONING_ENDPOINT", default_value = "https://api.openai.com")]
        reasoning_endpoint: String,

        /// Reasoning model identifier
        #[clap(long, env = "CORRSIGHT_REASONING_MODEL", default_value = "gpt-4o")]
        reasoning_model: String,

        /// Reasoning service credential (empty runs in template mode)
        #[clap(long, env = "CORRSIGHT_REASONING_API_KEY", default_value = "", hide_env_values = true)]
        reasoning_api_key: String,

        /// API bind address
        #[clap(long, env = "CORRSIGHT_RCA_BIND", default_value = "0.0.0.0:5026")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    info!("Starting Corrsight v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Correlation {
            metrics_store_url,
            analysis_interval_secs,
            lookback_minutes,
            bind,
        } => {
            let config = AnalyzerConfig {
                metrics_store_url,
                analysis_interval_secs,
                lookback_minutes,
                bind_addr: bind,
                ..AnalyzerConfig::default()
            };
            run_correlation_service(config).await
        }
        Commands::Rca {
            correlation_engine_url,
            metrics_store_url,
            reasoning_endpoint,
            reasoning_model,
            reasoning_api_key,
            bind,
        } => {
            let config = RcaConfig {
                correlation_engine_url,
                metrics_store_url,
                reasoning_endpoint,
                reasoning_model,
                reasoning_api_key,
                bind_addr: bind,
                ..RcaConfig::default()
            };
            run_rca_service(config).await
        }
    }
}

/// Run the correlation analyzer: background analysis loop plus read API
async fn run_correlation_service(config: AnalyzerConfig) -> Result<()> {
    config.validate().context("Invalid analyzer configuration")?;

    let exposition_handle =
        exposition::install_recorder().map_err(|e| anyhow::anyhow!(e))?;

    let store = MetricsStoreClient::new(MetricsStoreConfig {
        base_url: config.metrics_store_url.clone(),
        step_secs: config.step_secs,
        range_timeout: Duration::from_secs(config.range_timeout_secs),
        instant_timeout: Duration::from_secs(config.instant_timeout_secs),
    });
    let fetcher = SeriesFetcher::new(store.clone());
    let history = Arc::new(AnalysisHistory::new(config.history_capacity));

    let analyzer = Arc::new(CorrelationAnalyzer::new(
        Arc::new(fetcher),
        MetricCatalog::default(),
        config.clone(),
        Arc::new(PrometheusSink::new()),
        history,
    ));

    let analysis_running = Arc::new(AtomicBool::new(false));
    let loop_handle = tokio::spawn(analysis_loop(
        analyzer.clone(),
        store.clone(),
        analysis_running.clone(),
    ));

    let state = Arc::new(CorrelationApiState {
        analyzer,
        store,
        analysis_running,
    });
    let app = correlation_router(&ApiConfig::default(), state, exposition_handle);

    info!(bind = %config.bind_addr, "correlation analyzer listening");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("Failed to bind correlation service address")?;
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            result.context("Correlation API server failed")?;
        }
        result = loop_handle => {
            error!("analysis loop exited: {:?}", result);
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("Correlation analyzer stopped");
    Ok(())
}

/// The background analysis loop: one tick per interval, longer backoff
/// when the metrics store is unreachable.
async fn analysis_loop(
    analyzer: Arc<CorrelationAnalyzer>,
    store: MetricsStoreClient,
    running: Arc<AtomicBool>,
) {
    let interval = Duration::from_secs(analyzer.config().analysis_interval_secs);
    let backoff = Duration::from_secs(analyzer.config().error_backoff_secs);

    running.store(true, Ordering::Relaxed);
    info!(
        interval_secs = interval.as_secs(),
        "analysis loop started"
    );

    loop {
        if !store.is_reachable().await {
            warn!(
                backoff_secs = backoff.as_secs(),
                "metrics store unreachable, backing off"
            );
            tokio::time::sleep(backoff).await;
            continue;
        }

        analyzer.run_tick(chrono::Utc::now()).await;
        tokio::time::sleep(interval).await;
    }
}

/// Run the RCA narrative engine: startup self-test plus on-demand API
async fn run_rca_service(config: RcaConfig) -> Result<()> {
    config.validate().context("Invalid RCA configuration")?;

    let exposition_handle =
        exposition::install_recorder().map_err(|e| anyhow::anyhow!(e))?;

    let store = MetricsStoreClient::new(MetricsStoreConfig {
        base_url: config.metrics_store_url.clone(),
        instant_timeout: Duration::from_secs(config.instant_timeout_secs),
        ..MetricsStoreConfig::default()
    });

    // The dispatch path is fixed here, once, for the process lifetime
    let generator = NarrativeGenerator::initialize(&config).await;
    info!(
        reasoning_status = generator.status().as_str(),
        live = generator.is_live(),
        "narrative generator initialized"
    );

    let pipeline = Arc::new(RcaPipeline::new(ContextBuilder::new(store), generator));
    let engine = CorrelationEngineClient::new(config.correlation_engine_url.clone());

    let state = Arc::new(RcaApiState {
        pipeline,
        engine,
        config: config.clone(),
    });
    let app = rca_router(&ApiConfig::default(), state, exposition_handle);

    info!(bind = %config.bind_addr, "RCA narrative engine listening");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("Failed to bind RCA service address")?;
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            result.context("RCA API server failed")?;
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    info!("RCA narrative engine stopped");
    Ok(())
}

/// Wait for SIGTERM or ctrl-c
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("Received Ctrl+C, shutting down..."); },
        _ = terminate => { info!("Received SIGTERM, shutting down..."); },
    }
}

/// Initialize logging based on CLI arguments
fn init_logging(cli: &Cli) -> Result<()> {
    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .context("Invalid log level")?;

    if cli.log_json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true),
            )
            .with(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(log_level.into()),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .with(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(log_level.into()),
            )
            .init();
    }

    Ok(())
}
