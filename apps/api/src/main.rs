mod config;
mod errors;
mod llm_client;
mod rate_limit;
mod routes;
mod screening;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::{BehaviorVersion, Region};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::screening::archive::S3ResumeArchive;
use crate::screening::extractor::{PdfTextExtractor, TextExtractor};
use crate::screening::orchestrator::Orchestrator;
use crate::screening::parser::{LlmResumeParser, ResumeParser};
use crate::screening::registry::InMemoryTaskStore;
use crate::screening::scorer::{BatchScorer, LlmCandidateScorer};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())
        .context("Failed to build LLM HTTP client")?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Pipeline collaborators
    let extractor: Arc<dyn TextExtractor> = Arc::new(PdfTextExtractor);
    let parser: Arc<dyn ResumeParser> = Arc::new(LlmResumeParser::new(llm.clone()));
    let scorer = Arc::new(BatchScorer::new(
        Arc::new(LlmCandidateScorer::new(llm.clone())),
        config.scoring_delay,
    ));
    info!(
        "Scoring delay {}s ({})",
        config.scoring_delay.as_secs(),
        scorer.processing_rate()
    );

    let mut orchestrator = Orchestrator::new(
        Arc::new(InMemoryTaskStore::new()),
        extractor.clone(),
        parser.clone(),
        scorer,
    );

    // Initialize S3 / MinIO archive when a bucket is configured
    if let Some(bucket) = &config.s3_bucket {
        let client = build_s3_client(&config).await;
        orchestrator = orchestrator.with_archive(Arc::new(S3ResumeArchive::new(
            client,
            bucket.clone(),
            config.aws_region.clone(),
        )));
        info!("Resume archive enabled (bucket: {bucket})");
    }

    let state = AppState {
        orchestrator,
        extractor,
        parser,
        llm,
        root_limiter: rate_limit::per_minute(config.root_rate_limit_per_minute),
    };

    let app = build_router(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(&config.cors_origins)?);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn build_cors(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin '{o}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::DELETE])
        .allow_headers(Any))
}

/// Constructs an S3 client for MinIO (when S3_ENDPOINT is set) or AWS.
/// Credentials come from the default provider chain.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()));
    if let Some(endpoint) = &config.s3_endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let s3_config = loader.load().await;

    aws_sdk_s3::Client::new(&s3_config)
}
