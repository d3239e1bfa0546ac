use std::sync::Arc;

use crate::llm_client::LlmClient;
use crate::rate_limit::ClientRateLimiter;
use crate::screening::extractor::TextExtractor;
use crate::screening::orchestrator::Orchestrator;
use crate::screening::parser::ResumeParser;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    /// Same collaborators the pipeline uses, exposed for the diagnostic endpoints.
    pub extractor: Arc<dyn TextExtractor>,
    pub parser: Arc<dyn ResumeParser>,
    pub llm: LlmClient,
    pub root_limiter: Arc<ClientRateLimiter>,
}
