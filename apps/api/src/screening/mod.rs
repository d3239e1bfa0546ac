// Resume screening: text extraction, LLM parsing, rate-limited scoring and the
// task pipeline that drives them. All LLM calls go through llm_client.

pub mod archive;
pub mod extractor;
pub mod handlers;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod registry;
pub mod scorer;
pub mod task;
