// Shared prompt fragments. Each service that calls the LLM keeps its own
// templates in a prompts.rs alongside it.

pub const PING_SYSTEM: &str = "You are a connectivity check. Reply with one short sentence.";
