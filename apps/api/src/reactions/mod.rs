// Reaction Generator: simulated voter reactions to a speech.
// All LLM calls go through llm_client; no direct Gemini calls here.

pub mod generator;
pub mod handlers;
pub mod models;
pub mod prompts;
