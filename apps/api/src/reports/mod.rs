// Candidate reports: deterministic assembly from a snapshot, plus an optional
// narrative from the first LLM provider that answers.

pub mod generator;
pub mod handlers;
pub mod prompts;
