// Cross-cutting prompt fragments. Each service that calls an LLM keeps its own
// prompts.rs next to it.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps narrative output tied to the numbers it is given.
pub const EVIDENCE_INSTRUCTION: &str = "\
    Base every statement on the analysis data provided. \
    Do NOT invent employers, projects, metrics or technologies that are not in the data. \
    If the data does not support a claim, leave it out.";
