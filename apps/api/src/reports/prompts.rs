// Prompts for the report narrative.
// Reuses cross-cutting fragments from llm_client::prompts.

use serde_json::json;

use crate::llm_client::prompts::{EVIDENCE_INSTRUCTION, JSON_ONLY_SYSTEM};
use crate::models::report::CandidateReport;

const MAX_PROMPT_PROJECTS: usize = 10;
const MAX_PROMPT_SKILLS: usize = 12;

pub fn narrative_system() -> String {
    format!(
        "You are a technical recruiter summarizing a developer's public GitHub work for a hiring team. \
        {JSON_ONLY_SYSTEM} {EVIDENCE_INSTRUCTION}"
    )
}

const NARRATIVE_INSTRUCTIONS: &str = r#"Write a short hiring narrative for the candidate described by the analysis below.

Return a JSON object with this EXACT schema (no extra fields):
{
  "executive_summary": "2-3 sentences on who the candidate is and what they build",
  "strengths": ["one concrete strength per entry, citing a project or metric"],
  "concerns": ["one concrete gap or risk per entry"],
  "hiring_summary": "1-2 sentences: recommended role, seniority and next step"
}

Keep the recommended role and seniority consistent with the hiring recommendation in the data.
At most 5 strengths and 5 concerns."#;

/// The deterministic report, trimmed to what the narrative needs.
pub fn narrative_prompt(report: &CandidateReport) -> String {
    let projects: Vec<_> = report
        .projects
        .iter()
        .take(MAX_PROMPT_PROJECTS)
        .map(|p| {
            json!({
                "name": p.name,
                "type": p.project_type.label(),
                "description": p.description,
                "stars": p.stars,
                "technologies": p.technologies,
                "domain": p.classification.primary_domain,
                "days_since_last_commit": p.days_since_last_commit,
            })
        })
        .collect();

    let skills: Vec<&str> = report
        .skills
        .iter()
        .take(MAX_PROMPT_SKILLS)
        .map(|s| s.name.as_str())
        .collect();

    let tools: Vec<&str> = report
        .skill_groups
        .tools_and_platforms
        .iter()
        .take(MAX_PROMPT_SKILLS)
        .map(|s| s.name.as_str())
        .collect();

    let hiring = &report.hiring_recommendation;
    let context = json!({
        "username": report.username,
        "name": report.profile.name,
        "bio": report.profile.bio,
        "account_age_years": report.metrics.account_age_years,
        "followers": report.profile.followers,
        "domain": report.domain_analysis,
        "skills": skills,
        "tools": tools,
        "projects": projects,
        "metrics": {
            "total_repos": report.metrics.total_repos,
            "total_stars": report.metrics.total_stars,
            "documentation_percentage": report.metrics.documentation_percentage,
            "active_repos": report.metrics.active_repos,
            "days_since_last_commit": report.metrics.days_since_last_commit,
            "production_signals": report.metrics.production_signals,
        },
        "scores": {
            "technical_assessment": report.technical_assessment.score,
            "code_quality": report.code_quality.score,
            "hiring": hiring.overall_score,
        },
        "hiring_recommendation": {
            "primary_role": hiring.primary_role,
            "seniority_fit": hiring.seniority_fit,
            "green_flags": hiring.green_flags,
            "red_flags": hiring.red_flags,
        },
    });

    format!("{NARRATIVE_INSTRUCTIONS}\n\nANALYSIS DATA:\n{context:#}")
}
