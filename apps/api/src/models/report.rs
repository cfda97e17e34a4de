use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::{Dependency, Profile};
use crate::analysis::domains::DomainClassification;
use crate::analysis::keywords::KeywordSet;
use crate::analysis::readme::ReadmeSkill;
use crate::analysis::scoring::ProfileMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectType {
    #[serde(rename = "API Service")]
    ApiService,
    #[serde(rename = "Library")]
    Library,
    #[serde(rename = "CLI Tool")]
    CliTool,
    #[serde(rename = "Mobile App")]
    MobileApp,
    #[serde(rename = "AI Model")]
    AiModel,
    #[serde(rename = "Data Analysis")]
    DataAnalysis,
    #[serde(rename = "Web App")]
    WebApp,
}

impl ProjectType {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectType::ApiService => "API Service",
            ProjectType::Library => "Library",
            ProjectType::CliTool => "CLI Tool",
            ProjectType::MobileApp => "Mobile App",
            ProjectType::AiModel => "AI Model",
            ProjectType::DataAnalysis => "Data Analysis",
            ProjectType::WebApp => "Web App",
        }
    }
}

/// Per-repository output of the classifier pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    pub name: String,
    pub html_url: String,
    pub stars: u64,
    pub project_type: ProjectType,
    /// One sentence, at most 15 words.
    pub description: String,
    pub technologies: Vec<String>,
    pub frameworks: Vec<Dependency>,
    pub keywords: KeywordSet,
    /// Install commands, imports, badges and fence languages found in the README.
    pub readme_skills: Vec<ReadmeSkill>,
    pub classification: DomainClassification,
    pub days_since_last_commit: Option<i64>,
    pub partial_sections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    /// Repositories the skill was extracted from.
    pub repositories: usize,
    pub confidence: f64,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageUsage {
    pub name: String,
    /// Share of the language across all repositories, one decimal.
    pub usage_percentage: f64,
    pub repositories: usize,
}

/// A grouped skill and where it was seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEvidence {
    pub name: String,
    pub category: String,
    pub evidence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillGroups {
    pub programming_languages: Vec<LanguageUsage>,
    pub frameworks_and_libraries: Vec<SkillEvidence>,
    pub tools_and_platforms: Vec<SkillEvidence>,
    pub soft_skills_indicators: Vec<SkillEvidence>,
    pub domain_expertise: Vec<SkillEvidence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCount {
    pub domain: String,
    pub repositories: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainAnalysis {
    pub primary_domain: String,
    pub secondary_domains: Vec<String>,
    pub specializations: Vec<String>,
    pub distribution: Vec<DomainCount>,
}

/// A 0-10 score with the sentence that explains it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub score: f64,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiringRecommendation {
    pub overall_score: f64,
    pub primary_role: String,
    pub suitable_roles: Vec<String>,
    pub seniority_fit: String,
    pub confidence_level: String,
    pub team_fit_indicators: String,
    pub green_flags: Vec<String>,
    pub red_flags: Vec<String>,
    pub salary_bracket_suggestion: String,
    pub recommendation_summary: String,
    pub next_steps: Vec<String>,
}

/// Deterministic candidate report. Identical snapshots produce identical reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub username: String,
    pub analyzed_at: DateTime<Utc>,
    pub profile: Profile,
    pub projects: Vec<ProjectAnalysis>,
    pub skills: Vec<Skill>,
    pub skill_groups: SkillGroups,
    pub domain_analysis: DomainAnalysis,
    pub metrics: ProfileMetrics,
    pub technical_assessment: Assessment,
    pub code_quality: Assessment,
    pub hiring_recommendation: HiringRecommendation,
    pub executive_summary: String,
    pub partial_repositories: Vec<String>,
}

/// Narrative an LLM provider adds on top of the deterministic report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Narrative {
    pub executive_summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
    pub hiring_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: String,
}

/// Body of `POST /reports/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report_type: String,
    /// `"template"` when no provider produced a narrative.
    pub provider: String,
    pub model: Option<String>,
    pub from_snapshot: bool,
    pub generated_at: DateTime<Utc>,
    pub report: CandidateReport,
    pub narrative: Option<Narrative>,
    pub provider_failures: Vec<ProviderFailure>,
}
