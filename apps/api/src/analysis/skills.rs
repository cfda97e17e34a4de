//! Structured skill groups: languages by usage, frameworks and libraries from
//! manifests and READMEs, tools and practices from READMEs, soft-skill and
//! domain indicators.

use crate::analysis::readme::ReadmeSkillCategory;
use crate::analysis::scoring::ProfileMetrics;
use crate::models::profile::Repository;
use crate::models::report::{DomainAnalysis, LanguageUsage, ProjectAnalysis, SkillEvidence, SkillGroups};

/// Documentation share above which consistent documentation counts as a soft skill.
const DOCUMENTATION_INDICATOR_PERCENT: f64 = 40.0;

pub fn skill_groups(
    repos: &[Repository],
    projects: &[ProjectAnalysis],
    metrics: &ProfileMetrics,
    domains: &DomainAnalysis,
) -> SkillGroups {
    let mut soft_skills_indicators = Vec::new();
    if metrics.documentation_percentage > DOCUMENTATION_INDICATOR_PERCENT {
        soft_skills_indicators.push(SkillEvidence {
            name: "Documentation".to_string(),
            category: "Practice".to_string(),
            evidence: format!(
                "{}% of repositories documented",
                metrics.documentation_percentage
            ),
        });
    }

    SkillGroups {
        programming_languages: programming_languages(repos, metrics),
        frameworks_and_libraries: frameworks_and_libraries(projects),
        tools_and_platforms: tools_and_platforms(projects),
        soft_skills_indicators,
        domain_expertise: domains
            .specializations
            .iter()
            .map(|s| SkillEvidence {
                name: s.clone(),
                category: "Domain".to_string(),
                evidence: "Project signatures".to_string(),
            })
            .collect(),
    }
}

fn programming_languages(repos: &[Repository], metrics: &ProfileMetrics) -> Vec<LanguageUsage> {
    let mut out: Vec<LanguageUsage> = metrics
        .language_distribution
        .iter()
        .map(|(name, pct)| LanguageUsage {
            name: name.clone(),
            usage_percentage: *pct,
            repositories: repos
                .iter()
                .filter(|r| r.languages.bytes.contains_key(name))
                .count(),
        })
        .collect();
    out.sort_by(|a, b| {
        b.usage_percentage
            .total_cmp(&a.usage_percentage)
            .then_with(|| a.name.cmp(&b.name))
    });
    out
}

/// Manifest frameworks first, then README frameworks and libraries that no
/// manifest declared.
fn frameworks_and_libraries(projects: &[ProjectAnalysis]) -> Vec<SkillEvidence> {
    let mut out: Vec<SkillEvidence> = Vec::new();
    for p in projects {
        for dep in &p.frameworks {
            push_unique(
                &mut out,
                SkillEvidence {
                    name: dep.name.clone(),
                    category: "Framework".to_string(),
                    evidence: format!("Declared in {} ({})", dep.source_file, p.name),
                },
            );
        }
    }
    for p in projects {
        for skill in p.readme_skills.iter().filter(|s| {
            matches!(s.category, ReadmeSkillCategory::Framework | ReadmeSkillCategory::Library)
        }) {
            push_unique(
                &mut out,
                SkillEvidence {
                    name: skill.name.clone(),
                    category: skill.category.label().to_string(),
                    evidence: format!("Mentioned in README ({}, {})", skill.source.label(), p.name),
                },
            );
        }
    }
    out
}

fn tools_and_platforms(projects: &[ProjectAnalysis]) -> Vec<SkillEvidence> {
    let mut out: Vec<SkillEvidence> = Vec::new();
    for p in projects {
        for skill in p.readme_skills.iter().filter(|s| {
            matches!(
                s.category,
                ReadmeSkillCategory::Tool | ReadmeSkillCategory::Database | ReadmeSkillCategory::Practice
            )
        }) {
            push_unique(
                &mut out,
                SkillEvidence {
                    name: skill.name.clone(),
                    category: skill.category.label().to_string(),
                    evidence: format!("Mentioned in README ({}, {})", skill.source.label(), p.name),
                },
            );
        }
    }
    out
}

/// First evidence wins; names compare case-insensitively.
fn push_unique(out: &mut Vec<SkillEvidence>, item: SkillEvidence) {
    if !out.iter().any(|e| e.name.eq_ignore_ascii_case(&item.name)) {
        out.push(item);
    }
}
