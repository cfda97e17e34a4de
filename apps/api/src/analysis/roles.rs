//! Hiring recommendation: role selection, flags, and the bracketed verdicts
//! derived from the headline scores.

use crate::analysis::rules::RuleBook;
use crate::analysis::scoring::{ProfileMetrics, Scores};
use crate::models::profile::Dependency;
use crate::models::report::HiringRecommendation;

pub const FALLBACK_ROLE: &str = "Software Engineer";

/// Picks `(role, suitable_roles)`: framework family first, then the top language,
/// then the domain's role, then the generic fallback.
pub fn select_role(
    frameworks: &[Dependency],
    top_language: Option<&str>,
    domain: &str,
    rules: &RuleBook,
) -> (String, Vec<String>) {
    let segments: Vec<Vec<String>> = frameworks
        .iter()
        .map(|d| {
            let name = d.name.to_lowercase();
            let mut parts: Vec<String> = name
                .split('/')
                .map(|s| s.trim_start_matches('@').to_string())
                .collect();
            parts.push(name);
            parts
        })
        .collect();

    if let Some(family) = rules
        .role_families
        .iter()
        .find(|f| f.frameworks.iter().any(|fw| segments.iter().any(|s| s.contains(fw))))
    {
        return (family.role.clone(), family.suitable_roles.clone());
    }

    if let Some(lang) = top_language.map(str::to_lowercase) {
        if let Some(entry) = rules.language_roles.iter().find(|r| r.language == lang) {
            return (entry.role.clone(), entry.suitable_roles.clone());
        }
    }

    if let Some(rule) = rules.domain(domain).filter(|r| !r.role.is_empty()) {
        return (rule.role.clone(), rule.suitable_roles.clone());
    }

    (FALLBACK_ROLE.to_string(), vec![FALLBACK_ROLE.to_string()])
}

pub fn seniority(overall: f64) -> &'static str {
    if overall > 8.5 {
        "Senior"
    } else if overall > 6.5 {
        "Mid-level"
    } else {
        "Junior"
    }
}

pub fn salary_bracket(overall: f64) -> &'static str {
    if overall >= 8.0 {
        "Premium"
    } else if overall >= 6.0 {
        "Competitive"
    } else if overall >= 4.0 {
        "Standard"
    } else {
        "Entry-level"
    }
}

pub fn next_steps(overall: f64) -> Vec<String> {
    let mut steps = vec!["Technical Interview", "Code Review"];
    if overall >= 7.0 {
        steps.extend(["System Design Discussion", "Team Culture Fit"]);
    } else {
        steps.push("Coding Assignment");
    }
    steps.into_iter().map(str::to_string).collect()
}

/// How much evidence backs the verdict, read from documentation coverage.
pub fn confidence_level(metrics: &ProfileMetrics) -> &'static str {
    let pct = metrics.documentation_percentage;
    if pct > 60.0 {
        "Very High"
    } else if pct > 40.0 {
        "High"
    } else if pct > 20.0 {
        "Medium"
    } else {
        "Low"
    }
}

pub fn team_fit(metrics: &ProfileMetrics) -> &'static str {
    match metrics.total_forks {
        f if f > 5 => "Strong collaboration signals",
        f if f > 0 => "Some collaboration evidence",
        _ => "Verifiable code history",
    }
}

pub fn flags(domain: &str, overall: f64, metrics: &ProfileMetrics, rules: &RuleBook) -> (Vec<String>, Vec<String>) {
    let mut green = Vec::new();
    let mut red = Vec::new();

    if domain != rules.default_domain {
        green.push(format!("Specialized in {domain}"));
    }
    if overall >= 7.0 {
        green.push("High Technical Proficiency".to_string());
    }
    if metrics.documentation_percentage > 50.0 {
        green.push("Strong Documentation Practices".to_string());
    }
    if metrics.total_stars > 10 {
        green.push("Community Recognition".to_string());
    }
    if green.is_empty() {
        green.push("Demonstrated Domain Expertise".to_string());
    }

    // nothing pushed inside the active window
    if metrics.active_repos == 0 {
        red.push("Low Activity Consistency".to_string());
    }
    if metrics.documentation_percentage < 20.0 {
        red.push("Limited Documentation".to_string());
    }
    (green, red)
}

pub fn recommend(
    domain: &str,
    frameworks: &[Dependency],
    top_language: Option<&str>,
    scores: &Scores,
    metrics: &ProfileMetrics,
    rules: &RuleBook,
) -> HiringRecommendation {
    let overall = scores.hiring;
    let (primary_role, suitable_roles) = select_role(frameworks, top_language, domain, rules);
    let (green_flags, red_flags) = flags(domain, overall, metrics, rules);
    let stack = top_language.unwrap_or("multiple technologies");

    tracing::debug!(role = %primary_role, overall, "role selected");

    HiringRecommendation {
        overall_score: overall,
        recommendation_summary: format!(
            "Candidate for {primary_role} positions with experience in {domain}. Primary stack: {stack}."
        ),
        primary_role,
        suitable_roles,
        seniority_fit: seniority(overall).to_string(),
        confidence_level: confidence_level(metrics).to_string(),
        team_fit_indicators: team_fit(metrics).to_string(),
        green_flags,
        red_flags,
        salary_bracket_suggestion: salary_bracket(overall).to_string(),
        next_steps: next_steps(overall),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::models::profile::{DependencyKind, Ecosystem};

    fn rules() -> RuleBook {
        RuleBook::builtin().unwrap()
    }

    fn dep(name: &str, ecosystem: Ecosystem) -> Dependency {
        Dependency {
            name: name.to_string(),
            ecosystem,
            version: "*".to_string(),
            kind: DependencyKind::Production,
            source_file: "manifest".to_string(),
        }
    }

    fn metrics(doc_pct: f64, stars: u64, forks: u64, active: usize) -> ProfileMetrics {
        ProfileMetrics {
            total_repos: 4,
            total_stars: stars,
            total_forks: forks,
            repos_with_readme: 2,
            documented_repos: 2,
            documentation_percentage: doc_pct,
            markdown_files: 0,
            days_since_last_commit: Some(3),
            active_repos: active,
            account_age_years: 3.0,
            language_distribution: BTreeMap::new(),
            production_signals: vec![],
        }
    }

    #[test]
    fn test_framework_family_beats_language() {
        let (role, roles) = select_role(
            &[dep("react-native", Ecosystem::Npm), dep("react", Ecosystem::Npm)],
            Some("TypeScript"),
            "Software Development",
            &rules(),
        );
        assert_eq!(role, "Mobile Developer");
        assert!(roles.contains(&"Mobile Developer".to_string()));
    }

    #[test]
    fn test_language_role_when_no_framework() {
        let (role, _) = select_role(&[], Some("Python"), "Healthcare", &rules());
        assert_eq!(role, "Python Developer");
    }

    #[test]
    fn test_domain_role_when_language_unknown() {
        let (role, _) = select_role(&[], Some("COBOL"), "Healthcare", &rules());
        assert_eq!(role, "Healthcare Software Engineer");
    }

    #[test]
    fn test_fallback_role() {
        let (role, roles) = select_role(&[], None, "Not A Domain", &rules());
        assert_eq!(role, FALLBACK_ROLE);
        assert_eq!(roles, vec![FALLBACK_ROLE.to_string()]);
    }

    #[test]
    fn test_brackets() {
        assert_eq!(seniority(9.0), "Senior");
        assert_eq!(seniority(8.5), "Mid-level");
        assert_eq!(seniority(6.5), "Junior");
        assert_eq!(salary_bracket(8.0), "Premium");
        assert_eq!(salary_bracket(6.2), "Competitive");
        assert_eq!(salary_bracket(4.0), "Standard");
        assert_eq!(salary_bracket(1.0), "Entry-level");
        assert_eq!(next_steps(7.0).len(), 4);
        assert_eq!(next_steps(5.0)[2], "Coding Assignment");
    }

    #[test]
    fn test_flags_for_strong_profile() {
        let r = rules();
        let (green, red) = flags("Healthcare", 7.5, &metrics(80.0, 40, 2, 3), &r);
        assert_eq!(
            green,
            vec![
                "Specialized in Healthcare",
                "High Technical Proficiency",
                "Strong Documentation Practices",
                "Community Recognition",
            ]
        );
        assert!(red.is_empty());
    }

    #[test]
    fn test_flags_for_weak_profile() {
        let r = rules();
        let (green, red) = flags(&r.default_domain.clone(), 2.0, &metrics(0.0, 0, 0, 0), &r);
        assert_eq!(green, vec!["Demonstrated Domain Expertise"]);
        assert_eq!(red, vec!["Low Activity Consistency", "Limited Documentation"]);
    }

    #[test]
    fn test_confidence_and_team_fit() {
        assert_eq!(confidence_level(&metrics(61.0, 0, 0, 1)), "Very High");
        assert_eq!(confidence_level(&metrics(20.0, 0, 0, 1)), "Low");
        assert_eq!(team_fit(&metrics(0.0, 0, 6, 1)), "Strong collaboration signals");
        assert_eq!(team_fit(&metrics(0.0, 0, 1, 1)), "Some collaboration evidence");
        assert_eq!(team_fit(&metrics(0.0, 0, 0, 1)), "Verifiable code history");
    }

    #[test]
    fn test_recommendation_is_populated() {
        let scores = Scores {
            technical_assessment: 6.0,
            code_quality: 5.0,
            hiring: 5.5,
        };
        let rec = recommend("Education", &[], Some("Rust"), &scores, &metrics(50.0, 3, 0, 1), &rules());
        assert_eq!(rec.overall_score, 5.5);
        assert_eq!(rec.seniority_fit, "Junior");
        assert!(!rec.suitable_roles.is_empty());
        assert!(rec.recommendation_summary.contains("Education"));
    }
}
