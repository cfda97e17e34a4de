use once_cell::sync::Lazy;
use regex::Regex;

use crate::analysis::domains::DomainClassification;
use crate::analysis::keywords::KeywordSet;
use crate::analysis::readme::analyze_readme;
use crate::models::profile::{Dependency, Repository};
use crate::models::report::{ProjectAnalysis, ProjectType};

pub const MAX_DESCRIPTION_WORDS: usize = 15;
const MAX_TECHNOLOGIES: usize = 6;

/// First matching rule wins; `WebApp` is the fallback.
static PROJECT_TYPE_RULES: Lazy<Vec<(ProjectType, Regex)>> = Lazy::new(|| {
    [
        (ProjectType::ApiService, r"\b(api|apis|backend|microservices?|rest|graphql|server)\b"),
        (ProjectType::Library, r"\b(library|lib|sdk|package|crate|module|plugin)\b"),
        (ProjectType::CliTool, r"\b(cli|command line|command-line|terminal|tool|tools)\b"),
        (ProjectType::MobileApp, r"\b(mobile|android|ios|flutter|react native|expo)\b"),
        (ProjectType::AiModel, r"\b(model|models|training|dataset|neural|deep learning|llm)\b"),
        (ProjectType::DataAnalysis, r"\b(notebook|notebooks|jupyter|analysis|analytics|eda)\b"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).unwrap()))
    .collect()
});

pub fn infer_project_type(repo: &Repository) -> ProjectType {
    let text = format!(
        "{} {} {}",
        repo.name.replace(['-', '_'], " "),
        repo.description.as_deref().unwrap_or_default(),
        repo.topics.join(" ").replace('-', " "),
    )
    .to_lowercase();

    PROJECT_TYPE_RULES
        .iter()
        .find(|(_, re)| re.is_match(&text))
        .map(|(kind, _)| *kind)
        .unwrap_or(ProjectType::WebApp)
}

/// Top two languages, then frameworks, then other technical keywords.
pub fn technologies_used(repo: &Repository, frameworks: &[Dependency], keywords: &KeywordSet) -> Vec<String> {
    let mut languages: Vec<(&String, &f64)> = repo.languages.percentages.iter().collect();
    languages.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let candidates = languages
        .into_iter()
        .take(2)
        .map(|(name, _)| name.clone())
        .chain(frameworks.iter().map(|d| d.name.clone()))
        .chain(
            keywords
                .technical
                .iter()
                .filter(|k| k.category.as_deref() != Some("Language"))
                .map(|k| k.term.clone()),
        );

    let mut out: Vec<String> = Vec::new();
    for tech in candidates {
        if !out.iter().any(|t| t.eq_ignore_ascii_case(&tech)) {
            out.push(tech);
        }
        if out.len() == MAX_TECHNOLOGIES {
            break;
        }
    }
    out
}

/// One sentence of at most 15 words: the repository description when it has one,
/// otherwise composed from the domain and the leading technologies.
pub fn crisp_description(description: Option<&str>, domain: &str, technologies: &[String]) -> String {
    if let Some(desc) = description.map(str::trim).filter(|d| !d.is_empty()) {
        let sentence = desc
            .split(". ")
            .next()
            .unwrap_or(desc)
            .trim_end_matches('.')
            .trim();
        let words: Vec<&str> = sentence.split_whitespace().collect();
        if words.len() <= MAX_DESCRIPTION_WORDS {
            return words.join(" ");
        }
        return format!("{}...", words[..MAX_DESCRIPTION_WORDS].join(" "));
    }

    match technologies {
        [] => format!("{domain} project"),
        [only] => format!("{domain} project using {only}"),
        [first, second, ..] => format!("{domain} project using {first} and {second}"),
    }
}

pub fn analyze_project(
    repo: &Repository,
    frameworks: Vec<Dependency>,
    keywords: KeywordSet,
    classification: DomainClassification,
) -> ProjectAnalysis {
    let technologies = technologies_used(repo, &frameworks, &keywords);
    let description = crisp_description(
        repo.description.as_deref(),
        &classification.primary_domain,
        &technologies,
    );
    ProjectAnalysis {
        name: repo.name.clone(),
        html_url: repo.html_url.clone(),
        stars: repo.stars,
        project_type: infer_project_type(repo),
        description,
        technologies,
        frameworks,
        keywords,
        readme_skills: repo.readme.as_ref().map(|r| analyze_readme(&r.content)).unwrap_or_default(),
        classification,
        days_since_last_commit: repo.days_since_last_commit,
        partial_sections: repo.partial_sections.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::Utc;

    use crate::analysis::keywords::{Keyword, KeywordSource};
    use crate::models::profile::{DependencyKind, Ecosystem, LanguageStats};

    fn repo(name: &str, description: Option<&str>, topics: &[&str]) -> Repository {
        let now = Utc::now();
        Repository {
            name: name.to_string(),
            full_name: format!("octo/{name}"),
            html_url: format!("https://github.com/octo/{name}"),
            description: description.map(str::to_string),
            language: Some("Python".to_string()),
            languages: LanguageStats::from_bytes(BTreeMap::from([
                ("Python".to_string(), 800),
                ("Shell".to_string(), 150),
                ("Dockerfile".to_string(), 50),
            ])),
            stars: 3,
            forks: 0,
            watchers: 3,
            open_issues: 0,
            size_kb: 120,
            has_wiki: false,
            has_projects: false,
            is_fork: false,
            archived: false,
            default_branch: "main".to_string(),
            created_at: now,
            updated_at: now,
            pushed_at: Some(now),
            days_since_last_commit: Some(0),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            readme: None,
            markdown_files: vec![],
            dependencies: vec![],
            production_signals: vec![],
            partial_sections: vec![],
        }
    }

    #[test]
    fn test_project_type_inference() {
        assert_eq!(
            infer_project_type(&repo("orders", Some("REST API for order management"), &[])),
            ProjectType::ApiService
        );
        assert_eq!(
            infer_project_type(&repo("pyfoo", Some("A tiny parsing library"), &[])),
            ProjectType::Library
        );
        assert_eq!(
            infer_project_type(&repo("todo-cli", None, &[])),
            ProjectType::CliTool
        );
        assert_eq!(
            infer_project_type(&repo("shop", Some("Grocery delivery"), &["react-native"])),
            ProjectType::MobileApp
        );
        assert_eq!(
            infer_project_type(&repo("titanic", Some("Exploratory notebooks"), &[])),
            ProjectType::DataAnalysis
        );
        assert_eq!(
            infer_project_type(&repo("portfolio", Some("My personal site"), &[])),
            ProjectType::WebApp
        );
    }

    #[test]
    fn test_short_pattern_does_not_match_inside_words() {
        // "rapid" contains "api"
        assert_eq!(
            infer_project_type(&repo("landing", Some("rapid prototyping page"), &[])),
            ProjectType::WebApp
        );
    }

    #[test]
    fn test_crisp_description_uses_first_sentence() {
        assert_eq!(
            crisp_description(Some("Fast queue. Supports retries."), "Software Development", &[]),
            "Fast queue"
        );
    }

    #[test]
    fn test_crisp_description_truncates_to_fifteen_words() {
        let long = "one two three four five six seven eight nine ten eleven twelve thirteen fourteen fifteen sixteen";
        let out = crisp_description(Some(long), "Gaming", &[]);
        assert_eq!(out.trim_end_matches("...").split_whitespace().count(), MAX_DESCRIPTION_WORDS);
        assert!(out.ends_with("fifteen..."));
    }

    #[test]
    fn test_crisp_description_without_repo_description() {
        let techs = vec!["Python".to_string(), "django".to_string(), "Docker".to_string()];
        assert_eq!(
            crisp_description(None, "Healthcare", &techs),
            "Healthcare project using Python and django"
        );
        assert_eq!(crisp_description(Some("  "), "Gaming", &[]), "Gaming project");
    }

    #[test]
    fn test_technologies_dedupe_and_cap() {
        let r = repo("api", None, &[]);
        let frameworks = vec![Dependency {
            name: "django".to_string(),
            ecosystem: Ecosystem::Pypi,
            version: "4.2".to_string(),
            kind: DependencyKind::Production,
            source_file: "requirements.txt".to_string(),
        }];
        let kw = |term: &str, category: &str| Keyword {
            term: term.to_string(),
            confidence: 0.9,
            sources: vec![KeywordSource::Readme],
            category: Some(category.to_string()),
        };
        let keywords = KeywordSet {
            technical: vec![
                kw("Python", "Language"),
                kw("Django", "Backend Framework"),
                kw("PostgreSQL", "Database"),
                kw("Redis", "Database"),
                kw("Docker", "DevOps & Cloud"),
                kw("Celery", "Backend Framework"),
            ],
            domain: vec![],
            feature: vec![],
        };
        let techs = technologies_used(&r, &frameworks, &keywords);
        assert_eq!(techs[..3], ["Python", "Shell", "django"]);
        assert_eq!(techs.len(), MAX_TECHNOLOGIES);
        assert!(!techs.iter().any(|t| t == "Django"));
    }
}
