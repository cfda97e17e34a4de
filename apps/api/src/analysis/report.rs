//! Report assembler: runs the per-repository pipeline and merges the results
//! into one candidate report.
//!
//! The report is a pure function of the snapshot. Every time-dependent value is
//! computed against `snapshot.analyzed_at`, so a stored snapshot reproduces the
//! report of the fresh fetch that created it.

use std::collections::{BTreeMap, HashMap};

use crate::analysis::domains::{classify, ClassifierWeights, RepoMetadata};
use crate::analysis::frameworks::filter_frameworks;
use crate::analysis::keywords::{extract_keywords, KeywordBudget, RepoSignals};
use crate::analysis::projects::analyze_project;
use crate::analysis::roles;
use crate::analysis::rules::RuleBook;
use crate::analysis::scoring::{compute_metrics, compute_scores, ProfileMetrics, ScoreFactors, Scores, ScoringWeights};
use crate::analysis::skills::skill_groups;
use crate::models::profile::{Dependency, Repository};
use crate::models::report::{
    Assessment, CandidateReport, DomainAnalysis, DomainCount, ProjectAnalysis, Skill,
};
use crate::models::snapshot::AnalysisSnapshot;

const MAX_CANDIDATE_SECONDARY: usize = 3;
const MAX_CANDIDATE_SPECIALIZATIONS: usize = 5;

pub struct ReportAssembler<'a> {
    rules: &'a RuleBook,
    budget: KeywordBudget,
    classifier: ClassifierWeights,
    scoring: ScoringWeights,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(rules: &'a RuleBook, budget: KeywordBudget) -> Self {
        Self {
            rules,
            budget,
            classifier: ClassifierWeights::default(),
            scoring: ScoringWeights::default(),
        }
    }

    pub fn analyze_repository(&self, repo: &Repository) -> ProjectAnalysis {
        let frameworks = filter_frameworks(&repo.dependencies, self.rules);
        let keywords = extract_keywords(&RepoSignals::new(repo, &frameworks), self.rules, &self.budget);
        let classification = classify(&keywords, &RepoMetadata::of(repo), self.rules, &self.classifier);
        analyze_project(repo, frameworks, keywords, classification)
    }

    pub fn assemble(&self, snapshot: &AnalysisSnapshot) -> CandidateReport {
        let projects: Vec<ProjectAnalysis> = snapshot
            .repositories
            .iter()
            .map(|r| self.analyze_repository(r))
            .collect();

        let metrics = compute_metrics(&snapshot.profile, &snapshot.repositories, snapshot.analyzed_at);
        let scores = compute_scores(&ScoreFactors::from_metrics(&metrics), &self.scoring);
        let domain_analysis = candidate_domains(&projects, self.rules);
        let top_language = top_language(&metrics);
        let frameworks = all_frameworks(&projects);

        let hiring_recommendation = roles::recommend(
            &domain_analysis.primary_domain,
            &frameworks,
            top_language.as_deref(),
            &scores,
            &metrics,
            self.rules,
        );

        let display_name = snapshot
            .profile
            .name
            .clone()
            .unwrap_or_else(|| snapshot.profile.login.clone());
        let executive_summary = format!(
            "{display_name} ({login}) fits {role} roles with a focus on {domain}. \
             {repos} repositories analyzed, {stars} stars in total, hiring score {hiring}/10 ({seniority}).",
            login = snapshot.profile.login,
            role = hiring_recommendation.primary_role,
            domain = domain_analysis.primary_domain,
            repos = metrics.total_repos,
            stars = metrics.total_stars,
            hiring = scores.hiring,
            seniority = hiring_recommendation.seniority_fit,
        );

        tracing::debug!(
            username = %snapshot.username,
            repositories = projects.len(),
            primary_domain = %domain_analysis.primary_domain,
            hiring = scores.hiring,
            "report assembled"
        );

        CandidateReport {
            username: snapshot.username.clone(),
            analyzed_at: snapshot.analyzed_at,
            profile: snapshot.profile.clone(),
            skills: skills(&projects),
            skill_groups: skill_groups(&snapshot.repositories, &projects, &metrics, &domain_analysis),
            partial_repositories: projects
                .iter()
                .filter(|p| !p.partial_sections.is_empty())
                .map(|p| p.name.clone())
                .collect(),
            technical_assessment: technical_assessment(&scores, &metrics),
            code_quality: code_quality(&scores, &metrics),
            projects,
            domain_analysis,
            metrics,
            hiring_recommendation,
            executive_summary,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Aggregation
// ────────────────────────────────────────────────────────────────────────────

struct DomainTally {
    repositories: usize,
    best_stars: u64,
    first_seen: usize,
}

/// Most frequent repository primary; ties go to the domain holding the
/// highest-starred repository, then to the one seen first.
pub fn candidate_domains(projects: &[ProjectAnalysis], rules: &RuleBook) -> DomainAnalysis {
    let mut tally: HashMap<&str, DomainTally> = HashMap::new();
    for (idx, p) in projects.iter().enumerate() {
        let t = tally
            .entry(p.classification.primary_domain.as_str())
            .or_insert(DomainTally {
                repositories: 0,
                best_stars: 0,
                first_seen: idx,
            });
        t.repositories += 1;
        t.best_stars = t.best_stars.max(p.stars);
    }

    let mut ranked: Vec<(&str, DomainTally)> = tally.into_iter().collect();
    ranked.sort_by(|(_, a), (_, b)| {
        b.repositories
            .cmp(&a.repositories)
            .then_with(|| b.best_stars.cmp(&a.best_stars))
            .then_with(|| a.first_seen.cmp(&b.first_seen))
    });

    let primary_domain = ranked
        .first()
        .map(|(d, _)| d.to_string())
        .unwrap_or_else(|| rules.default_domain.clone());
    let secondary_domains = ranked
        .iter()
        .skip(1)
        .map(|(d, _)| *d)
        .filter(|d| *d != rules.default_domain)
        .take(MAX_CANDIDATE_SECONDARY)
        .map(str::to_string)
        .collect();

    let mut spec_counts: Vec<(String, usize, usize)> = Vec::new();
    for tag in projects.iter().flat_map(|p| p.classification.specializations.iter()) {
        match spec_counts.iter_mut().find(|(t, _, _)| t == tag) {
            Some(entry) => entry.1 += 1,
            None => {
                let order = spec_counts.len();
                spec_counts.push((tag.clone(), 1, order));
            }
        }
    }
    spec_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.2.cmp(&b.2)));

    DomainAnalysis {
        primary_domain,
        secondary_domains,
        specializations: spec_counts
            .into_iter()
            .take(MAX_CANDIDATE_SPECIALIZATIONS)
            .map(|(t, _, _)| t)
            .collect(),
        distribution: ranked
            .iter()
            .map(|(d, t)| DomainCount {
                domain: d.to_string(),
                repositories: t.repositories,
            })
            .collect(),
    }
}

/// Every technical keyword across repositories, deduplicated case-insensitively,
/// by repository count then confidence.
pub fn skills(projects: &[ProjectAnalysis]) -> Vec<Skill> {
    let mut by_term: BTreeMap<String, Skill> = BTreeMap::new();
    for keyword in projects.iter().flat_map(|p| p.keywords.technical.iter()) {
        let skill = by_term
            .entry(keyword.term.to_lowercase())
            .or_insert_with(|| Skill {
                name: keyword.term.clone(),
                repositories: 0,
                confidence: 0.0,
                category: keyword.category.clone(),
            });
        skill.repositories += 1;
        skill.confidence = skill.confidence.max(keyword.confidence);
    }

    let mut skills: Vec<Skill> = by_term.into_values().collect();
    skills.sort_by(|a, b| {
        b.repositories
            .cmp(&a.repositories)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| a.name.cmp(&b.name))
    });
    skills
}

fn top_language(metrics: &ProfileMetrics) -> Option<String> {
    metrics
        .language_distribution
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(lang, _)| lang.clone())
}

fn all_frameworks(projects: &[ProjectAnalysis]) -> Vec<Dependency> {
    let mut out: Vec<Dependency> = Vec::new();
    for dep in projects.iter().flat_map(|p| p.frameworks.iter()) {
        if !out
            .iter()
            .any(|d| d.ecosystem == dep.ecosystem && d.name.eq_ignore_ascii_case(&dep.name))
        {
            out.push(dep.clone());
        }
    }
    out
}

fn technical_assessment(scores: &Scores, metrics: &ProfileMetrics) -> Assessment {
    let languages = metrics
        .language_distribution
        .values()
        .filter(|p| **p >= crate::analysis::keywords::MIN_LANGUAGE_SHARE)
        .count();
    Assessment {
        score: scores.technical_assessment,
        summary: format!(
            "{languages} languages with a meaningful share across {} repositories and {} stars.",
            metrics.total_repos, metrics.total_stars
        ),
    }
}

fn code_quality(scores: &Scores, metrics: &ProfileMetrics) -> Assessment {
    let recency = match metrics.days_since_last_commit {
        Some(d) => format!("last push {d} days ago"),
        None => "no pushes recorded".to_string(),
    };
    Assessment {
        score: scores.code_quality,
        summary: format!(
            "{}% of repositories documented with {} extra markdown files; {recency}.",
            metrics.documentation_percentage, metrics.markdown_files
        ),
    }
}
