use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::keywords::MIN_LANGUAGE_SHARE;
use crate::models::profile::{days_since, LanguageStats, Profile, Repository};
use crate::models::round1;

/// Repositories pushed within this many days count as active.
pub const ACTIVE_WINDOW_DAYS: i64 = 90;
/// Total stars at which popularity saturates.
pub const POPULARITY_STARS: f64 = 50.0;
/// Languages (at or above 5% share) at which diversity saturates.
pub const DIVERSITY_LANGUAGES: f64 = 5.0;

/// Raw numbers behind every score, computed as of the analysis timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetrics {
    pub total_repos: usize,
    pub total_stars: u64,
    pub total_forks: u64,
    pub repos_with_readme: usize,
    pub documented_repos: usize,
    pub documentation_percentage: f64,
    pub markdown_files: usize,
    pub days_since_last_commit: Option<i64>,
    pub active_repos: usize,
    pub account_age_years: f64,
    pub language_distribution: BTreeMap<String, f64>,
    pub production_signals: Vec<String>,
}

pub fn compute_metrics(profile: &Profile, repos: &[Repository], as_of: DateTime<Utc>) -> ProfileMetrics {
    let total_repos = repos.len();
    let documented_repos = repos.iter().filter(|r| r.has_documentation()).count();
    let push_ages: Vec<i64> = repos
        .iter()
        .filter_map(|r| r.pushed_at)
        .map(|p| days_since(p, as_of))
        .collect();

    let mut bytes: BTreeMap<String, u64> = BTreeMap::new();
    for repo in repos {
        for (lang, count) in &repo.languages.bytes {
            *bytes.entry(lang.clone()).or_default() += count;
        }
    }

    let mut signal_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for signal in repos.iter().flat_map(|r| r.production_signals.iter()) {
        *signal_counts.entry(signal.as_str()).or_default() += 1;
    }
    let mut production_signals: Vec<(&str, usize)> = signal_counts.into_iter().collect();
    production_signals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ProfileMetrics {
        total_repos,
        total_stars: repos.iter().map(|r| r.stars).sum(),
        total_forks: repos.iter().map(|r| r.forks).sum(),
        repos_with_readme: repos.iter().filter(|r| r.readme.is_some()).count(),
        documented_repos,
        documentation_percentage: percentage(documented_repos, total_repos),
        markdown_files: repos.iter().map(|r| r.markdown_files.len()).sum(),
        days_since_last_commit: push_ages.iter().min().copied(),
        active_repos: push_ages.iter().filter(|d| **d < ACTIVE_WINDOW_DAYS).count(),
        account_age_years: round1(((as_of - profile.created_at).num_days().max(0)) as f64 / 365.25),
        language_distribution: LanguageStats::from_bytes(bytes).percentages,
        production_signals: production_signals
            .into_iter()
            .map(|(s, _)| s.to_string())
            .collect(),
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round1(part as f64 / whole as f64 * 100.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Factors and weights
// ────────────────────────────────────────────────────────────────────────────

/// Normalized inputs to every score, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactors {
    pub language_diversity: f64,
    pub documentation: f64,
    pub recency: f64,
    pub popularity: f64,
}

impl ScoreFactors {
    pub fn from_metrics(metrics: &ProfileMetrics) -> Self {
        let languages = metrics
            .language_distribution
            .values()
            .filter(|pct| **pct >= MIN_LANGUAGE_SHARE)
            .count() as f64;
        Self {
            language_diversity: (languages / DIVERSITY_LANGUAGES).min(1.0),
            documentation: metrics.documentation_percentage / 100.0,
            recency: recency_factor(metrics.days_since_last_commit),
            popularity: (metrics.total_stars as f64 / POPULARITY_STARS).min(1.0),
        }
    }
}

/// Step function over days since the most recent push.
pub fn recency_factor(days_since_last_commit: Option<i64>) -> f64 {
    match days_since_last_commit {
        None => 0.0,
        Some(d) if d < 7 => 1.0,
        Some(d) if d < 30 => 0.8,
        Some(d) if d < 90 => 0.6,
        Some(d) if d < 365 => 0.3,
        Some(_) => 0.1,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorWeights {
    pub language_diversity: f64,
    pub documentation: f64,
    pub recency: f64,
    pub popularity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub technical: FactorWeights,
    pub quality: FactorWeights,
    pub hiring_technical: f64,
    pub hiring_quality: f64,
    pub hiring_recency: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            technical: FactorWeights {
                language_diversity: 0.35,
                documentation: 0.25,
                recency: 0.20,
                popularity: 0.20,
            },
            quality: FactorWeights {
                language_diversity: 0.15,
                documentation: 0.60,
                recency: 0.25,
                popularity: 0.0,
            },
            hiring_technical: 0.45,
            hiring_quality: 0.35,
            hiring_recency: 0.20,
        }
    }
}

/// Weighted sum of the factors, clamped to [0, 1].
pub fn compute_combined_score(factors: &ScoreFactors, weights: &FactorWeights) -> f64 {
    (weights.language_diversity * factors.language_diversity
        + weights.documentation * factors.documentation
        + weights.recency * factors.recency
        + weights.popularity * factors.popularity)
        .clamp(0.0, 1.0)
}

/// The three headline scores on a 0-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub technical_assessment: f64,
    pub code_quality: f64,
    pub hiring: f64,
}

pub fn compute_scores(factors: &ScoreFactors, weights: &ScoringWeights) -> Scores {
    let technical = 10.0 * compute_combined_score(factors, &weights.technical);
    let quality = 10.0 * compute_combined_score(factors, &weights.quality);
    let hiring = weights.hiring_technical * technical
        + weights.hiring_quality * quality
        + weights.hiring_recency * 10.0 * factors.recency;

    Scores {
        technical_assessment: round1(technical.clamp(0.0, 10.0)),
        code_quality: round1(quality.clamp(0.0, 10.0)),
        hiring: round1(hiring.clamp(0.0, 10.0)),
    }
}
