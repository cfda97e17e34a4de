//! Domain classification: a generic weighted-overlap scorer over the rule book.
//!
//! A domain's score is the confidence-weighted count of extracted keywords that hit
//! its keyword list, plus raw description/topic/name hits, multiplied by the domain's
//! priority weight. Domain keywords count more than technical or feature keywords.

use serde::{Deserialize, Serialize};

use crate::analysis::keywords::{Keyword, KeywordSet};
use crate::analysis::rules::{DomainRule, RuleBook};
use crate::models::profile::Repository;

pub const MAX_SECONDARY_DOMAINS: usize = 3;
pub const MAX_SPECIALIZATIONS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierWeights {
    pub domain_keyword: f64,
    pub technical_keyword: f64,
    pub feature_keyword: f64,
    pub metadata: f64,
}

impl Default for ClassifierWeights {
    fn default() -> Self {
        Self {
            domain_keyword: 2.0,
            technical_keyword: 1.0,
            feature_keyword: 0.75,
            metadata: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    pub domain: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainClassification {
    pub primary_domain: String,
    pub secondary_domains: Vec<String>,
    pub specializations: Vec<String>,
    /// Every domain with a non-zero score, best first.
    pub evidence: Vec<DomainScore>,
}

/// Raw repository text that feeds the classifier alongside keywords.
#[derive(Debug, Clone, Copy)]
pub struct RepoMetadata<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub topics: &'a [String],
}

impl<'a> RepoMetadata<'a> {
    pub fn of(repo: &'a Repository) -> Self {
        Self {
            name: &repo.name,
            description: repo.description.as_deref(),
            topics: &repo.topics,
        }
    }

    fn text(&self) -> String {
        format!(
            "{} {} {}",
            self.description.unwrap_or_default(),
            self.topics.join(" ").replace('-', " "),
            self.name.replace(['-', '_'], " "),
        )
        .to_lowercase()
    }
}

fn keyword_overlap(rule: &DomainRule, keywords: &[Keyword], weight: f64) -> f64 {
    keywords
        .iter()
        .filter(|k| {
            let term = k.term.to_lowercase();
            rule.keywords.iter().any(|m| m.is_match(&term))
        })
        .map(|k| weight * k.confidence)
        .sum()
}

fn score_domain(
    rule: &DomainRule,
    keywords: &KeywordSet,
    metadata_text: &str,
    weights: &ClassifierWeights,
) -> f64 {
    let metadata_hits = rule
        .keywords
        .iter()
        .filter(|m| m.is_match(metadata_text))
        .count() as f64;

    let raw = keyword_overlap(rule, &keywords.domain, weights.domain_keyword)
        + keyword_overlap(rule, &keywords.technical, weights.technical_keyword)
        + keyword_overlap(rule, &keywords.feature, weights.feature_keyword)
        + weights.metadata * metadata_hits;

    ((raw * rule.weight) * 100.0).round() / 100.0
}

pub fn classify(
    keywords: &KeywordSet,
    metadata: &RepoMetadata<'_>,
    rules: &RuleBook,
    weights: &ClassifierWeights,
) -> DomainClassification {
    let text = metadata.text();

    let mut evidence: Vec<DomainScore> = rules
        .domains
        .iter()
        .map(|rule| DomainScore {
            domain: rule.name.clone(),
            score: score_domain(rule, keywords, &text, weights),
        })
        .filter(|s| s.score > 0.0)
        .collect();
    // stable: equal scores keep rule-book order
    evidence.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut qualifying = evidence
        .iter()
        .filter(|s| s.score >= rules.min_domain_score)
        .map(|s| s.domain.clone());

    let primary_domain = qualifying
        .next()
        .unwrap_or_else(|| rules.default_domain.clone());
    let secondary_domains = qualifying.take(MAX_SECONDARY_DOMAINS).collect();

    DomainClassification {
        primary_domain,
        secondary_domains,
        specializations: specializations(keywords),
        evidence,
    }
}

/// Technology families of the technical keywords, in keyword rank order.
fn specializations(keywords: &KeywordSet) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for category in keywords
        .technical
        .iter()
        .filter_map(|k| k.category.as_deref())
        .filter(|c| *c != "Language")
    {
        if !tags.iter().any(|t| t == category) {
            tags.push(category.to_string());
        }
    }
    tags.truncate(MAX_SPECIALIZATIONS);
    tags
}
