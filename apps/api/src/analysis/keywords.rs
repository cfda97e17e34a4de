//! Keyword extraction: technical, domain and feature keywords for one repository.
//!
//! Every term table in the rule book is matched against each text source
//! (topics, framework names, README, description, other markdown, repo name).
//! A term found in more sources gets a higher confidence. Languages holding at
//! least 5% of the code become technical keywords with their share as confidence.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::analysis::rules::{RuleBook, Term};
use crate::models::profile::{Dependency, LanguageStats, Repository};

pub const MIN_LANGUAGE_SHARE: f64 = 5.0;

/// Where a keyword was seen. Declaration order is tie-break priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordSource {
    Topics,
    Dependencies,
    Readme,
    Description,
    Docs,
    Name,
    Languages,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub term: String,
    pub confidence: f64,
    pub sources: Vec<KeywordSource>,
    /// Technology family for technical keywords ("Database", "Language", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordSet {
    pub technical: Vec<Keyword>,
    pub domain: Vec<Keyword>,
    pub feature: Vec<Keyword>,
}

impl KeywordSet {
    pub fn total(&self) -> usize {
        self.technical.len() + self.domain.len() + self.feature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Per-category share of the keyword cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordBudget {
    pub technical: usize,
    pub domain: usize,
    pub feature: usize,
    pub max_total: usize,
}

impl Default for KeywordBudget {
    fn default() -> Self {
        Self {
            technical: 7,
            domain: 4,
            feature: 4,
            max_total: 15,
        }
    }
}

impl KeywordBudget {
    /// Parses a `technical,domain,feature` split such as `7,4,4`.
    pub fn parse(max_total: usize, split: &str) -> Option<Self> {
        let parts: Vec<usize> = split
            .split(',')
            .map(|p| p.trim().parse().ok())
            .collect::<Option<_>>()?;
        match parts.as_slice() {
            [technical, domain, feature] => Some(Self {
                technical: *technical,
                domain: *domain,
                feature: *feature,
                max_total,
            }),
            _ => None,
        }
    }

    /// Slots per category given how many candidates each has.
    ///
    /// Every non-empty category gets one slot first, then its configured share,
    /// then leftover slots go round-robin to categories with candidates left.
    pub fn allocate(&self, available: [usize; 3]) -> [usize; 3] {
        let shares = [self.technical, self.domain, self.feature];
        let mut alloc = [0usize; 3];
        let mut budget = self.max_total;

        for i in 0..3 {
            if available[i] > 0 && budget > 0 {
                alloc[i] = 1;
                budget -= 1;
            }
        }
        for i in 0..3 {
            let extra = shares[i]
                .min(available[i])
                .saturating_sub(alloc[i])
                .min(budget);
            alloc[i] += extra;
            budget -= extra;
        }
        while budget > 0 && (0..3).any(|i| alloc[i] < available[i]) {
            for i in 0..3 {
                if budget > 0 && alloc[i] < available[i] {
                    alloc[i] += 1;
                    budget -= 1;
                }
            }
        }
        alloc
    }
}

/// The text signals of one repository.
#[derive(Debug, Clone)]
pub struct RepoSignals<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub readme: Option<&'a str>,
    pub docs: Vec<&'a str>,
    pub topics: &'a [String],
    pub languages: &'a LanguageStats,
    pub frameworks: &'a [Dependency],
}

impl<'a> RepoSignals<'a> {
    pub fn new(repo: &'a Repository, frameworks: &'a [Dependency]) -> Self {
        Self {
            name: &repo.name,
            description: repo.description.as_deref(),
            readme: repo.readme.as_ref().map(|r| r.content.as_str()),
            docs: repo.markdown_files.iter().map(|m| m.content.as_str()).collect(),
            topics: &repo.topics,
            languages: &repo.languages,
            frameworks,
        }
    }

    /// Lowercased text per source; empty sources are left out.
    fn sources(&self) -> Vec<(KeywordSource, String)> {
        let mut sources = Vec::new();
        let mut push = |source: KeywordSource, text: String| {
            if !text.trim().is_empty() {
                sources.push((source, text.to_lowercase()));
            }
        };

        let topics = self.topics.join(" ");
        push(KeywordSource::Topics, format!("{topics} {}", topics.replace('-', " ")));

        let deps = self
            .frameworks
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        push(
            KeywordSource::Dependencies,
            format!("{deps} {}", deps.replace(['-', '/', '@'], " ")),
        );

        push(KeywordSource::Readme, self.readme.unwrap_or_default().to_string());
        push(
            KeywordSource::Description,
            self.description.unwrap_or_default().to_string(),
        );
        push(KeywordSource::Docs, self.docs.join("\n"));
        push(KeywordSource::Name, self.name.replace(['-', '_'], " "));
        sources
    }
}

#[derive(Debug, Default)]
struct Hit {
    sources: BTreeSet<KeywordSource>,
    category: Option<String>,
}

fn match_terms(terms: &[Term], sources: &[(KeywordSource, String)]) -> BTreeMap<String, Hit> {
    let mut hits: BTreeMap<String, Hit> = BTreeMap::new();
    for term in terms {
        for (source, text) in sources {
            if term.matcher.is_match(text) {
                let hit = hits.entry(term.name.clone()).or_default();
                hit.sources.insert(*source);
                if hit.category.is_none() {
                    hit.category = term.category.clone();
                }
            }
        }
    }
    hits
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn to_keywords(hits: BTreeMap<String, Hit>, confidence: impl Fn(&BTreeSet<KeywordSource>) -> f64) -> Vec<Keyword> {
    hits.into_iter()
        .map(|(term, hit)| Keyword {
            confidence: round2(confidence(&hit.sources).min(1.0)),
            sources: hit.sources.into_iter().collect(),
            category: hit.category,
            term,
        })
        .collect()
}

/// Confidence desc, then best source priority, then source count, then name.
fn rank(keywords: &mut [Keyword]) {
    keywords.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.sources.first().cmp(&b.sources.first()))
            .then_with(|| b.sources.len().cmp(&a.sources.len()))
            .then_with(|| a.term.cmp(&b.term))
    });
}

fn technical_keywords(signals: &RepoSignals<'_>, rules: &RuleBook, sources: &[(KeywordSource, String)]) -> Vec<Keyword> {
    let mut keywords = to_keywords(match_terms(&rules.technical_terms, sources), |s| {
        0.5 + 0.2 * s.len() as f64
    });

    for (lang, share) in signals.languages.dominant(MIN_LANGUAGE_SHARE) {
        let confidence = round2(share / 100.0);
        match keywords
            .iter_mut()
            .find(|k| k.term.eq_ignore_ascii_case(lang))
        {
            Some(existing) => {
                existing.confidence = existing.confidence.max(confidence);
                existing.sources.push(KeywordSource::Languages);
            }
            None => keywords.push(Keyword {
                term: lang.to_string(),
                confidence,
                sources: vec![KeywordSource::Languages],
                category: Some("Language".to_string()),
            }),
        }
    }
    keywords
}

pub fn extract_keywords(signals: &RepoSignals<'_>, rules: &RuleBook, budget: &KeywordBudget) -> KeywordSet {
    let sources = signals.sources();

    let mut technical = technical_keywords(signals, rules, &sources);
    let mut domain = to_keywords(match_terms(&rules.domain_terms, &sources), |s| {
        let mut c = 0.5 + 0.1 * s.len() as f64;
        if s.contains(&KeywordSource::Description) {
            c += 0.2;
        }
        if s.contains(&KeywordSource::Topics) {
            c += 0.2;
        }
        c
    });
    let mut feature = to_keywords(match_terms(&rules.feature_terms, &sources), |s| {
        0.5 + 0.15 * s.len() as f64
    });

    // categories stay disjoint: technical > domain > feature
    let mut taken: HashSet<String> = technical.iter().map(|k| k.term.to_lowercase()).collect();
    domain.retain(|k| taken.insert(k.term.to_lowercase()));
    feature.retain(|k| taken.insert(k.term.to_lowercase()));

    rank(&mut technical);
    rank(&mut domain);
    rank(&mut feature);

    let [t, d, f] = budget.allocate([technical.len(), domain.len(), feature.len()]);
    technical.truncate(t);
    domain.truncate(d);
    feature.truncate(f);

    KeywordSet {
        technical,
        domain,
        feature,
    }
}
