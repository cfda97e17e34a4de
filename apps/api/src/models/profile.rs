use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::round1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
    pub followers: u64,
    pub following: u64,
    pub public_repos: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Language byte counts as reported by GitHub plus their share of the total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageStats {
    pub bytes: BTreeMap<String, u64>,
    pub percentages: BTreeMap<String, f64>,
}

impl LanguageStats {
    pub fn from_bytes(bytes: BTreeMap<String, u64>) -> Self {
        let total: u64 = bytes.values().sum();
        let percentages = if total == 0 {
            BTreeMap::new()
        } else {
            bytes
                .iter()
                .map(|(lang, count)| (lang.clone(), round1(*count as f64 / total as f64 * 100.0)))
                .collect()
        };
        Self { bytes, percentages }
    }

    /// Languages at or above `min_share` percent, largest first.
    pub fn dominant(&self, min_share: f64) -> Vec<(&str, f64)> {
        let mut langs: Vec<(&str, f64)> = self
            .percentages
            .iter()
            .filter(|(_, pct)| **pct >= min_share)
            .map(|(lang, pct)| (lang.as_str(), *pct))
            .collect();
        langs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        langs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readme {
    pub content: String,
    pub length_chars: usize,
}

impl Readme {
    pub fn new(content: String) -> Self {
        let length_chars = content.chars().count();
        Self {
            content,
            length_chars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkdownFile {
    pub filename: String,
    pub path: String,
    pub content: String,
    pub length_chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    Pypi,
    Go,
    Rubygems,
    Composer,
    Cargo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Production,
    Dev,
}

/// A dependency declared in one of the repository's manifests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub ecosystem: Ecosystem,
    pub version: String,
    pub kind: DependencyKind,
    pub source_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub languages: LanguageStats,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    pub size_kb: u64,
    pub has_wiki: bool,
    pub has_projects: bool,
    pub is_fork: bool,
    pub archived: bool,
    pub default_branch: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub days_since_last_commit: Option<i64>,
    pub topics: Vec<String>,
    pub readme: Option<Readme>,
    pub markdown_files: Vec<MarkdownFile>,
    pub dependencies: Vec<Dependency>,
    /// Repository hygiene found in the file tree: CI, Docker, tests, license.
    pub production_signals: Vec<String>,
    /// Sub-fetches that failed or timed out for this repository.
    pub partial_sections: Vec<String>,
}

impl Repository {
    pub fn has_documentation(&self) -> bool {
        self.readme.is_some() || !self.markdown_files.is_empty()
    }
}

/// Whole days between `pushed_at` and `as_of`, floored and never negative.
pub fn days_since(pushed_at: DateTime<Utc>, as_of: DateTime<Utc>) -> i64 {
    (as_of - pushed_at).num_days().max(0)
}
