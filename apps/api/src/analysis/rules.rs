//! Rule book: every keyword, domain and framework table the classifier scores against.
//!
//! The built-in tables ship as `rules/default_rules.json` and are compiled once at
//! startup into term matchers. `RULES_PATH` may point at a replacement file with the
//! same shape. The classifier only ever sees `&RuleBook`.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::models::profile::Ecosystem;

const BUILTIN_RULES: &str = include_str!("../../rules/default_rules.json");

/// Patterns shorter than this must match on word boundaries.
const SHORT_PATTERN_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to read rule file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid rule file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("invalid rule book: {0}")]
    Invalid(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Matching
// ────────────────────────────────────────────────────────────────────────────

/// A lowercase pattern. Short patterns use word boundaries so that "ai" does not
/// match "maintain"; longer ones match as substrings.
#[derive(Debug, Clone)]
pub struct Matcher {
    pattern: String,
    boundary: Option<Regex>,
}

impl Matcher {
    pub fn new(pattern: &str) -> Result<Self, RulesError> {
        let pattern = pattern.trim().to_lowercase();
        if pattern.is_empty() {
            return Err(RulesError::Invalid("empty pattern".to_string()));
        }
        let boundary = if pattern.chars().count() < SHORT_PATTERN_LEN {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(&pattern))).map_err(|e| {
                RulesError::Pattern {
                    pattern: pattern.clone(),
                    source: e,
                }
            })?;
            Some(re)
        } else {
            None
        };
        Ok(Self { pattern, boundary })
    }

    /// `text` must already be lowercase.
    pub fn is_match(&self, text: &str) -> bool {
        match &self.boundary {
            Some(re) => re.is_match(text),
            None => text.contains(&self.pattern),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Compiled tables
// ────────────────────────────────────────────────────────────────────────────

/// One entry of a keyword table: a pattern and the display name it produces.
#[derive(Debug, Clone)]
pub struct Term {
    pub matcher: Matcher,
    pub name: String,
    /// Technology family, only set for technical terms.
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DomainRule {
    pub name: String,
    pub weight: f64,
    pub keywords: Vec<Matcher>,
    pub role: String,
    pub suitable_roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleFamily {
    pub role: String,
    pub suitable_roles: Vec<String>,
    pub frameworks: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageRole {
    pub language: String,
    pub role: String,
    pub suitable_roles: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RuleBook {
    pub default_domain: String,
    pub min_domain_score: f64,
    pub utility_markers: Vec<String>,
    pub frameworks: BTreeMap<Ecosystem, Vec<String>>,
    pub technical_terms: Vec<Term>,
    pub domain_terms: Vec<Term>,
    pub feature_terms: Vec<Term>,
    pub domains: Vec<DomainRule>,
    pub role_families: Vec<RoleFamily>,
    pub language_roles: Vec<LanguageRole>,
}

// ────────────────────────────────────────────────────────────────────────────
// File shape
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawRuleBook {
    default_domain: String,
    min_domain_score: f64,
    #[serde(default)]
    utility_markers: Vec<String>,
    frameworks: BTreeMap<Ecosystem, Vec<String>>,
    technical_terms: Vec<RawTerm>,
    domain_terms: Vec<RawTerm>,
    feature_terms: Vec<RawTerm>,
    domains: Vec<RawDomain>,
    #[serde(default)]
    role_families: Vec<RoleFamily>,
    #[serde(default)]
    language_roles: Vec<LanguageRole>,
}

#[derive(Debug, Deserialize)]
struct RawTerm {
    pattern: String,
    name: String,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDomain {
    name: String,
    weight: f64,
    keywords: Vec<String>,
    role: String,
    suitable_roles: Vec<String>,
}

impl RuleBook {
    /// The tables compiled into the binary.
    pub fn builtin() -> Result<Self, RulesError> {
        Self::from_json(BUILTIN_RULES)
    }

    /// Loads `path` when given, otherwise the built-in tables.
    pub fn load(path: Option<&str>) -> Result<Self, RulesError> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| RulesError::Io {
                    path: path.to_string(),
                    source: e,
                })?;
                Self::from_json(&raw)
            }
            None => Self::builtin(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, RulesError> {
        let raw: RawRuleBook = serde_json::from_str(raw)?;

        if raw.default_domain.trim().is_empty() {
            return Err(RulesError::Invalid("default_domain is empty".to_string()));
        }
        if raw.domains.is_empty() {
            return Err(RulesError::Invalid("no domains defined".to_string()));
        }

        let mut seen = HashSet::new();
        let mut domains = Vec::with_capacity(raw.domains.len());
        for d in raw.domains {
            if !seen.insert(d.name.to_lowercase()) || d.name == raw.default_domain {
                return Err(RulesError::Invalid(format!("duplicate domain '{}'", d.name)));
            }
            if !(d.weight > 0.0) {
                return Err(RulesError::Invalid(format!(
                    "domain '{}' needs a positive weight",
                    d.name
                )));
            }
            domains.push(DomainRule {
                keywords: d
                    .keywords
                    .iter()
                    .map(|k| Matcher::new(k))
                    .collect::<Result<_, _>>()?,
                name: d.name,
                weight: d.weight,
                role: d.role,
                suitable_roles: d.suitable_roles,
            });
        }

        let frameworks = raw
            .frameworks
            .into_iter()
            .map(|(eco, names)| (eco, names.iter().map(|n| n.to_lowercase()).collect()))
            .collect();

        Ok(RuleBook {
            default_domain: raw.default_domain,
            min_domain_score: raw.min_domain_score,
            utility_markers: raw
                .utility_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            frameworks,
            technical_terms: compile_terms(raw.technical_terms)?,
            domain_terms: compile_terms(raw.domain_terms)?,
            feature_terms: compile_terms(raw.feature_terms)?,
            domains,
            role_families: raw.role_families,
            language_roles: raw.language_roles,
        })
    }

    /// Every domain a classification may name, in tie-break order.
    pub fn domain_names(&self) -> impl Iterator<Item = &str> {
        self.domains
            .iter()
            .map(|d| d.name.as_str())
            .chain(std::iter::once(self.default_domain.as_str()))
    }

    pub fn domain(&self, name: &str) -> Option<&DomainRule> {
        self.domains.iter().find(|d| d.name == name)
    }
}

fn compile_terms(raw: Vec<RawTerm>) -> Result<Vec<Term>, RulesError> {
    raw.into_iter()
        .map(|t| {
            Ok(Term {
                matcher: Matcher::new(&t.pattern)?,
                name: t.name,
                category: t.category,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_rules_load() {
        let rules = RuleBook::builtin().unwrap();
        assert!(rules.domains.len() >= 35, "only {} domains", rules.domains.len());
        assert_eq!(rules.default_domain, "Software Development");
        assert!(rules.frameworks.contains_key(&Ecosystem::Cargo));
        assert!(!rules.technical_terms.is_empty());
    }

    #[test]
    fn test_domain_names_end_with_default() {
        let rules = RuleBook::builtin().unwrap();
        assert_eq!(rules.domain_names().last(), Some("Software Development"));
    }

    #[test]
    fn test_short_pattern_needs_word_boundary() {
        let m = Matcher::new("AI").unwrap();
        assert!(m.is_match("an ai assistant"));
        assert!(!m.is_match("easy to maintain"));
    }

    #[test]
    fn test_long_pattern_matches_substring() {
        let m = Matcher::new("postgres").unwrap();
        assert!(m.is_match("backed by postgresql 16"));
    }

    #[test]
    fn test_duplicate_domain_rejected() {
        let raw = r#"{
            "default_domain": "Software Development",
            "min_domain_score": 1.0,
            "frameworks": {},
            "technical_terms": [], "domain_terms": [], "feature_terms": [],
            "domains": [
                {"name": "Healthcare", "weight": 1.0, "keywords": ["health"], "role": "Dev", "suitable_roles": []},
                {"name": "healthcare", "weight": 1.0, "keywords": ["clinic"], "role": "Dev", "suitable_roles": []}
            ]
        }"#;
        assert!(matches!(RuleBook::from_json(raw), Err(RulesError::Invalid(_))));
    }

    #[test]
    fn test_load_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "default_domain": "General",
                "min_domain_score": 0.5,
                "frameworks": {{"npm": ["React"]}},
                "technical_terms": [{{"pattern": "react", "name": "React", "category": "Frontend"}}],
                "domain_terms": [], "feature_terms": [],
                "domains": [{{"name": "Gaming", "weight": 1.5, "keywords": ["game"], "role": "Game Developer", "suitable_roles": []}}]
            }}"#
        )
        .unwrap();

        let rules = RuleBook::load(file.path().to_str()).unwrap();
        assert_eq!(rules.default_domain, "General");
        assert_eq!(rules.frameworks[&Ecosystem::Npm], vec!["react".to_string()]);
        assert_eq!(rules.domain_names().collect::<Vec<_>>(), vec!["Gaming", "General"]);
    }

    #[test]
    fn test_missing_override_file_is_io_error() {
        assert!(matches!(
            RuleBook::load(Some("/definitely/not/here.json")),
            Err(RulesError::Io { .. })
        ));
    }
}
