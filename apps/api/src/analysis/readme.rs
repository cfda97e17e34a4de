//! README skill pass: install commands, imports inside code fences, CI and
//! coverage badges, fence languages and known technology names.
//!
//! Complements keyword extraction, which only sees the README as prose.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadmeSkillSource {
    PackageManager,
    Import,
    Badge,
    CodeBlock,
    Keyword,
}

impl ReadmeSkillSource {
    pub fn label(&self) -> &'static str {
        match self {
            ReadmeSkillSource::PackageManager => "package manager",
            ReadmeSkillSource::Import => "import",
            ReadmeSkillSource::Badge => "badge",
            ReadmeSkillSource::CodeBlock => "code block",
            ReadmeSkillSource::Keyword => "keyword",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadmeSkillCategory {
    Framework,
    Library,
    Database,
    Tool,
    Practice,
    Language,
}

impl ReadmeSkillCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ReadmeSkillCategory::Framework => "Framework",
            ReadmeSkillCategory::Library => "Library",
            ReadmeSkillCategory::Database => "Database",
            ReadmeSkillCategory::Tool => "Tool",
            ReadmeSkillCategory::Practice => "Practice",
            ReadmeSkillCategory::Language => "Language",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadmeSkill {
    pub name: String,
    pub category: ReadmeSkillCategory,
    pub source: ReadmeSkillSource,
    pub confidence: f64,
}

const PACKAGE_CONFIDENCE: f64 = 0.9;
const IMPORT_CONFIDENCE: f64 = 0.8;
const CI_BADGE_CONFIDENCE: f64 = 0.95;
const COVERAGE_BADGE_CONFIDENCE: f64 = 0.9;
const CODE_BLOCK_CONFIDENCE: f64 = 0.8;
const KEYWORD_CONFIDENCE: f64 = 0.7;

/// Names shorter than this from installs and imports are noise.
const MIN_NAME_LEN: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Tables
// ────────────────────────────────────────────────────────────────────────────

const FRAMEWORKS: &[&str] = &[
    "React", "Vue", "Angular", "Django", "Flask", "FastAPI", "Express", "Spring", "Laravel",
    "Rails", "Next.js", "Nuxt", "Gatsby", "NestJS", "Svelte", "Ember", "Koa", "Hapi",
    "Strapi", "Redux", "MobX", "RxJS", "jQuery", "Bootstrap", "Tailwind", "Material-UI",
    "Actix", "Axum", "Rocket", "Gin", "Echo", "Fiber", "Phoenix",
];

const DATABASES: &[&str] = &[
    "PostgreSQL", "MySQL", "MongoDB", "Redis", "Elasticsearch", "Cassandra", "DynamoDB",
    "SQLite", "MariaDB", "CouchDB", "Neo4j", "InfluxDB", "Firebase", "Supabase",
    "CockroachDB", "TimescaleDB",
];

const TOOLS: &[&str] = &[
    "Docker", "Kubernetes", "Jenkins", "Travis CI", "CircleCI", "GitHub Actions", "GitLab CI",
    "Webpack", "Babel", "ESLint", "Prettier", "Jest", "Pytest", "Mocha", "Cypress",
    "Selenium", "Playwright", "Puppeteer", "Vite", "Rollup", "Terraform", "Ansible",
    "Vagrant", "Nginx", "Helm",
];

const LANGUAGES: &[&str] = &[
    "JavaScript", "TypeScript", "Python", "Java", "Go", "Rust", "PHP", "Ruby", "Swift",
    "Kotlin", "Scala", "Dart", "Elixir", "Clojure", "Haskell",
];

/// Badge text or URL fragment, and the CI service it names.
const CI_BADGES: &[(&str, &str)] = &[
    ("travis", "Travis CI"),
    ("circleci", "CircleCI"),
    ("jenkins", "Jenkins"),
    ("github/workflow", "GitHub Actions"),
    ("actions/workflows", "GitHub Actions"),
    ("github actions", "GitHub Actions"),
    ("gitlab", "GitLab CI"),
    ("azure pipelines", "Azure Pipelines"),
    ("dev.azure.com", "Azure Pipelines"),
];

const FENCE_ALIASES: &[(&str, &str)] = &[
    ("js", "JavaScript"),
    ("javascript", "JavaScript"),
    ("jsx", "JavaScript"),
    ("ts", "TypeScript"),
    ("typescript", "TypeScript"),
    ("tsx", "TypeScript"),
    ("py", "Python"),
    ("python", "Python"),
    ("rb", "Ruby"),
    ("sh", "Shell"),
    ("bash", "Shell"),
    ("shell", "Shell"),
    ("zsh", "Shell"),
    ("rs", "Rust"),
    ("golang", "Go"),
    ("cpp", "C++"),
    ("csharp", "C#"),
    ("cs", "C#"),
];

/// Fence tags that are not languages.
const FENCE_IGNORED: &[&str] = &["text", "txt", "console", "output", "plaintext", "diff", "mermaid"];

/// Words that show up after `pip install` or `import` without naming a package.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "from", "into", "with", "this", "that", "your", "all", "are",
    "requirements", "install", "installation", "setup", "config", "example", "examples",
    "test", "tests", "build", "run", "dev", "src", "app", "api", "server", "client",
    "package", "packages", "module", "modules", "lib", "library", "node", "npm", "pip",
    "gem", "cargo", "composer", "yarn", "pnpm", "version", "upgrade", "latest", "user",
    "editable", "save", "global", "foo", "bar", "baz", "data", "docs", "typing", "then",
    "using", "via", "now", "also", "first", "done",
];

static RE_INSTALLS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bnpm[ \t]+(?:install|i)((?:[ \t]+[@\w./-]+)+)",
        r"(?i)\byarn[ \t]+add((?:[ \t]+[@\w./-]+)+)",
        r"(?i)\bpnpm[ \t]+add((?:[ \t]+[@\w./-]+)+)",
        r"(?i)\bpip3?[ \t]+install((?:[ \t]+[-\w.\[\]=<>~]+)+)",
        r"(?i)\bgem[ \t]+install((?:[ \t]+[\w-]+)+)",
        r"(?i)\bgo[ \t]+(?:get|install)((?:[ \t]+[\w./@-]+)+)",
        r"(?i)\bcomposer[ \t]+require((?:[ \t]+[\w./-]+)+)",
        r"(?i)\bcargo[ \t]+(?:add|install)((?:[ \t]+[\w-]+)+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```([\w+#-]*)[^\n]*\n(.*?)```").unwrap());

static RE_PY_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:from\s+([\w.]+)\s+import|import\s+([\w.]+))").unwrap());

static RE_JS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:import\s[^;\n]*?from\s+['"]([^'"]+)['"]|require\(\s*['"]([^'"]+)['"]\s*\))"#).unwrap()
});

static RE_BADGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[!\[([^\]]*)\]\(([^)]+)\)\]\(([^)]+)\)").unwrap());

static KNOWN: Lazy<Vec<(Regex, &'static str, ReadmeSkillCategory)>> = Lazy::new(|| {
    let tables = [
        (FRAMEWORKS, ReadmeSkillCategory::Framework),
        (DATABASES, ReadmeSkillCategory::Database),
        (TOOLS, ReadmeSkillCategory::Tool),
        (LANGUAGES, ReadmeSkillCategory::Language),
    ];
    tables
        .iter()
        .flat_map(|(names, category)| {
            names.iter().map(move |name| {
                let pattern = format!(r"(?i)(?:^|[^\w.]){}(?:$|[^\w])", regex::escape(name));
                (Regex::new(&pattern).unwrap(), *name, *category)
            })
        })
        .collect()
});

// ────────────────────────────────────────────────────────────────────────────
// Extraction
// ────────────────────────────────────────────────────────────────────────────

/// Skills mentioned in one README, deduplicated by name (highest confidence wins)
/// and ordered by confidence, then name.
pub fn analyze_readme(content: &str) -> Vec<ReadmeSkill> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let mut found = Vec::new();
    found.extend(from_installs(content));
    found.extend(from_code_blocks(content));
    found.extend(from_badges(content));
    found.extend(from_keywords(content));
    dedupe(found)
}

fn from_installs(content: &str) -> Vec<ReadmeSkill> {
    RE_INSTALLS
        .iter()
        .flat_map(|re| re.captures_iter(content))
        .filter_map(|caps| caps.get(1))
        .flat_map(|m| m.as_str().split_whitespace())
        .filter(|arg| !arg.starts_with('-') && !arg.starts_with('.'))
        .filter_map(package_name)
        .map(|name| skill(name, ReadmeSkillCategory::Library, ReadmeSkillSource::PackageManager, PACKAGE_CONFIDENCE))
        .collect()
}

/// `@scope/pkg@1.2` -> `pkg`, `fastapi[all]==0.110` -> `fastapi`,
/// `github.com/gin-gonic/gin@latest` -> `gin`.
fn package_name(arg: &str) -> Option<String> {
    let unversioned = match arg.strip_prefix('@') {
        Some(scoped) => scoped.split('@').next().unwrap_or(scoped),
        None => arg.split('@').next().unwrap_or(arg),
    };
    let last = unversioned.rsplit('/').next().unwrap_or(unversioned);
    let name = last
        .split(|c: char| matches!(c, '[' | '=' | '<' | '>' | '~' | '!'))
        .next()
        .unwrap_or(last);
    usable_name(name)
}

fn usable_name(name: &str) -> Option<String> {
    let lower = name.trim().to_lowercase();
    let valid = lower.len() >= MIN_NAME_LEN
        && lower.chars().any(|c| c.is_ascii_alphabetic())
        && lower.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !STOPWORDS.contains(&lower.as_str());
    valid.then_some(lower)
}

/// Fence languages, plus imports found inside the fences.
fn from_code_blocks(content: &str) -> Vec<ReadmeSkill> {
    let mut skills = Vec::new();
    for caps in RE_FENCE.captures_iter(content) {
        let tag = caps.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
        if !tag.is_empty() && !FENCE_IGNORED.contains(&tag.as_str()) {
            let language = FENCE_ALIASES
                .iter()
                .find(|(alias, _)| *alias == tag)
                .map(|(_, name)| name.to_string())
                .unwrap_or_else(|| capitalize(&tag));
            skills.push(skill(language, ReadmeSkillCategory::Language, ReadmeSkillSource::CodeBlock, CODE_BLOCK_CONFIDENCE));
        }

        let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let imports = RE_PY_IMPORT
            .captures_iter(body)
            .chain(RE_JS_IMPORT.captures_iter(body))
            .filter_map(|c| c.get(1).or_else(|| c.get(2)))
            .filter(|m| !m.as_str().starts_with('.'))
            .filter_map(|m| {
                let root = m.as_str().trim_start_matches('@');
                let root = root.split(['.', '/']).next().unwrap_or(root);
                usable_name(root)
            });
        for module in imports {
            skills.push(skill(module, ReadmeSkillCategory::Library, ReadmeSkillSource::Import, IMPORT_CONFIDENCE));
        }
    }
    skills
}

fn from_badges(content: &str) -> Vec<ReadmeSkill> {
    let mut skills = Vec::new();
    for caps in RE_BADGE.captures_iter(content) {
        let text = caps[1].to_lowercase();
        let urls = format!("{} {}", caps[2].to_lowercase(), caps[3].to_lowercase());

        for (marker, tool) in CI_BADGES {
            if text.contains(marker) || urls.contains(marker) {
                skills.push(skill(tool.to_string(), ReadmeSkillCategory::Tool, ReadmeSkillSource::Badge, CI_BADGE_CONFIDENCE));
            }
        }
        if text.contains("coverage") || urls.contains("codecov") || urls.contains("coveralls") {
            skills.push(skill(
                "Code Coverage".to_string(),
                ReadmeSkillCategory::Practice,
                ReadmeSkillSource::Badge,
                COVERAGE_BADGE_CONFIDENCE,
            ));
        }
    }
    skills
}

fn from_keywords(content: &str) -> Vec<ReadmeSkill> {
    KNOWN
        .iter()
        .filter(|(re, _, _)| re.is_match(content))
        .map(|(_, name, category)| skill(name.to_string(), *category, ReadmeSkillSource::Keyword, KEYWORD_CONFIDENCE))
        .collect()
}

/// Package and import names resolve to the display name and category of a
/// known technology when there is one.
fn skill(name: String, category: ReadmeSkillCategory, source: ReadmeSkillSource, confidence: f64) -> ReadmeSkill {
    let known = KNOWN.iter().find(|(_, known, _)| known.eq_ignore_ascii_case(&name));
    match known {
        Some((_, display, known_category)) => ReadmeSkill {
            name: display.to_string(),
            category: *known_category,
            source,
            confidence,
        },
        None => ReadmeSkill {
            name: if category == ReadmeSkillCategory::Library { capitalize(&name) } else { name },
            category,
            source,
            confidence,
        },
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn dedupe(skills: Vec<ReadmeSkill>) -> Vec<ReadmeSkill> {
    let mut by_name: BTreeMap<String, ReadmeSkill> = BTreeMap::new();
    for s in skills {
        let key = s.name.to_lowercase();
        match by_name.get(&key) {
            Some(existing) if existing.confidence >= s.confidence => {}
            _ => {
                by_name.insert(key, s);
            }
        }
    }
    let mut out: Vec<ReadmeSkill> = by_name.into_values().collect();
    out.sort_by(|a, b| b.confidence.total_cmp(&a.confidence).then_with(|| a.name.cmp(&b.name)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(skills: &'a [ReadmeSkill], name: &str) -> Option<&'a ReadmeSkill> {
        skills.iter().find(|s| s.name == name)
    }

    const PYTHON_README: &str = "# Clinic API\n\n\
        [![codecov](https://codecov.io/gh/octo/clinic/branch/main/graph/badge.svg)](https://codecov.io/gh/octo/clinic)\n\
        [![CI](https://github.com/octo/clinic/actions/workflows/ci.yml/badge.svg)](https://github.com/octo/clinic/actions)\n\n\
        Install with `pip install fastapi uvicorn`.\n\n\
        ```python\nfrom sqlalchemy import create_engine\nimport httpx\n```\n\n\
        Data lives in PostgreSQL.\n";

    #[test]
    fn test_python_readme() {
        let skills = analyze_readme(PYTHON_README);

        let fastapi = find(&skills, "FastAPI").unwrap();
        assert_eq!(fastapi.category, ReadmeSkillCategory::Framework);
        assert_eq!(fastapi.source, ReadmeSkillSource::PackageManager);

        assert_eq!(find(&skills, "Uvicorn").unwrap().category, ReadmeSkillCategory::Library);
        assert_eq!(find(&skills, "Sqlalchemy").unwrap().source, ReadmeSkillSource::Import);
        assert!(find(&skills, "Httpx").is_some());

        let python = find(&skills, "Python").unwrap();
        assert_eq!(python.category, ReadmeSkillCategory::Language);
        assert_eq!(python.source, ReadmeSkillSource::CodeBlock);

        let coverage = find(&skills, "Code Coverage").unwrap();
        assert_eq!(coverage.category, ReadmeSkillCategory::Practice);
        assert_eq!(coverage.source, ReadmeSkillSource::Badge);
        assert_eq!(find(&skills, "GitHub Actions").unwrap().category, ReadmeSkillCategory::Tool);
        assert_eq!(find(&skills, "PostgreSQL").unwrap().category, ReadmeSkillCategory::Database);
    }

    #[test]
    fn test_npm_scoped_and_flagged_installs() {
        let skills = analyze_readme("```bash\nnpm install --save-dev @testing-library/react jest@29\n```");
        assert!(find(&skills, "React").is_some());
        assert_eq!(find(&skills, "Jest").unwrap().category, ReadmeSkillCategory::Tool);
        assert_eq!(find(&skills, "Shell").unwrap().source, ReadmeSkillSource::CodeBlock);
        assert!(skills.iter().all(|s| !s.name.starts_with('-')));
    }

    #[test]
    fn test_js_imports_and_relative_paths() {
        let readme = "```js\nimport express from 'express';\nconst cors = require('cors');\nimport x from './local';\n```";
        let skills = analyze_readme(readme);
        assert_eq!(find(&skills, "Express").unwrap().category, ReadmeSkillCategory::Framework);
        assert!(find(&skills, "Cors").is_some());
        assert!(find(&skills, "Local").is_none());
        assert_eq!(find(&skills, "JavaScript").unwrap().source, ReadmeSkillSource::CodeBlock);
    }

    #[test]
    fn test_stopwords_and_short_names_are_dropped() {
        let skills = analyze_readme("Run `pip install -r requirements.txt` then `pip install -e .` and `pip install qt`.");
        assert!(skills.is_empty(), "{skills:?}");
    }

    #[test]
    fn test_highest_confidence_wins() {
        // keyword (0.7) and install (0.9) both name Django
        let skills = analyze_readme("Built on Django.\n\n    pip install django\n");
        let django: Vec<_> = skills.iter().filter(|s| s.name == "Django").collect();
        assert_eq!(django.len(), 1);
        assert_eq!(django[0].source, ReadmeSkillSource::PackageManager);
    }

    #[test]
    fn test_go_and_known_words_need_boundaries() {
        let skills = analyze_readme("Let's go get it done: go get github.com/gin-gonic/gin@latest");
        assert_eq!(find(&skills, "Gin").unwrap().category, ReadmeSkillCategory::Framework);
        // "Going" and "ago" are not the Go language
        assert!(analyze_readme("Going strong since long ago").is_empty());
    }

    #[test]
    fn test_empty_readme() {
        assert!(analyze_readme("  \n").is_empty());
    }
}
