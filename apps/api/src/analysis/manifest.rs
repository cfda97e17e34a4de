//! Manifest parsers: turn a dependency-declaration file into raw `Dependency` rows.
//!
//! Nothing is filtered here; `frameworks::filter_frameworks` decides what matters.
//! A manifest that fails to parse contributes no dependencies.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::models::profile::{Dependency, DependencyKind, Ecosystem};

/// Root-level files the fetcher downloads for dependency analysis.
pub const MANIFEST_FILES: [&str; 7] = [
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "go.mod",
    "Gemfile",
    "composer.json",
    "Cargo.toml",
];

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid JSON manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML manifest: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported manifest '{0}'")]
    Unsupported(String),
}

static RE_VERSION_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\^~>=<!\s]+").unwrap());

static RE_REQUIREMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._\-]*)\s*(?:\[[^\]]*\])?\s*([^;]*)").unwrap()
});

static RE_GO_REQUIRE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:require\s+)?([^\s()]+)\s+(v[^\s]+)").unwrap());

static RE_GEM_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*gem\s+["']([^"']+)["']\s*(?:,\s*["']([^"']+)["'])?"#).unwrap());

static RE_GEM_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*group\s+(.+?)\s+do\s*$").unwrap());

/// Strips range operators and anything after the first constraint:
/// `^18.2.0` -> `18.2.0`, `>=4.2,<5` -> `4.2`.
pub fn clean_version(raw: &str) -> String {
    let trimmed = RE_VERSION_PREFIX.replace(raw.trim(), "");
    trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .next()
        .unwrap_or("")
        .to_string()
}

pub fn parse_manifest(file_name: &str, content: &str) -> Result<Vec<Dependency>, ManifestError> {
    match file_name {
        "package.json" => parse_package_json(content),
        "requirements.txt" => Ok(parse_requirements_txt(content)),
        "pyproject.toml" => parse_pyproject_toml(content),
        "go.mod" => Ok(parse_go_mod(content)),
        "Gemfile" => Ok(parse_gemfile(content)),
        "composer.json" => parse_composer_json(content),
        "Cargo.toml" => parse_cargo_toml(content),
        other => Err(ManifestError::Unsupported(other.to_string())),
    }
}

/// Parses every `(file_name, content)` pair; broken manifests are logged and skipped.
pub fn parse_all(files: &[(String, String)]) -> Vec<Dependency> {
    let mut deps = Vec::new();
    for (name, content) in files {
        match parse_manifest(name, content) {
            Ok(mut parsed) => deps.append(&mut parsed),
            Err(e) => warn!("Skipping manifest {name}: {e}"),
        }
    }
    deps
}

fn dep(name: &str, version: &str, ecosystem: Ecosystem, kind: DependencyKind, source: &str) -> Dependency {
    Dependency {
        name: name.trim().to_string(),
        ecosystem,
        version: clean_version(version),
        kind,
        source_file: source.to_string(),
    }
}

fn json_version(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn toml_version(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Table(t) => t
            .get("version")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
        _ => String::new(),
    }
}

fn parse_package_json(content: &str) -> Result<Vec<Dependency>, ManifestError> {
    let data: Value = serde_json::from_str(content)?;
    let mut deps = Vec::new();
    for (section, kind) in [
        ("dependencies", DependencyKind::Production),
        ("devDependencies", DependencyKind::Dev),
    ] {
        if let Some(table) = data.get(section).and_then(|v| v.as_object()) {
            for (name, version) in table {
                deps.push(dep(name, &json_version(version), Ecosystem::Npm, kind, "package.json"));
            }
        }
    }
    Ok(deps)
}

fn parse_requirement(line: &str, kind: DependencyKind, source: &str) -> Option<Dependency> {
    let caps = RE_REQUIREMENT.captures(line.trim())?;
    let name = caps.get(1)?.as_str().to_lowercase();
    let version = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    Some(dep(&name, version, Ecosystem::Pypi, kind, source))
}

fn parse_requirements_txt(content: &str) -> Vec<Dependency> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .filter_map(|line| parse_requirement(line, DependencyKind::Production, "requirements.txt"))
        .collect()
}

fn parse_pyproject_toml(content: &str) -> Result<Vec<Dependency>, ManifestError> {
    let doc: toml::Value = toml::from_str(content)?;
    let mut deps = Vec::new();

    // PEP 621
    if let Some(list) = doc
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_array())
    {
        deps.extend(
            list.iter()
                .filter_map(|v| v.as_str())
                .filter_map(|s| parse_requirement(s, DependencyKind::Production, "pyproject.toml")),
        );
    }

    // Poetry
    if let Some(poetry) = doc.get("tool").and_then(|t| t.get("poetry")) {
        let mut tables = vec![
            (poetry.get("dependencies"), DependencyKind::Production),
            (poetry.get("dev-dependencies"), DependencyKind::Dev),
        ];
        if let Some(groups) = poetry.get("group").and_then(|g| g.as_table()) {
            for group in groups.values() {
                tables.push((group.get("dependencies"), DependencyKind::Dev));
            }
        }
        for (table, kind) in tables {
            let Some(table) = table.and_then(|t| t.as_table()) else {
                continue;
            };
            for (name, value) in table {
                if name.eq_ignore_ascii_case("python") {
                    continue;
                }
                deps.push(dep(
                    &name.to_lowercase(),
                    &toml_version(value),
                    Ecosystem::Pypi,
                    kind,
                    "pyproject.toml",
                ));
            }
        }
    }

    Ok(deps)
}

fn parse_go_mod(content: &str) -> Vec<Dependency> {
    let mut deps = Vec::new();
    let mut in_block = false;
    for line in content.lines() {
        let line = line.trim();
        if line.starts_with("require (") || line == "require(" {
            in_block = true;
            continue;
        }
        if in_block && line.starts_with(')') {
            in_block = false;
            continue;
        }
        if in_block || line.starts_with("require ") {
            if let Some(caps) = RE_GO_REQUIRE.captures(line) {
                deps.push(dep(
                    &caps[1],
                    &caps[2],
                    Ecosystem::Go,
                    DependencyKind::Production,
                    "go.mod",
                ));
            }
        }
    }
    deps
}

fn parse_gemfile(content: &str) -> Vec<Dependency> {
    let mut deps = Vec::new();
    let mut group_kind: Option<DependencyKind> = None;
    for line in content.lines() {
        if let Some(caps) = RE_GEM_GROUP.captures(line) {
            let groups = &caps[1];
            group_kind = Some(if groups.contains(":development") || groups.contains(":test") {
                DependencyKind::Dev
            } else {
                DependencyKind::Production
            });
            continue;
        }
        if line.trim() == "end" {
            group_kind = None;
            continue;
        }
        if let Some(caps) = RE_GEM_LINE.captures(line) {
            let version = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            deps.push(dep(
                &caps[1],
                version,
                Ecosystem::Rubygems,
                group_kind.unwrap_or(DependencyKind::Production),
                "Gemfile",
            ));
        }
    }
    deps
}

fn parse_composer_json(content: &str) -> Result<Vec<Dependency>, ManifestError> {
    let data: Value = serde_json::from_str(content)?;
    let mut deps = Vec::new();
    for (section, kind) in [
        ("require", DependencyKind::Production),
        ("require-dev", DependencyKind::Dev),
    ] {
        if let Some(table) = data.get(section).and_then(|v| v.as_object()) {
            for (name, version) in table {
                // platform requirements, not packages
                if name == "php" || name.starts_with("ext-") {
                    continue;
                }
                deps.push(dep(
                    name,
                    &json_version(version),
                    Ecosystem::Composer,
                    kind,
                    "composer.json",
                ));
            }
        }
    }
    Ok(deps)
}

fn parse_cargo_toml(content: &str) -> Result<Vec<Dependency>, ManifestError> {
    let doc: toml::Value = toml::from_str(content)?;
    let mut deps = Vec::new();
    let workspace_deps = doc.get("workspace").and_then(|w| w.get("dependencies"));
    for (table, kind) in [
        (doc.get("dependencies"), DependencyKind::Production),
        (workspace_deps, DependencyKind::Production),
        (doc.get("dev-dependencies"), DependencyKind::Dev),
    ] {
        let Some(table) = table.and_then(|t| t.as_table()) else {
            continue;
        };
        for (name, value) in table {
            deps.push(dep(name, &toml_version(value), Ecosystem::Cargo, kind, "Cargo.toml"));
        }
    }
    Ok(deps)
}
