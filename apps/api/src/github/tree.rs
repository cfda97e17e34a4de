//! Decisions made from a repository's recursive file tree: which markdown and
//! manifest files to download, and which production signals are present.

use serde::Deserialize;

use crate::analysis::manifest::MANIFEST_FILES;

/// Markdown files above this size are not downloaded.
pub const MAX_MARKDOWN_BYTES: u64 = 100 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: Option<u64>,
}

impl TreeEntry {
    fn is_blob(&self) -> bool {
        self.kind == "blob"
    }

    fn file_name(&self) -> &str {
        file_name(&self.path)
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

/// Markdown files other than READMEs, in tree order, at most `limit`.
pub fn markdown_paths(tree: &Tree, limit: usize) -> Vec<&TreeEntry> {
    tree.tree
        .iter()
        .filter(|e| e.is_blob())
        .filter(|e| e.path.to_lowercase().ends_with(".md"))
        .filter(|e| !e.file_name().to_lowercase().starts_with("readme"))
        .filter(|e| e.size.unwrap_or(0) <= MAX_MARKDOWN_BYTES)
        .take(limit)
        .collect()
}

/// Root-level manifests the dependency parser understands.
pub fn manifest_paths(tree: &Tree) -> Vec<&TreeEntry> {
    tree.tree
        .iter()
        .filter(|e| e.is_blob() && !e.path.contains('/'))
        .filter(|e| MANIFEST_FILES.contains(&e.path.as_str()))
        .collect()
}

const CI_MARKERS: [&str; 6] = [
    ".github/workflows/",
    ".gitlab-ci.yml",
    ".circleci/",
    ".travis.yml",
    "Jenkinsfile",
    "azure-pipelines.yml",
];
const DOCKER_FILES: [&str; 4] = [
    "Dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    "compose.yaml",
];
const TEST_DIRS: [&str; 4] = ["test", "tests", "__tests__", "spec"];
const LICENSE_FILES: [&str; 4] = ["LICENSE", "LICENSE.md", "LICENSE.txt", "COPYING"];

fn is_test_path(path: &str) -> bool {
    let mut segments = path.split('/').peekable();
    while let Some(seg) = segments.next() {
        let is_last = segments.peek().is_none();
        if !is_last && TEST_DIRS.contains(&seg) {
            return true;
        }
        if is_last && (seg.contains(".test.") || seg.contains(".spec.") || seg.contains("_test.") || seg.starts_with("test_")) {
            return true;
        }
    }
    false
}

/// Hygiene markers in fixed order: CI/CD, Docker, Tests, License.
pub fn production_signals(tree: &Tree) -> Vec<String> {
    let paths: Vec<&str> = tree.tree.iter().map(|e| e.path.as_str()).collect();
    let mut signals = Vec::new();

    if paths.iter().any(|p| CI_MARKERS.iter().any(|m| p.starts_with(m))) {
        signals.push("CI/CD");
    }
    if paths.iter().any(|p| DOCKER_FILES.contains(&file_name(p))) {
        signals.push("Docker");
    }
    if paths.iter().any(|p| is_test_path(p)) {
        signals.push("Tests");
    }
    if paths.iter().any(|p| LICENSE_FILES.contains(p)) {
        signals.push("License");
    }
    signals.into_iter().map(str::to_string).collect()
}
