use std::collections::HashSet;

use crate::analysis::rules::RuleBook;
use crate::models::profile::{Dependency, Ecosystem};

/// Keeps only dependencies on the per-ecosystem framework allow-list.
///
/// Utility packages (type stubs, linters, polyfills) are dropped even when a path
/// segment would otherwise match. Duplicates by (name, ecosystem) collapse to the
/// first occurrence, so filtering a filtered list returns it unchanged.
pub fn filter_frameworks(deps: &[Dependency], rules: &RuleBook) -> Vec<Dependency> {
    let mut seen: HashSet<(String, Ecosystem)> = HashSet::new();
    deps.iter()
        .filter(|d| is_major_framework(&d.name, d.ecosystem, rules))
        .filter(|d| seen.insert((d.name.to_lowercase(), d.ecosystem)))
        .cloned()
        .collect()
}

pub fn is_major_framework(name: &str, ecosystem: Ecosystem, rules: &RuleBook) -> bool {
    let name = name.trim().to_lowercase();
    if name.is_empty() || rules.utility_markers.iter().any(|m| name.contains(m.as_str())) {
        return false;
    }
    let Some(allowed) = rules.frameworks.get(&ecosystem) else {
        return false;
    };

    // `@scope/pkg`, `github.com/org/pkg/v2` and `vendor/pkg` match on any segment;
    // multi-segment entries like `gorilla/mux` match as a path suffix.
    let segments: Vec<&str> = name.split('/').map(|s| s.trim_start_matches('@')).collect();
    allowed.iter().any(|fw| {
        *fw == name
            || segments.contains(&fw.as_str())
            || (fw.contains('/') && name.ends_with(&format!("/{fw}")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::DependencyKind;

    fn rules() -> RuleBook {
        RuleBook::builtin().unwrap()
    }

    fn dep(name: &str, ecosystem: Ecosystem) -> Dependency {
        Dependency {
            name: name.to_string(),
            ecosystem,
            version: "1.0.0".to_string(),
            kind: DependencyKind::Production,
            source_file: "manifest".to_string(),
        }
    }

    #[test]
    fn test_keeps_major_frameworks_only() {
        let deps = vec![
            dep("react", Ecosystem::Npm),
            dep("left-pad", Ecosystem::Npm),
            dep("@types/react", Ecosystem::Npm),
            dep("eslint-plugin-react", Ecosystem::Npm),
            dep("core-js", Ecosystem::Npm),
            dep("django", Ecosystem::Pypi),
        ];
        let kept: Vec<String> = filter_frameworks(&deps, &rules())
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(kept, vec!["react", "django"]);
    }

    #[test]
    fn test_go_module_paths_match_on_segment() {
        let r = rules();
        assert!(is_major_framework("github.com/gin-gonic/gin", Ecosystem::Go, &r));
        assert!(is_major_framework("github.com/gorilla/mux", Ecosystem::Go, &r));
        assert!(is_major_framework("github.com/go-chi/chi/v5", Ecosystem::Go, &r));
        assert!(!is_major_framework("github.com/spf13/cobra", Ecosystem::Go, &r));
    }

    #[test]
    fn test_scoped_npm_package() {
        assert!(is_major_framework("@nestjs/core", Ecosystem::Npm, &rules()));
    }

    #[test]
    fn test_framework_under_wrong_ecosystem_is_dropped() {
        assert!(!is_major_framework("react", Ecosystem::Cargo, &rules()));
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(filter_frameworks(&[], &rules()).is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let deps = vec![
            dep("axum", Ecosystem::Cargo),
            dep("Axum", Ecosystem::Cargo),
            dep("axum", Ecosystem::Cargo),
        ];
        assert_eq!(filter_frameworks(&deps, &rules()).len(), 1);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let r = rules();
        let deps = vec![
            dep("next", Ecosystem::Npm),
            dep("@types/node", Ecosystem::Npm),
            dep("prettier", Ecosystem::Npm),
            dep("tailwindcss", Ecosystem::Npm),
            dep("next", Ecosystem::Npm),
            dep("pandas", Ecosystem::Pypi),
            dep("black", Ecosystem::Pypi),
            dep("laravel/framework", Ecosystem::Composer),
            dep("github.com/labstack/echo/v4", Ecosystem::Go),
            dep("serde", Ecosystem::Cargo),
            dep("anyhow", Ecosystem::Cargo),
        ];
        let once = filter_frameworks(&deps, &r);
        let twice = filter_frameworks(&once, &r);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 6);
    }
}
