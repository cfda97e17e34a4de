use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::AppError;

/// GitHub usernames: 1-39 chars, alphanumerics and inner hyphens.
static RE_USERNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,37}[a-zA-Z0-9])?$").unwrap());

/// Accepts a bare username or a profile URL and returns the lowercase username.
///
/// Handles `https://github.com/user`, `github.com/user/`, `www.github.com/user?tab=repositories`
/// and repository URLs (the owner is taken).
pub fn normalize_github_input(input: &str) -> Result<String, AppError> {
    let mut rest = input.trim();
    if rest.is_empty() {
        return Err(AppError::Validation("github_input cannot be empty".to_string()));
    }

    for scheme in ["https://", "http://"] {
        if let Some(stripped) = strip_prefix_ignore_case(rest, scheme) {
            rest = stripped;
            break;
        }
    }
    if let Some(stripped) = strip_prefix_ignore_case(rest, "www.") {
        rest = stripped;
    }
    if let Some(stripped) = strip_prefix_ignore_case(rest, "github.com/") {
        rest = stripped;
    } else if rest.contains('/') && rest.contains('.') {
        return Err(AppError::Validation(format!(
            "'{input}' is not a GitHub profile URL"
        )));
    }

    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let username = rest.split('/').next().unwrap_or_default();

    validate_username(username)
}

/// Validates an already-bare username (reports take these directly).
pub fn validate_username(username: &str) -> Result<String, AppError> {
    let username = username.trim();
    if !RE_USERNAME.is_match(username) {
        return Err(AppError::Validation(format!(
            "'{username}' is not a valid GitHub username"
        )));
    }
    Ok(username.to_lowercase())
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_username_is_lowercased() {
        assert_eq!(normalize_github_input("  OctoCat ").unwrap(), "octocat");
    }

    #[test]
    fn test_profile_urls() {
        for input in [
            "https://github.com/octocat",
            "http://github.com/octocat/",
            "https://www.github.com/Octocat?tab=repositories",
            "github.com/octocat#readme",
            "https://github.com/octocat/hello-world",
        ] {
            assert_eq!(normalize_github_input(input).unwrap(), "octocat", "{input}");
        }
    }

    #[test]
    fn test_rejects_invalid_usernames() {
        let too_long = "a".repeat(40);
        for input in ["", "-octo", "octo-", "octo_cat", too_long.as_str(), "https://gitlab.com/octocat"] {
            assert!(
                matches!(normalize_github_input(input), Err(AppError::Validation(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(normalize_github_input("a").unwrap(), "a");
        assert!(normalize_github_input(&"a".repeat(39)).is_ok());
    }

    #[test]
    fn test_inner_hyphens_allowed() {
        assert_eq!(validate_username("octo-cat-2").unwrap(), "octo-cat-2");
    }
}
