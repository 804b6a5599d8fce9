//! Expansion of `fetch` arguments into clone URLs.
//!
//! `gh:owner/repo` (or any configured shorthand prefix) becomes a full HTTPS
//! clone URL on the forge host derived from the configured API URL. Anything
//! else is passed to the clone client unchanged.

use tracing::debug;

use crate::config::FetchConfig;

/// Expand `arg` when it starts with one of the configured shorthand prefixes.
pub fn expand_shorthand(arg: &str, config: &FetchConfig) -> String {
    let arg = arg.trim();
    for prefix in &config.shorthands {
        if let Some(repo) = arg.strip_prefix(prefix.as_str()) {
            let repo = repo.trim_matches('/').trim_end_matches(".git");
            if is_owner_repo(repo) {
                let url =
                    derive_git_remote_url(&config.api_url, config.git_base_url.as_deref(), repo);
                debug!(shorthand = arg, %url, "expanded shorthand");
                return url;
            }
        }
    }
    arg.to_string()
}

fn is_owner_repo(repo: &str) -> bool {
    let mut parts = repo.split('/');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    )
}

/// Clone URL `{base}/{owner/repo}.git`.
///
/// See [`derive_git_base_url`] for how the base is chosen.
pub fn derive_git_remote_url(api_url: &str, git_base_url: Option<&str>, repo: &str) -> String {
    let base = derive_git_base_url(api_url, git_base_url);
    format!("{}/{}.git", base, repo)
}

/// Derive the Git host base URL.
///
/// Resolution order:
/// 1. If `git_base_url` is `Some(non-empty)`, use it as the base.
/// 2. Otherwise derive from `api_url`:
///    - `https://api.github.com` → `https://github.com`
///    - `https://<host>/api/v3`  → `https://<host>`
///    - Anything else            → strip trailing slash, use as-is
pub fn derive_git_base_url(api_url: &str, git_base_url: Option<&str>) -> String {
    if let Some(explicit) = git_base_url {
        let trimmed = explicit.trim();
        if !trimmed.is_empty() {
            return trimmed.trim_end_matches('/').to_string();
        }
    }

    let url = api_url.trim().trim_end_matches('/');

    if url.eq_ignore_ascii_case("https://api.github.com") {
        return "https://github.com".to_string();
    }

    if let Some(base) = url.strip_suffix("/api/v3") {
        return base.to_string();
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gh_shorthand() {
        let config = FetchConfig::default();
        assert_eq!(
            expand_shorthand("gh:acme/project", &config),
            "https://github.com/acme/project.git"
        );
        assert_eq!(
            expand_shorthand("github:acme/project.git", &config),
            "https://github.com/acme/project.git"
        );
    }

    #[test]
    fn test_full_urls_pass_through() {
        let config = FetchConfig::default();
        for url in [
            "https://gitlab.com/acme/project.git",
            "git@github.com:acme/project.git",
            "/srv/git/project",
        ] {
            assert_eq!(expand_shorthand(url, &config), url);
        }
    }

    #[test]
    fn test_malformed_shorthand_passes_through() {
        let config = FetchConfig::default();
        assert_eq!(expand_shorthand("gh:justowner", &config), "gh:justowner");
        assert_eq!(expand_shorthand("gh:a/b/c", &config), "gh:a/b/c");
    }

    #[test]
    fn test_shorthand_enterprise_host() {
        let config = FetchConfig {
            api_url: "https://github.company.com/api/v3/".into(),
            ..FetchConfig::default()
        };
        assert_eq!(
            expand_shorthand("gh:org/repo", &config),
            "https://github.company.com/org/repo.git"
        );
    }

    #[test]
    fn test_shorthand_explicit_base_and_custom_prefix() {
        let config = FetchConfig {
            git_base_url: Some("https://git.internal.io/".into()),
            shorthands: vec!["int:".into()],
            ..FetchConfig::default()
        };
        assert_eq!(
            expand_shorthand("int:team/tool", &config),
            "https://git.internal.io/team/tool.git"
        );
        assert_eq!(expand_shorthand("gh:team/tool", &config), "gh:team/tool");
    }

    #[test]
    fn test_base_url_rules() {
        assert_eq!(
            derive_git_base_url("HTTPS://API.GITHUB.COM", None),
            "https://github.com"
        );
        assert_eq!(
            derive_git_base_url("https://api.github.com", Some("  ")),
            "https://github.com"
        );
        assert_eq!(
            derive_git_base_url("https://git.internal.io/", None),
            "https://git.internal.io"
        );
    }
}
