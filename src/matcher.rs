/// Lock-pattern matching.
///
/// Decides whether a navigated-to URL falls under any stored lock pattern.
/// Matching is deliberately over-inclusive (a lock should catch every
/// spelling of its site), with one override in the other direction: a domain
/// the user explicitly unlocked never matches again, even while stale
/// patterns for it remain stored.
use crate::domain::{registrable_domain, www_toggle};
use crate::tab_data::LockedPattern;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Should this URL be redirected to the lock screen?
///
/// Comparison order, first hit wins: explicit unlocks (reject), exact URL,
/// exact hostname, www-toggled hostname, registrable domain, pattern-in-URL
/// substring, parsed-pattern hostname or subdomain relation, and finally
/// bare-string comparison for patterns that don't parse as URLs.
pub fn should_lock_url(
    url: &str,
    patterns: &HashMap<String, LockedPattern>,
    unlocked_domains: &HashSet<String>,
) -> bool {
    // Blank pages and browser-internal URLs are never lockable
    if url.is_empty() || url == "about:blank" || url == "chrome://newtab/" {
        return false;
    }
    if url.starts_with("chrome://") || url.starts_with("chrome-extension://") {
        return false;
    }

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::debug!("skipping unparseable URL {url:?}: {e}");
            return false;
        }
    };
    let hostname = parsed.host_str().unwrap_or_default().to_string();
    let base_domain = registrable_domain(url);

    // An explicit unlock overrides every pattern, across all spellings
    if unlocked_domains.contains(&hostname)
        || unlocked_domains.contains(&www_toggle(&hostname))
        || unlocked_domains.contains(&base_domain)
    {
        log::debug!("{hostname} is explicitly unlocked, skipping lock check");
        return false;
    }

    if patterns.contains_key(url) || patterns.contains_key(&hostname) {
        return true;
    }
    if patterns.contains_key(&www_toggle(&hostname)) {
        return true;
    }
    if patterns.contains_key(&base_domain) {
        return true;
    }

    let url_without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    for pattern in patterns.keys() {
        // Pattern-in-URL containment only; a URL inside a pattern is not a
        // hit. Permissive on purpose, so path-scoped locks keep working.
        if url.contains(pattern.as_str()) || url_without_scheme.contains(pattern.as_str()) {
            log::debug!("URL {url} contains pattern {pattern}");
            return true;
        }

        let pattern_with_scheme = if pattern.contains("://") {
            pattern.clone()
        } else {
            format!("https://{pattern}")
        };

        match Url::parse(&pattern_with_scheme).ok().and_then(|p| {
            p.host_str().map(str::to_string)
        }) {
            Some(pattern_host) => {
                if hostname == pattern_host {
                    return true;
                }
                // Subdomain relationship in either direction
                if hostname.ends_with(&format!(".{pattern_host}"))
                    || pattern_host.ends_with(&format!(".{hostname}"))
                {
                    return true;
                }
            }
            None => {
                // Not a URL at all: fall back to bare string comparison
                if hostname == *pattern
                    || hostname.contains(pattern.as_str())
                    || pattern.contains(&hostname)
                {
                    return true;
                }
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(keys: &[&str]) -> HashMap<String, LockedPattern> {
        keys.iter()
            .map(|k| {
                (
                    k.to_string(),
                    LockedPattern {
                        password_hash: "hash".to_string(),
                        locked_at: 0.0,
                    },
                )
            })
            .collect()
    }

    fn no_unlocks() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_internal_urls_never_lock() {
        let pats = patterns(&["chrome", "about"]);
        assert!(!should_lock_url("", &pats, &no_unlocks()));
        assert!(!should_lock_url("about:blank", &pats, &no_unlocks()));
        assert!(!should_lock_url("chrome://newtab/", &pats, &no_unlocks()));
        assert!(!should_lock_url("chrome://settings", &pats, &no_unlocks()));
        assert!(!should_lock_url("chrome-extension://abc/locked.html", &pats, &no_unlocks()));
    }

    #[test]
    fn test_unparseable_url_never_locks() {
        let pats = patterns(&["example.com"]);
        assert!(!should_lock_url("not a url", &pats, &no_unlocks()));
    }

    #[test]
    fn test_exact_url_match() {
        let pats = patterns(&["https://example.com/secret"]);
        assert!(should_lock_url("https://example.com/secret", &pats, &no_unlocks()));
    }

    #[test]
    fn test_hostname_match() {
        let pats = patterns(&["example.com"]);
        assert!(should_lock_url("https://example.com/any/path", &pats, &no_unlocks()));
    }

    #[test]
    fn test_www_variant_match_both_directions() {
        let pats = patterns(&["example.com"]);
        assert!(should_lock_url("https://www.example.com/", &pats, &no_unlocks()));

        let pats = patterns(&["www.example.com"]);
        assert!(should_lock_url("https://example.com/", &pats, &no_unlocks()));
    }

    #[test]
    fn test_base_domain_match() {
        let pats = patterns(&["example.co.uk"]);
        assert!(should_lock_url("https://mail.example.co.uk/inbox", &pats, &no_unlocks()));
    }

    #[test]
    fn test_subdomain_relation_either_direction() {
        // Pattern names a subdomain, URL is the parent
        let pats = patterns(&["https://mail.corp.example"]);
        assert!(should_lock_url("https://corp.example/login", &pats, &no_unlocks()));

        // Pattern names the parent, URL is a subdomain
        let pats = patterns(&["corp.example"]);
        assert!(should_lock_url("https://mail.corp.example/login", &pats, &no_unlocks()));
    }

    #[test]
    fn test_unrelated_url_does_not_match() {
        let pats = patterns(&["example.com"]);
        assert!(!should_lock_url("https://rust-lang.org/", &pats, &no_unlocks()));
    }

    #[test]
    fn test_unlocked_domain_overrides_pattern() {
        let pats = patterns(&["example.com", "www.example.com"]);
        let unlocked: HashSet<String> = ["example.com".to_string()].into();

        assert!(!should_lock_url("https://example.com/", &pats, &unlocked));
        // www variant of an unlocked domain is also exempt
        assert!(!should_lock_url("https://www.example.com/", &pats, &unlocked));
    }

    #[test]
    fn test_unlock_survives_stale_www_pattern() {
        // Stale patterns for the www variant remain stored, but an unlocked
        // base domain keeps every spelling unlocked.
        let pats = patterns(&["www.example.com"]);
        let unlocked: HashSet<String> = ["example.com".to_string()].into();

        assert!(!should_lock_url("https://example.com/a", &pats, &unlocked));
        assert!(!should_lock_url("https://www.example.com/a", &pats, &unlocked));
    }

    #[test]
    fn test_unlocked_base_domain_covers_subdomain_urls() {
        let pats = patterns(&["example.com"]);
        let unlocked: HashSet<String> = ["example.com".to_string()].into();

        assert!(!should_lock_url("https://mail.example.com/", &pats, &unlocked));
    }

    #[test]
    fn test_substring_match_is_over_inclusive() {
        // Known over-match, kept for compatibility: a short pattern matches
        // anywhere in the URL text, including unrelated hosts whose path
        // happens to contain it.
        let pats = patterns(&["a.com"]);
        assert!(should_lock_url("https://notaa.com/a.com-page", &pats, &no_unlocks()));
    }

    #[test]
    fn test_path_scoped_pattern() {
        let pats = patterns(&["example.com/admin"]);
        assert!(should_lock_url("https://example.com/admin/users", &pats, &no_unlocks()));
    }

    #[test]
    fn test_unparseable_pattern_falls_back_to_string_compare() {
        let pats = patterns(&["exa mple.com"]);
        assert!(!should_lock_url("https://rust-lang.org/", &pats, &no_unlocks()));
    }
}
