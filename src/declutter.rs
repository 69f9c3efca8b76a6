/// Declutter selection: which inactive tabs are safe to close.
use crate::tab_data::{LockedTab, TabInfo};
use regex::Regex;
use std::collections::HashMap;

const MS_PER_HOUR: f64 = 60.0 * 60.0 * 1000.0;

/// Effective settings for one declutter run.
#[derive(Debug, Clone)]
pub struct DeclutterSettings {
    pub threshold_hours: f64,
    pub whitelist: Vec<String>,
}

/// Pick the tabs eligible for closure.
///
/// A tab survives if it is locked, whitelisted, active, pinned, or was active
/// within the threshold window (untracked tabs count as never active, so they
/// are eligible). The result keeps the input order.
pub fn select_for_closure<'a>(
    tabs: &'a [TabInfo],
    locked_tabs: &HashMap<i32, LockedTab>,
    activity: &HashMap<i32, f64>,
    settings: &DeclutterSettings,
    now_ms: f64,
) -> Vec<&'a TabInfo> {
    let cutoff = now_ms - settings.threshold_hours * MS_PER_HOUR;

    tabs.iter()
        .filter(|tab| !locked_tabs.contains_key(&tab.id))
        .filter(|tab| {
            !settings
                .whitelist
                .iter()
                .any(|pattern| match_url_pattern(&tab.url, pattern))
        })
        .filter(|tab| !tab.active && !tab.pinned)
        .filter(|tab| {
            let last_active = activity.get(&tab.id).copied().unwrap_or(0.0);
            last_active < cutoff
        })
        .collect()
}

/// Match a URL against a whitelist pattern: plain substring containment, or
/// anchored full-string matching when the pattern carries "*" wildcards.
pub fn match_url_pattern(url: &str, pattern: &str) -> bool {
    if url.is_empty() || pattern.is_empty() {
        return false;
    }

    if url.contains(pattern) {
        return true;
    }

    if pattern.contains('*') {
        let escaped = regex::escape(pattern).replace("\\*", ".*");
        match Regex::new(&format!("^{escaped}$")) {
            Ok(re) => return re.is_match(url),
            Err(e) => log::warn!("bad whitelist pattern {pattern:?}: {e}"),
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tab_data::TabInfo;

    fn tab(id: i32, url: &str) -> TabInfo {
        TabInfo::new(id, url, url)
    }

    fn settings(threshold_hours: f64, whitelist: &[&str]) -> DeclutterSettings {
        DeclutterSettings {
            threshold_hours,
            whitelist: whitelist.iter().map(|s| s.to_string()).collect(),
        }
    }

    const HOUR: f64 = MS_PER_HOUR;

    #[test]
    fn test_selects_inactive_tabs_in_input_order() {
        let tabs = vec![tab(1, "https://a.com"), tab(2, "https://b.com"), tab(3, "https://c.com")];
        let activity: HashMap<i32, f64> =
            [(1, 0.0), (2, 30.0 * HOUR), (3, 1.0 * HOUR)].into();

        let selected = select_for_closure(
            &tabs,
            &HashMap::new(),
            &activity,
            &settings(24.0, &[]),
            48.0 * HOUR,
        );

        let ids: Vec<i32> = selected.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_untracked_tab_counts_as_never_active() {
        let tabs = vec![tab(1, "https://a.com")];

        let selected = select_for_closure(
            &tabs,
            &HashMap::new(),
            &HashMap::new(),
            &settings(24.0, &[]),
            48.0 * HOUR,
        );

        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_active_and_pinned_tabs_survive() {
        let mut active = tab(1, "https://a.com");
        active.active = true;
        let mut pinned = tab(2, "https://b.com");
        pinned.pinned = true;
        let tabs = vec![active, pinned, tab(3, "https://c.com")];

        let selected = select_for_closure(
            &tabs,
            &HashMap::new(),
            &HashMap::new(),
            &settings(1.0, &[]),
            100.0 * HOUR,
        );

        let ids: Vec<i32> = selected.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_locked_tabs_survive() {
        let tabs = vec![tab(1, "https://a.com"), tab(2, "https://b.com")];
        let locked: HashMap<i32, LockedTab> = [(
            1,
            LockedTab {
                original_url: "https://a.com".to_string(),
                password_hash: "h".to_string(),
                locked_at: 0.0,
            },
        )]
        .into();

        let selected = select_for_closure(
            &tabs,
            &locked,
            &HashMap::new(),
            &settings(1.0, &[]),
            100.0 * HOUR,
        );

        let ids: Vec<i32> = selected.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_whitelisted_tabs_survive() {
        let tabs = vec![
            tab(1, "https://mail.google.com/inbox"),
            tab(2, "https://docs.rs/serde"),
            tab(3, "https://example.com/"),
        ];

        let selected = select_for_closure(
            &tabs,
            &HashMap::new(),
            &HashMap::new(),
            &settings(1.0, &["mail.google.com", "https://docs.rs/*"]),
            100.0 * HOUR,
        );

        let ids: Vec<i32> = selected.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_match_url_pattern_substring() {
        assert!(match_url_pattern("https://mail.google.com/x", "google.com"));
        assert!(!match_url_pattern("https://example.com", "google.com"));
        assert!(!match_url_pattern("https://example.com", ""));
    }

    #[test]
    fn test_match_url_pattern_wildcard_is_anchored() {
        assert!(match_url_pattern("https://docs.rs/serde", "https://docs.rs/*"));
        assert!(match_url_pattern("https://a.example.com/x", "*.example.com/*"));
        // Anchored: the wildcard form must cover the whole URL
        assert!(!match_url_pattern("https://docs.rs/serde", "*://docs.rs"));
    }

    #[test]
    fn test_wildcard_escapes_regex_metacharacters() {
        assert!(match_url_pattern("https://a.com/x?q=1", "https://a.com/*"));
        // "." in the pattern is literal, not any-character
        assert!(!match_url_pattern("https://aXcom/", "https://a.com/*"));
    }
}
