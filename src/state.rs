/// Lock/unlock state: the single source of truth while a handler runs.
///
/// One `GuardState` is constructed at startup from the two storage scopes and
/// injected wherever it is needed; nothing reads ambient globals. Mutations
/// happen in memory first; callers persist at the end of each operation, so a
/// crash between the two loses that one operation and corrupts nothing else.
use crate::domain::{normalize_host, registrable_domain, www_toggle};
use crate::matcher::should_lock_url;
use crate::storage::{self, KeyValueStore, keys};
use crate::suppress::RecentlyUnlocked;
use crate::tab_data::{LockedPattern, LockedTab};
use std::collections::{HashMap, HashSet};
use url::Url;

#[derive(Debug, Default)]
pub struct GuardState {
    pub locked_tabs: HashMap<i32, LockedTab>,
    pub locked_patterns: HashMap<String, LockedPattern>,
    pub unlocked_domains: HashSet<String>,
    pub recently_unlocked: RecentlyUnlocked,
    pub tab_activity: HashMap<i32, f64>,
}

impl GuardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild state from the synced scope (lock data) and the local scope
    /// (activity stamps). Missing or undecodable keys start empty.
    pub fn load<S: KeyValueStore + ?Sized>(sync: &S, local: &S) -> Self {
        let state = GuardState {
            locked_tabs: storage::load(sync, keys::LOCKED_TABS).unwrap_or_default(),
            locked_patterns: storage::load(sync, keys::LOCKED_PATTERNS).unwrap_or_default(),
            unlocked_domains: storage::load(sync, keys::UNLOCKED_DOMAINS).unwrap_or_default(),
            recently_unlocked: RecentlyUnlocked::new(),
            tab_activity: storage::load(local, keys::TAB_ACTIVITY).unwrap_or_default(),
        };
        log::info!(
            "loaded {} locked tabs, {} lock patterns, {} unlocked domains",
            state.locked_tabs.len(),
            state.locked_patterns.len(),
            state.unlocked_domains.len()
        );
        state
    }

    /// Durably save the full lock maps and unlocked-domain set.
    pub fn persist_locks<S: KeyValueStore + ?Sized>(&self, sync: &mut S) {
        storage::save(sync, keys::LOCKED_TABS, &self.locked_tabs);
        storage::save(sync, keys::LOCKED_PATTERNS, &self.locked_patterns);
        storage::save(sync, keys::UNLOCKED_DOMAINS, &self.unlocked_domains);
    }

    pub fn persist_activity<S: KeyValueStore + ?Sized>(&self, local: &mut S) {
        storage::save(local, keys::TAB_ACTIVITY, &self.tab_activity);
    }

    pub fn should_lock(&self, url: &str) -> bool {
        should_lock_url(url, &self.locked_patterns, &self.unlocked_domains)
    }

    /// Record a lock on one tab: the LockedTab row plus redundant pattern
    /// variants (bare hostname, registrable domain, www-prefixed hostname,
    /// scheme-qualified hostname) so later matching succeeds against any
    /// normalized form. Returns false when no usable hostname exists.
    pub fn register_lock(&mut self, tab_id: i32, url: &str, password_hash: &str, now_ms: f64) -> bool {
        let parsed = Url::parse(url).ok();
        let hostname = match parsed.as_ref().and_then(|u| u.host_str()) {
            Some(host) => host.to_string(),
            None => normalize_host(url),
        };
        if hostname.is_empty() {
            log::error!("cannot lock tab {tab_id}: no hostname in {url:?}");
            return false;
        }

        self.locked_tabs.insert(
            tab_id,
            LockedTab {
                original_url: url.to_string(),
                password_hash: password_hash.to_string(),
                locked_at: now_ms,
            },
        );

        let make_pattern = || LockedPattern {
            password_hash: password_hash.to_string(),
            locked_at: now_ms,
        };

        log::debug!("locking domain {hostname}");
        self.locked_patterns.insert(hostname.clone(), make_pattern());

        let base_domain = registrable_domain(url);
        if !base_domain.is_empty() && base_domain != hostname {
            self.locked_patterns.insert(base_domain, make_pattern());
        }

        if !hostname.starts_with("www.") {
            self.locked_patterns.insert(format!("www.{hostname}"), make_pattern());
        }

        if let Some(url_obj) = parsed {
            self.locked_patterns
                .insert(format!("{}://{hostname}", url_obj.scheme()), make_pattern());
        }

        true
    }

    pub fn remove_tab_lock(&mut self, tab_id: i32) -> Option<LockedTab> {
        self.locked_tabs.remove(&tab_id)
    }

    /// Mark a domain (with its www variant and registrable base) as
    /// explicitly unlocked. Membership is permanent and overrides patterns.
    pub fn add_unlocked_domains(&mut self, hostname: &str, original_url: &str) {
        self.unlocked_domains.insert(hostname.to_string());
        self.unlocked_domains.insert(www_toggle(hostname));

        let base_domain = registrable_domain(original_url);
        if !base_domain.is_empty() {
            self.unlocked_domains.insert(base_domain);
        }
        log::debug!("unlocked domains now: {:?}", self.unlocked_domains);
    }

    /// Delete every stored pattern related to an unlocked domain:
    /// equality, containment, www variants, parsed-hostname or subdomain
    /// relation, and the registrable base of the unlocking tab's URL.
    /// Collects first, then deletes. Returns the removed keys.
    pub fn purge_patterns_for(&mut self, hostname: &str, original_url: &str) -> Vec<String> {
        let without_www = hostname.strip_prefix("www.").unwrap_or(hostname).to_string();
        let with_www = if hostname.starts_with("www.") {
            hostname.to_string()
        } else {
            format!("www.{hostname}")
        };
        let base_domain = registrable_domain(original_url);

        let to_delete: Vec<String> = self
            .locked_patterns
            .keys()
            .filter(|pattern| {
                pattern_relates_to_domain(pattern, hostname)
                    || pattern.as_str() == without_www
                    || pattern.as_str() == with_www
                    || pattern.contains(&without_www)
                    || pattern.contains(&with_www)
                    || (!base_domain.is_empty()
                        && (pattern.as_str() == base_domain || pattern.contains(&base_domain)))
            })
            .cloned()
            .collect();

        log::debug!("found {} patterns to unlock: {to_delete:?}", to_delete.len());
        for key in &to_delete {
            self.locked_patterns.remove(key);
        }
        to_delete
    }

    /// Other locked tabs whose original hostname is equal, www-equivalent,
    /// or subdomain-related to the given domain.
    pub fn sibling_locked_tabs(&self, hostname: &str, exclude_tab: i32) -> Vec<i32> {
        self.locked_tabs
            .iter()
            .filter(|(tab_id, _)| **tab_id != exclude_tab)
            .filter_map(|(tab_id, locked)| {
                let tab_host = Url::parse(&locked.original_url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string))?;
                let related = tab_host == hostname
                    || tab_host == format!("www.{hostname}")
                    || hostname == format!("www.{tab_host}")
                    || tab_host.ends_with(&format!(".{hostname}"))
                    || hostname.ends_with(&format!(".{tab_host}"));
                related.then_some(*tab_id)
            })
            .collect()
    }

    pub fn touch_activity(&mut self, tab_id: i32, now_ms: f64) {
        self.tab_activity.insert(tab_id, now_ms);
    }

    /// Drop activity stamps for tabs that no longer exist.
    pub fn prune_activity(&mut self, live_tab_ids: &HashSet<i32>) {
        self.tab_activity.retain(|tab_id, _| live_tab_ids.contains(tab_id));
    }
}

/// Does a stored pattern refer to this domain? Direct equality, textual
/// containment, or a hostname/subdomain relationship once parsed as a URL.
fn pattern_relates_to_domain(pattern: &str, domain: &str) -> bool {
    if pattern == domain || pattern.contains(domain) {
        return true;
    }

    let with_scheme = if pattern.starts_with("http") {
        pattern.to_string()
    } else {
        format!("https://{pattern}")
    };
    if let Some(pattern_host) = Url::parse(&with_scheme)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
    {
        if pattern_host == domain
            || pattern_host.ends_with(&format!(".{domain}"))
            || domain.ends_with(&format!(".{pattern_host}"))
        {
            return true;
        }
    }

    false
}
