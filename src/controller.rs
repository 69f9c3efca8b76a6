/// Tab lock controller: the event-driven orchestration layer.
///
/// The extension shell forwards browser events (tab created/updated/
/// activated/removed, alarms, UI messages) here; this module decides what to
/// lock, unlock, close, or restore, mutates `GuardState`, persists it, and
/// drives the tab provider. Every method takes the current time explicitly so
/// the host clock stays outside the core.
use crate::browser::{NotificationSink, TabProvider};
use crate::declutter::{DeclutterSettings, select_for_closure};
use crate::domain::{registrable_domain, www_toggle};
use crate::message::{Request, Response};
use crate::password::{hash_password, verify_password};
use crate::state::GuardState;
use crate::storage::{self, KeyValueStore, keys};
use crate::tab_data::{ClosedTab, DeclutterBatch, GuardianSettings, TabInfo, VaultEntry};
use crate::vault;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// How long a declutter batch stays restorable.
pub const UNDO_WINDOW_MS: f64 = 5.0 * 60.0 * 1000.0;

const NOTIFICATION_TITLE: &str = "Tab Guardian";

/// Operation failures. Everything here is caught at the message boundary and
/// turned into a boolean or a log line; nothing crosses it as a panic.
#[derive(Debug, Error, PartialEq)]
pub enum GuardError {
    #[error("no password provided and no shared password configured")]
    NoPasswordConfigured,
    #[error("password verification failed")]
    PasswordMismatch,
    #[error("no locked data found for tab {0}")]
    TabNotFound(i32),
}

pub struct TabGuardian<B, S, N> {
    tabs: B,
    sync: S,
    local: S,
    notifier: N,
    state: GuardState,
    settings: GuardianSettings,
    lock_page_url: String,
}

impl<B, S, N> TabGuardian<B, S, N>
where
    B: TabProvider,
    S: KeyValueStore,
    N: NotificationSink,
{
    /// Build the controller, loading settings and lock state from storage.
    pub fn new(tabs: B, sync: S, local: S, notifier: N, lock_page_url: impl Into<String>) -> Self {
        let state = GuardState::load(&sync, &local);
        let settings = storage::load(&sync, keys::SETTINGS).unwrap_or_default();
        TabGuardian {
            tabs,
            sync,
            local,
            notifier,
            state,
            settings,
            lock_page_url: lock_page_url.into(),
        }
    }

    /// Startup pass: seed activity stamps for live tabs, drop stamps for dead
    /// ones, then sweep every open tab against the stored patterns.
    pub fn startup(&mut self, now_ms: f64) {
        let live = self.tabs.list_tabs();
        for tab in &live {
            self.state.tab_activity.entry(tab.id).or_insert(now_ms);
        }
        let live_ids: HashSet<i32> = live.iter().map(|t| t.id).collect();
        self.state.prune_activity(&live_ids);
        self.state.persist_activity(&mut self.local);

        log::info!("startup: checking {} open tabs", live.len());
        self.scan_all_tabs(now_ms);
    }

    pub fn settings(&self) -> &GuardianSettings {
        &self.settings
    }

    /// Replace settings and persist them to the synced scope.
    pub fn update_settings(&mut self, settings: GuardianSettings) {
        self.settings = settings;
        storage::save(&mut self.sync, keys::SETTINGS, &self.settings);
    }

    /// Re-read settings, e.g. after the options page wrote them directly.
    pub fn reload_settings(&mut self) {
        self.settings = storage::load(&self.sync, keys::SETTINGS).unwrap_or_default();
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn browser(&self) -> &B {
        &self.tabs
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    #[cfg(test)]
    fn browser_mut_for_tests(&mut self) -> &mut B {
        &mut self.tabs
    }

    // ---- Locking ----

    /// Lock a tab with the given password, falling back to the configured
    /// shared password. Registers pattern variants for the tab's domain,
    /// redirects the tab to the lock screen, then cascades the lock to every
    /// other open tab that now matches.
    pub fn lock_tab(
        &mut self,
        tab_id: i32,
        password: Option<&str>,
        now_ms: f64,
    ) -> Result<(), GuardError> {
        let tab = self
            .tabs
            .get_tab(tab_id)
            .ok_or(GuardError::TabNotFound(tab_id))?;
        if tab.url.is_empty() {
            log::warn!("tab {tab_id} has no URL yet, not locking");
            return Ok(());
        }

        let effective = password
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .or_else(|| self.settings.global_password.clone())
            .ok_or(GuardError::NoPasswordConfigured)?;
        let hash = hash_password(&effective);

        if !self.state.register_lock(tab_id, &tab.url, &hash, now_ms) {
            return Ok(());
        }
        self.state.persist_locks(&mut self.sync);
        self.redirect_to_lock_page(tab_id);

        // Domain-wide cascade: any open tab matching the new patterns gets
        // locked too, sharing the same hash.
        let mut cascaded = false;
        for other in self.tabs.list_tabs() {
            if other.id == tab_id || self.state.locked_tabs.contains_key(&other.id) {
                continue;
            }
            if self.state.should_lock(&other.url)
                && self.state.register_lock(other.id, &other.url, &hash, now_ms)
            {
                log::info!("cascading lock to tab {} at {}", other.id, other.url);
                self.redirect_to_lock_page(other.id);
                cascaded = true;
            }
        }
        if cascaded {
            self.state.persist_locks(&mut self.sync);
        }
        Ok(())
    }

    /// Unlock one tab. With `unlock_domain`, also release the whole domain:
    /// grow the unlocked set, purge related patterns, and free every sibling
    /// locked tab.
    pub fn unlock_tab(
        &mut self,
        tab_id: i32,
        password: &str,
        unlock_domain: bool,
        now_ms: f64,
    ) -> Result<(), GuardError> {
        let locked = self
            .state
            .locked_tabs
            .get(&tab_id)
            .cloned()
            .ok_or(GuardError::TabNotFound(tab_id))?;

        // Fallback compares the supplied password to the shared one, never
        // the shared password to the stored hash: otherwise a lock created
        // from the shared password would open with any input.
        let matches = verify_password(password, &locked.password_hash)
            || self
                .settings
                .global_password
                .as_deref()
                .is_some_and(|shared| password == shared);
        if !matches {
            return Err(GuardError::PasswordMismatch);
        }

        self.state.remove_tab_lock(tab_id);

        if unlock_domain {
            match Url::parse(&locked.original_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
            {
                Some(hostname) => {
                    self.state.add_unlocked_domains(&hostname, &locked.original_url);
                    self.state.purge_patterns_for(&hostname, &locked.original_url);

                    for sibling in self.state.sibling_locked_tabs(&hostname, tab_id) {
                        if let Some(entry) = self.state.remove_tab_lock(sibling) {
                            log::info!("also unlocking tab {sibling} on {hostname}");
                            self.state.recently_unlocked.suppress(sibling, now_ms);
                            self.restore_tab(sibling, &entry.original_url);
                        }
                    }
                }
                None => log::warn!(
                    "couldn't parse {} for domain unlock",
                    locked.original_url
                ),
            }
        }

        // Suppress before restoring: the navigation event fired by the
        // restore must not re-trigger the lock path.
        self.state.recently_unlocked.suppress(tab_id, now_ms);
        self.restore_tab(tab_id, &locked.original_url);
        self.state.persist_locks(&mut self.sync);
        Ok(())
    }

    /// Release every locked tab at once. Verified against the shared
    /// password; clears all patterns so the scanner doesn't re-lock.
    pub fn unlock_all(&mut self, password: &str, now_ms: f64) -> Result<usize, GuardError> {
        let shared = self
            .settings
            .global_password
            .as_deref()
            .ok_or(GuardError::NoPasswordConfigured)?;
        if password != shared {
            return Err(GuardError::PasswordMismatch);
        }

        let locked: Vec<(i32, String)> = self
            .state
            .locked_tabs
            .iter()
            .map(|(id, entry)| (*id, entry.original_url.clone()))
            .collect();
        for (tab_id, original_url) in &locked {
            self.state.recently_unlocked.suppress(*tab_id, now_ms);
            self.restore_tab(*tab_id, original_url);
        }
        self.state.locked_tabs.clear();
        self.state.locked_patterns.clear();
        self.state.persist_locks(&mut self.sync);
        Ok(locked.len())
    }

    /// The URL a locked tab will return to after a successful unlock.
    pub fn locked_url(&self, tab_id: i32) -> Option<String> {
        self.state
            .locked_tabs
            .get(&tab_id)
            .map(|entry| entry.original_url.clone())
    }

    fn redirect_to_lock_page(&mut self, tab_id: i32) {
        let lock_page = format!("{}?tabId={tab_id}", self.lock_page_url);
        if let Err(e) = self.tabs.update_tab_url(tab_id, &lock_page) {
            log::warn!("couldn't redirect tab {tab_id} to lock screen: {e}");
        }
    }

    fn restore_tab(&mut self, tab_id: i32, original_url: &str) {
        if let Err(e) = self.tabs.update_tab_url(tab_id, original_url) {
            log::warn!("couldn't restore tab {tab_id}: {e}");
        }
    }

    // ---- Event handlers ----

    pub fn on_tab_created(&mut self, tab: &TabInfo, now_ms: f64) {
        self.state.touch_activity(tab.id, now_ms);
        self.state.persist_activity(&mut self.local);
        self.maybe_lock(tab.id, &tab.url, now_ms);
    }

    /// Navigation or load-complete on an existing tab.
    pub fn on_tab_updated(&mut self, tab_id: i32, url: &str, now_ms: f64) {
        self.state.touch_activity(tab_id, now_ms);
        self.state.persist_activity(&mut self.local);
        self.maybe_lock(tab_id, url, now_ms);
    }

    pub fn on_tab_activated(&mut self, tab_id: i32, now_ms: f64) {
        self.state.touch_activity(tab_id, now_ms);
        self.state.persist_activity(&mut self.local);
    }

    pub fn on_tab_removed(&mut self, tab_id: i32) {
        self.state.tab_activity.remove(&tab_id);
        self.state.recently_unlocked.remove(tab_id);
        if self.state.remove_tab_lock(tab_id).is_some() {
            self.state.persist_locks(&mut self.sync);
        }
        self.state.persist_activity(&mut self.local);
    }

    /// Periodic backstop for locks missed by the event handlers (restored
    /// sessions, background tabs, races between listeners).
    pub fn scan_all_tabs(&mut self, now_ms: f64) {
        self.state.recently_unlocked.sweep(now_ms);
        for tab in self.tabs.list_tabs() {
            if self.state.locked_tabs.contains_key(&tab.id) {
                continue;
            }
            self.maybe_lock(tab.id, &tab.url, now_ms);
        }
    }

    /// Lock a tab if (and only if) it matches, checking "already locked" and
    /// the suppression window immediately before acting.
    fn maybe_lock(&mut self, tab_id: i32, url: &str, now_ms: f64) {
        if url.is_empty()
            || self.state.locked_tabs.contains_key(&tab_id)
            || self.state.recently_unlocked.contains(tab_id, now_ms)
        {
            return;
        }
        if !self.state.should_lock(url) {
            return;
        }
        let Some(hash) = self.enforcement_hash_for(url) else {
            log::warn!("tab {tab_id} matches a lock pattern but no password is available");
            return;
        };
        if self.state.register_lock(tab_id, url, &hash, now_ms) {
            log::info!("locking tab {tab_id} at {url}");
            self.state.persist_locks(&mut self.sync);
            self.redirect_to_lock_page(tab_id);
        }
    }

    /// The hash a background-enforced lock should carry: the hash of the
    /// pattern that covers this URL, so the password that created the lock
    /// also opens it; the shared password's hash as a last resort.
    fn enforcement_hash_for(&self, url: &str) -> Option<String> {
        if let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)) {
            for key in [
                url.to_string(),
                host.clone(),
                www_toggle(&host),
                registrable_domain(url),
            ] {
                if let Some(pattern) = self.state.locked_patterns.get(&key) {
                    return Some(pattern.password_hash.clone());
                }
            }
        }
        for (pattern, data) in &self.state.locked_patterns {
            if url.contains(pattern.as_str()) {
                return Some(data.password_hash.clone());
            }
        }
        self.settings.global_password.as_deref().map(hash_password)
    }

    // ---- Declutter ----

    /// Close inactive tabs, preserving them in the vault and recording an
    /// undo batch. Returns the number of tabs closed.
    pub fn declutter(
        &mut self,
        hours: Option<f64>,
        whitelist_override: Option<Vec<String>>,
        now_ms: f64,
    ) -> usize {
        let run_settings = DeclutterSettings {
            threshold_hours: hours.unwrap_or(self.settings.declutter_threshold_hours),
            whitelist: whitelist_override.unwrap_or_else(|| self.settings.whitelist.clone()),
        };
        log::info!(
            "declutter run: {}h threshold, {} whitelist entries",
            run_settings.threshold_hours,
            run_settings.whitelist.len()
        );

        let all_tabs = self.tabs.list_tabs();
        let selected: Vec<TabInfo> = select_for_closure(
            &all_tabs,
            &self.state.locked_tabs,
            &self.state.tab_activity,
            &run_settings,
            now_ms,
        )
        .into_iter()
        .cloned()
        .collect();

        if selected.is_empty() {
            log::debug!("no tabs to declutter");
            return 0;
        }

        if self.settings.vault_enabled {
            let mut entries: Vec<VaultEntry> =
                storage::load(&self.local, keys::TAB_VAULT).unwrap_or_default();
            for tab in &selected {
                let title = if tab.title.is_empty() { tab.url.clone() } else { tab.title.clone() };
                vault::append(
                    &mut entries,
                    VaultEntry {
                        url: tab.url.clone(),
                        title,
                        favicon: tab.favicon.clone(),
                        timestamp: now_ms,
                        reason: "auto-declutter".to_string(),
                    },
                    self.settings.vault_retention_days,
                    now_ms,
                );
            }
            storage::save(&mut self.local, keys::TAB_VAULT, &entries);
        }

        self.notifier.notify(
            NOTIFICATION_TITLE,
            &format!(
                "Closed {} inactive tabs from {}",
                selected.len(),
                domain_summary(&selected)
            ),
        );

        let batch = DeclutterBatch {
            id: Uuid::new_v4().to_string(),
            tabs: selected
                .iter()
                .map(|t| ClosedTab {
                    id: t.id,
                    url: t.url.clone(),
                    title: t.title.clone(),
                })
                .collect(),
            timestamp: now_ms,
        };
        storage::save(&mut self.local, keys::LAST_DECLUTTER, &batch);

        let ids: Vec<i32> = selected.iter().map(|t| t.id).collect();
        if let Err(e) = self.tabs.remove_tabs(&ids) {
            log::error!("couldn't close decluttered tabs: {e}");
        }
        for id in &ids {
            self.state.tab_activity.remove(id);
        }
        self.state.persist_activity(&mut self.local);

        ids.len()
    }

    /// Reopen the last declutter batch if it is still inside the undo window.
    pub fn undo_last_declutter(&mut self, now_ms: f64) -> usize {
        let Some(batch): Option<DeclutterBatch> = storage::load(&self.local, keys::LAST_DECLUTTER)
        else {
            return 0;
        };
        if now_ms - batch.timestamp > UNDO_WINDOW_MS {
            self.notifier.notify(
                NOTIFICATION_TITLE,
                "Cannot restore tabs after 5 minutes. Please use the Tab Vault instead.",
            );
            return 0;
        }

        for closed in &batch.tabs {
            if let Err(e) = self.tabs.create_tab(&closed.url, false) {
                log::warn!("couldn't reopen {}: {e}", closed.url);
            }
        }
        if let Err(e) = self.local.remove(keys::LAST_DECLUTTER) {
            log::error!("couldn't clear undo batch: {e}");
        }
        self.notifier.notify(
            NOTIFICATION_TITLE,
            &format!("Restored {} tabs", batch.tabs.len()),
        );
        batch.tabs.len()
    }

    // ---- Vault ----

    pub fn vault(&self) -> Vec<VaultEntry> {
        storage::load(&self.local, keys::TAB_VAULT).unwrap_or_default()
    }

    pub fn clear_vault(&mut self) -> bool {
        match self.local.remove(keys::TAB_VAULT) {
            Ok(()) => true,
            Err(e) => {
                log::error!("couldn't clear vault: {e}");
                false
            }
        }
    }

    pub fn add_to_vault(
        &mut self,
        url: &str,
        title: Option<&str>,
        reason: Option<&str>,
        now_ms: f64,
    ) -> bool {
        if !self.settings.vault_enabled {
            log::debug!("vault is disabled, not adding {url}");
            return false;
        }
        let mut entries: Vec<VaultEntry> =
            storage::load(&self.local, keys::TAB_VAULT).unwrap_or_default();
        vault::append(
            &mut entries,
            VaultEntry {
                url: url.to_string(),
                title: title.filter(|t| !t.is_empty()).unwrap_or(url).to_string(),
                favicon: None,
                timestamp: now_ms,
                reason: reason.unwrap_or("manual-add").to_string(),
            },
            self.settings.vault_retention_days,
            now_ms,
        );
        storage::save(&mut self.local, keys::TAB_VAULT, &entries);
        true
    }

    pub fn delete_from_vault(&mut self, url: &str, timestamp: f64) -> bool {
        let mut entries: Vec<VaultEntry> =
            storage::load(&self.local, keys::TAB_VAULT).unwrap_or_default();
        let found = vault::delete(&mut entries, url, timestamp);
        if found {
            storage::save(&mut self.local, keys::TAB_VAULT, &entries);
        }
        found
    }

    // ---- Message boundary ----

    /// Dispatch a UI request. Failures never escape: they become boolean
    /// outcomes or log lines, and locking stays a silent background action.
    pub fn handle(&mut self, request: Request, now_ms: f64) -> Response {
        match request {
            Request::LockTab { tab_id, password } => {
                if let Err(e) = self.lock_tab(tab_id, password.as_deref(), now_ms) {
                    log::error!("lock of tab {tab_id} failed: {e}");
                }
                Response::Ack
            }
            Request::UnlockTab {
                tab_id,
                password,
                unlock_domain,
            } => match self.unlock_tab(tab_id, &password, unlock_domain, now_ms) {
                Ok(()) => Response::Unlocked(true),
                Err(e) => {
                    log::warn!("unlock of tab {tab_id} failed: {e}");
                    Response::Unlocked(false)
                }
            },
            Request::UnlockAllTabs { password } => match self.unlock_all(&password, now_ms) {
                Ok(count) => {
                    log::info!("unlocked all {count} tabs");
                    Response::Unlocked(true)
                }
                Err(e) => {
                    log::warn!("unlock-all failed: {e}");
                    Response::Unlocked(false)
                }
            },
            Request::GetLockedUrl { tab_id } => Response::LockedUrl {
                url: self.locked_url(tab_id),
            },
            Request::DeclutterTabs { hours, options } => {
                Response::Count(self.declutter(Some(hours), options.whitelist, now_ms))
            }
            Request::GetVault => Response::Vault(self.vault()),
            Request::ClearVault => Response::Success(self.clear_vault()),
            Request::AddToVault { url, title, reason } => Response::Success(self.add_to_vault(
                &url,
                title.as_deref(),
                reason.as_deref(),
                now_ms,
            )),
            Request::DeleteFromVault { url, timestamp } => {
                Response::Success(self.delete_from_vault(&url, timestamp))
            }
        }
    }
}

/// Up to three distinct hostnames from a closure batch, for the notification.
fn domain_summary(tabs: &[TabInfo]) -> String {
    let mut seen = HashSet::new();
    let domains: Vec<String> = tabs
        .iter()
        .map(|tab| {
            Url::parse(&tab.url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| "unknown".to_string())
        })
        .filter(|domain| seen.insert(domain.clone()))
        .collect();

    if domains.len() <= 3 {
        domains.join(", ")
    } else {
        format!("{} and {} more", domains[..3].join(", "), domains.len() - 3)
    }
}
