/// Data structures for Tab Guardian
use serde::{Deserialize, Serialize};

/// Information about a browser tab, as supplied by the tab provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TabInfo {
    pub id: i32,
    pub url: String,
    pub title: String,
    pub active: bool,
    pub pinned: bool,
    pub favicon: Option<String>,
}

impl TabInfo {
    pub fn new(id: i32, url: impl Into<String>, title: impl Into<String>) -> TabInfo {
        TabInfo {
            id,
            url: url.into(),
            title: title.into(),
            active: false,
            pinned: false,
            favicon: None,
        }
    }
}

/// A tab currently held behind the lock screen. Keyed by tab id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockedTab {
    pub original_url: String,
    pub password_hash: String,
    pub locked_at: f64,
}

/// A stored lock pattern (hostname, base domain, or URL fragment).
/// Keyed by the pattern string; several patterns share one hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockedPattern {
    pub password_hash: String,
    pub locked_at: f64,
}

/// A closed tab preserved for recovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VaultEntry {
    pub url: String,
    pub title: String,
    pub favicon: Option<String>,
    pub timestamp: f64,
    pub reason: String,
}

/// A tab closed by a declutter run, kept so the batch can be undone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClosedTab {
    pub id: i32,
    pub url: String,
    pub title: String,
}

/// The most recent declutter closure batch. Restorable for five minutes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeclutterBatch {
    pub id: String,
    pub tabs: Vec<ClosedTab>,
    pub timestamp: f64,
}

/// User settings, persisted in the synced storage scope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardianSettings {
    /// Shared password used when a lock request carries none.
    pub global_password: Option<String>,
    /// Declutter never closes tabs matching these patterns ("*" wildcards allowed).
    pub whitelist: Vec<String>,
    pub declutter_threshold_hours: f64,
    pub declutter_frequency_minutes: u32,
    pub auto_declutter_enabled: bool,
    pub vault_enabled: bool,
    /// Days to keep vault entries; 0 keeps them forever.
    pub vault_retention_days: u32,
}

impl Default for GuardianSettings {
    fn default() -> Self {
        GuardianSettings {
            global_password: None,
            whitelist: Vec::new(),
            declutter_threshold_hours: 24.0,
            declutter_frequency_minutes: 60,
            auto_declutter_enabled: true,
            vault_enabled: true,
            vault_retention_days: 30,
        }
    }
}
