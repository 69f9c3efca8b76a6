/// Request/response protocol between the core and the extension's UI pages.
///
/// The JSON wire shape is the extension message format: a tagged "action"
/// field plus camelCase parameters, e.g.
/// `{"action":"unlockTab","tabId":3,"password":"…","unlockDomain":true}`.
use crate::tab_data::VaultEntry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    #[serde(rename_all = "camelCase")]
    LockTab {
        tab_id: i32,
        #[serde(default)]
        password: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    UnlockTab {
        tab_id: i32,
        password: String,
        #[serde(default)]
        unlock_domain: bool,
    },
    UnlockAllTabs {
        password: String,
    },
    #[serde(rename_all = "camelCase")]
    GetLockedUrl {
        tab_id: i32,
    },
    DeclutterTabs {
        hours: f64,
        #[serde(default)]
        options: DeclutterOptions,
    },
    GetVault,
    ClearVault,
    #[serde(rename_all = "camelCase")]
    AddToVault {
        url: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        reason: Option<String>,
    },
    DeleteFromVault {
        url: String,
        timestamp: f64,
    },
}

/// Per-run declutter overrides carried alongside the threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DeclutterOptions {
    /// Replaces the configured whitelist for this run when present.
    pub whitelist: Option<Vec<String>>,
}

/// Replies, shaped like the values the UI pages already consume.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Response {
    /// Fire-and-forget acknowledgement (lockTab).
    Ack,
    /// unlockTab / unlockAllTabs outcome.
    Unlocked(bool),
    /// getLockedUrl.
    LockedUrl { url: Option<String> },
    /// declutterTabs: number of tabs closed.
    Count(usize),
    /// getVault.
    Vault(Vec<VaultEntry>),
    /// clearVault / addToVault / deleteFromVault.
    Success(bool),
}
