//! Tab Guardian - core engine for a tab-locking browser extension
//!
//! Password-locks tabs by URL/domain pattern and declutters inactive tabs
//! into a recoverable vault. The extension shell (popup, options, vault and
//! lock pages, browser APIs) lives outside this crate and talks to
//! [`TabGuardian`] through the [`message`] protocol and the collaborator
//! traits in [`browser`] and [`storage`].

pub mod browser;
pub mod controller;
pub mod declutter;
pub mod domain;
pub mod matcher;
pub mod message;
pub mod password;
pub mod state;
pub mod storage;
pub mod suppress;
pub mod tab_data;
pub mod vault;

pub use controller::{GuardError, TabGuardian};
pub use state::GuardState;
pub use tab_data::{GuardianSettings, TabInfo, VaultEntry};
