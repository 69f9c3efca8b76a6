/// Collaborator seams toward the browser runtime.
///
/// The extension shell implements these over the real tab and notification
/// APIs; the core never touches a browser API directly.
use crate::tab_data::TabInfo;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("no tab with id {0}")]
    TabGone(i32),
    #[error("browser call failed: {0}")]
    Call(String),
}

/// Live-tab access: query, navigate, close, open.
pub trait TabProvider {
    fn list_tabs(&self) -> Vec<TabInfo>;
    fn get_tab(&self, tab_id: i32) -> Option<TabInfo>;
    fn update_tab_url(&mut self, tab_id: i32, url: &str) -> Result<(), BrowserError>;
    fn remove_tabs(&mut self, tab_ids: &[i32]) -> Result<(), BrowserError>;
    fn create_tab(&mut self, url: &str, active: bool) -> Result<(), BrowserError>;
}

/// Fire-and-forget user-facing notifications. Not part of correctness.
pub trait NotificationSink {
    fn notify(&mut self, title: &str, message: &str);
}

/// Sink that drops notifications, for embedders without a notification API.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn notify(&mut self, _title: &str, _message: &str) {}
}
