/// Re-lock suppression for recently unlocked tabs.
///
/// After an unlock, the navigation listener and the periodic scanner must not
/// immediately re-lock the tab the user just opened. Each unlocked tab gets a
/// deadline; until it passes, every lock path skips the tab. Suppressing a
/// tab that already has a deadline replaces it, so a fresh unlock always wins
/// over a stale timer.
use std::collections::HashMap;

/// How long a freshly unlocked tab is protected from re-locking.
pub const SUPPRESSION_WINDOW_MS: f64 = 30_000.0;

#[derive(Debug, Default)]
pub struct RecentlyUnlocked {
    deadlines: HashMap<i32, f64>,
}

impl RecentlyUnlocked {
    pub fn new() -> Self {
        Self::default()
    }

    /// Protect a tab until `now_ms + SUPPRESSION_WINDOW_MS`, replacing any
    /// earlier deadline.
    pub fn suppress(&mut self, tab_id: i32, now_ms: f64) {
        self.deadlines.insert(tab_id, now_ms + SUPPRESSION_WINDOW_MS);
    }

    /// Is this tab still inside its suppression window?
    pub fn contains(&self, tab_id: i32, now_ms: f64) -> bool {
        self.deadlines
            .get(&tab_id)
            .is_some_and(|deadline| *deadline > now_ms)
    }

    /// Drop a tab's protection early (e.g. the tab closed).
    pub fn remove(&mut self, tab_id: i32) {
        self.deadlines.remove(&tab_id);
    }

    /// Drop all expired deadlines. Called opportunistically from the scanner
    /// so the map doesn't accumulate dead tab ids.
    pub fn sweep(&mut self, now_ms: f64) {
        self.deadlines.retain(|_, deadline| *deadline > now_ms);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }
}
