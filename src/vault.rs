/// Vault log operations: an append-only record of closed tabs.
///
/// The vault keeps the newest 500 entries; a retention policy (in days) may
/// additionally prune old entries before each append. Eviction drops the
/// oldest entries first and preserves the order of the rest.
use crate::tab_data::VaultEntry;

pub const MAX_VAULT_ENTRIES: usize = 500;

const MS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Append an entry, pruning by retention first and enforcing the size cap.
pub fn append(
    vault: &mut Vec<VaultEntry>,
    entry: VaultEntry,
    retention_days: u32,
    now_ms: f64,
) {
    if retention_days > 0 {
        let max_age_ms = retention_days as f64 * MS_PER_DAY;
        vault.retain(|existing| now_ms - existing.timestamp <= max_age_ms);
    }

    vault.push(entry);

    if vault.len() > MAX_VAULT_ENTRIES {
        let excess = vault.len() - MAX_VAULT_ENTRIES;
        vault.drain(..excess);
    }
}

/// Remove the entry identified by URL + timestamp. Returns whether one was found.
pub fn delete(vault: &mut Vec<VaultEntry>, url: &str, timestamp: f64) -> bool {
    match vault
        .iter()
        .position(|entry| entry.url == url && entry.timestamp == timestamp)
    {
        Some(index) => {
            vault.remove(index);
            true
        }
        None => {
            log::debug!("vault entry not found: {url} @ {timestamp}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, timestamp: f64) -> VaultEntry {
        VaultEntry {
            url: url.to_string(),
            title: url.to_string(),
            favicon: None,
            timestamp,
            reason: "auto-declutter".to_string(),
        }
    }

    #[test]
    fn test_append_grows_vault() {
        let mut vault = Vec::new();
        append(&mut vault, entry("https://a.com", 1.0), 0, 1.0);
        append(&mut vault, entry("https://b.com", 2.0), 0, 2.0);

        assert_eq!(vault.len(), 2);
        assert_eq!(vault[0].url, "https://a.com");
    }

    #[test]
    fn test_cap_evicts_oldest_preserving_order() {
        let mut vault: Vec<VaultEntry> = (0..MAX_VAULT_ENTRIES)
            .map(|i| entry(&format!("https://site{i}.com"), i as f64))
            .collect();

        append(&mut vault, entry("https://newest.com", 9_999.0), 0, 9_999.0);

        assert_eq!(vault.len(), MAX_VAULT_ENTRIES);
        // Entry #0 evicted, the rest shift, newest appended at the end
        assert_eq!(vault[0].url, "https://site1.com");
        assert_eq!(vault[MAX_VAULT_ENTRIES - 1].url, "https://newest.com");
    }

    #[test]
    fn test_retention_prunes_before_append() {
        let now = 40.0 * MS_PER_DAY;
        let mut vault = vec![
            entry("https://ancient.com", 1.0 * MS_PER_DAY),
            entry("https://recent.com", 35.0 * MS_PER_DAY),
        ];

        append(&mut vault, entry("https://new.com", now), 30, now);

        let urls: Vec<&str> = vault.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://recent.com", "https://new.com"]);
    }

    #[test]
    fn test_zero_retention_keeps_forever() {
        let now = 400.0 * MS_PER_DAY;
        let mut vault = vec![entry("https://ancient.com", 0.0)];

        append(&mut vault, entry("https://new.com", now), 0, now);

        assert_eq!(vault.len(), 2);
    }

    #[test]
    fn test_delete_matches_url_and_timestamp() {
        let mut vault = vec![entry("https://a.com", 1.0), entry("https://a.com", 2.0)];

        assert!(delete(&mut vault, "https://a.com", 2.0));
        assert_eq!(vault.len(), 1);
        assert_eq!(vault[0].timestamp, 1.0);

        assert!(!delete(&mut vault, "https://a.com", 99.0));
    }
}
