/// URL normalization for Tab Guardian: hostname and registrable-domain forms
use url::Url;

/// Compound public suffixes that take three labels instead of two
/// (e.g. "bbc.co.uk" rather than "co.uk").
const COMPOUND_SUFFIXES: [&str; 7] = [
    "co.uk", "com.au", "co.nz", "co.za", "co.jp", "com.br", "com.mx",
];

/// Canonicalize a raw URL or domain string into a bare hostname.
///
/// Inputs without a scheme are treated as https. Malformed input degrades to
/// a best-effort string (scheme and "www." stripped textually); this never
/// fails, though the result may be empty.
///
/// Examples:
/// - https://www.google.com/search → www.google.com
/// - google.com/maps → google.com
pub fn normalize_host(input: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        return String::new();
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };

    match Url::parse(&with_scheme) {
        Ok(parsed) => parsed.host_str().unwrap_or_default().to_string(),
        Err(_) => {
            log::debug!("couldn't normalize URL {input:?}, using as-is");
            let stripped = input
                .strip_prefix("https://")
                .or_else(|| input.strip_prefix("http://"))
                .unwrap_or(input);
            stripped.strip_prefix("www.").unwrap_or(stripped).to_string()
        }
    }
}

/// Extract the registrable base domain from a URL with smart TLD handling.
///
/// Algorithm:
/// 1. Parse URL to extract hostname
/// 2. Split hostname by "."
/// 3. If the last two labels form a known compound suffix (co.uk, com.au, …):
///    → Return last 3 labels (e.g., "bbc.co.uk", "example.com.au")
/// 4. Else:
///    → Return last 2 labels (e.g., "microsoft.com", "zinfandel.io")
/// 5. Handle edge cases (localhost, IPs, single-label hosts)
///
/// Examples:
/// - https://www.google.com/search → google.com
/// - https://ai.microsoft.com → microsoft.com
/// - https://news.bbc.co.uk/article → bbc.co.uk
pub fn registrable_domain(input: &str) -> String {
    let input = input.trim();
    if input.is_empty() {
        return String::new();
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };

    let hostname = match Url::parse(&with_scheme) {
        Ok(parsed) => parsed.host_str().unwrap_or_default().to_string(),
        Err(_) => {
            // Fallback: strip scheme, path, and port by string splitting
            let stripped = input
                .strip_prefix("https://")
                .or_else(|| input.strip_prefix("http://"))
                .unwrap_or(input);
            return stripped
                .split('/')
                .next()
                .unwrap_or_default()
                .split(':')
                .next()
                .unwrap_or_default()
                .to_string();
        }
    };

    // Special cases: localhost and IP addresses have no registrable suffix
    if hostname == "localhost" || is_ip_address(&hostname) {
        return hostname;
    }

    let parts: Vec<&str> = hostname.split('.').collect();
    if parts.len() < 2 {
        return hostname;
    }

    let last_two = parts[parts.len() - 2..].join(".");
    let num_parts = if parts.len() > 2 && COMPOUND_SUFFIXES.contains(&last_two.as_str()) {
        3
    } else {
        2
    };

    parts[parts.len() - num_parts..].join(".")
}

/// Toggle the "www." prefix on a hostname.
pub fn www_toggle(host: &str) -> String {
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => format!("www.{host}"),
    }
}

/// Check if a string looks like an IPv4 address
fn is_ip_address(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_digit() || c == '.')
}
