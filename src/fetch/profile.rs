//! Request profiles and the escalation catalog.
//!
//! # Responsibilities
//! - Define the immutable per-request parameter bundles (headers, timeout,
//!   redirect limit, acceptable-status rule)
//! - Supply the fixed, ordered escalation catalog
//!
//! # Design Decisions
//! - Catalog order encodes best-effort-to-least-effort escalation: desktop
//!   browser, mobile browser, bare headers, search crawler, delayed retry
//! - Profiles are `'static` data; no mutation after startup, safe to share
//!   across tasks without synchronization
//! - The "Delayed Request" profile pauses before sending, for origins that
//!   rate-limit by request burst

use std::time::Duration;

/// Upstream status that always means "blocked", even though bytes arrived.
pub const HARD_BLOCK_STATUS: u16 = 999;

/// Anti-automation statuses that trigger escalation instead of being
/// surfaced to the caller as a plain upstream error.
pub const BLOCKING_STATUSES: [u16; 3] = [403, 429, HARD_BLOCK_STATUS];

/// Desktop browser signature, shared by the standard profile and `/proxy`.
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Decides whether a status is usable at the transport level. Statuses the
/// predicate rejects count as failures and trigger fallback.
pub type StatusPredicate = fn(u16) -> bool;

fn below_server_error(status: u16) -> bool {
    status < 500
}

/// Returns true for statuses that indicate active blocking.
pub fn is_blocking_status(status: u16) -> bool {
    BLOCKING_STATUSES.contains(&status)
}

/// A named, immutable bundle of request parameters.
#[derive(Debug, Clone, Copy)]
pub struct RequestProfile {
    pub name: &'static str,
    pub headers: &'static [(&'static str, &'static str)],
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Pause materialized before the request is sent, if any.
    pub pre_request_delay: Option<Duration>,
    pub acceptable: StatusPredicate,
}

impl RequestProfile {
    /// Whether a response with this status is good enough to evaluate
    /// further (a `true` here does not yet mean success; see the fetcher).
    pub fn accepts(&self, status: u16) -> bool {
        (self.acceptable)(status)
    }
}

const MODERN_BROWSER_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", DESKTOP_USER_AGENT),
    ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8"),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("DNT", "1"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
    ("Sec-Fetch-Dest", "document"),
    ("Sec-Fetch-Mode", "navigate"),
    ("Sec-Fetch-Site", "none"),
    ("Sec-Fetch-User", "?1"),
    ("Cache-Control", "max-age=0"),
];

const MOBILE_BROWSER_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1"),
    ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Accept-Encoding", "gzip, deflate"),
    ("Connection", "keep-alive"),
];

const MINIMAL_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"),
    ("Accept", "text/html"),
];

const CRAWLER_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"),
    ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    ("Accept-Language", "en"),
];

const DELAYED_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"),
    ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    ("Accept-Language", "en-US,en;q=0.5"),
    ("Accept-Encoding", "gzip, deflate"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
];

const STANDARD_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", DESKTOP_USER_AGENT),
    ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8"),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Accept-Encoding", "gzip, deflate, br"),
    ("DNT", "1"),
    ("Connection", "keep-alive"),
    ("Upgrade-Insecure-Requests", "1"),
    ("Cache-Control", "max-age=0"),
];

/// The profile for the initial, non-escalated attempt. Not part of the
/// catalog; its attempt is not recorded in the ledger.
pub fn standard_profile() -> RequestProfile {
    RequestProfile {
        name: "Standard",
        headers: STANDARD_HEADERS,
        timeout: Duration::from_secs(25),
        max_redirects: 5,
        pre_request_delay: None,
        acceptable: below_server_error,
    }
}

/// The ordered sequence of fallback profiles. Fixed at construction; order
/// is significant.
pub struct ProfileCatalog {
    profiles: &'static [RequestProfile],
}

const CATALOG: &[RequestProfile] = &[
    RequestProfile {
        name: "Modern Browser",
        headers: MODERN_BROWSER_HEADERS,
        timeout: Duration::from_secs(25),
        max_redirects: 5,
        pre_request_delay: None,
        acceptable: below_server_error,
    },
    RequestProfile {
        name: "Mobile Browser",
        headers: MOBILE_BROWSER_HEADERS,
        timeout: Duration::from_secs(25),
        max_redirects: 5,
        pre_request_delay: None,
        acceptable: below_server_error,
    },
    RequestProfile {
        name: "Minimal Headers",
        headers: MINIMAL_HEADERS,
        timeout: Duration::from_secs(15),
        max_redirects: 3,
        pre_request_delay: None,
        acceptable: below_server_error,
    },
    RequestProfile {
        name: "Search Crawler",
        headers: CRAWLER_HEADERS,
        timeout: Duration::from_secs(30),
        max_redirects: 5,
        pre_request_delay: None,
        acceptable: below_server_error,
    },
    RequestProfile {
        name: "Delayed Request",
        headers: DELAYED_HEADERS,
        timeout: Duration::from_secs(35),
        max_redirects: 5,
        pre_request_delay: Some(Duration::from_secs(2)),
        acceptable: below_server_error,
    },
];

impl ProfileCatalog {
    /// The standard escalation catalog.
    pub fn standard() -> Self {
        Self { profiles: CATALOG }
    }

    pub fn profiles(&self) -> &[RequestProfile] {
        self.profiles
    }

    pub fn get(&self, index: usize) -> Option<&RequestProfile> {
        self.profiles.get(index)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_order_is_fixed() {
        let catalog = ProfileCatalog::standard();
        let names: Vec<_> = catalog.profiles().iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            [
                "Modern Browser",
                "Mobile Browser",
                "Minimal Headers",
                "Search Crawler",
                "Delayed Request"
            ]
        );
    }

    #[test]
    fn only_the_last_profile_delays() {
        let catalog = ProfileCatalog::standard();
        let delayed: Vec<_> = catalog
            .profiles()
            .iter()
            .filter(|p| p.pre_request_delay.is_some())
            .map(|p| p.name)
            .collect();
        assert_eq!(delayed, ["Delayed Request"]);
    }

    #[test]
    fn predicate_rejects_server_errors() {
        let catalog = ProfileCatalog::standard();
        let profile = &catalog.profiles()[0];
        assert!(profile.accepts(200));
        assert!(profile.accepts(404));
        assert!(!profile.accepts(500));
        assert!(!profile.accepts(HARD_BLOCK_STATUS));
    }

    #[test]
    fn blocking_statuses_cover_rate_limits_and_hard_blocks() {
        assert!(is_blocking_status(403));
        assert!(is_blocking_status(429));
        assert!(is_blocking_status(999));
        assert!(!is_blocking_status(404));
        assert!(!is_blocking_status(200));
    }

    #[test]
    fn standard_profile_sends_no_fetch_metadata_hints() {
        let profile = standard_profile();
        assert!(profile
            .headers
            .iter()
            .all(|(name, _)| !name.starts_with("Sec-Fetch")));
        assert!(profile.pre_request_delay.is_none());
    }
}
