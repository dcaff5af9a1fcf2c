//! Failure classification.
//!
//! An ordered substring table, first match wins, with a looser keyword pass
//! behind it. This feeds the user-facing error messages and the transport
//! tuning; it is a lookup table, not an inference engine.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Dns,
    Connection,
    Timeout,
    Blocked,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// The outcome of classifying a failure description.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub category: Category,
    pub severity: Severity,
    /// The table pattern that matched.
    pub pattern: &'static str,
    pub description: &'static str,
}

/// Exact patterns, checked in order against the lowercased failure text.
const PATTERNS: &[(&str, Category, Severity, &str)] = &[
    ("dns", Category::Dns, Severity::Medium, "DNS resolution failed"),
    (
        "name or service not known",
        Category::Dns,
        Severity::Medium,
        "DNS resolution failed",
    ),
    (
        "connection refused",
        Category::Connection,
        Severity::Medium,
        "Connection refused by the origin",
    ),
    (
        "timed out",
        Category::Timeout,
        Severity::Medium,
        "Request timed out",
    ),
    (
        "status 999",
        Category::Blocked,
        Severity::High,
        "Origin hard-blocked the request",
    ),
    (
        "status 429",
        Category::Blocked,
        Severity::Medium,
        "Origin is rate limiting requests",
    ),
    (
        "status 403",
        Category::Blocked,
        Severity::Medium,
        "Origin rejected the request as automated",
    ),
];

/// Looser single-keyword fallbacks, also in order.
const KEYWORDS: &[(&str, Category, &str)] = &[
    ("connection", Category::Connection, "Connection-level failure"),
    ("timeout", Category::Timeout, "Request timed out"),
    ("block", Category::Blocked, "Origin is blocking requests"),
];

/// Classify a failure description. Never fails; unmatched text lands in
/// `Category::Unknown` with low severity.
pub fn classify(detail: &str) -> Diagnosis {
    let haystack = detail.to_lowercase();

    for (pattern, category, severity, description) in PATTERNS.iter().copied() {
        if haystack.contains(pattern) {
            return Diagnosis {
                category,
                severity,
                pattern,
                description,
            };
        }
    }

    for (keyword, category, description) in KEYWORDS.iter().copied() {
        if haystack.contains(keyword) {
            return Diagnosis {
                category,
                severity: Severity::Medium,
                pattern: keyword,
                description,
            };
        }
    }

    Diagnosis {
        category: Category::Unknown,
        severity: Severity::Low,
        pattern: "unknown",
        description: "Failure could not be classified",
    }
}

impl Diagnosis {
    /// The caller-facing message and suggestion for this failure class.
    pub fn user_message(&self) -> (&'static str, &'static str) {
        match self.category {
            Category::Dns => (
                "Website not found (DNS error)",
                "Check if the website URL is correct and accessible.",
            ),
            Category::Connection => (
                "Connection refused",
                "The website server is not responding.",
            ),
            Category::Timeout => (
                "Request timed out",
                "The website is taking too long to respond. Try again later.",
            ),
            Category::Blocked => (
                "Website blocked the request",
                "This website has very strong anti-bot protection.",
            ),
            Category::Unknown => (
                "Failed to fetch URL",
                "Please check the URL and try again.",
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_patterns_win_over_keywords() {
        let diagnosis = classify("connection refused: 127.0.0.1:80");
        assert_eq!(diagnosis.category, Category::Connection);
        assert_eq!(diagnosis.pattern, "connection refused");
    }

    #[test]
    fn dns_failures_are_matched() {
        assert_eq!(classify("dns lookup failed: no host").category, Category::Dns);
        assert_eq!(
            classify("Name or service not known").category,
            Category::Dns
        );
    }

    #[test]
    fn timeouts_are_matched_from_transport_text() {
        let diagnosis = classify("timed out after 25s");
        assert_eq!(diagnosis.category, Category::Timeout);
        assert_eq!(diagnosis.severity, Severity::Medium);
    }

    #[test]
    fn hard_block_is_high_severity() {
        let diagnosis = classify("blocked with status 999");
        assert_eq!(diagnosis.category, Category::Blocked);
        assert_eq!(diagnosis.severity, Severity::High);
    }

    #[test]
    fn keyword_fallback_catches_loose_text() {
        assert_eq!(classify("socket timeout somewhere").category, Category::Timeout);
        assert_eq!(classify("request was blocked").category, Category::Blocked);
    }

    #[test]
    fn unmatched_text_is_unknown_and_low() {
        let diagnosis = classify("something else entirely");
        assert_eq!(diagnosis.category, Category::Unknown);
        assert_eq!(diagnosis.severity, Severity::Low);
    }
}
