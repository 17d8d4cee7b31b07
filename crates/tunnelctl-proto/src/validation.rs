//! Name and hostname validation
//!
//! Both checks are pure and run before any request reaches the directory.

use std::sync::OnceLock;

use regex_lite::Regex;

const NAME_PATTERN: &str = r"^[_a-zA-Z0-9][-_.a-zA-Z0-9]*$";

fn name_regex() -> &'static Regex {
    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    NAME_REGEX.get_or_init(|| Regex::new(NAME_PATTERN).expect("name pattern is a valid regex"))
}

/// Check a pool or load balancer name.
///
/// The first character must be alphanumeric or `_`; the rest may also
/// contain `.` and `-`.
pub fn is_valid_name(s: &str) -> bool {
    name_regex().is_match(s)
}

/// Check a hostname that will be routed to a tunnel.
///
/// The input is converted to its ASCII-compatible (punycode) form under the
/// strict IDNA profile: STD3 rules, per-label validation and DNS length
/// limits. The converted form must then pass [`is_valid_name`]. A conversion
/// failure means "not a valid hostname"; the untranslated input is never
/// used in its place.
pub fn is_valid_hostname(s: &str) -> bool {
    match idna::domain_to_ascii_strict(s) {
        Ok(ascii) => is_valid_name(&ascii),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("abc-123.def"));
        assert!(is_valid_name("_pool"));
        assert!(is_valid_name("pool_1"));
        assert!(is_valid_name("9lives"));
        assert!(is_valid_name("a"));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid_name("-bad"));
        assert!(!is_valid_name(".bad"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("pool one"));
        assert!(!is_valid_name("pool/one"));
        assert!(!is_valid_name("münchen"));
    }

    #[test]
    fn test_plain_hostnames() {
        assert!(is_valid_hostname("example.com"));
        assert!(is_valid_hostname("app.staging.example.com"));
        assert!(is_valid_hostname("tunnel-1.example.io"));
    }

    #[test]
    fn test_internationalized_hostname_is_converted() {
        assert!(is_valid_hostname("münchen.example.com"));
        assert!(is_valid_hostname("xn--mnchen-3ya.example.com"));
    }

    #[test]
    fn test_invalid_hostnames() {
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("bad host.example.com"));
        assert!(!is_valid_hostname("-leading.example.com"));
        assert!(!is_valid_hostname("host/path.example.com"));
    }

    #[test]
    fn test_hostname_over_dns_length_limits() {
        let long_label = "a".repeat(64);
        assert!(!is_valid_hostname(&format!("{}.example.com", long_label)));

        let label = "a".repeat(63);
        let long_name = [label.as_str(); 5].join(".");
        assert!(long_name.len() > 253);
        assert!(!is_valid_hostname(&long_name));
    }

    #[test]
    fn test_internationalized_label_over_length_limit() {
        // 61 characters, but the punycode form exceeds 63 bytes
        let label = format!("{}ü", "a".repeat(60));
        assert!(!is_valid_hostname(&format!("{}.example.com", label)));
    }
}
