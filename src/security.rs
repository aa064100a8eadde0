use subtle::ConstantTimeEq;

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Check an `Authorization` header value against the configured API key.
///
/// Accepts `Bearer <key>` (scheme is case-insensitive). A missing header or
/// any other scheme is rejected.
pub fn bearer_matches(authorization: Option<&str>, expected_key: &str) -> bool {
    let Some(value) = authorization else {
        return false;
    };
    let Some((scheme, token)) = value.trim().split_once(' ') else {
        return false;
    };
    scheme.eq_ignore_ascii_case("bearer") && constant_time_compare(token.trim(), expected_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret123", "secret123"));
        assert!(!constant_time_compare("secret123", "secret124"));
        assert!(!constant_time_compare("secret123", "secret12"));
        assert!(!constant_time_compare("", "secret"));
    }

    #[test]
    fn test_bearer_matches() {
        assert!(bearer_matches(Some("Bearer secret"), "secret"));
        assert!(bearer_matches(Some("bearer  secret "), "secret"));
        assert!(!bearer_matches(Some("Bearer wrong"), "secret"));
        assert!(!bearer_matches(Some("Basic secret"), "secret"));
        assert!(!bearer_matches(Some("secret"), "secret"));
        assert!(!bearer_matches(None, "secret"));
    }
}
