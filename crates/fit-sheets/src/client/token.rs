use std::fmt;

/// Bearer token for fitness API requests.
///
/// Obtaining and refreshing the token happens outside this tool; it is read
/// from configuration as-is.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token, returning `None` when it is blank
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Value for the `Authorization` header
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

// Keep the secret out of logs and panics
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_rejected() {
        assert!(AccessToken::new("   ").is_none());
        assert!(AccessToken::new("").is_none());
    }

    #[test]
    fn test_authorization_header() {
        let token = AccessToken::new(" ya29.token ").unwrap();
        assert_eq!(token.authorization_header(), "Bearer ya29.token");
    }

    #[test]
    fn test_debug_hides_secret() {
        let token = AccessToken::new("secret-value").unwrap();
        assert!(!format!("{:?}", token).contains("secret-value"));
    }
}
