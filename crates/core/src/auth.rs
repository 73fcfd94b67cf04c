use serde::{Deserialize, Serialize};

/// Who the client is acting as. Passed explicitly to every backend call.
///
/// Sign-in is a placeholder: no protocol backs it yet, but a token stored
/// here is forwarded as a bearer credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AuthContext {
    #[default]
    Anonymous,
    SignedIn {
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
}

impl AuthContext {
    pub fn signed_in(username: impl Into<String>, token: Option<String>) -> Self {
        Self::SignedIn {
            username: username.into(),
            token: token.filter(|token| !token.trim().is_empty()),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Self::SignedIn { username, .. } => Some(username),
            Self::Anonymous => None,
        }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        match self {
            Self::SignedIn { token, .. } => token.as_deref(),
            Self::Anonymous => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_is_dropped() {
        let auth = AuthContext::signed_in("ada", Some("  ".to_string()));
        assert!(auth.is_signed_in());
        assert_eq!(auth.username(), Some("ada"));
        assert_eq!(auth.bearer_token(), None);
    }

    #[test]
    fn anonymous_has_no_credentials() {
        let auth = AuthContext::default();
        assert!(!auth.is_signed_in());
        assert_eq!(auth.bearer_token(), None);
    }
}
