use base64::Engine as _;
use std::fmt;

/// Authorization scheme attached to a compiled request.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthScheme {
    None,
    /// Service-to-service credentials (e.g. issue tracker user + API token).
    Basic { username: String, password: String },
    /// Delegated OAuth access token.
    Bearer { token: String },
}

impl AuthScheme {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthScheme::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        AuthScheme::Bearer {
            token: token.into(),
        }
    }

    /// Value for the `Authorization` header, if any.
    pub fn header_value(&self) -> Option<String> {
        match self {
            AuthScheme::None => None,
            AuthScheme::Basic { username, password } => {
                let raw = format!("{}:{}", username, password);
                Some(format!(
                    "Basic {}",
                    base64::engine::general_purpose::STANDARD.encode(raw)
                ))
            }
            AuthScheme::Bearer { token } => Some(format!("Bearer {}", token)),
        }
    }
}

// Secrets never reach logs.
impl fmt::Debug for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScheme::None => f.write_str("None"),
            AuthScheme::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            AuthScheme::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_header_is_base64_of_user_colon_password() {
        let v = AuthScheme::basic("bot@example.com", "s3cret").header_value().unwrap();
        assert_eq!(v, "Basic Ym90QGV4YW1wbGUuY29tOnMzY3JldA==");
    }

    #[test]
    fn debug_redacts_secrets() {
        let text = format!("{:?}", AuthScheme::bearer("tok-123"));
        assert!(!text.contains("tok-123"));
    }
}
