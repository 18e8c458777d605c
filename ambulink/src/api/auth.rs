//! Which credential a request carries.

/// Credential attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// No credential (login initiation, code verification).
    Anonymous,
    /// The refresh token (refresh endpoint).
    RefreshToken,
    /// The access token (everything else).
    AccessToken,
}

/// Paths of the authentication endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPaths {
    pub login: String,
    pub verify: String,
    pub refresh: String,
}

impl Default for AuthPaths {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            verify: "/auth/verify".to_string(),
            refresh: "/auth/refresh".to_string(),
        }
    }
}

impl AuthPaths {
    /// Credential policy for a request path; any query string is ignored.
    pub fn policy_for(&self, path: &str) -> AuthPolicy {
        let path = path.split('?').next().unwrap_or(path);
        if path == self.refresh {
            AuthPolicy::RefreshToken
        } else if path == self.login || path == self.verify {
            AuthPolicy::Anonymous
        } else {
            AuthPolicy::AccessToken
        }
    }
}
