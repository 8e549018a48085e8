//! Client configuration.

use std::time::Duration;

use crate::validation::is_anonymous_username;

/// Configuration for a [`crate::Connection`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Twitch login name. Defaults to an anonymous (read-only)
    /// `justinfan` login.
    pub username: String,
    /// OAuth token. `oauth:` is prepended on login if missing; `None`
    /// logs in without credentials (only valid for anonymous logins).
    pub password: Option<String>,
    /// Also request `twitch.tv/membership` (JOIN/PART/NAMES of other
    /// users) during capability negotiation.
    pub request_membership_capability: bool,
    /// Timeout applied to command responses (login, capability
    /// negotiation, join, say, ...).
    pub default_timeout: Duration,
    /// How often to ping the server once the connection is ready.
    pub ping_interval: Duration,
    /// How long to wait for the PONG before the connection is
    /// considered dead.
    pub ping_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            username: "justinfan12345".to_string(),
            password: None,
            request_membership_capability: false,
            default_timeout: Duration::from_millis(2000),
            ping_interval: Duration::from_secs(60),
            ping_timeout: Duration::from_millis(2000),
        }
    }
}

impl ClientConfig {
    /// Credentials for a logged-in connection.
    pub fn with_login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    pub fn is_anonymous(&self) -> bool {
        is_anonymous_username(&self.username) && self.password.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_anonymous() {
        let config = ClientConfig::default();
        assert!(config.is_anonymous());
        assert!(config.password.is_none());
    }

    #[test]
    fn login_config_is_not_anonymous() {
        let config = ClientConfig::with_login("pajlada", "oauth:abcdef");
        assert!(!config.is_anonymous());
    }
}
