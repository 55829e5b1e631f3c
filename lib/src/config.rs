//! Session configuration, as read from a toml file such as:
//!
//! ```toml
//! uri = "ldap://ldap.example.com:389"
//! bind_dn = "cn=Directory Manager"
//! bind_password = "password"
//! timeout = 30
//! max_value_len = 1048576
//! ```
//!
//! Every key is optional. Keys present override the builder's defaults, see
//! [`LdapSessionBuilder::read_options_from_optional_config`](crate::ldap::LdapSessionBuilder::read_options_from_optional_config).

use serde::Deserialize;

use crate::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    pub uri: Option<Url>,
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    /// Seconds to wait for the server before a request fails.
    pub timeout: Option<u64>,
    /// Largest single value in bytes accepted from or sent to the server.
    pub max_value_len: Option<usize>,
}

impl SessionConfig {
    pub fn parse(contents: &str) -> Result<Self, OperationError> {
        toml::from_str(contents).map_err(|e| {
            admin_error!(?e, "unable to parse session configuration");
            OperationError::InvalidConfig(e.to_string())
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SESSION_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_sessionconfig_parse() {
        let config = SessionConfig::parse(
            r#"
            uri = "ldap://ldap.example.com:1389"
            bind_dn = "cn=admin,dc=example,dc=com"
            bind_password = "hunter2"
            timeout = 5
            "#,
        )
        .expect("parse failed");

        assert_eq!(
            config.uri.as_ref().and_then(|u| u.host_str()),
            Some("ldap.example.com")
        );
        assert_eq!(config.uri.as_ref().and_then(|u| u.port()), Some(1389));
        assert_eq!(config.bind_dn.as_deref(), Some("cn=admin,dc=example,dc=com"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.max_value_len, None);
    }

    #[test]
    fn test_sessionconfig_defaults() {
        let config = SessionConfig::parse("").expect("parse failed");
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.timeout(), DEFAULT_SESSION_TIMEOUT);
    }

    #[test]
    fn test_sessionconfig_rejects_bad_input() {
        for bad in [
            r#"uri = "not a url""#,
            r#"timeout = "soon""#,
            r#"unknown_key = 1"#,
        ] {
            assert_eq!(
                SessionConfig::parse(bad),
                Err(OperationError::InvalidConfig(String::new())),
                "{bad} should not parse"
            );
        }
    }
}
