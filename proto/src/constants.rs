//! Because consistency is great!
//!
use std::time::Duration;

/// The reserved key which addresses an entry's distinguished name rather than
/// one of its attributes.
pub const ATTR_DN: &str = "dn";

/// The only uri scheme the session accepts. TLS transports are not handled here.
pub const LDAP_URI_SCHEME: &str = "ldap";
/// Port used when an `ldap://` uri does not name one.
pub const DEFAULT_LDAP_PORT: u16 = 389;

/// How long a single request may wait for the server's response.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(DEFAULT_SESSION_TIMEOUT_SECS);

// LDAP boolean syntax, RFC 4517 3.3.3
pub const LDAP_TRUE: &str = "TRUE";
pub const LDAP_FALSE: &str = "FALSE";
