use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/* ===== errors ===== */
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "lowercase")]
pub enum OperationError {
    // Local validation errors. These are raised before any network
    // call and never alter entry state.
    IdentityMissing,
    SessionUnbound,
    SessionNotConnected,
    TypeMismatch(String),
    KeyNotFound(String),
    ValueNotFound(String),
    InvalidDistinguishedName(String),

    // The server was contacted and refused the request. Pending changes
    // are left intact so the caller can retry.
    ProtocolFailure { code: String, message: String },

    // A value could not be represented on the wire.
    EncodingFailure(String),

    // Transport level failures of the session.
    SessionIo(String),
    SessionTimeout,
    UnexpectedResponse(String),

    // Configuration
    InvalidConfig(String),
    ConfigIo(String),
}

impl PartialEq for OperationError {
    fn eq(&self, other: &Self) -> bool {
        // Only the kind matters when comparing. Generally we only use the
        // PartialEq for TESTING anyway.
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl Display for OperationError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let mut output = format!("{self:?}")
            .split(['(', ' '])
            .next()
            .unwrap_or("")
            .to_string();

        if let Some(msg) = self.message() {
            output += &format!(" - {msg}");
        };
        f.write_str(&output)
    }
}

impl std::error::Error for OperationError {}

impl OperationError {
    /// Return the message associated with the error if there is one.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::IdentityMissing => Some("Missing distinguished name.".into()),
            Self::SessionUnbound => Some("No directory session is bound to this entry.".into()),
            Self::SessionNotConnected => {
                Some("The session has to connect to the server first.".into())
            }
            Self::TypeMismatch(val) => Some(format!("Type mismatch: {val}")),
            Self::KeyNotFound(val) => Some(format!("Key '{val}' is not in the entry.")),
            Self::ValueNotFound(val) => Some(format!("Value '{val}' is not in the list.")),
            Self::InvalidDistinguishedName(val) => {
                Some(format!("Invalid distinguished name: {val}"))
            }
            Self::ProtocolFailure { code, message } => {
                if message.is_empty() {
                    Some(code.clone())
                } else {
                    Some(format!("{code}: {message}"))
                }
            }
            Self::EncodingFailure(val) => Some(format!("Unable to encode value: {val}")),
            Self::SessionIo(val) => Some(val.clone()),
            Self::SessionTimeout => Some("The server did not respond in time.".into()),
            Self::UnexpectedResponse(val) => Some(format!("Unexpected response: {val}")),
            Self::InvalidConfig(val) => Some(format!("Invalid configuration: {val}")),
            Self::ConfigIo(val) => Some(val.clone()),
        }
    }

    /// True for the errors raised before the server was contacted.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::IdentityMissing
                | Self::SessionUnbound
                | Self::SessionNotConnected
                | Self::TypeMismatch(_)
                | Self::KeyNotFound(_)
                | Self::ValueNotFound(_)
                | Self::InvalidDistinguishedName(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::OperationError;

    #[test]
    fn test_operationerror_as_string() {
        assert_eq!(
            OperationError::IdentityMissing.to_string(),
            "IdentityMissing - Missing distinguished name.".to_string()
        );
        assert_eq!(
            OperationError::KeyNotFound("mail".to_string()).to_string(),
            "KeyNotFound - Key 'mail' is not in the entry.".to_string()
        );
        let err = OperationError::ProtocolFailure {
            code: "NoSuchObject".to_string(),
            message: "entry does not exist".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ProtocolFailure - NoSuchObject: entry does not exist".to_string()
        );
    }

    #[test]
    fn test_operationerror_eq_ignores_payload() {
        assert_eq!(
            OperationError::TypeMismatch("a".into()),
            OperationError::TypeMismatch("b".into())
        );
        assert_ne!(OperationError::SessionUnbound, OperationError::SessionNotConnected);
    }

    #[test]
    fn test_operationerror_is_local() {
        assert!(OperationError::IdentityMissing.is_local());
        assert!(OperationError::KeyNotFound("cn".into()).is_local());
        assert!(!OperationError::SessionTimeout.is_local());
        assert!(!OperationError::ProtocolFailure {
            code: "Busy".into(),
            message: String::new()
        }
        .is_local());
    }
}
