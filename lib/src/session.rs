//! The seam between entries and the live directory. An [`Entry`](crate::entry::Entry) holds a
//! weak binding to something implementing [`DirectorySession`] and calls into it for every
//! operation that writes to the server.

use std::fmt::Debug;

use ldap3_proto::proto::{LdapResult, LdapResultCode};

use crate::prelude::*;

/// What the server answered to a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryResult {
    pub code: LdapResultCode,
    pub message: String,
}

impl DirectoryResult {
    pub fn success() -> Self {
        DirectoryResult {
            code: LdapResultCode::Success,
            message: String::new(),
        }
    }

    pub fn new(code: LdapResultCode, message: &str) -> Self {
        DirectoryResult {
            code,
            message: message.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == LdapResultCode::Success
    }

    /// Translate a refusal from the server into an [`OperationError::ProtocolFailure`].
    pub fn into_result(self) -> Result<(), OperationError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(OperationError::ProtocolFailure {
                code: format!("{:?}", self.code),
                message: self.message,
            })
        }
    }
}

impl From<LdapResult> for DirectoryResult {
    fn from(res: LdapResult) -> Self {
        DirectoryResult {
            code: res.code,
            message: res.message,
        }
    }
}

/// A live, authenticated connection to a directory server.
///
/// Every `execute_*` call blocks until the server answers. `Err` is reserved for failures
/// of the transport itself. A server that answers with a non-success code yields
/// `Ok(DirectoryResult)` and the caller decides what that means.
pub trait DirectorySession: Send + Sync + Debug {
    fn is_connected(&self) -> bool;

    /// Create the entry `dn` from the add operations in `mods`.
    fn execute_add(&self, dn: &Dn, mods: &ModifyList) -> Result<DirectoryResult, OperationError>;

    fn execute_modify(&self, dn: &Dn, mods: &ModifyList)
        -> Result<DirectoryResult, OperationError>;

    fn execute_delete(&self, dn: &Dn) -> Result<DirectoryResult, OperationError>;

    /// Move `dn` to `new_rdn` under `new_superior`. The old RDN values are removed.
    fn execute_rename(
        &self,
        dn: &Dn,
        new_rdn: &str,
        new_superior: &str,
    ) -> Result<DirectoryResult, OperationError>;
}
