//! An in-memory [`DirectorySession`] for tests. It never talks to a server: every call is
//! recorded and answered with success unless a failure has been primed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use ldap3_proto::proto::LdapResultCode;

use crate::prelude::*;

/// One call made against a [`RecordingSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    Add { dn: String, mods: Vec<Modify> },
    Modify { dn: String, mods: Vec<Modify> },
    Delete { dn: String },
    Rename {
        dn: String,
        new_rdn: String,
        new_superior: String,
    },
}

#[derive(Debug, Clone)]
enum Failure {
    Refuse(LdapResultCode, String),
    Transport(OperationError),
}

#[derive(Debug)]
pub struct RecordingSession {
    connected: AtomicBool,
    calls: Mutex<Vec<SessionCall>>,
    failure: Mutex<Option<Failure>>,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

// A test that panicked while holding a lock must not hide the calls from the next assertion.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordingSession {
    pub fn new() -> Self {
        RecordingSession {
            connected: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    pub fn disconnected() -> Self {
        let session = Self::new();
        session.set_connected(false);
        session
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    /// Answer every following call with `code` until [`RecordingSession::succeed`].
    pub fn fail_with(&self, code: LdapResultCode, message: &str) {
        *lock(&self.failure) = Some(Failure::Refuse(code, message.to_string()));
    }

    /// Fail every following call as if the connection broke before the server answered.
    pub fn fail_transport(&self, err: OperationError) {
        *lock(&self.failure) = Some(Failure::Transport(err));
    }

    pub fn succeed(&self) {
        *lock(&self.failure) = None;
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: SessionCall) -> Result<DirectoryResult, OperationError> {
        lock(&self.calls).push(call);
        match lock(&self.failure).as_ref() {
            None => Ok(DirectoryResult::success()),
            Some(Failure::Refuse(code, message)) => Ok(DirectoryResult::new(code.clone(), message)),
            Some(Failure::Transport(err)) => Err(err.clone()),
        }
    }
}

impl DirectorySession for RecordingSession {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn execute_add(&self, dn: &Dn, mods: &ModifyList) -> Result<DirectoryResult, OperationError> {
        self.record(SessionCall::Add {
            dn: dn.to_string(),
            mods: mods.iter().cloned().collect(),
        })
    }

    fn execute_modify(
        &self,
        dn: &Dn,
        mods: &ModifyList,
    ) -> Result<DirectoryResult, OperationError> {
        self.record(SessionCall::Modify {
            dn: dn.to_string(),
            mods: mods.iter().cloned().collect(),
        })
    }

    fn execute_delete(&self, dn: &Dn) -> Result<DirectoryResult, OperationError> {
        self.record(SessionCall::Delete { dn: dn.to_string() })
    }

    fn execute_rename(
        &self,
        dn: &Dn,
        new_rdn: &str,
        new_superior: &str,
    ) -> Result<DirectoryResult, OperationError> {
        self.record(SessionCall::Rename {
            dn: dn.to_string(),
            new_rdn: new_rdn.to_string(),
            new_superior: new_superior.to_string(),
        })
    }
}
