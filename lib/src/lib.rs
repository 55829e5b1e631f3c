//! The ldapentry library. This models a single directory entry as a case-insensitive, ordered,
//! multi-valued attribute map, tracks every local change made to it, and compiles those changes
//! into the ordered protocol modifications that bring the remote entry in line with local state.

#![deny(warnings)]
#![warn(unused_extern_crates)]
// Enable some groups of clippy lints.
#![deny(clippy::suspicious)]
#![deny(clippy::perf)]
// Specific lints to enforce.
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::await_holding_lock)]
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::trivially_copy_pass_by_ref)]
#![deny(clippy::manual_let_else)]
#![allow(clippy::unreachable)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod dn;
pub mod entry;
pub mod ldap;
pub mod materialize;
pub mod modify;
pub mod session;
pub mod testkit;
pub mod value;
pub mod valuelist;

/// A prelude of imports that should be imported by all other ldapentry modules to
/// help make imports cleaner.
pub mod prelude {
    pub use ldapentry_proto::constants::*;
    pub use ldapentry_proto::OperationError;
    pub use ldapentry_sketching::{
        admin_debug, admin_error, admin_warn, codec_warn, modify_info, modify_trace, request_error,
        request_info, session_debug, session_error, session_info, tagged_event, EventTag,
    };
    pub use std::time::Duration;
    pub use url::Url;

    pub use crate::config::SessionConfig;
    pub use crate::dn::Dn;
    pub use crate::entry::{AttrInput, Entry};
    pub use crate::ldap::{LdapSession, LdapSessionBuilder};
    pub use crate::modify::{CommitKind, Modify, ModifyList};
    pub use crate::session::{DirectoryResult, DirectorySession};
    pub use crate::value::{Value, ValueCodec};
    pub use crate::valuelist::{AttributeValueList, ValueStatus};
}
