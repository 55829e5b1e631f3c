#![deny(warnings)]
#![warn(unused_extern_crates)]
#![allow(non_snake_case)]
use num_enum::{IntoPrimitive, TryFromPrimitive};
use tracing::level_filters::LevelFilter;
use tracing_forest::printer::TestCapturePrinter;
use tracing_forest::tag::NoTag;
use tracing_forest::ForestLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub mod macros;

pub use {tracing, tracing_forest, tracing_subscriber};

/// Start up the logging for test mode.
pub fn test_init() {
    let filter = EnvFilter::from_default_env()
        .add_directive(LevelFilter::TRACE.into())
        // tokio's runtime internals are noisy at trace and add nothing to our tests.
        .add_directive("tokio=INFO".parse().expect("failed to generate log filter"));

    // start the logging!
    let _ = tracing_subscriber::Registry::default()
        .with(ForestLayer::new(TestCapturePrinter::new(), NoTag).with_filter(filter))
        .try_init();
}

#[derive(Debug, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u64)]
pub enum EventTag {
    AdminDebug,
    AdminError,
    AdminWarn,
    RequestError,
    RequestInfo,
    ModifyTrace,
    ModifyInfo,
    CodecWarn,
    SessionDebug,
    SessionInfo,
    SessionError,
}

impl EventTag {
    pub fn pretty(self) -> &'static str {
        match self {
            EventTag::AdminDebug => "admin.debug",
            EventTag::AdminError => "admin.error",
            EventTag::AdminWarn => "admin.warn",
            EventTag::RequestError => "request.error",
            EventTag::RequestInfo => "request.info",
            EventTag::ModifyTrace => "modify.trace",
            EventTag::ModifyInfo => "modify.info",
            EventTag::CodecWarn => "codec.warn",
            EventTag::SessionDebug => "session.debug",
            EventTag::SessionInfo => "session.info",
            EventTag::SessionError => "session.error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EventTag;

    #[test]
    fn test_eventtag_roundtrip_id() {
        let id: u64 = EventTag::CodecWarn.into();
        let tag = EventTag::try_from(id).expect("tag id must map back");
        assert_eq!(tag.pretty(), "codec.warn");
    }

    #[test]
    fn test_tagged_macros_emit() {
        use crate::{modify_trace, session_error, tagged_event};
        super::test_init();
        modify_trace!(attr = "cn", "compiled");
        session_error!("failure path");
    }
}
