#[macro_export]
macro_rules! tagged_event {
    ($level:ident, $event_tag:path, $($arg:tt)*) => {{
        use tracing;
        fn assert_eventtag(_: &EventTag) {}
        assert_eventtag(&$event_tag);
        let event_tag_id: u64 = $event_tag.into();
        tracing::event!(tracing::Level::$level, event_tag_id, $($arg)*)
    }}
}

#[macro_export]
macro_rules! admin_debug {
    ($($arg:tt)*) => { tagged_event!(DEBUG, EventTag::AdminDebug, $($arg)*) }
}

#[macro_export]
macro_rules! admin_error {
    ($($arg:tt)*) => { tagged_event!(ERROR, EventTag::AdminError, $($arg)*) }
}

#[macro_export]
macro_rules! admin_warn {
    ($($arg:tt)*) => { tagged_event!(WARN, EventTag::AdminWarn, $($arg)*) }
}

#[macro_export]
macro_rules! request_error {
    ($($arg:tt)*) => { tagged_event!(ERROR, EventTag::RequestError, $($arg)*) }
}

#[macro_export]
macro_rules! request_info {
    ($($arg:tt)*) => { tagged_event!(INFO, EventTag::RequestInfo, $($arg)*) }
}

#[macro_export]
macro_rules! modify_trace {
    ($($arg:tt)*) => { tagged_event!(TRACE, EventTag::ModifyTrace, $($arg)*) }
}

#[macro_export]
macro_rules! modify_info {
    ($($arg:tt)*) => { tagged_event!(INFO, EventTag::ModifyInfo, $($arg)*) }
}

#[macro_export]
macro_rules! codec_warn {
    ($($arg:tt)*) => { tagged_event!(WARN, EventTag::CodecWarn, $($arg)*) }
}

#[macro_export]
macro_rules! session_debug {
    ($($arg:tt)*) => { tagged_event!(DEBUG, EventTag::SessionDebug, $($arg)*) }
}

#[macro_export]
macro_rules! session_info {
    ($($arg:tt)*) => { tagged_event!(INFO, EventTag::SessionInfo, $($arg)*) }
}

#[macro_export]
macro_rules! session_error {
    ($($arg:tt)*) => { tagged_event!(ERROR, EventTag::SessionError, $($arg)*) }
}
