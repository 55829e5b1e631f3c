//! A blocking [`DirectorySession`] over a plain LDAP connection.
//!
//! The session owns a private current-thread tokio runtime and drives the `ldap3_proto` codec
//! on it, so every call blocks the caller until the server answers or the timeout expires.
//! These calls must not be made from inside another tokio runtime.

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use ldap3_proto::proto::*;
use ldap3_proto::LdapCodec;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;

use crate::prelude::*;

struct LdapInner {
    framed: Framed<TcpStream, LdapCodec>,
    msgid: i32,
}

impl LdapInner {
    async fn send(&mut self, op: LdapOp) -> Result<i32, OperationError> {
        self.msgid += 1;
        let msgid = self.msgid;
        let msg = LdapMsg {
            msgid,
            op,
            ctrl: vec![],
        };

        self.framed.send(msg).await.map_err(|e| {
            session_error!(?e, "unable to send request");
            OperationError::SessionIo(format!("{:?}", e))
        })?;
        Ok(msgid)
    }

    /// The next response to `msgid`. Responses to anything else are dropped.
    async fn recv(&mut self, msgid: i32) -> Result<LdapOp, OperationError> {
        loop {
            match self.framed.next().await {
                Some(Ok(msg)) if msg.msgid == msgid => return Ok(msg.op),
                Some(Ok(msg)) => {
                    session_debug!(msgid = msg.msgid, "dropping response to another request");
                }
                Some(Err(e)) => {
                    session_error!(?e, "unable to read response");
                    return Err(OperationError::SessionIo(format!("{:?}", e)));
                }
                None => {
                    session_error!("connection closed by server");
                    return Err(OperationError::SessionIo(
                        "connection closed by server".to_string(),
                    ));
                }
            }
        }
    }

    async fn request(&mut self, op: LdapOp) -> Result<LdapOp, OperationError> {
        let msgid = self.send(op).await?;
        self.recv(msgid).await
    }

    async fn search(
        &mut self,
        req: LdapSearchRequest,
    ) -> Result<(Vec<LdapSearchResultEntry>, LdapResult), OperationError> {
        let msgid = self.send(LdapOp::SearchRequest(req)).await?;
        let mut entries = Vec::new();
        loop {
            match self.recv(msgid).await? {
                LdapOp::SearchResultEntry(lsre) => entries.push(lsre),
                LdapOp::SearchResultDone(res) => return Ok((entries, res)),
                other => return Err(unexpected(&other)),
            }
        }
    }
}

fn unexpected(op: &LdapOp) -> OperationError {
    session_error!(?op, "invalid ldap response state");
    OperationError::UnexpectedResponse(format!("{:?}", op))
}

#[derive(Debug, Clone, Default)]
pub struct LdapSessionBuilder {
    address: Option<Url>,
    bind_dn: Option<String>,
    bind_password: Option<String>,
    timeout: Option<Duration>,
    max_value_len: Option<usize>,
}

impl LdapSessionBuilder {
    pub fn new() -> Self {
        LdapSessionBuilder::default()
    }

    pub fn apply_config_options(self, config: SessionConfig) -> Self {
        let timeout = config.timeout.map(Duration::from_secs);
        let LdapSessionBuilder {
            address,
            bind_dn,
            bind_password,
            timeout: prev_timeout,
            max_value_len,
        } = self;

        LdapSessionBuilder {
            address: config.uri.or(address),
            bind_dn: config.bind_dn.or(bind_dn),
            bind_password: config.bind_password.or(bind_password),
            timeout: timeout.or(prev_timeout),
            max_value_len: config.max_value_len.or(max_value_len),
        }
    }

    /// Apply the options in `config_path` if the file exists. A missing or unreadable file is
    /// skipped, a file that does not parse is an error.
    pub fn read_options_from_optional_config<P: AsRef<Path> + fmt::Debug>(
        self,
        config_path: P,
    ) -> Result<Self, OperationError> {
        admin_debug!("Attempting to load configuration from {:#?}", &config_path);

        if !config_path.as_ref().exists() {
            admin_debug!("{:?} does not exist", config_path);
            return Ok(self);
        }

        let mut f = match File::open(&config_path) {
            Ok(f) => f,
            Err(e) => {
                match e.kind() {
                    ErrorKind::PermissionDenied => {
                        admin_warn!(
                            "Permission denied loading configuration file {:#?}, skipping.",
                            &config_path
                        );
                    }
                    _ => {
                        admin_debug!(
                            "Unable to open config file {:#?} [{:?}], skipping ...",
                            &config_path,
                            e
                        );
                    }
                };
                return Ok(self);
            }
        };

        let mut contents = String::new();
        f.read_to_string(&mut contents).map_err(|e| {
            admin_error!(?e, "unable to read configuration file");
            OperationError::ConfigIo(format!("{:?}", e))
        })?;

        let config = SessionConfig::parse(&contents)?;
        Ok(self.apply_config_options(config))
    }

    pub fn address(self, address: &str) -> Result<Self, OperationError> {
        let address = Url::parse(address).map_err(|e| {
            admin_error!(?e, %address, "invalid session uri");
            OperationError::InvalidConfig(format!("{address}: {e}"))
        })?;
        Ok(LdapSessionBuilder {
            address: Some(address),
            ..self
        })
    }

    pub fn bind(self, bind_dn: &str, bind_password: &str) -> Self {
        LdapSessionBuilder {
            bind_dn: Some(bind_dn.to_string()),
            bind_password: Some(bind_password.to_string()),
            ..self
        }
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        LdapSessionBuilder {
            timeout: Some(timeout),
            ..self
        }
    }

    pub fn max_value_len(self, max_value_len: usize) -> Self {
        LdapSessionBuilder {
            max_value_len: Some(max_value_len),
            ..self
        }
    }

    /// Validate the options and resolve the server address. The session is not yet connected.
    pub fn build(self) -> Result<LdapSession, OperationError> {
        let uri = self.address.ok_or_else(|| {
            admin_error!("no session uri was provided");
            OperationError::InvalidConfig("no uri was provided".to_string())
        })?;

        if uri.scheme() != LDAP_URI_SCHEME {
            admin_error!(scheme = %uri.scheme(), "unsupported uri scheme");
            return Err(OperationError::InvalidConfig(format!(
                "unsupported uri scheme '{}', only '{}' is supported",
                uri.scheme(),
                LDAP_URI_SCHEME
            )));
        }

        let host = uri
            .host_str()
            .ok_or_else(|| OperationError::InvalidConfig(format!("{uri} has no host")))?;
        let port = uri.port().unwrap_or(DEFAULT_LDAP_PORT);

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| {
                admin_error!(?e, %host, "unable to resolve ldap address");
                OperationError::InvalidConfig(format!("{host}: {e}"))
            })?
            .next()
            .ok_or_else(|| {
                admin_error!(%host, "no ldap addresses found");
                OperationError::InvalidConfig(format!("{host} did not resolve"))
            })?;

        admin_debug!(?addr, "resolved ldap address");

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                admin_error!(?e, "unable to start session runtime");
                OperationError::SessionIo(format!("{:?}", e))
            })?;

        Ok(LdapSession {
            uri,
            addr,
            bind_dn: self.bind_dn,
            bind_password: self.bind_password,
            timeout: self.timeout.unwrap_or(DEFAULT_SESSION_TIMEOUT),
            codec: ValueCodec::new(self.max_value_len),
            rt,
            conn: Mutex::new(None),
            connected: AtomicBool::new(false),
        })
    }
}

pub struct LdapSession {
    uri: Url,
    addr: SocketAddr,
    bind_dn: Option<String>,
    bind_password: Option<String>,
    timeout: Duration,
    codec: ValueCodec,
    rt: Runtime,
    conn: Mutex<Option<LdapInner>>,
    connected: AtomicBool,
}

impl fmt::Debug for LdapSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapSession")
            .field("uri", &self.uri.as_str())
            .field("addr", &self.addr)
            .field("bind_dn", &self.bind_dn)
            .field("timeout", &self.timeout)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl LdapSession {
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    /// Open the connection and bind. An anonymous bind is used when no bind dn was configured.
    #[instrument(level = "debug", skip_all, fields(addr = %self.addr))]
    pub fn connect(&self) -> Result<(), OperationError> {
        let timeout = self.timeout;
        let bind = LdapBindRequest {
            dn: self.bind_dn.clone().unwrap_or_default(),
            cred: LdapBindCred::Simple(self.bind_password.clone().unwrap_or_default()),
        };

        self.rt.block_on(async {
            let mut guard = self.conn.lock().await;
            // Drop any previous connection first, it must not be used again.
            *guard = None;
            self.connected.store(false, Ordering::Release);

            let tcpstream = tokio::time::timeout(timeout, TcpStream::connect(self.addr))
                .await
                .map_err(|_| {
                    session_error!("timed out connecting to {}", self.uri);
                    OperationError::SessionTimeout
                })?
                .map_err(|e| {
                    session_error!(?e, "failed to connect to {}", self.uri);
                    OperationError::SessionIo(format!("{:?}", e))
                })?;

            let mut inner = LdapInner {
                framed: Framed::new(tcpstream, LdapCodec::default()),
                msgid: 0,
            };

            let res = tokio::time::timeout(timeout, inner.request(LdapOp::BindRequest(bind)))
                .await
                .map_err(|_| OperationError::SessionTimeout)??;

            match res {
                LdapOp::BindResponse(res) => DirectoryResult::from(res.res).into_result()?,
                other => return Err(unexpected(&other)),
            }

            *guard = Some(inner);
            self.connected.store(true, Ordering::Release);
            session_info!(bind_dn = ?self.bind_dn, "bound to {}", self.uri);
            Ok(())
        })
    }

    /// Send a request and wait for its response. Any failure of the transport drops the
    /// connection, after which the session reports itself as not connected.
    fn request(&self, op: LdapOp) -> Result<LdapOp, OperationError> {
        let timeout = self.timeout;
        self.rt.block_on(async {
            let mut guard = self.conn.lock().await;
            let inner = guard.as_mut().ok_or(OperationError::SessionNotConnected)?;

            let res = match tokio::time::timeout(timeout, inner.request(op)).await {
                Ok(res) => res,
                Err(_) => {
                    session_error!("request timed out after {:?}", timeout);
                    Err(OperationError::SessionTimeout)
                }
            };

            if res.is_err() {
                *guard = None;
                self.connected.store(false, Ordering::Release);
            }
            res
        })
    }

    /// Search the directory, returning each result as an entry bound to this session.
    #[instrument(level = "debug", skip_all, fields(%base))]
    pub fn search(
        self: &Arc<Self>,
        base: &str,
        scope: LdapSearchScope,
        filter: LdapFilter,
        attrs: Vec<String>,
    ) -> Result<Vec<Entry>, OperationError> {
        let req = LdapSearchRequest {
            base: base.to_string(),
            scope,
            aliases: LdapDerefAliases::Never,
            sizelimit: 0,
            timelimit: 0,
            typesonly: false,
            filter,
            attrs,
        };

        let timeout = self.timeout;
        let (results, done) = self.rt.block_on(async {
            let mut guard = self.conn.lock().await;
            let inner = guard.as_mut().ok_or(OperationError::SessionNotConnected)?;

            let res = match tokio::time::timeout(timeout, inner.search(req)).await {
                Ok(res) => res,
                Err(_) => Err(OperationError::SessionTimeout),
            };
            if res.is_err() {
                *guard = None;
                self.connected.store(false, Ordering::Release);
            }
            res
        })?;

        DirectoryResult::from(done).into_result()?;

        let session: Arc<dyn DirectorySession> = self.clone();
        let entries = results
            .into_iter()
            .map(|lsre| {
                let mut entry = Entry::from_ldap(lsre, &self.codec)?;
                entry.set_session(&session);
                Ok(entry)
            })
            .collect::<Result<Vec<_>, OperationError>>()?;

        request_info!(count = entries.len(), "search complete");
        Ok(entries)
    }

    /// Tell the server the session is over and close the connection.
    pub fn unbind(&self) -> Result<(), OperationError> {
        self.rt.block_on(async {
            let mut guard = self.conn.lock().await;
            self.connected.store(false, Ordering::Release);
            let Some(mut inner) = guard.take() else {
                return Ok(());
            };
            // The server sends no response to an unbind.
            inner.send(LdapOp::UnbindRequest).await?;
            session_info!("unbound from {}", self.uri);
            Ok(())
        })
    }
}

impl DirectorySession for LdapSession {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    #[instrument(level = "debug", skip_all, fields(%dn))]
    fn execute_add(&self, dn: &Dn, mods: &ModifyList) -> Result<DirectoryResult, OperationError> {
        let attributes = mods.to_ldap_attributes(&self.codec)?;
        let req = LdapAddRequest {
            dn: dn.to_string(),
            attributes,
        };
        match self.request(LdapOp::AddRequest(req))? {
            LdapOp::AddResponse(res) => Ok(res.into()),
            other => Err(unexpected(&other)),
        }
    }

    #[instrument(level = "debug", skip_all, fields(%dn))]
    fn execute_modify(
        &self,
        dn: &Dn,
        mods: &ModifyList,
    ) -> Result<DirectoryResult, OperationError> {
        let changes = mods.to_ldap_changes(&self.codec)?;
        let req = LdapModifyRequest {
            dn: dn.to_string(),
            changes,
        };
        match self.request(LdapOp::ModifyRequest(req))? {
            LdapOp::ModifyResponse(res) => Ok(res.into()),
            other => Err(unexpected(&other)),
        }
    }

    #[instrument(level = "debug", skip_all, fields(%dn))]
    fn execute_delete(&self, dn: &Dn) -> Result<DirectoryResult, OperationError> {
        match self.request(LdapOp::DelRequest(dn.to_string()))? {
            LdapOp::DelResponse(res) => Ok(res.into()),
            other => Err(unexpected(&other)),
        }
    }

    #[instrument(level = "debug", skip_all, fields(%dn, %new_rdn, %new_superior))]
    fn execute_rename(
        &self,
        dn: &Dn,
        new_rdn: &str,
        new_superior: &str,
    ) -> Result<DirectoryResult, OperationError> {
        let req = LdapModifyDNRequest {
            dn: dn.to_string(),
            newrdn: new_rdn.to_string(),
            deleteoldrdn: true,
            new_superior: Some(new_superior.to_string()),
        };
        match self.request(LdapOp::ModifyDNRequest(req))? {
            LdapOp::ModifyDNResponse(res) => Ok(res.into()),
            other => Err(unexpected(&other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;

    use crate::prelude::*;

    #[test]
    fn test_builder_requires_uri() {
        assert_eq!(
            LdapSessionBuilder::new().build().map(|_| ()),
            Err(OperationError::InvalidConfig(String::new()))
        );
    }

    #[test]
    fn test_builder_rejects_tls_and_garbage() {
        let builder = LdapSessionBuilder::new()
            .address("ldaps://127.0.0.1")
            .expect("uri parse failed");
        assert_eq!(
            builder.build().map(|_| ()),
            Err(OperationError::InvalidConfig(String::new()))
        );

        assert_eq!(
            LdapSessionBuilder::new().address("::not a uri::").map(|_| ()),
            Err(OperationError::InvalidConfig(String::new()))
        );
    }

    #[test]
    fn test_builder_default_port_and_timeout() {
        let session = LdapSessionBuilder::new()
            .address("ldap://127.0.0.1")
            .expect("uri parse failed")
            .build()
            .expect("build failed");

        assert_eq!(session.addr.port(), DEFAULT_LDAP_PORT);
        assert_eq!(session.timeout, DEFAULT_SESSION_TIMEOUT);
        assert_eq!(session.codec().max_value_len(), None);
        assert!(!session.is_connected());
    }

    #[test]
    fn test_builder_config_overlay() {
        let config = SessionConfig::parse(
            r#"
            uri = "ldap://127.0.0.1:1389"
            bind_dn = "cn=admin"
            bind_password = "password"
            timeout = 3
            max_value_len = 64
            "#,
        )
        .expect("parse failed");

        let session = LdapSessionBuilder::new()
            .timeout(Duration::from_secs(60))
            .apply_config_options(config)
            .build()
            .expect("build failed");

        assert_eq!(session.addr.port(), 1389);
        assert_eq!(session.timeout, Duration::from_secs(3));
        assert_eq!(session.bind_dn.as_deref(), Some("cn=admin"));
        assert_eq!(session.codec().max_value_len(), Some(64));
        // The password never shows up in debug output.
        assert!(!format!("{:?}", session).contains("password"));
    }

    #[test]
    fn test_builder_optional_config_file() {
        let builder = LdapSessionBuilder::new()
            .read_options_from_optional_config("/nonexistent/ldapentry/session.toml")
            .expect("a missing file is not an error");
        assert!(builder.address.is_none());

        let path = std::env::temp_dir().join(format!(
            "ldapentry-session-test-{}.toml",
            std::process::id()
        ));
        {
            let mut f = std::fs::File::create(&path).expect("create failed");
            f.write_all(b"uri = \"ldap://127.0.0.1:3389\"\n")
                .expect("write failed");
        }
        let res = LdapSessionBuilder::new().read_options_from_optional_config(&path);
        let _ = std::fs::remove_file(&path);

        let session = res.expect("config failed").build().expect("build failed");
        assert_eq!(session.addr.port(), 3389);
    }

    #[test]
    fn test_session_requests_need_connection() {
        let session = LdapSessionBuilder::new()
            .address("ldap://127.0.0.1")
            .expect("uri parse failed")
            .build()
            .expect("build failed");

        let dn = Dn::try_from("cn=a,dc=example").expect("invalid dn");
        assert_eq!(
            session.execute_delete(&dn),
            Err(OperationError::SessionNotConnected)
        );
        assert_eq!(session.unbind(), Ok(()));
    }

    #[test]
    fn test_session_connect_refused() {
        // Grab a free port, then close it so nothing is listening there.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind failed");
            listener.local_addr().expect("no local addr").port()
        };

        let session = LdapSessionBuilder::new()
            .address(&format!("ldap://127.0.0.1:{port}"))
            .expect("uri parse failed")
            .timeout(Duration::from_secs(5))
            .build()
            .expect("build failed");

        assert_eq!(
            session.connect(),
            Err(OperationError::SessionIo(String::new()))
        );
        assert!(!session.is_connected());
    }
}
