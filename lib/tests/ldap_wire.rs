#![deny(warnings)]
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread;

use futures_util::sink::SinkExt;
use futures_util::stream::StreamExt;
use ldap3_proto::proto::*;
use ldap3_proto::simple::ServerOps;
use ldap3_proto::LdapCodec;
use tokio::net::TcpListener;
use tokio_util::codec::Framed;

use ldapentry_lib::prelude::*;

const TEST_BIND_DN: &str = "cn=admin,dc=example,dc=com";
const TEST_BIND_PASSWORD: &str = "integration test password";

/// A summary of each request the fake server saw.
type Seen = Arc<Mutex<Vec<String>>>;

fn result(code: &LdapResultCode) -> LdapResult {
    LdapResult {
        code: code.clone(),
        matcheddn: String::new(),
        message: format!("{:?}", code),
        referral: vec![],
    }
}

fn respond(msg: LdapMsg, code: &LdapResultCode, seen: &Seen) -> Vec<LdapMsg> {
    if matches!(msg.op, LdapOp::BindRequest(_) | LdapOp::SearchRequest(_)) {
        return match ServerOps::try_from(msg) {
            Ok(ServerOps::SimpleBind(sbr)) => {
                if sbr.dn == TEST_BIND_DN && sbr.pw == TEST_BIND_PASSWORD {
                    vec![sbr.gen_success()]
                } else {
                    vec![sbr.gen_error(
                        LdapResultCode::InvalidCredentials,
                        "invalid credentials".to_string(),
                    )]
                }
            }
            Ok(ServerOps::Search(sr)) => vec![
                sr.gen_result_entry(LdapSearchResultEntry {
                    dn: "cn=alice,ou=People,dc=example,dc=com".to_string(),
                    attributes: vec![
                        LdapPartialAttribute {
                            atype: "cn".to_string(),
                            vals: vec![b"alice".to_vec()],
                        },
                        LdapPartialAttribute {
                            atype: "mail".to_string(),
                            vals: vec![b"alice@example.com".to_vec()],
                        },
                    ],
                }),
                sr.gen_success(),
            ],
            _ => vec![],
        };
    }

    let msgid = msg.msgid;
    let reply = |op| LdapMsg {
        msgid,
        op,
        ctrl: vec![],
    };
    let mut seen = seen.lock().expect("lock poisoned");

    match msg.op {
        LdapOp::AddRequest(req) => {
            let attrs: Vec<_> = req.attributes.iter().map(|a| a.atype.clone()).collect();
            seen.push(format!("add {} {}", req.dn, attrs.join(",")));
            vec![reply(LdapOp::AddResponse(result(code)))]
        }
        LdapOp::ModifyRequest(req) => {
            let changes: Vec<_> = req
                .changes
                .iter()
                .map(|c| format!("{:?}:{}", c.operation, c.modification.atype))
                .collect();
            seen.push(format!("modify {} {}", req.dn, changes.join(",")));
            vec![reply(LdapOp::ModifyResponse(result(code)))]
        }
        LdapOp::DelRequest(dn) => {
            seen.push(format!("delete {}", dn));
            vec![reply(LdapOp::DelResponse(result(code)))]
        }
        LdapOp::ModifyDNRequest(req) => {
            seen.push(format!(
                "rename {} {} {:?}",
                req.dn, req.newrdn, req.new_superior
            ));
            vec![reply(LdapOp::ModifyDNResponse(result(code)))]
        }
        _ => vec![],
    }
}

/// Serve a single client connection on a background thread. Every write request is answered
/// with `code`.
fn spawn_server(code: LdapResultCode) -> (SocketAddr, Seen) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind failed");
    std_listener
        .set_nonblocking(true)
        .expect("set_nonblocking failed");
    let addr = std_listener.local_addr().expect("no local addr");
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let server_seen = seen.clone();

    thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime failed");
        rt.block_on(async move {
            let listener = TcpListener::from_std(std_listener).expect("listener failed");
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let mut framed = Framed::new(stream, LdapCodec::default());
            while let Some(Ok(msg)) = framed.next().await {
                if matches!(msg.op, LdapOp::UnbindRequest) {
                    server_seen.lock().expect("lock poisoned").push("unbind".to_string());
                    return;
                }
                for rmsg in respond(msg, &code, &server_seen) {
                    if framed.send(rmsg).await.is_err() {
                        return;
                    }
                }
            }
        });
    });

    (addr, seen)
}

fn connect(addr: SocketAddr, password: &str) -> Result<Arc<LdapSession>, OperationError> {
    let session = LdapSessionBuilder::new()
        .address(&format!("ldap://{addr}"))?
        .bind(TEST_BIND_DN, password)
        .timeout(Duration::from_secs(10))
        .build()?;
    session.connect()?;
    Ok(Arc::new(session))
}

#[test]
fn test_ldap_session_search_modify_rename_delete() {
    ldapentry_sketching::test_init();
    let (addr, seen) = spawn_server(LdapResultCode::Success);
    let session = connect(addr, TEST_BIND_PASSWORD).expect("connect failed");
    assert!(session.is_connected());

    let mut entries = session
        .search(
            "dc=example,dc=com",
            LdapSearchScope::Subtree,
            LdapFilter::Equality("cn".to_string(), "alice".to_string()),
            vec![],
        )
        .expect("search failed");
    assert_eq!(entries.len(), 1);
    let mut e = entries.remove(0);
    assert!(e.session().is_some());
    assert_eq!(e.get("MAIL").map(|vl| vl.len()), Some(1));

    e.set("cn", ["alice", "Alice Smith"]).expect("set failed");
    e.delete("mail").expect("delete failed");
    e.modify().expect("modify failed");

    e.rename("cn=alice smith,ou=People,dc=example,dc=com")
        .expect("rename failed");
    e.delete_entry().expect("delete failed");
    e.add().expect("add failed");
    session.unbind().expect("unbind failed");
    assert!(!session.is_connected());

    // The server thread may still be recording the unbind.
    for _ in 0..50 {
        if seen.lock().expect("lock poisoned").len() == 5 {
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    let seen = seen.lock().expect("lock poisoned").clone();
    assert_eq!(
        seen,
        vec![
            "modify cn=alice,ou=People,dc=example,dc=com Replace:cn,Delete:mail".to_string(),
            "rename cn=alice,ou=People,dc=example,dc=com cn=alice smith Some(\"ou=People,dc=example,dc=com\")".to_string(),
            "delete cn=alice smith,ou=People,dc=example,dc=com".to_string(),
            "add cn=alice smith,ou=People,dc=example,dc=com cn".to_string(),
            "unbind".to_string(),
        ]
    );
}

#[test]
fn test_ldap_session_bind_refused() {
    ldapentry_sketching::test_init();
    let (addr, _seen) = spawn_server(LdapResultCode::Success);

    match connect(addr, "wrong password") {
        Err(OperationError::ProtocolFailure { code, .. }) => {
            assert_eq!(code, "InvalidCredentials")
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_ldap_session_server_refusal_keeps_changes() {
    ldapentry_sketching::test_init();
    let (addr, _seen) = spawn_server(LdapResultCode::UnwillingToPerform);
    let session = connect(addr, TEST_BIND_PASSWORD).expect("connect failed");
    let dyn_session: Arc<dyn DirectorySession> = session.clone();

    let mut e = Entry::with_session("cn=bob,dc=example,dc=com", &dyn_session)
        .expect("invalid dn");
    e.set("cn", "bob").expect("set failed");

    match e.add() {
        Err(OperationError::ProtocolFailure { code, .. }) => {
            assert_eq!(code, "UnwillingToPerform")
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(e.get("cn").map(|vl| vl.status()), Some(ValueStatus::Fresh));
    // A refusal is an answer, the connection stays usable.
    assert!(session.is_connected());
}
