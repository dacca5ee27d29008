#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use wirecall_server::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  listen: "0.0.0.0:8080"
  call_timeout: 500 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn deny_unknown_top_level_section() {
    let bad = r#"
version: 1
tenants: []
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.call_timeout_ms, 30_000);
    assert_eq!(cfg.routes.stream, "/rpc/stream");
    assert_eq!(cfg.routes.plain, "/rpc");
    assert_eq!(cfg.routes.socket, "/rpc/ws");

    let settings = cfg.server.engine_settings();
    assert_eq!(settings.call_timeout, Duration::from_secs(30));
    assert_eq!(settings.max_pending_attachments, 64);
}

#[test]
fn unsupported_version_is_rejected() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn call_timeout_out_of_range_is_rejected() {
    let bad = r#"
version: 1
server:
  call_timeout_ms: 10
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().contains("call_timeout_ms"));
}

#[test]
fn invalid_listen_address_is_rejected() {
    let bad = r#"
version: 1
server:
  listen: "not-an-address"
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn routes_must_be_distinct_and_avoid_ops() {
    let dup = r#"
version: 1
routes:
  stream: "/rpc"
  plain: "/rpc"
"#;
    assert!(config::load_from_str(dup).is_err());

    let ops = r#"
version: 1
routes:
  socket: "/healthz"
"#;
    assert!(config::load_from_str(ops).is_err());

    let relative = r#"
version: 1
routes:
  plain: "rpc"
"#;
    assert!(config::load_from_str(relative).is_err());
}

#[test]
fn custom_routes_parse() {
    let ok = r#"
version: 1
server:
  listen: "127.0.0.1:9000"
  call_timeout_ms: 1500
routes:
  stream: "/v1/stream"
  plain: "/v1/call"
  socket: "/v1/ws"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.server.listen, "127.0.0.1:9000");
    assert_eq!(cfg.server.engine_settings().call_timeout, Duration::from_millis(1500));
    assert_eq!(cfg.routes.plain, "/v1/call");
}
