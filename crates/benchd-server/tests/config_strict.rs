#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashMap;

use benchd_core::ErrorClass;
use benchd_server::config::{self, ServerConfig};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  host: "0.0.0.0"
  prot: 9090 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.class(), ErrorClass::Fatal);
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.stats.interval_ms, 10_000);
    assert_eq!(cfg.log.path.to_str(), Some("server.log"));
    assert_eq!(cfg.listen_addr(), "0.0.0.0:8080");
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
server:
  host: "127.0.0.1"
  port: 9000
  max_head_bytes: 16384
log:
  path: "/var/log/benchd/server.log"
stats:
  interval_ms: 5000
shutdown:
  drain_timeout_ms: 0
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.listen_addr(), "127.0.0.1:9000");
    assert_eq!(cfg.server.max_head_bytes, 16384);
    assert_eq!(cfg.stats.interval_ms, 5000);
    assert_eq!(cfg.shutdown.drain_timeout_ms, 0);
}

#[test]
fn rejects_wrong_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert!(err.to_string().contains("version"));
}

#[test]
fn rejects_out_of_range_values() {
    for bad in [
        "version: 1\nstats: { interval_ms: 10 }\n",
        "version: 1\nserver: { max_head_bytes: 100 }\n",
        "version: 1\nserver: { host: \"\" }\n",
        "version: 1\nserver: { port: 70000 }\n",
    ] {
        assert!(config::load_from_str(bad).is_err(), "accepted: {bad}");
    }
}

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |k: &str| map.get(k).cloned()
}

#[test]
fn env_overrides_port_and_log() {
    let cfg = config::apply_overrides(
        ServerConfig::default(),
        lookup(&[("BENCHD_PORT", "9191"), ("BENCHD_LOG", "/tmp/x.log")]),
    )
    .unwrap();
    assert_eq!(cfg.server.port, 9191);
    assert_eq!(cfg.log.path.to_str(), Some("/tmp/x.log"));
}

#[test]
fn benchd_port_wins_over_port() {
    let cfg = config::apply_overrides(
        ServerConfig::default(),
        lookup(&[("BENCHD_PORT", "9191"), ("PORT", "7000")]),
    )
    .unwrap();
    assert_eq!(cfg.server.port, 9191);

    let cfg = config::apply_overrides(ServerConfig::default(), lookup(&[("PORT", "7000")])).unwrap();
    assert_eq!(cfg.server.port, 7000);
}

#[test]
fn invalid_port_override_is_fatal() {
    let err = config::apply_overrides(ServerConfig::default(), lookup(&[("BENCHD_PORT", "http")]))
        .expect_err("must fail");
    assert_eq!(err.class(), ErrorClass::Fatal);
}
