// ABOUTME: Integration tests for SSH session setup.
// ABOUTME: Covers session settings and credential failures that need no server.

use dregs::config::ServerConfig;
use dregs::ssh::{Error, Session, SessionConfig};
use std::time::Duration;

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

#[test]
fn session_config_defaults() {
    let config = SessionConfig::new("build.example.com", "ops");
    assert_eq!(config.port, 22);
    assert!(!config.trust_on_first_use);
    assert!(config.key_path.is_none());
    assert_eq!(config.destination(), "ops@build.example.com:22");
}

#[test]
fn server_settings_flow_into_session() {
    let yaml = r#"
server:
  host: build.example.com
  port: 2222
  user: ops
  known_hosts: /etc/dregs/known_hosts
  trust_first_connection: true
"#;
    let server = dregs::config::Config::from_yaml(yaml)
        .unwrap()
        .server
        .unwrap();
    let session = server.ssh_session_config(Duration::from_secs(45));

    assert_eq!(session.destination(), "ops@build.example.com:2222");
    assert!(session.trust_on_first_use);
    assert_eq!(session.command_timeout, Duration::from_secs(45));
    assert_eq!(
        session.known_hosts_path.as_deref(),
        Some(std::path::Path::new("/etc/dregs/known_hosts"))
    );
}

#[test]
fn unreadable_key_file_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let key = dir.path().join("id_ed25519");
    std::fs::write(&key, "not a private key\n").unwrap();

    let config = ServerConfig::parse("ops@192.0.2.1")
        .unwrap()
        .ssh_session_config(Duration::from_secs(5))
        .key_path(&key);

    match block_on(Session::connect(config)) {
        Err(Error::KeyLoadFailed { path, .. }) => assert_eq!(path, key),
        other => panic!("expected KeyLoadFailed, got {other:?}"),
    }
}

#[test]
fn no_agent_and_no_keys_is_no_credentials() {
    let home = tempfile::tempdir().unwrap();
    temp_env::with_vars(
        [
            ("SSH_AUTH_SOCK", None),
            ("HOME", home.path().to_str()),
        ],
        || {
            let config = SessionConfig::new("192.0.2.1", "ops");
            let result = block_on(Session::connect(config));
            assert!(matches!(result, Err(Error::NoCredentials(_))), "got {result:?}");
        },
    );
}
