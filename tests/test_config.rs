use std::path::PathBuf;
use std::time::Duration;

use ember::config::{Config, ConfigError, ServerSettings};

#[test]
fn test_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.server.keep_alive_timeout_secs, 5);
    assert!(cfg.static_files.directories.is_empty());
    assert_eq!(cfg.settings(), ServerSettings::default());
    assert_eq!(cfg.settings().keep_alive_timeout(), Duration::from_secs(5));
}

#[test]
fn test_full_yaml() {
    let yaml = r#"
server:
  listen_addr: "0.0.0.0:3000"
  keep_alive_timeout_secs: 30
static_files:
  directories:
    - ./public
    - /var/www
"#;

    let cfg = Config::from_yaml_str(yaml).unwrap();

    assert_eq!(cfg.server.listen_addr, "0.0.0.0:3000");
    assert_eq!(cfg.settings().keep_alive_timeout(), Duration::from_secs(30));
    assert_eq!(
        cfg.static_files.directories,
        vec![PathBuf::from("./public"), PathBuf::from("/var/www")]
    );
}

#[test]
fn test_partial_yaml_keeps_defaults() {
    let cfg = Config::from_yaml_str("server:\n  keep_alive_timeout_secs: 1\n").unwrap();

    assert_eq!(cfg.server.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.server.keep_alive_timeout_secs, 1);
    assert!(cfg.static_files.directories.is_empty());
}

#[test]
fn test_invalid_yaml() {
    let err = Config::from_yaml_str("server:\n  keep_alive_timeout_secs: soon\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

// The only test in this binary that touches the process environment.
#[test]
fn test_load_from_file_and_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ember.yaml");
    std::fs::write(
        &path,
        "server:\n  listen_addr: \"127.0.0.1:9000\"\nstatic_files:\n  directories: [www]\n",
    )
    .unwrap();

    unsafe {
        std::env::set_var("EMBER_CONFIG", &path);
        std::env::remove_var("LISTEN");
        std::env::remove_var("KEEP_ALIVE");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:9000");
    assert_eq!(cfg.static_files.directories, vec![PathBuf::from("www")]);

    unsafe {
        std::env::set_var("LISTEN", "127.0.0.1:9001");
        std::env::set_var("KEEP_ALIVE", " 12 ");
    }
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.server.listen_addr, "127.0.0.1:9001");
    assert_eq!(cfg.server.keep_alive_timeout_secs, 12);

    unsafe {
        std::env::set_var("KEEP_ALIVE", "forever");
    }
    let err = Config::load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidKeepAlive(ref v) if v == "forever"));

    unsafe {
        std::env::set_var("EMBER_CONFIG", dir.path().join("missing.yaml"));
        std::env::remove_var("KEEP_ALIVE");
    }
    let err = Config::load().unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));

    unsafe {
        std::env::remove_var("EMBER_CONFIG");
        std::env::remove_var("LISTEN");
    }
}
