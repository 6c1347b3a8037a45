use sentinel_files::config::{Config, ConfigError, Timeouts, DEFAULT_MAX_CONNECTIONS};
use std::time::Duration;

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.server.max_connections, DEFAULT_MAX_CONNECTIONS);
    assert!(cfg.files.root.is_none());
}

#[test]
fn test_config_from_yaml() {
    let yaml = r#"
server:
  host: 127.0.0.1
  port: 9000
  max_connections: 16
files:
  root: /srv/www
timeouts:
  header_read_secs: 5
  idle_secs: 0
"#;
    let cfg = Config::from_yaml_str(yaml).unwrap();

    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.max_connections, 16);
    assert_eq!(cfg.files.root.as_deref(), Some(std::path::Path::new("/srv/www")));
    assert_eq!(cfg.timeouts.header_read_secs, 5);
    assert_eq!(cfg.timeouts.idle_secs, 0);
    // Missing keys fall back to defaults
    assert_eq!(cfg.timeouts.max_duration_secs, 0);
}

#[test]
fn test_config_invalid_yaml() {
    let result = Config::from_yaml_str("server: [not, a, map]");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_config_missing_file() {
    let result = Config::from_yaml_file("/definitely/not/here.yaml");
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn test_validate_canonicalizes_root() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("sub");
    std::fs::create_dir(&nested).unwrap();

    let mut cfg = Config::new(nested.join(".."), 0);
    cfg.server.host = "127.0.0.1".to_string();
    let server = cfg.validate().unwrap();

    assert_eq!(server.root, dir.path().canonicalize().unwrap());
    assert_eq!(server.bind_addr.port(), 0);
    assert!(server.bind_addr.ip().is_loopback());
}

#[test]
fn test_validate_rejects_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config::new(dir.path().join("nope"), 8080);

    assert!(matches!(cfg.validate(), Err(ConfigError::RootMissing(_))));
}

#[test]
fn test_validate_rejects_file_root() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    std::fs::write(&file, b"x").unwrap();

    let cfg = Config::new(&file, 8080);
    assert!(matches!(cfg.validate(), Err(ConfigError::RootNotDirectory(_))));
}

#[test]
fn test_validate_rejects_no_root() {
    assert!(matches!(Config::default().validate(), Err(ConfigError::NoRoot)));
}

#[test]
fn test_validate_rejects_zero_concurrency() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = Config::new(dir.path(), 8080);
    cfg.server.max_connections = 0;

    assert!(matches!(cfg.validate(), Err(ConfigError::ZeroConcurrency)));
}

#[test]
fn test_timeouts_zero_disables() {
    let cfg = Config::from_yaml_str("timeouts:\n  header_read_secs: 3\n  idle_secs: 0\n").unwrap();
    let timeouts = Timeouts::from(&cfg.timeouts);

    assert_eq!(timeouts.header_read, Some(Duration::from_secs(3)));
    assert_eq!(timeouts.idle, None);
    assert_eq!(timeouts.max_duration, None);
}
