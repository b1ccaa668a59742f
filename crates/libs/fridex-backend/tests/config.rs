mod common;

use std::fs;
use std::sync::Arc;

use fridex_backend::{Backend, BackendConfig, ConfigError, ServerConfig};
use fridex_transport::{Endpoint, MemoryConnector};
use tempfile::NamedTempFile;

#[test]
fn loads_config_from_file() {
    let input = r#"
auto_connect = true

[server]
host = "fridex.local"
port = 3849
"#;
    let file = NamedTempFile::new().expect("temp file");
    fs::write(file.path(), input).expect("write config");

    let cfg = BackendConfig::from_path(file.path()).expect("load");
    assert!(cfg.auto_connect);
    assert_eq!(cfg.server, ServerConfig::new("fridex.local", 3849));
}

#[test]
fn rejects_invalid_files() {
    let file = NamedTempFile::new().expect("temp file");

    fs::write(file.path(), "[server]\nport = 0\n").expect("write config");
    assert!(matches!(BackendConfig::from_path(file.path()), Err(ConfigError::Invalid { .. })));

    fs::write(file.path(), "[server]\nport = \"eighty\"\n").expect("write config");
    assert!(matches!(BackendConfig::from_path(file.path()), Err(ConfigError::Parse(_))));

    fs::write(file.path(), "auto_connect = true\n").expect("write config");
    assert!(matches!(BackendConfig::from_path(file.path()), Err(ConfigError::Parse(_))));
}

#[test]
fn auto_connect_uses_the_configured_endpoint() {
    common::setup();
    let cfg = BackendConfig::from_toml("auto_connect = true\n[server]\nport = 4000\n")
        .expect("parse");
    let connector = Arc::new(MemoryConnector::new());
    let backend = Backend::from_config(connector.clone(), &cfg).expect("backend");

    assert!(backend.connection().is_connected());
    assert_eq!(connector.endpoints(), vec![Endpoint::new("localhost", 4000)]);
}
