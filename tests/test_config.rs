use courier::ClientConfig;

#[test]
fn test_default_config() {
    let config = ClientConfig::default();

    assert_eq!(config.max_concurrent, 8);
    assert_eq!(config.max_body_size, 1024 * 1024);
    assert_eq!(config.max_line_length, 8 * 1024);
    assert_eq!(config.max_header_block, 64 * 1024);
    assert_eq!(config.connect_timeout_ms, 10_000);
}

#[test]
fn test_partial_yaml_fills_defaults() {
    let path = std::env::temp_dir().join("courier-test-partial.yaml");
    std::fs::write(&path, "max_concurrent: 2\nmax_body_size: 4096\n").unwrap();

    let config = ClientConfig::from_yaml_file(path.to_str().unwrap()).unwrap();
    assert_eq!(config.max_concurrent, 2);
    assert_eq!(config.max_body_size, 4096);
    assert_eq!(config.connect_timeout_ms, 10_000);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_missing_config_file_is_an_error() {
    let result = ClientConfig::from_yaml_file("/nonexistent/courier.yaml");
    assert!(result.is_err());
}

#[test]
fn test_invalid_yaml_is_an_error() {
    let path = std::env::temp_dir().join("courier-test-invalid.yaml");
    std::fs::write(&path, "max_concurrent: [not a number\n").unwrap();

    assert!(ClientConfig::from_yaml_file(path.to_str().unwrap()).is_err());

    std::fs::remove_file(&path).ok();
}
