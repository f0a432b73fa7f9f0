use citydb_config::{
    AppConfig, MapSettings, SettingsProvider, connection_params, parse_extent,
    postgres_connections,
};

fn sample_settings() -> MapSettings {
    MapSettings::new()
        .with_value("PostgreSQL/connections/munich/host", "db.local")
        .with_value("PostgreSQL/connections/munich/port", "5432")
        .with_value("PostgreSQL/connections/munich/database", "citydb")
        .with_value("PostgreSQL/connections/munich/username", "citydb_user")
        .with_value("PostgreSQL/connections/munich/password", "secret")
        .with_value("PostgreSQL/connections/berlin/host", "berlin.local")
        .with_value("PostgreSQL/connections/selected", "munich")
        .with_value("Qgis/other/key", "ignored")
}

#[test]
fn lists_connection_groups() {
    let settings = sample_settings();
    assert_eq!(postgres_connections(&settings), vec!["berlin", "munich"]);
}

#[test]
fn reads_connection_params_with_missing_keys_empty() {
    let settings = sample_settings();

    let munich = connection_params(&settings, "munich");
    assert_eq!(munich.host, "db.local");
    assert_eq!(munich.port, "5432");
    assert_eq!(munich.database, "citydb");
    assert_eq!(munich.username, "citydb_user");
    assert_eq!(munich.password, "secret");

    let berlin = connection_params(&settings, "berlin");
    assert_eq!(berlin.host, "berlin.local");
    assert!(berlin.port.is_empty());
    assert!(berlin.password.is_empty());
}

#[test]
fn loads_settings_from_json() {
    let settings = MapSettings::from_json_str(
        r#"{
            "PostgreSQL/connections/local/host": "localhost",
            "PostgreSQL/connections/local/port": 5432
        }"#,
    )
    .expect("settings");

    assert_eq!(
        settings.value("PostgreSQL/connections/local/port").as_deref(),
        Some("5432")
    );
    assert_eq!(postgres_connections(&settings), vec!["local"]);
}

#[test]
fn rejects_non_object_settings() {
    let err = MapSettings::from_json_str("[1, 2]").expect_err("array root");
    assert_eq!(err.to_string(), "settings file error: settings root must be an object");
}

#[test]
fn parses_extent_text() {
    let extent = parse_extent("0, 0, 10.5, 10").expect("extent");
    assert_eq!(extent.xmax, 10.5);
    assert!(parse_extent("0,0,10").is_none());
    assert!(parse_extent("a,b,c,d").is_none());
}

#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::set_var("CITYDB_SETTINGS_FILE", "/tmp/settings.json");
        std::env::set_var("CITYDB_MAX_FEATURES", "50");
        std::env::set_var("CITYDB_EXTENT", "0,0,10,10");
    }

    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.settings_file, "/tmp/settings.json");
    assert_eq!(config.max_features, 50);
    assert_eq!(config.extent.map(|extent| extent.ymax), Some(10.0));
}
