use super::*;

#[test]
fn every_field_is_optional() {
    let config: ProjectConfig = ron::from_str("()").expect("config should parse");
    assert_eq!(config, ProjectConfig::default());
}

#[test]
fn parses_all_fields() {
    let config: ProjectConfig = ron::from_str(
        r#"(
  include_dirs: ["inc", "/opt/lib65"],
  format: Some(IntelHex),
  unused_byte: Some(255),
  ihex_strip: Some(true),
  listing: Some(false),
)"#,
    )
    .expect("config should parse");

    assert_eq!(config.include_dirs.len(), 2);
    assert_eq!(config.format, Some(OutputFormat::IntelHex));
    assert_eq!(config.unused_byte, Some(0xFF));
    assert_eq!(config.ihex_strip, Some(true));
    assert_eq!(config.listing, Some(false));
}

#[test]
fn rejects_unknown_fields() {
    let result: Result<ProjectConfig, _> = ron::from_str("(output: \"game.bin\")");
    assert!(result.is_err());
}

#[test]
fn unused_byte_must_fit_in_a_byte() {
    let result: Result<ProjectConfig, _> = ron::from_str("(unused_byte: Some(256))");
    assert!(result.is_err());
}

#[test]
fn load_config_rebases_relative_include_dirs() {
    let root = temp_root("config");
    let path = root.join("c816.ron");
    std::fs::write(&path, "(include_dirs: [\"inc\"], format: Some(Memory))").expect("write config");

    let config = load_config(&path).expect("load config");
    assert_eq!(config.include_dirs, vec![root.join("inc")]);
    assert_eq!(config.format, Some(OutputFormat::Memory));
}

#[test]
fn load_config_reports_the_path() {
    let root = temp_root("config-missing");
    let path = root.join("missing.ron");
    let error = load_config(&path).expect_err("missing file");
    assert!(matches!(error, LinkError::ReadConfig { .. }));
    assert!(error.to_string().contains("missing.ron"));

    std::fs::write(&path, "(format: Some(Xex))").expect("write config");
    let error = load_config(&path).expect_err("bad variant");
    assert!(matches!(error, LinkError::ParseConfig { .. }));
}
