use std::path::Path;

use super::*;

const VALID_YAML: &str = r"
categories:
  - key: tax
    title: Tax
    description: HMRC updates
  - key: pensions
    title: Pensions
    description: Pension news
sources:
  - url: https://example.com/tax.rss
    displayName: Example Tax
    category: tax
  - url: https://example.com/pensions.rss
    displayName: Example Pensions
    category: pensions
";

#[test]
fn builtin_registry_is_valid() {
    let builtin = SourceRegistry::builtin();
    let rebuilt = SourceRegistry::new(builtin.categories().to_vec(), builtin.sources().to_vec());
    assert!(rebuilt.is_ok(), "builtin registry failed validation: {rebuilt:?}");
    assert!(builtin.len() > 8, "builtin should exceed the per-pass cap");
}

#[test]
fn parses_valid_yaml_in_order() {
    let registry = parse_registry(VALID_YAML).expect("valid yaml");
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.sources()[0].display_name, "Example Tax");
    assert_eq!(registry.sources()[1].category, "pensions");
    assert_eq!(
        registry.category("pensions").map(|c| c.title.as_str()),
        Some("Pensions")
    );
    assert!(registry.source_by_url("https://example.com/tax.rss").is_some());
}

#[test]
fn rejects_duplicate_urls() {
    let yaml = r"
categories:
  - key: tax
    title: Tax
    description: ''
sources:
  - url: https://example.com/a.rss
    displayName: A
    category: tax
  - url: https://example.com/a.rss
    displayName: B
    category: tax
";
    let err = parse_registry(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate source url")));
}

#[test]
fn rejects_undeclared_category() {
    let yaml = r"
categories: []
sources:
  - url: https://example.com/a.rss
    displayName: A
    category: tax
";
    let err = parse_registry(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("undeclared category")));
}

#[test]
fn rejects_non_http_url() {
    let yaml = r"
categories:
  - key: tax
    title: Tax
    description: ''
sources:
  - url: ftp://example.com/a.rss
    displayName: A
    category: tax
";
    let err = parse_registry(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("non-HTTP")));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let err = parse_registry("sources: [unterminated").unwrap_err();
    assert!(matches!(err, ConfigError::SourcesFileParse(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_registry(Path::new("/nonexistent/sources.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::SourcesFileIo { .. }));
}

#[test]
fn shipped_sources_file_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/sources.yaml");
    let registry = load_registry(&path).expect("config/sources.yaml should load");
    assert_eq!(registry.len(), SourceRegistry::builtin().len());
}
