use repo_scribe::load_config::{load_config, Secrets, Settings};
use serial_test::serial;
use std::collections::HashMap;
use std::env;
use std::fs::write;
use tempfile::NamedTempFile;

fn config_file(yaml: &str) -> NamedTempFile {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), yaml).unwrap();
    config_file
}

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

fn full_env() -> Vec<(&'static str, &'static str)> {
    vec![
        ("CONFLUENCE_URL", "https://example.atlassian.net/wiki"),
        ("CONFLUENCE_USER", "bot@example.com"),
        ("CONFLUENCE_API_TOKEN", "secret"),
        ("OPENAI_API_KEY", "sk-test"),
    ]
}

/// A static config with every section produces the expected target and publish settings.
#[tokio::test]
#[serial]
async fn test_load_config_full() {
    env::remove_var("PARENT_PAGE_ID");
    let file = config_file(
        r#"
target:
  owner: acme
  name: widgets
  path: src
publish:
  space_key: ENG
  parent_page_id: "4242"
github:
  api_base_url: https://github.example.com/api/v3
generator:
  model: gpt-4o
"#,
    );

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.target.owner, "acme");
    assert_eq!(config.target.name, "widgets");
    assert_eq!(config.target.path, "src");
    assert_eq!(config.publish.space_key.as_deref(), Some("ENG"));
    assert_eq!(config.publish.parent_page_id.as_deref(), Some("4242"));
    assert_eq!(config.github.api_base_url, "https://github.example.com/api/v3");
    assert_eq!(config.generator.model.as_deref(), Some("gpt-4o"));
}

#[tokio::test]
#[serial]
async fn test_load_config_defaults_and_parent_from_env() {
    env::remove_var("CONFLUENCE_SPACE_KEY");
    env::set_var("PARENT_PAGE_ID", "9001");
    let file = config_file("target:\n  owner: acme\n  name: widgets\n");

    let config = load_config(file.path()).expect("Config should load");
    env::remove_var("PARENT_PAGE_ID");

    assert_eq!(config.target.path, "");
    assert_eq!(config.publish.space_key, None);
    assert_eq!(config.publish.effective_space_key(), "DEV");
    assert_eq!(config.publish.parent_page_id.as_deref(), Some("9001"));
}

#[tokio::test]
#[serial]
async fn test_load_config_file_value_wins_over_env_parent() {
    env::set_var("PARENT_PAGE_ID", "9001");
    let file = config_file(
        "target:\n  owner: acme\n  name: widgets\npublish:\n  parent_page_id: \"12\"\n",
    );

    let config = load_config(file.path()).expect("Config should load");
    env::remove_var("PARENT_PAGE_ID");

    assert_eq!(config.publish.parent_page_id.as_deref(), Some("12"));
}

#[tokio::test]
#[serial]
async fn test_load_config_space_key_from_env() {
    env::remove_var("PARENT_PAGE_ID");
    env::set_var("CONFLUENCE_SPACE_KEY", "ENG");
    let file = config_file(
        "target:\n  owner: acme\n  name: widgets\npublish:\n  parent_page_id: \"12\"\n",
    );
    let explicit = config_file(
        "target:\n  owner: acme\n  name: widgets\npublish:\n  space_key: OPS\n  parent_page_id: \"12\"\n",
    );

    let config = load_config(file.path()).expect("Config should load");
    let explicit = load_config(explicit.path()).expect("Config should load");
    env::remove_var("CONFLUENCE_SPACE_KEY");

    assert_eq!(config.publish.space_key.as_deref(), Some("ENG"));
    assert_eq!(config.run_config().validate().unwrap().space_key, "ENG");
    assert_eq!(explicit.publish.space_key.as_deref(), Some("OPS"));
}

#[tokio::test]
#[serial]
async fn test_load_config_invalid_yaml() {
    let file = config_file("target: [unterminated\n");

    let err = load_config(file.path()).expect_err("Invalid YAML must fail");
    let msg = err.to_string();
    assert!(msg.contains("parse") && msg.contains("YAML"), "got: {msg}");
}

#[test]
fn test_load_config_missing_file() {
    let err = load_config("/definitely/not/here.yaml").expect_err("Missing file must fail");
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn secrets_list_every_missing_variable() {
    let err = Secrets::from_lookup(lookup(&[
        ("CONFLUENCE_URL", "https://x"),
        ("OPENAI_API_KEY", "  "),
    ]))
    .expect_err("incomplete environment");
    assert_eq!(
        err.to_string(),
        "Missing required environment variables: CONFLUENCE_USER, CONFLUENCE_API_TOKEN, OPENAI_API_KEY"
    );
}

#[test]
fn secrets_github_token_is_optional() {
    let secrets = Secrets::from_lookup(lookup(&full_env())).expect("complete environment");
    assert!(secrets.github_token.is_none());
    assert!(secrets.openai_model.is_none());
    assert_eq!(secrets.confluence_user, "bot@example.com");
}

#[tokio::test]
#[serial]
async fn settings_resolve_model_precedence() {
    env::remove_var("PARENT_PAGE_ID");
    let file = config_file(
        "target:\n  owner: acme\n  name: widgets\npublish:\n  parent_page_id: \"1\"\ngenerator:\n  model: from-file\n",
    );

    let mut vars = full_env();
    vars.push(("GITHUB_TOKEN", "ghp_x"));
    vars.push(("OPENAI_MODEL", "from-env"));
    let settings = Settings::resolve(
        load_config(file.path()).unwrap(),
        Secrets::from_lookup(lookup(&vars)).unwrap(),
    )
    .expect("settings resolve");
    assert_eq!(settings.generator.model, "from-env");
    assert_eq!(settings.github.token.as_deref(), Some("ghp_x"));
    assert_eq!(settings.publish_target.parent_page_id, "1");

    let settings = Settings::resolve(
        load_config(file.path()).unwrap(),
        Secrets::from_lookup(lookup(&full_env())).unwrap(),
    )
    .unwrap();
    assert_eq!(settings.generator.model, "from-file");
    assert_eq!(settings.generator.api_base_url, "https://api.openai.com/v1");
}

#[tokio::test]
#[serial]
async fn settings_require_parent_page() {
    env::remove_var("PARENT_PAGE_ID");
    let file = config_file("target:\n  owner: acme\n  name: widgets\n");

    let err = Settings::resolve(
        load_config(file.path()).unwrap(),
        Secrets::from_lookup(lookup(&full_env())).unwrap(),
    )
    .expect_err("parent page is required");
    assert!(err.to_string().contains("Invalid configuration"));
}
