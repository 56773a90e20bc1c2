//! Default configuration values

use std::path::PathBuf;

use super::types::Config;

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "taskdeck.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "taskdeck.yaml";

/// Alternative configuration file name
pub const ALT_CONFIG_FILE: &str = ".taskdeck.yaml";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ALT_CONFIG_FILE,
        ".taskdeck.toml",
    ]
}

/// Directory holding taskdeck's own state (`~/.taskdeck`)
pub fn state_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".taskdeck"))
}

/// Default location of the persisted task database
pub fn default_store_path() -> Option<PathBuf> {
    state_dir().map(|dir| dir.join("db.json"))
}

/// Generate default configuration YAML
pub fn default_config_yaml() -> String {
    let config = Config::default();
    serde_yaml::to_string(&config).unwrap_or_else(|_| DEFAULT_CONFIG_TEMPLATE.to_string())
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# taskdeck configuration

tasks:
  max_logs: 2000
  view_id: taskdeck-project-tasks
  build_mode_env: NODE_ENV
  log_batch_size: 50
  log_batch_interval_ms: 300
  terminate_timeout_ms: 3000
  pull_before_run: true

history:
  max_records: 10
  # homepage: "https://deploy.example.com/{project}/{id}/"

projects:
  - id: web
    path: .
    tasks:
      - name: build
        command: npm run build
        need_history: true
        prompts:
          - name: mode
            type: list
            default: production
            choices:
              - value: production
              - value: development
"#;
