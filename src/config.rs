// file: src/config.rs
// description: application configuration management with json/toml support
// reference: https://docs.rs/config

use crate::error::{AggregatorError, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Access token for the hosting API.
    #[serde(default)]
    pub token: String,
    /// Repository URLs in the order they are processed.
    #[serde(default)]
    pub repositories: Vec<String>,
    /// URLs excluded from every run.
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// `0` clones full history.
    #[serde(default = "default_clone_depth")]
    pub clone_depth: u32,
    #[serde(default)]
    pub parallel_workers: Option<usize>,
    #[serde(default = "default_severity_namespaces")]
    pub severity_namespaces: Vec<String>,
    #[serde(default = "default_low_severity_markers")]
    pub low_severity_markers: Vec<String>,
    #[serde(default)]
    pub check_archived: bool,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> String {
    "ALL".to_string()
}

fn default_clone_depth() -> u32 {
    1
}

fn default_severity_namespaces() -> Vec<String> {
    vec!["nuclei_".to_string()]
}

fn default_low_severity_markers() -> Vec<String> {
    vec!["info".to_string(), "low".to_string()]
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("TEMPLATE_AGGREGATOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AggregatorError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| AggregatorError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            token: String::new(),
            repositories: vec![],
            blacklist: vec![],
            workdir: default_workdir(),
            output_dir: default_output_dir(),
            clone_depth: default_clone_depth(),
            parallel_workers: None,
            severity_namespaces: default_severity_namespaces(),
            low_severity_markers: default_low_severity_markers(),
            check_archived: false,
            api_url: default_api_url(),
        }
    }

    pub fn blacklist_set(&self) -> HashSet<String> {
        self.blacklist.iter().cloned().collect()
    }

    /// Absolute-or-relative path of the aggregate directory.
    pub fn output_path(&self) -> PathBuf {
        self.workdir.join(&self.output_dir)
    }

    /// Configured cap, else the host's available parallelism.
    pub fn worker_count(&self) -> usize {
        self.parallel_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(AggregatorError::Credential(
                "token is not configured, generate one at https://github.com/settings/tokens"
                    .to_string(),
            ));
        }

        if self.parallel_workers == Some(0) {
            return Err(AggregatorError::Config(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }

        if self.output_dir.trim().is_empty() {
            return Err(AggregatorError::Config(
                "output_dir must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_json_config_with_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "token": "ghp_example",
                "repositories": ["https://github.com/a/b", "https://github.com/c/d"],
                "blacklist": ["https://github.com/c/d"]
            }"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.token, "ghp_example");
        assert_eq!(config.repositories.len(), 2);
        assert!(config.blacklist_set().contains("https://github.com/c/d"));
        assert_eq!(config.output_dir, "ALL");
        assert_eq!(config.clone_depth, 1);
        assert_eq!(config.low_severity_markers, vec!["info", "low"]);
    }

    #[test]
    fn test_missing_token_is_credential_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"repositories": []}"#).unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, AggregatorError::Credential(_)));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = Config::default_config();
        config.token = "t".to_string();
        config.parallel_workers = Some(0);

        assert!(matches!(
            config.validate(),
            Err(AggregatorError::Config(_))
        ));
    }

    #[test]
    fn test_worker_count_defaults_to_parallelism() {
        let mut config = Config::default_config();
        assert!(config.worker_count() >= 1);

        config.parallel_workers = Some(3);
        assert_eq!(config.worker_count(), 3);
    }
}
