use ftext_workspace::WorkspaceConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "ftext.config.json";

/// ftext configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding one subdirectory per document
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Committed operations kept per document; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,

    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

fn default_storage_dir() -> String {
    "documents".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3030
}

fn default_broadcast_capacity() -> usize {
    256
}

fn default_mailbox_capacity() -> usize {
    64
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get absolute path to the storage directory
    pub fn get_storage_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.storage_dir)
    }

    pub fn workspace_config(&self, cwd: &str) -> WorkspaceConfig {
        WorkspaceConfig {
            storage_dir: self.get_storage_dir(cwd),
            history_limit: self.history_limit,
            broadcast_capacity: self.broadcast_capacity,
            mailbox_capacity: self.mailbox_capacity,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            host: default_host(),
            port: default_port(),
            history_limit: None,
            broadcast_capacity: default_broadcast_capacity(),
            mailbox_capacity: default_mailbox_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "storageDir": "/var/lib/ftext",
            "port": 8080,
            "historyLimit": 500
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.storage_dir, "/var/lib/ftext");
        assert_eq!(config.port, 8080);
        assert_eq!(config.history_limit, Some(500));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.mailbox_capacity, 64);

        let workspace = config.workspace_config("/home/me");
        assert_eq!(workspace.storage_dir, PathBuf::from("/var/lib/ftext"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage_dir, "documents");
        assert_eq!(config.port, 3030);
        assert_eq!(config.history_limit, None);
        assert_eq!(
            config.get_storage_dir("/srv"),
            PathBuf::from("/srv/documents")
        );
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().display().to_string()).unwrap();
        assert_eq!(config.broadcast_capacity, 256);
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ port: }").unwrap();
        assert!(Config::load(&dir.path().display().to_string()).is_err());
    }
}
