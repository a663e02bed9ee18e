use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the merged catalog artifact written at the root of the tree.
pub const DATA_BLOCK_FILE: &str = "datablock.pb";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub root_dir: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default)]
    pub folder_exclusions: Vec<String>,
    #[serde(default = "default_file_exclusions")]
    pub file_exclusions: Vec<String>,
}

fn default_db_path() -> String {
    "tori.db".to_string()
}

/// Files the sync writes into every classified folder, plus the rule itself.
/// None of them may count as catalog content or the next run sees drift.
pub const ARTIFACT_EXCLUSIONS: [&str; 4] = ["rule.json", "fileblock.csv", "*.pb", "*.invalid"];

pub fn default_file_exclusions() -> Vec<String> {
    ARTIFACT_EXCLUSIONS.iter().map(|ex| ex.to_string()).collect()
}

impl AppConfig {
    pub fn new(root_dir: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            db_path: default_db_path(),
            folder_exclusions: Vec::new(),
            file_exclusions: default_file_exclusions(),
        }
    }

    pub fn root_path(&self) -> &Path {
        Path::new(&self.root_dir)
    }

    pub fn data_block_path(&self) -> PathBuf {
        self.root_path().join(DATA_BLOCK_FILE)
    }

    /// Append any artifact pattern missing from `file_exclusions`. Configured
    /// values extend the list; they never replace it.
    pub fn with_artifact_exclusions(mut self) -> Self {
        for pattern in ARTIFACT_EXCLUSIONS {
            if !self.file_exclusions.iter().any(|ex| ex == pattern) {
                self.file_exclusions.push(pattern.to_string());
            }
        }
        self
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.root_dir.trim().is_empty() {
            return Err(ConfigError::Message(
                "missing 'root_dir' in configuration".to_string(),
            ));
        }
        Ok(self.with_artifact_exclusions())
    }
}

/// Load `Config.{toml,json,...}` from the working directory, overlaid with
/// `TORI_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("TORI")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("folder_exclusions")
                .with_list_parse_key("file_exclusions"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()?.validate()
}
