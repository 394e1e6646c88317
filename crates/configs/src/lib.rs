use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StateConfig {
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_disk_file")]
    pub disk_file: String,
    #[serde(default = "default_change_feed_capacity")]
    pub change_feed_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            disk_file: default_disk_file(),
            change_feed_capacity: default_change_feed_capacity(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}
fn default_disk_file() -> String {
    "state.json".to_string()
}
fn default_change_feed_capacity() -> usize {
    256
}

pub fn load_default() -> Result<StateConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<StateConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: StateConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl StateConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.storage.normalize_from_env();
        self.storage.validate()?;
        Ok(())
    }

    /// Full path of the on-disk state file.
    pub fn disk_path(&self) -> String {
        format!("{}/{}", self.storage.data_dir, self.storage.disk_file)
    }
}

impl StorageConfig {
    pub fn normalize_from_env(&mut self) {
        if let Ok(dir) = std::env::var("STATE_DATA_DIR") {
            if !dir.trim().is_empty() {
                self.data_dir = dir;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_dir.trim().is_empty() {
            return Err(anyhow!(
                "storage.data_dir is empty; set it in config.toml or STATE_DATA_DIR"
            ));
        }
        if self.disk_file.trim().is_empty() {
            return Err(anyhow!("storage.disk_file must not be empty"));
        }
        if self.change_feed_capacity == 0 {
            return Err(anyhow!("storage.change_feed_capacity must be >= 1"));
        }
        Ok(())
    }
}
