//! Loads [`Config`] from a directory (`main.toml` plus one file per target
//! host) and holds it behind `Arc<RwLock<Arc<Config>>>` so the control
//! surface can trigger a hot reload without restarting the process.
//!
//! A fixed main file plus a glob over the rest of the directory, one file
//! per host.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use glob::glob;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{Config, HostConfigFile, SecretsLoader};

pub struct ConfigManager {
    config: Arc<RwLock<Arc<Config>>>,
    config_dir: String,
    secrets: Arc<SecretsLoader>,
}

impl ConfigManager {
    pub async fn load(config_dir: impl Into<String>) -> Result<Self> {
        let config_dir = config_dir.into();
        let secrets_path = Path::new(&config_dir).join("secrets.toml");
        let secrets = Arc::new(SecretsLoader::load(&secrets_path)?);

        let config = Self::load_from_toml(&config_dir).await?;
        info!(hosts = config.hosts.len(), "configuration loaded");

        Ok(ConfigManager { config: Arc::new(RwLock::new(Arc::new(config))), config_dir, secrets })
    }

    pub async fn current(&self) -> Arc<Config> {
        self.config.read().await.clone()
    }

    pub fn secrets(&self) -> Arc<SecretsLoader> {
        self.secrets.clone()
    }

    /// Re-reads every file under `config_dir` and swaps the live config.
    /// Leaves the previous configuration in place if reloading fails.
    pub async fn reload(&self) -> Result<()> {
        let fresh = Self::load_from_toml(&self.config_dir).await?;
        let mut guard = self.config.write().await;
        *guard = Arc::new(fresh);
        info!("configuration reloaded");
        Ok(())
    }

    async fn load_from_toml(config_dir: &str) -> Result<Config> {
        let main_path = format!("{}/main.toml", config_dir);
        let main_content = fs::read_to_string(&main_path)
            .await
            .with_context(|| format!("failed to read main config {}", main_path))?;
        let mut config: Config = toml::from_str(&main_content).with_context(|| "failed to parse main.toml".to_string())?;

        let pattern = format!("{}/*.toml", config_dir);
        let mut hosts = std::collections::HashMap::new();

        for entry in glob(&pattern).map_err(|e| anyhow!("glob pattern error: {}", e))? {
            let path = entry.map_err(|e| anyhow!("glob entry error: {}", e))?;
            let filename = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| anyhow!("invalid filename"))?;

            if filename == "main.toml" || filename == "secrets.toml" {
                continue;
            }

            debug!(file = %path.display(), "loading host config");
            let content = fs::read_to_string(&path).await.with_context(|| format!("failed to read {}", path.display()))?;
            let host_file: HostConfigFile =
                toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
            hosts.insert(host_file.host.name.clone(), host_file.host);
        }

        if hosts.is_empty() {
            warn!("no host configuration files found under {}", config_dir);
        }

        config.hosts = hosts;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).await.unwrap();
    }

    #[tokio::test]
    async fn loads_main_config_and_merges_host_files() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "main.toml",
            r#"
bind_address = "0.0.0.0"
bind_port = 8095
database_path = "remediator.db"
monitoring_url = "http://monitoring:9090"
log_aggregator_url = "http://loki:3100"
llm_base_url = "http://llm-gateway:8443"
signature_labels = ["host"]
attempt_window_seconds = 7200
escalation_cooldown_seconds = 14400
dedup_cooldown_seconds = 300
verification_deadline_seconds = 120
"#,
        )
        .await;
        write(
            dir.path(),
            "nexus.toml",
            r#"
[host]
name = "nexus"
address = "10.0.0.2"
login = "ops"
key_path = "/keys/nexus"
localhost = false
"#,
        )
        .await;

        let manager = ConfigManager::load(dir.path().to_str().unwrap()).await.unwrap();
        let config = manager.current().await;
        assert_eq!(config.hosts.len(), 1);
        assert!(config.hosts.contains_key("nexus"));
    }
}
