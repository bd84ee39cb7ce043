//! Secrets loader for webhook ingress credentials, the outbound notification
//! URL, and the LLM provider API key.
//!
//! A separate TOML file (`config/secrets.toml`, excluded from version
//! control) that resolves sensitive values the primary `Config` never
//! embeds directly, with a missing-file fallback that warns rather than
//! aborts so a host can still come up in a degraded, notification-less mode.
//!
//! Example secrets.toml:
//! ```toml
//! webhook_ingress_username = "alertmanager"
//! webhook_ingress_password = "change-me"
//! notification_webhook_url = "https://hooks.example.net/remediator"
//! llm_api_key = "sk-..."
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Default)]
pub struct SecretsFile {
    pub webhook_ingress_username: Option<String>,
    pub webhook_ingress_password: Option<String>,
    pub notification_webhook_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub monitoring_basic_auth: Option<String>,
    pub log_aggregator_basic_auth: Option<String>,
}

pub struct SecretsLoader {
    secrets: SecretsFile,
}

impl SecretsLoader {
    /// Loads secrets from `secrets_path`. Returns an empty loader, with a
    /// warning, if the file doesn't exist rather than failing startup.
    pub fn load(secrets_path: &Path) -> Result<Self> {
        if !secrets_path.exists() {
            warn!("secrets file not found at {:?}, ingress auth and outbound notifications will be disabled", secrets_path);
            return Ok(SecretsLoader { secrets: SecretsFile::default() });
        }

        let content = std::fs::read_to_string(secrets_path)
            .with_context(|| format!("failed to read secrets file: {:?}", secrets_path))?;
        let secrets: SecretsFile =
            toml::from_str(&content).with_context(|| format!("failed to parse secrets file: {:?}", secrets_path))?;

        info!("loaded secrets from {:?}", secrets_path);
        Ok(SecretsLoader { secrets })
    }

    pub fn webhook_ingress_credentials(&self) -> Option<(&str, &str)> {
        match (&self.secrets.webhook_ingress_username, &self.secrets.webhook_ingress_password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }

    pub fn notification_webhook_url(&self) -> &str {
        self.secrets.notification_webhook_url.as_deref().unwrap_or("")
    }

    pub fn llm_api_key(&self) -> Option<&str> {
        self.secrets.llm_api_key.as_deref()
    }

    pub fn monitoring_basic_auth(&self) -> Option<&str> {
        self.secrets.monitoring_basic_auth.as_deref()
    }

    pub fn log_aggregator_basic_auth(&self) -> Option<&str> {
        self.secrets.log_aggregator_basic_auth.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_declared_secrets() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
webhook_ingress_username = "alertmanager"
webhook_ingress_password = "hunter2"
notification_webhook_url = "https://hooks.example.net/remediator"
"#
        )
        .unwrap();

        let loader = SecretsLoader::load(file.path()).unwrap();
        assert_eq!(loader.webhook_ingress_credentials(), Some(("alertmanager", "hunter2")));
        assert_eq!(loader.notification_webhook_url(), "https://hooks.example.net/remediator");
        assert_eq!(loader.llm_api_key(), None);
    }

    #[test]
    fn missing_file_yields_empty_loader() {
        let loader = SecretsLoader::load(Path::new("/nonexistent/path/secrets.toml")).unwrap();
        assert_eq!(loader.webhook_ingress_credentials(), None);
        assert_eq!(loader.notification_webhook_url(), "");
    }
}
