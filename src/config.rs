use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::enricher::Priority;
use crate::webhook::Deployment;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ForwarderConfig {
    pub secret_id: String,
    pub default_priority: Priority,
    pub dry_run: bool,
    pub deployment_name: String,
    pub deployment_description: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct Config {
    forwarder: ForwarderConfig,
}

impl ForwarderConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading {}", path.as_ref().display()))?;
        let config: Config = toml::from_str(&contents)?;
        config.forwarder.check_timeout()?;
        Ok(config.forwarder)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secret_id) = var("SECRET_ARN") {
            config.secret_id = secret_id;
        }
        if let Some(priority) = var("DEFAULT_PRIORITY").filter(|p| !p.trim().is_empty()) {
            config.default_priority = priority
                .parse()
                .map_err(|e: String| anyhow::anyhow!("DEFAULT_PRIORITY: {}", e))?;
        }
        if let Some(dry_run) = var("DRY_RUN") {
            config.dry_run = matches!(dry_run.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Some(name) = var("DEPLOYMENT_NAME") {
            config.deployment_name = name;
        }
        if let Some(description) = var("DEPLOYMENT_DESCRIPTION") {
            config.deployment_description = description;
        }
        if let Some(timeout) = var("WEBHOOK_TIMEOUT_SECS") {
            config.request_timeout_secs = timeout
                .trim()
                .parse()
                .with_context(|| format!("WEBHOOK_TIMEOUT_SECS: invalid value '{}'", timeout))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.check_timeout()?;
        if !self.dry_run && self.secret_id.trim().is_empty() {
            bail!("SECRET_ARN must be set unless DRY_RUN is enabled");
        }
        Ok(())
    }

    fn check_timeout(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            bail!("webhook request timeout must be at least one second");
        }
        Ok(())
    }

    pub fn deployment(&self) -> Deployment {
        Deployment {
            name: self.deployment_name.clone(),
            description: self.deployment_description.clone(),
        }
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            secret_id: String::new(),
            default_priority: Priority::Medium,
            dry_run: false,
            deployment_name: String::new(),
            deployment_description: String::new(),
            request_timeout_secs: 30,
        }
    }
}
