//! ccsync configuration file
//!
//! TOML with three sections. Every key is optional; `GITHUB_TOKEN` and
//! `GITHUB_ENTERPRISE` override the file.
//!
//! ```toml
//! [github]
//! enterprise = "acme"
//!
//! [cost_centers]
//! no_pru_name = "00 - No PRU overages"
//! prus_exception_users = ["octocat"]
//! ```

use crate::paths;
use anyhow::{Context, Result, bail};
use assignment::{
    CostCenterSpec, CostCenterSpecs, DEFAULT_BATCH_SIZE, ExceptionSet, MAX_BATCH_SIZE, Role,
    is_placeholder,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Enterprise slugs shipped in example configs
const PLACEHOLDER_ENTERPRISES: &[&str] = &["REPLACE_WITH_ENTERPRISE_SLUG", "your_enterprise_name"];

pub const ENV_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_ENTERPRISE: &str = "GITHUB_ENTERPRISE";

/// Example written by `ccsync config init`
pub const EXAMPLE_CONFIG: &str = r#"# ccsync configuration

[github]
# Enterprise slug, as in https://github.com/enterprises/<slug>
# GITHUB_ENTERPRISE overrides this value.
enterprise = "REPLACE_WITH_ENTERPRISE_SLUG"
# Prefer the GITHUB_TOKEN environment variable over storing a token here.
# token = "ghp_..."
api_base = "https://api.github.com"
timeout_secs = 30

[cost_centers]
# Real cost center ids. Leave the placeholders to look cost centers up by name.
no_prus_cost_center = "CC-001-NO-PRUS"
prus_allowed_cost_center = "CC-002-PRUS-ALLOWED"
no_pru_name = "00 - No PRU overages"
pru_allowed_name = "01 - PRU overages allowed"
# Create missing cost centers on apply (same as --create-cost-centers)
auto_create = false
# Users allowed to incur premium request overages
prus_exception_users = []
# Users per assignment call (1-50)
batch_size = 50

[state]
# Defaults to <state dir>/last_run.json
# watermark_file = "~/.local/state/ccsync/last_run.json"
"#;

// ============================================================================
// Schema
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub cost_centers: CostCentersConfig,

    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    pub api_base: String,

    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            enterprise: None,
            token: None,
            api_base: billing::DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CostCentersConfig {
    pub no_prus_cost_center: String,
    pub prus_allowed_cost_center: String,
    pub no_pru_name: String,
    pub pru_allowed_name: String,
    pub auto_create: bool,
    pub prus_exception_users: Vec<String>,
    pub batch_size: usize,
}

impl Default for CostCentersConfig {
    fn default() -> Self {
        Self {
            no_prus_cost_center: "CC-001-NO-PRUS".to_string(),
            prus_allowed_cost_center: "CC-002-PRUS-ALLOWED".to_string(),
            no_pru_name: "00 - No PRU overages".to_string(),
            pru_allowed_name: "01 - PRU overages allowed".to_string(),
            auto_create: false,
            prus_exception_users: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE.get(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermark_file: Option<String>,
}

/// Problems that make a config unusable
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GitHub enterprise is not set (config [github].enterprise or GITHUB_ENTERPRISE)")]
    MissingEnterprise,

    #[error("batch_size must be between 1 and 50, got {0}")]
    BatchSize(usize),

    #[error("both cost centers are named '{0}'")]
    SameNames(String),

    #[error("both cost centers use id '{0}'")]
    SameIds(String),
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load from `explicit`, or the default path, then apply env overrides
    ///
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, PathBuf)> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (paths::config_file()?, false),
        };

        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else if required {
            bail!("Config file not found: {}", path.display());
        } else {
            log::warn!(
                "No config file at {}; using defaults (run `ccsync config init`)",
                path.display()
            );
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok((config, path))
    }

    /// Parse a config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(ENV_TOKEN).filter(|t| !t.trim().is_empty()) {
            log::debug!("Using token from {}", ENV_TOKEN);
            self.github.token = Some(token);
        }
        if let Some(enterprise) = lookup(ENV_ENTERPRISE).filter(|e| !e.trim().is_empty()) {
            log::debug!("Using enterprise from {}", ENV_ENTERPRISE);
            self.github.enterprise = Some(enterprise);
        }
    }

    /// Check the config, returning non-fatal warnings
    pub fn validate(&self) -> std::result::Result<Vec<String>, ConfigError> {
        if self.enterprise().is_none() {
            return Err(ConfigError::MissingEnterprise);
        }

        let cc = &self.cost_centers;
        if cc.batch_size == 0 || cc.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::BatchSize(cc.batch_size));
        }
        if cc.no_pru_name.trim() == cc.pru_allowed_name.trim() {
            return Err(ConfigError::SameNames(cc.no_pru_name.clone()));
        }
        if !is_placeholder(&cc.no_prus_cost_center)
            && cc.no_prus_cost_center.trim() == cc.prus_allowed_cost_center.trim()
        {
            return Err(ConfigError::SameIds(cc.no_prus_cost_center.clone()));
        }

        let mut warnings = Vec::new();
        if !cc.auto_create {
            for (id, name) in [
                (&cc.no_prus_cost_center, &cc.no_pru_name),
                (&cc.prus_allowed_cost_center, &cc.pru_allowed_name),
            ] {
                if is_placeholder(id) {
                    warnings.push(format!(
                        "Cost center id '{}' is a placeholder; '{}' will be looked up by name",
                        id, name
                    ));
                }
            }
        }
        if cc.prus_exception_users.is_empty() {
            log::info!("No PRU exception users configured; every user goes to '{}'", cc.no_pru_name);
        }
        Ok(warnings)
    }

    /// Enterprise slug, ignoring placeholders
    pub fn enterprise(&self) -> Option<&str> {
        self.github
            .enterprise
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty() && !PLACEHOLDER_ENTERPRISES.contains(e))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.github.timeout_secs)
    }

    /// Token from config/env, else a hidden prompt when someone is at the terminal
    pub fn resolve_token(&self) -> Result<String> {
        if let Some(token) = self.github.token.as_deref().filter(|t| !t.trim().is_empty()) {
            return Ok(token.trim().to_string());
        }

        if !console::user_attended() {
            bail!(
                "No GitHub token: set {} or [github].token in the config file",
                ENV_TOKEN
            );
        }

        let token: String = dialoguer::Password::new()
            .with_prompt("GitHub token (manage_billing:enterprise)")
            .interact()
            .context("Failed to read token")?;
        if token.trim().is_empty() {
            bail!("No GitHub token provided");
        }
        Ok(token.trim().to_string())
    }

    /// Cost center specs for the engine
    pub fn specs(&self) -> CostCenterSpecs {
        let cc = &self.cost_centers;
        let spec = |role, id: &str, name: &str| CostCenterSpec {
            role,
            configured_id: Some(id.trim().to_string()).filter(|id| !id.is_empty()),
            display_name: name.trim().to_string(),
            auto_create: cc.auto_create,
        };
        CostCenterSpecs {
            no_pru: spec(Role::NoPru, &cc.no_prus_cost_center, &cc.no_pru_name),
            pru_allowed: spec(
                Role::PruAllowed,
                &cc.prus_allowed_cost_center,
                &cc.pru_allowed_name,
            ),
        }
    }

    pub fn exceptions(&self) -> ExceptionSet {
        ExceptionSet::new(
            self.cost_centers
                .prus_exception_users
                .iter()
                .map(|u| u.trim())
                .filter(|u| !u.is_empty()),
        )
    }

    pub fn batch_size(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cost_centers.batch_size.min(MAX_BATCH_SIZE))
            .unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Watermark location: configured path, else the state directory
    pub fn watermark_path(&self) -> Result<PathBuf> {
        match self.state.watermark_file.as_deref() {
            Some(path) if !path.trim().is_empty() => Ok(paths::expand(path.trim())),
            _ => paths::watermark_file(),
        }
    }

    /// Copy safe to print
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.github.token.is_some() {
            copy.github.token = Some("********".to_string());
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

/// Browser URL of a cost center
pub fn cost_center_url(enterprise: &str, id: &str) -> String {
    format!("https://github.com/enterprises/{enterprise}/billing/cost_centers/{id}")
}

/// Write the example config, refusing to overwrite unless `force`
pub fn write_example(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Could not create {}", dir.display()))?;
    }
    fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Could not write {}", path.display()))
}

// ============================================================================
// Tests
// ============================================================================
