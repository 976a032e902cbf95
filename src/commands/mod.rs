pub mod assign;
pub mod config;
pub mod users;
pub mod watermark;

use crate::Context;
use crate::config::Config;
use crate::ui;
use anyhow::{Context as _, Result};
use billing::GitHubClient;

/// Load and validate the config, printing its warnings
pub(crate) fn load_config(ctx: &Context) -> Result<Config> {
    let (config, path) = Config::load(ctx.config_path.as_deref())?;
    let warnings = config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    if !ctx.quiet {
        for warning in &warnings {
            ui::warn(warning);
        }
    }
    Ok(config)
}

/// GitHub client for a validated config
pub(crate) fn connect(config: &Config) -> Result<GitHubClient> {
    let enterprise = config
        .enterprise()
        .context("GitHub enterprise is not set")?;
    let token = config.resolve_token()?;
    let client = GitHubClient::new(enterprise, token, config.timeout())
        .with_api_base(config.github.api_base.as_str());
    log::debug!("Using {:?}", client);
    Ok(client)
}
