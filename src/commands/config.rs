//! `ccsync config`

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::{Config, cost_center_url, write_example};
use crate::{paths, ui};
use anyhow::Result;
use assignment::is_placeholder;
use std::path::PathBuf;

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Init { force } => init(ctx, force),
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => {
            println!("{}", config_path(ctx)?.display());
            Ok(())
        }
    }
}

fn config_path(ctx: &Context) -> Result<PathBuf> {
    match &ctx.config_path {
        Some(path) => Ok(path.clone()),
        None => paths::config_file(),
    }
}

fn init(ctx: &Context, force: bool) -> Result<()> {
    let path = config_path(ctx)?;
    write_example(&path, force)?;
    ui::success(&format!("Wrote {}", path.display()));
    ui::dim("Set [github].enterprise and the exception users, then run `ccsync assign`.");
    Ok(())
}

fn show(ctx: &Context) -> Result<()> {
    let (config, path) = Config::load(ctx.config_path.as_deref())?;

    ui::header("Configuration");
    ui::kv(
        "File",
        &format!(
            "{}{}",
            path.display(),
            if path.exists() { "" } else { " (not found, using defaults)" }
        ),
    );
    ui::kv("Watermark", &config.watermark_path()?.display().to_string());
    println!();
    print!("{}", config.redacted().to_toml()?);

    if let Some(enterprise) = config.enterprise() {
        let cc = &config.cost_centers;
        let ids = [
            (&cc.no_pru_name, &cc.no_prus_cost_center),
            (&cc.pru_allowed_name, &cc.prus_allowed_cost_center),
        ];
        if ids.iter().any(|(_, id)| !is_placeholder(id)) {
            ui::section("Cost center links");
            for (name, id) in ids {
                if !is_placeholder(id) {
                    ui::kv(name, &cost_center_url(enterprise, id.trim()));
                }
            }
        }
    }

    println!();
    match config.validate() {
        Ok(warnings) if warnings.is_empty() => ui::success("Configuration is valid"),
        Ok(warnings) => {
            for warning in &warnings {
                ui::warn(warning);
            }
        }
        Err(e) => ui::error(&e.to_string()),
    }
    Ok(())
}
