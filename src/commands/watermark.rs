//! `ccsync watermark`

use crate::Context;
use crate::cli::WatermarkCommand;
use crate::config::Config;
use crate::ui;
use anyhow::Result;
use assignment::FileWatermarkStore;

pub fn run(ctx: &Context, cmd: WatermarkCommand) -> Result<()> {
    // The watermark location doesn't need a valid enterprise or token
    let (config, _) = Config::load(ctx.config_path.as_deref())?;
    let store = FileWatermarkStore::new(config.watermark_path()?);

    match cmd {
        WatermarkCommand::Show => show(&store),
        WatermarkCommand::Clear => clear(&store),
    }
}

fn show(store: &FileWatermarkStore) -> Result<()> {
    ui::header("Watermark");
    ui::kv("Path", &store.path().display().to_string());

    match store.load()? {
        Some(watermark) => {
            ui::kv(
                "Last run",
                &ui::format_timestamp(Some(watermark.last_run_timestamp)),
            );
            ui::kv("Saved at", &ui::format_timestamp(Some(watermark.updated_at)));
            ui::dim("Incremental runs only process seats created after the last run.");
        }
        None => ui::info("No watermark yet; the next incremental run processes every seat"),
    }
    Ok(())
}

fn clear(store: &FileWatermarkStore) -> Result<()> {
    if store.clear()? {
        ui::success(&format!("Removed {}", store.path().display()));
    } else {
        ui::info("No watermark to remove");
    }
    Ok(())
}
