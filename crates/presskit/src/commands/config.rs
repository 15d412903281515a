//! Printing the effective configuration.

use super::Context;

/// Handle `presskit config`.
pub fn show_config(ctx: &Context) -> anyhow::Result<()> {
    println!("Configuration sources:");
    if ctx.sources.is_empty() {
        println!("  (none)");
    } else {
        for source in &ctx.sources {
            println!("  {}", source.display());
        }
    }
    println!();

    println!("Data directory: {}", ctx.data_dir.display());
    println!(
        "Drafts directory: {}",
        presskit_util::path::drafts_dir(&ctx.data_dir).display()
    );
    if let Some(level) = &ctx.config.log_level {
        println!("Log level: {level}");
    }
    println!();

    println!("Auto-save:");
    println!("{}", serde_json::to_string_pretty(&ctx.autosave)?);
    Ok(())
}
