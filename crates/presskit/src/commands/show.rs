//! Printing stored drafts.

use super::{draft_key, Context};
use crate::draft::PressKit;
use presskit_storage::Storage;

/// Handle `presskit show <draft>`.
pub async fn show_draft(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let storage = ctx.storage();
    let draft: Option<PressKit> = storage.read(&draft_key(name)).await?;
    match draft {
        Some(draft) => println!("{}", serde_json::to_string_pretty(&draft)?),
        None => println!("Draft not found: {name}"),
    }
    Ok(())
}
