//! Single-field editing: every input line is a commit-key press.

use super::output::spawn_printer;
use super::{draft_key, Context};
use crate::draft::PressKit;
use futures::StreamExt;
use presskit_autosave::{persist_fn, Bus, FieldAutoSave, Key, KeyPress, Persist, PersistError};
use presskit_storage::{JsonStorage, Storage};
use std::sync::Arc;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, info};

/// Persist one field by rewriting the stored draft.
fn field_persist(storage: Arc<JsonStorage>, name: &str, field: &str) -> Arc<dyn Persist<String>> {
    let name = name.to_string();
    let field = field.to_string();

    Arc::new(persist_fn(move |value: String| {
        let storage = Arc::clone(&storage);
        let name = name.clone();
        let field = field.clone();
        async move {
            let key = draft_key(&name);
            let mut draft: PressKit = storage.read(&key).await?.unwrap_or_default();
            draft
                .set(&field, &value)
                .map_err(|e| PersistError::with_source("invalid field", e))?;
            storage.write(&key, &draft).await?;
            Ok::<(), PersistError>(())
        }
    }))
}

/// Handle `presskit field <draft> <field>`.
pub async fn handle_field(ctx: &Context, name: &str, field: &str) -> anyhow::Result<()> {
    PressKit::scalar_field(field)?;

    let bus = Bus::new();
    let autosave = FieldAutoSave::builder(field_persist(ctx.storage(), name, field))
        .config(&ctx.autosave)
        .notifier(Arc::new(bus.clone()))
        .label(format!("{name}.{field}"))
        .spawn();
    let printer = spawn_printer(&bus, None);
    let mut state = autosave.subscribe();

    info!(draft = name, field, "Editing field");
    println!("Editing {field} of {name}, each line is saved on enter");

    let mut lines = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    let enter = KeyPress::new(Key::Enter);
    while let Some(line) = lines.next().await {
        autosave.handle_key(&enter, &line?)?;

        let done = state.wait_for(|s| !s.is_saving).await?;
        if done.show_success {
            println!("  Saved");
        }
    }

    autosave.shutdown().await;
    drop(bus);
    if let Err(e) = printer.await {
        debug!(error = %e, "Printer task failed");
    }
    Ok(())
}
