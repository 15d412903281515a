//! Line-oriented draft editing with document auto-save.
//!
//! Every `set` produces a new snapshot for the coordinator, so typing several
//! edits in quick succession results in a single write. On `quit` (or end of
//! input) outstanding changes are saved before exiting.

use super::output::spawn_printer;
use super::{draft_key, Context};
use crate::draft::{PressKit, FIELDS};
use anyhow::bail;
use futures::StreamExt;
use presskit_autosave::{Bus, DocumentAutoSave, Persist, SavePhase, StoragePersist};
use presskit_storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, info, warn};

/// How long `quit` waits for outstanding changes to be written.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(60);

/// A line typed into the editor.
#[derive(Debug, PartialEq, Eq)]
pub enum EditCommand {
    Set { field: String, value: String },
    Save,
    Status,
    Enable,
    Disable,
    Help,
    Quit,
}

impl EditCommand {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = split_word(line);

        let command = match verb {
            "set" => {
                let (field, value) = split_word(rest);
                if field.is_empty() {
                    bail!("Usage: set <field> <value>");
                }
                Self::Set {
                    field: field.to_string(),
                    value: value.to_string(),
                }
            }
            "save" => Self::Save,
            "status" => Self::Status,
            "enable" => Self::Enable,
            "disable" => Self::Disable,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => bail!("Unknown command: {other} (try help)"),
        };
        Ok(Some(command))
    }
}

fn split_word(s: &str) -> (&str, &str) {
    s.split_once(char::is_whitespace)
        .map_or((s, ""), |(word, rest)| (word, rest.trim()))
}

/// Handle `presskit edit <draft>`.
pub async fn handle_edit(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let storage = ctx.storage();
    let key = draft_key(name);
    let mut draft: PressKit = storage.read(&key).await?.unwrap_or_default();

    let bus = Bus::new();
    let persist: Arc<dyn Persist<PressKit>> =
        Arc::new(StoragePersist::new(Arc::clone(&storage), &key));
    let mut autosave = DocumentAutoSave::builder(persist)
        .config(ctx.autosave.clone())
        .notifier(Arc::new(bus.clone()))
        .label(name)
        .spawn();
    autosave.update(draft.clone())?;
    let printer = spawn_printer(&bus, Some(autosave.subscribe()));

    info!(draft = name, coordinator = autosave.id(), "Editing draft");
    println!("Editing {name} (type help for commands)");

    let mut lines = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    while let Some(line) = lines.next().await {
        let command = match EditCommand::parse(&line?) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        match command {
            EditCommand::Set { field, value } => {
                if let Err(e) = draft.set(&field, &value) {
                    eprintln!("{e}");
                    continue;
                }
                if !autosave.update(draft.clone())? {
                    println!("  No changes");
                }
            }
            EditCommand::Save => autosave.trigger_save()?,
            EditCommand::Status => println!("{}", autosave.state().status_line()),
            EditCommand::Enable => autosave.set_enabled(true)?,
            EditCommand::Disable => autosave.set_enabled(false)?,
            EditCommand::Help => print_help(),
            EditCommand::Quit => break,
        }
    }

    let saved = match timeout(FLUSH_TIMEOUT, save_outstanding(&autosave)).await {
        Ok(result) => result?,
        Err(_) => false,
    };
    if !saved {
        warn!(draft = name, "Exiting with unsaved changes");
        eprintln!("Warning: {name} has unsaved changes");
    }

    autosave.shutdown().await;
    drop(bus);
    if let Err(e) = printer.await {
        debug!(error = %e, "Printer task failed");
    }
    Ok(())
}

/// Save until the stored draft matches the latest snapshot.
///
/// Returns `false` if a save failed for good.
async fn save_outstanding(autosave: &DocumentAutoSave<PressKit>) -> anyhow::Result<bool> {
    let mut rx = autosave.subscribe();
    loop {
        if !rx.borrow().has_unsaved_changes {
            return Ok(true);
        }
        autosave.trigger_save()?;
        rx.wait_for(|s| s.is_saving || !s.has_unsaved_changes)
            .await?;
        let phase = rx.wait_for(|s| !s.is_saving).await?.phase;

        // A success can still leave changes behind if the draft was edited
        // while the write was running.
        if phase != SavePhase::Succeeded {
            return Ok(!rx.borrow().has_unsaved_changes);
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  set <field> <value>  fields: {}", FIELDS.join(", "));
    println!("                       links take name=url, an empty url removes it");
    println!("  save                 save now");
    println!("  status               show the save status");
    println!("  enable | disable     toggle auto-save");
    println!("  quit                 save outstanding changes and exit");
}
