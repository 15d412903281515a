//! Printing notifications and state changes.

use presskit_autosave::{Bus, SaveState, Severity, Toast};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

pub fn format_toast(toast: &Toast) -> String {
    let marker = match toast.severity {
        Severity::Success => "ok",
        Severity::Info => "info",
        Severity::Warning => "warn",
        Severity::Error => "error",
    };
    format!("[{marker}] {}: {}", toast.title, toast.description)
}

/// Print toasts from the bus, and the status line whenever `states` changes.
///
/// Ends once the coordinator behind `states` is gone.
pub fn spawn_printer(
    bus: &Bus,
    mut states: Option<watch::Receiver<SaveState>>,
) -> JoinHandle<()> {
    let mut toasts = bus.subscribe::<Toast>();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                toast = toasts.recv() => match toast {
                    Ok(toast) => println!("{}", format_toast(&toast)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "Toast printer lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                changed = state_changed(&mut states) => {
                    let Some(rx) = states.as_mut().filter(|_| changed) else {
                        drain(&mut toasts);
                        break;
                    };
                    println!("  {}", rx.borrow_and_update().status_line());
                }
            }
        }
    })
}

async fn state_changed(states: &mut Option<watch::Receiver<SaveState>>) -> bool {
    match states {
        Some(rx) => rx.changed().await.is_ok(),
        None => std::future::pending().await,
    }
}

fn drain(toasts: &mut broadcast::Receiver<Toast>) {
    while let Ok(toast) = toasts.try_recv() {
        println!("{}", format_toast(&toast));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_toast() {
        assert_eq!(
            format_toast(&Toast::retrying(1, 3)),
            "[warn] Save failed: Retrying... (attempt 1 of 3)"
        );
        assert_eq!(
            format_toast(&Toast::saved()),
            "[ok] Saved: Your changes have been saved."
        );
    }
}
