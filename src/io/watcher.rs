use std::ffi::OsString;
use std::path::Path;
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::store::{ChangeEvent, Subscription};

/// Watch the data directory and emit a [`ChangeEvent`] whenever an event
/// names a path whose file name equals the store file's. Events for any other
/// name in the directory, lock and temp files included, are dropped.
pub fn watch_store_file(data_dir: &Path, store_file: &Path) -> Result<Subscription, notify::Error> {
    let (tx, rx) = mpsc::channel();
    let file_name: Option<OsString> = store_file.file_name().map(|n| n.to_os_string());

    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| {
            let event = match result {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(error = %e, "store watcher error");
                    return;
                }
            };

            match event.kind {
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                _ => return,
            }

            let relevant = event
                .paths
                .iter()
                .any(|p| p.file_name() == file_name.as_deref());
            if relevant {
                let _ = tx.send(ChangeEvent);
            }
        },
        Config::default(),
    )?;

    watcher.watch(data_dir, RecursiveMode::NonRecursive)?;
    Ok(Subscription::with_guard(rx, Box::new(watcher)))
}
