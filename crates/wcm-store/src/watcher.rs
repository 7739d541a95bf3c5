//! Schema directory watcher that hot-reloads edited schemas.
//!
//! Uses the `notify` crate for file system events. Every change to a
//! `<name>.yaml` file drops `name` from the registry cache before the event
//! is reported, so the next save validates against the file as it is now.

use std::path::Path;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::debug;

use wcm_core::error::{Result, WcmError};

use crate::registry::SchemaRegistry;

/// Events emitted by the schema watcher, carrying the schema name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaEvent {
    Changed(String),
    Removed(String),
}

pub struct SchemaWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::Receiver<SchemaEvent>,
}

impl SchemaWatcher {
    /// Start watching the registry's schema directory.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Io`] if the watcher cannot be created.
    pub fn start(registry: Arc<SchemaRegistry>) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let dir = registry.dir().to_path_buf();
        let watched = Arc::clone(&registry);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            for path in &event.paths {
                let Some(name) = schema_name(path) else {
                    continue;
                };
                let schema_event = match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) => SchemaEvent::Changed(name),
                    EventKind::Remove(_) => SchemaEvent::Removed(name),
                    _ => continue,
                };
                let (SchemaEvent::Changed(name) | SchemaEvent::Removed(name)) = &schema_event;
                if watched.invalidate(name).is_ok() {
                    debug!(schema = %name, "schema file changed");
                }
                let _ = tx.send(schema_event);
            }
        })
        .map_err(|e| WcmError::Io(std::io::Error::other(e)))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| WcmError::Io(std::io::Error::other(e)))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Next event, waiting at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SchemaEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Next event if one is already queued.
    pub fn try_recv(&self) -> Option<SchemaEvent> {
        self.receiver.try_recv().ok()
    }
}

fn schema_name(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.starts_with('.'))
        .map(str::to_string)
}
