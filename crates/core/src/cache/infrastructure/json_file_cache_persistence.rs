use std::fs;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::cache::domain::cache_persistence::CachePersistence;
use crate::cache::domain::highlight_cache::HighlightCacheState;

enum WriteCommand {
    Save { path: PathBuf, json: String },
    Remove { path: PathBuf },
    Flush(Sender<()>),
}

/// Stores one JSON file per project, written by a background thread.
///
/// `save` and `remove` only enqueue; write failures are logged and never
/// reach the caller.
pub struct JsonFileCachePersistence {
    dir: PathBuf,
    commands: Option<Sender<WriteCommand>>,
    writer: Option<JoinHandle<()>>,
}

impl JsonFileCachePersistence {
    pub fn new(dir: &Path) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let writer = std::thread::Builder::new()
            .name("highlight-cache-writer".to_string())
            .spawn(move || run_writer(rx));
        let writer = match writer {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Cache writer thread failed to start, persistence disabled: {e}");
                None
            }
        };
        Self {
            dir: dir.to_path_buf(),
            commands: writer.as_ref().map(|_| tx),
            writer,
        }
    }

    pub fn path_for(&self, project_id: &str) -> PathBuf {
        let safe: String = project_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.highlights.json"))
    }

    fn send(&self, command: WriteCommand) {
        if let Some(tx) = &self.commands {
            if tx.send(command).is_err() {
                log::warn!("Cache writer has stopped; dropping write");
            }
        }
    }

    /// Blocks until every queued write has been applied.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        self.send(WriteCommand::Flush(ack_tx));
        if self.commands.is_some() {
            let _ = ack_rx.recv();
        }
    }
}

fn run_writer(rx: Receiver<WriteCommand>) {
    for command in rx {
        match command {
            WriteCommand::Save { path, json } => {
                let result = path
                    .parent()
                    .map_or(Ok(()), fs::create_dir_all)
                    .and_then(|_| fs::write(&path, json));
                if let Err(e) = result {
                    log::warn!("Failed to persist highlight cache {}: {e}", path.display());
                }
            }
            WriteCommand::Remove { path } => {
                if let Err(e) = fs::remove_file(&path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        log::warn!("Failed to remove highlight cache {}: {e}", path.display());
                    }
                }
            }
            WriteCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

impl CachePersistence for JsonFileCachePersistence {
    fn load(
        &self,
        project_id: &str,
    ) -> Result<Option<HighlightCacheState>, Box<dyn std::error::Error + Send + Sync>> {
        self.flush();
        let path = self.path_for(project_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn save(&self, project_id: &str, state: &HighlightCacheState) {
        match serde_json::to_string(state) {
            Ok(json) => self.send(WriteCommand::Save {
                path: self.path_for(project_id),
                json,
            }),
            Err(e) => log::warn!("Failed to serialize highlight cache for {project_id}: {e}"),
        }
    }

    fn remove(&self, project_id: &str) {
        self.send(WriteCommand::Remove {
            path: self.path_for(project_id),
        });
    }
}

impl Drop for JsonFileCachePersistence {
    fn drop(&mut self) {
        // Closing the channel lets the writer drain and exit.
        self.commands.take();
        if let Some(handle) = self.writer.take() {
            let _ = handle.join();
        }
    }
}
