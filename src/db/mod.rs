use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod helpers;
mod migrations;
pub mod models;
mod repositories;

use migrations::run_migrations;

pub use models::{AttendanceRecord, AttendanceSummary};

const IN_MEMORY: &str = ":memory:";

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DatabaseInner {
    /// Stops the worker thread. Returns false if it was already stopped.
    fn shutdown(&self) -> Result<bool> {
        let handle = {
            let mut guard = match self.worker.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.take()
        };

        let Some(handle) = handle else {
            return Ok(false);
        };

        if let Err(err) = self.sender.send(DbCommand::Shutdown) {
            error!("Failed to send shutdown to DB thread: {err}");
        }
        handle
            .join()
            .map_err(|join_err| anyhow!("failed to join DB thread: {join_err:?}"))?;
        Ok(true)
    }
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!("{err:#}");
        }
    }
}

/// Handle to the attendance database.
///
/// The SQLite connection lives on a dedicated thread; every query is shipped
/// there as a closure and the answer comes back over a oneshot channel, so the
/// handle is cheap to clone into the scanner loop and the HTTP server alike.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let in_memory = db_path.as_os_str() == IN_MEMORY;
        if !in_memory {
            if let Some(parent) = db_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory {}", parent.display())
                })?;
            }
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("attendance-db".into())
            .spawn(move || {
                let opened = if in_memory {
                    Connection::open_in_memory()
                } else {
                    Connection::open(&path_for_thread)
                };
                let mut conn = match opened {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if !in_memory {
                    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                        error!("Failed to enable WAL mode: {err}");
                    }
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    /// Private, non-persistent database. Each call gets its own.
    pub fn in_memory() -> Result<Self> {
        Self::new(PathBuf::from(IN_MEMORY))
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    /// Flushes and closes the connection for every clone of this handle.
    /// Later queries fail; closing again is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.inner.shutdown()? {
            info!("Database at {} closed", self.db_path.display());
        }
        Ok(())
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|_| anyhow!("database is closed"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }
}
