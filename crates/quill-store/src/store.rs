//! Store lifecycle and readiness.
//!
//! [`Store::open`] returns immediately with the connection established but
//! the schema not yet created; a background task runs the bootstrap from
//! [`crate::schema`] and publishes the outcome on a `tokio::sync::watch`
//! channel.  Message and session operations run against the connection
//! directly (those tables are needed at construction-adjacent call sites);
//! the pre-key operations in [`crate::keys`] call [`Store::wait_ready`]
//! first and suspend until bootstrap finishes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use rusqlite::Connection;
use tokio::sync::{watch, Mutex};

use crate::error::{Result, StoreError};
use crate::schema;

/// Bootstrap state machine.
///
/// `Initializing` is the state at open; it transitions exactly once, to
/// `Ready` on success or `Failed` on error.  `Failed` is terminal — the
/// store instance must be recreated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Initializing,
    Ready,
    Failed(String),
}

pub(crate) struct StoreInner {
    /// The single shared connection.  `None` once [`Store::close`] has run;
    /// bootstrap observes the emptied slot and fails instead of recreating
    /// tables on a dead handle.
    pub(crate) conn: Mutex<Option<Connection>>,
    pub(crate) readiness: watch::Sender<Readiness>,
}

/// Handle to the local message/session/key database.
///
/// Cheap to clone; all clones share one connection.
#[derive(Clone)]
pub struct Store {
    pub(crate) inner: Arc<StoreInner>,
}

impl Store {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data
    /// directory:
    /// - Linux:   `~/.local/share/quill/quill.db`
    /// - macOS:   `~/Library/Application Support/im.quill.quill/quill.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\quill\quill\data\quill.db`
    pub fn open_default() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("im", "quill", "quill").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Self::open(data_dir.join("quill.db"))
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// Returns before the schema exists: bootstrap runs on a background
    /// task, so this must be called from within a Tokio runtime.  The
    /// special path `":memory:"` opens an ephemeral in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "opening database");

        let conn = Connection::open(path)?;

        // Recommended SQLite settings.
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let (readiness, _) = watch::channel(Readiness::Initializing);
        let inner = Arc::new(StoreInner {
            conn: Mutex::new(Some(conn)),
            readiness,
        });

        tokio::spawn(bootstrap(Arc::clone(&inner)));

        Ok(Self { inner })
    }

    /// Open an ephemeral in-memory database (tests, previews).
    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Current bootstrap state.
    pub fn readiness(&self) -> Readiness {
        self.inner.readiness.borrow().clone()
    }

    /// Subscribe to bootstrap state changes.
    ///
    /// Replaces ad hoc polling for callers that want to observe the ready
    /// (or failed) transition without issuing an operation.
    pub fn subscribe(&self) -> watch::Receiver<Readiness> {
        self.inner.readiness.subscribe()
    }

    /// Suspend until bootstrap has finished.
    ///
    /// Resolves `Ok(())` once the store is ready and
    /// `Err(StoreError::Bootstrap)` if schema creation failed, rather than
    /// hanging callers on a store that will never become usable.
    pub async fn wait_ready(&self) -> Result<()> {
        let mut rx = self.inner.readiness.subscribe();
        loop {
            let state = rx.borrow_and_update().clone();
            match state {
                Readiness::Ready => return Ok(()),
                Readiness::Failed(reason) => return Err(StoreError::Bootstrap(reason)),
                Readiness::Initializing => {}
            }
            if rx.changed().await.is_err() {
                return Err(StoreError::Closed);
            }
        }
    }

    /// Close the underlying connection.
    ///
    /// Idempotent, and safe to call while bootstrap is still in flight.  On
    /// a failed close the handle is put back so the error is retryable.
    pub async fn close(&self) -> Result<()> {
        let mut guard = self.inner.conn.lock().await;
        match guard.take() {
            Some(conn) => {
                tracing::info!("closing database");
                if let Err((conn, err)) = conn.close() {
                    *guard = Some(conn);
                    return Err(err.into());
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Filesystem path of the open database, if it is file-backed.
    pub async fn path(&self) -> Option<PathBuf> {
        let guard = self.inner.conn.lock().await;
        guard
            .as_ref()
            .and_then(|conn| conn.path())
            .map(PathBuf::from)
    }
}

/// Background schema bootstrap.
///
/// Holds the connection lock for the whole pass so `close()` cannot slip in
/// between table creation and the sanity read.
async fn bootstrap(inner: Arc<StoreInner>) {
    tracing::info!("initializing database tables");

    let result = {
        let guard = inner.conn.lock().await;
        match guard.as_ref() {
            Some(conn) => schema::create_tables(conn)
                .and_then(|_| schema::sanity_check(conn))
                .map_err(StoreError::from),
            None => Err(StoreError::Closed),
        }
    };

    match result {
        Ok(()) => {
            tracing::info!("database ready");
            inner.readiness.send_replace(Readiness::Ready);
        }
        Err(err) => {
            tracing::error!(%err, "schema bootstrap failed");
            inner.readiness.send_replace(Readiness::Failed(err.to_string()));
        }
    }
}
