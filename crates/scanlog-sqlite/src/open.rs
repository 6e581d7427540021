use crate::models::parse_stamp;
use crate::schema::MIG_0001_INIT;
use anyhow::Result as AnyResult;
use rusqlite::{Connection, OptionalExtension};
use shield_core::{Result, ScanError};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use time::OffsetDateTime;

pub(crate) struct Inner {
    pub(crate) conn: Connection,
    /// Last timestamp handed out; appends never go below it.
    pub(crate) last_stamp: Option<OffsetDateTime>,
}

/// Handle to the scan log. Writes through one handle are serialized by the
/// mutex; separate handles on the same file are serialized by SQLite.
pub struct Db {
    path: Option<PathBuf>,
    state: Mutex<Option<Inner>>,
}

impl Db {
    /// Open (creating file and schema as needed) and fail early if that is not possible.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let db = Db::deferred(path);
        db.with_inner(|_| Ok::<_, ScanError>(()))?;
        Ok(db)
    }

    /// Handle that opens the file on first use; every call fails with
    /// `StoreUnavailable` until the file can be opened.
    pub fn deferred(path: impl AsRef<Path>) -> Self {
        Db { path: Some(path.as_ref().to_path_buf()), state: Mutex::new(None) }
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Db { path: None, state: Mutex::new(None) };
        db.with_inner(|_| Ok::<_, ScanError>(()))?;
        Ok(db)
    }

    pub(crate) fn with_inner<T, E, F>(&self, f: F) -> Result<T>
    where
        E: Display,
        F: FnOnce(&mut Inner) -> std::result::Result<T, E>,
    {
        let mut guard = self.state.lock().map_err(|_| ScanError::store("scan log lock poisoned"))?;
        if guard.is_none() {
            let inner = connect(self.path.as_deref()).map_err(|e| {
                tracing::warn!(path = ?self.path, error = %e, "failed to open scan log");
                ScanError::store(format!("{e:#}"))
            })?;
            *guard = Some(inner);
        }
        let inner = guard.as_mut().ok_or_else(|| ScanError::store("scan log not open"))?;
        f(inner).map_err(|e| ScanError::store(e.to_string()))
    }
}

fn connect(path: Option<&Path>) -> AnyResult<Inner> {
    let conn = match path {
        Some(p) => {
            if let Some(dir) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            Connection::open(p)?
        }
        None => Connection::open_in_memory()?,
    };
    apply_pragmas(&conn)?;
    migrate(&conn)?;
    let last_stamp = last_stamp(&conn)?;
    tracing::debug!(path = ?path, "scan log ready");
    Ok(Inner { conn, last_stamp })
}

fn apply_pragmas(conn: &Connection) -> AnyResult<()> {
    conn.pragma_update(None, "journal_mode", &"WAL")?;
    // FULL so an append is on disk once it returns
    conn.pragma_update(None, "synchronous", &"FULL")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}

fn migrate(conn: &Connection) -> AnyResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name='scans'",
        [],
        |r| r.get(0),
    )?;
    if exists == 0 {
        conn.execute_batch(MIG_0001_INIT)?;
    }
    Ok(())
}

fn last_stamp(conn: &Connection) -> AnyResult<Option<OffsetDateTime>> {
    let ts: Option<Option<String>> = conn
        .query_row("SELECT timestamp FROM scans ORDER BY id DESC LIMIT 1", [], |r| r.get(0))
        .optional()?;
    // legacy rows may use another timestamp layout; those are ignored
    Ok(ts.flatten().and_then(|s| parse_stamp(&s)))
}
