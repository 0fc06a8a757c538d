//! Durable token lists shared by every worker process
//!
//! Each [`TokenKind`] lives in its own file as a JSON array of strings. Writers
//! take an exclusive advisory lock on a sibling `<file>.lock`, write the full
//! list to a temp file in the same directory and rename it over the original,
//! so readers (which never lock) see either the old or the new list.

use crate::config::LifecycleConfig;
use crate::error::PersistenceError;
use crate::store::TokenKind;
use fs2::FileExt;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(20);

pub struct DurablePersistence {
    revoked_path: PathBuf,
    expired_path: PathBuf,
    lock_timeout: Duration,
    // Serializes writers of the same file within this process
    revoked_writer: Mutex<()>,
    expired_writer: Mutex<()>,
}

impl DurablePersistence {
    pub fn new(
        revoked_path: impl Into<PathBuf>,
        expired_path: impl Into<PathBuf>,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            revoked_path: revoked_path.into(),
            expired_path: expired_path.into(),
            lock_timeout,
            revoked_writer: Mutex::new(()),
            expired_writer: Mutex::new(()),
        }
    }

    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self::new(
            config.revoked_list_path.clone(),
            config.expired_list_path.clone(),
            config.lock_timeout(),
        )
    }

    pub fn path(&self, kind: TokenKind) -> &Path {
        match kind {
            TokenKind::Revoked => &self.revoked_path,
            TokenKind::Expired => &self.expired_path,
        }
    }

    fn writer(&self, kind: TokenKind) -> &Mutex<()> {
        match kind {
            TokenKind::Revoked => &self.revoked_writer,
            TokenKind::Expired => &self.expired_writer,
        }
    }

    /// Read one token list. Never fails: a missing, unreadable or malformed
    /// file yields an empty set.
    pub async fn load(&self, kind: TokenKind) -> HashSet<String> {
        let path = self.path(kind).to_path_buf();
        let task_path = path.clone();

        match tokio::task::spawn_blocking(move || read_token_file(&task_path)).await {
            Ok(Ok(Some(tokens))) => {
                debug!(kind = %kind, count = tokens.len(), "Loaded persisted token list");
                tokens
            }
            Ok(Ok(None)) => {
                info!(kind = %kind, path = %path.display(), "No persisted token list yet, starting empty");
                HashSet::new()
            }
            Ok(Err(e)) => {
                error!(kind = %kind, error = %e, "Failed to load persisted token list, starting empty");
                crate::metrics::record_persistence_failure(kind, "load");
                HashSet::new()
            }
            Err(e) => {
                error!(kind = %kind, error = %e, "Token list load task failed, starting empty");
                crate::metrics::record_persistence_failure(kind, "load");
                HashSet::new()
            }
        }
    }

    /// Replace the persisted list with `tokens`
    pub async fn save(
        &self,
        kind: TokenKind,
        tokens: HashSet<String>,
    ) -> Result<(), PersistenceError> {
        let _writer = self.writer(kind).lock().await;
        let path = self.path(kind).to_path_buf();
        let timeout = self.lock_timeout;

        tokio::task::spawn_blocking(move || {
            with_file_lock(&path, timeout, || write_token_file(&path, &tokens))
        })
        .await
        .map_err(|e| PersistenceError::Task(e.to_string()))??;

        debug!(kind = %kind, "Persisted token list");
        Ok(())
    }

    /// Read-modify-write under the file lock.
    ///
    /// `mutator` receives the list currently on disk (empty if missing or
    /// malformed); the mutated list is written back and returned. A failed
    /// read leaves the file untouched and returns the error.
    pub async fn update<F>(
        &self,
        kind: TokenKind,
        mutator: F,
    ) -> Result<HashSet<String>, PersistenceError>
    where
        F: FnOnce(&mut HashSet<String>) + Send + 'static,
    {
        let _writer = self.writer(kind).lock().await;
        let path = self.path(kind).to_path_buf();
        let timeout = self.lock_timeout;

        let tokens = tokio::task::spawn_blocking(move || {
            with_file_lock(&path, timeout, || {
                let mut tokens = match read_token_file(&path) {
                    Ok(Some(tokens)) => tokens,
                    Ok(None) => HashSet::new(),
                    Err(e @ PersistenceError::Malformed { .. }) => {
                        warn!(error = %e, "Overwriting malformed token list");
                        HashSet::new()
                    }
                    Err(e) => return Err(e),
                };
                mutator(&mut tokens);
                write_token_file(&path, &tokens)?;
                Ok(tokens)
            })
        })
        .await
        .map_err(|e| PersistenceError::Task(e.to_string()))??;

        debug!(kind = %kind, count = tokens.len(), "Merged token list on disk");
        Ok(tokens)
    }
}

/// Releases the advisory lock when dropped, on every exit path
struct FileLockGuard {
    file: File,
    path: PathBuf,
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "Failed to release token list lock");
        }
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut lock_path = path.as_os_str().to_owned();
    lock_path.push(".lock");
    PathBuf::from(lock_path)
}

fn acquire_lock(path: &Path, timeout: Duration) -> Result<FileLockGuard, PersistenceError> {
    ensure_parent_dir(path)?;
    let lock_path = lock_path_for(path);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|source| PersistenceError::Io {
            path: lock_path.clone(),
            source,
        })?;

    let deadline = Instant::now() + timeout;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => {
                return Ok(FileLockGuard {
                    file,
                    path: lock_path,
                })
            }
            Err(e) if is_contended(&e) => {
                if Instant::now() >= deadline {
                    return Err(PersistenceError::LockTimeout {
                        path: lock_path,
                        timeout,
                    });
                }
                std::thread::sleep(LOCK_RETRY_INTERVAL);
            }
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: lock_path,
                    source,
                })
            }
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn with_file_lock<T>(
    path: &Path,
    timeout: Duration,
    f: impl FnOnce() -> Result<T, PersistenceError>,
) -> Result<T, PersistenceError> {
    let _guard = acquire_lock(path, timeout)?;
    f()
}

fn ensure_parent_dir(path: &Path) -> Result<(), PersistenceError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

fn read_token_file(path: &Path) -> Result<Option<HashSet<String>>, PersistenceError> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice::<Vec<String>>(&bytes)
            .map(|tokens| Some(tokens.into_iter().collect()))
            .map_err(|source| PersistenceError::Malformed {
                path: path.to_path_buf(),
                source,
            }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_token_file(path: &Path, tokens: &HashSet<String>) -> Result<(), PersistenceError> {
    ensure_parent_dir(path)?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let io_err = |source: io::Error| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut sorted: Vec<&String> = tokens.iter().collect();
    sorted.sort();

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    serde_json::to_writer(tmp.as_file_mut(), &sorted).map_err(|source| {
        PersistenceError::Malformed {
            path: path.to_path_buf(),
            source,
        }
    })?;
    tmp.as_file_mut().flush().map_err(io_err)?;
    tmp.as_file_mut().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
