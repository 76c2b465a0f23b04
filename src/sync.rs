//! Snapshot stores and last-writer-wins replication between collaborators.
//!
//! Collaborators share one snapshot. Whoever writes last wins: an incoming
//! snapshot that is newer than what a replica last saw, and was not written by
//! that replica, replaces its whole tournament. There is no merge and no
//! conflict detection.

use crate::logic::{apply_command, Command};
use crate::models::{Snapshot, Tournament, TournamentError};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Where the shared snapshot lives.
pub trait SnapshotStore: Send + Sync {
    /// Last written snapshot, if any.
    fn read(&self) -> Result<Option<Snapshot>, TournamentError>;

    /// Replace the stored snapshot and notify subscribers.
    fn write(&self, snapshot: Snapshot) -> Result<(), TournamentError>;

    /// Receiver that sees every snapshot this store learns about.
    fn subscribe(&self) -> watch::Receiver<Option<Snapshot>>;
}

/// In-process store.
#[derive(Debug)]
pub struct MemorySnapshotStore {
    tx: watch::Sender<Option<Snapshot>>,
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn read(&self) -> Result<Option<Snapshot>, TournamentError> {
        Ok(self.tx.borrow().clone())
    }

    fn write(&self, snapshot: Snapshot) -> Result<(), TournamentError> {
        self.tx.send_replace(Some(snapshot));
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Snapshot>> {
        self.tx.subscribe()
    }
}

/// Store backed by one JSON file. Other processes may write the file too;
/// [`FileSnapshotStore::poll`] picks up their changes.
#[derive(Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
    tx: watch::Sender<Option<Snapshot>>,
}

impl FileSnapshotStore {
    /// Open the store, loading the file if it already exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, TournamentError> {
        let path = path.into();
        let current = load(&path)?;
        let (tx, _) = watch::channel(current);
        Ok(Self { path, tx })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file; notify subscribers if it holds a newer snapshot.
    pub fn poll(&self) -> Result<bool, TournamentError> {
        let Some(snapshot) = load(&self.path)? else {
            return Ok(false);
        };
        let seen = self.tx.borrow().as_ref().map(|s| s.timestamp);
        if !snapshot.is_newer_than(seen) {
            return Ok(false);
        }
        log::debug!("{} changed on disk", self.path.display());
        self.tx.send_replace(Some(snapshot));
        Ok(true)
    }

    /// Poll the file on a fixed interval until the returned task is aborted.
    pub fn spawn_polling(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = self.poll() {
                    log::warn!("Polling {} failed: {}", self.path.display(), e);
                }
            }
        })
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn read(&self) -> Result<Option<Snapshot>, TournamentError> {
        Ok(self.tx.borrow().clone())
    }

    fn write(&self, snapshot: Snapshot) -> Result<(), TournamentError> {
        let body = snapshot.to_json_pretty()?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| TournamentError::Storage(format!("{}: {}", self.path.display(), e)))?;
        self.tx.send_replace(Some(snapshot));
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Snapshot>> {
        self.tx.subscribe()
    }
}

fn load(path: &Path) -> Result<Option<Snapshot>, TournamentError> {
    match fs::read_to_string(path) {
        Ok(text) => Snapshot::from_json(&text).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(TournamentError::Storage(format!("{}: {}", path.display(), e))),
    }
}

/// One collaborator's copy of the tournament.
#[derive(Clone, Debug)]
pub struct Replica {
    tournament: Tournament,
    writer: String,
    last_sync: Option<DateTime<Utc>>,
}

impl Replica {
    pub fn new(writer: impl Into<String>) -> Self {
        Self::with_tournament(writer, Tournament::new())
    }

    pub fn with_tournament(writer: impl Into<String>, tournament: Tournament) -> Self {
        Self {
            tournament,
            writer: writer.into(),
            last_sync: None,
        }
    }

    pub fn tournament(&self) -> &Tournament {
        &self.tournament
    }

    pub fn writer(&self) -> &str {
        &self.writer
    }

    /// Timestamp of the last snapshot written or accepted.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    /// Run a command and publish the result. The replica only changes once
    /// the store has accepted the new snapshot.
    pub fn apply(&mut self, command: &Command, store: &dyn SnapshotStore) -> Result<(), TournamentError> {
        let mut next = self.tournament.clone();
        apply_command(&mut next, command)?;
        let action = command.describe(&next);
        let stamp = write_stamped(store, &next, &self.writer, Some(action))?;
        self.tournament = next;
        self.last_sync = Some(stamp);
        Ok(())
    }

    /// Write the current state, stamped with this writer.
    pub fn publish(&mut self, store: &dyn SnapshotStore, action: Option<String>) -> Result<(), TournamentError> {
        let stamp = write_stamped(store, &self.tournament, &self.writer, action)?;
        self.last_sync = Some(stamp);
        Ok(())
    }

    /// Last-writer-wins: take `snapshot` wholesale if it is newer and from
    /// someone else. A snapshot that fails validation leaves the replica as is.
    pub fn receive(&mut self, snapshot: Snapshot) -> Result<bool, TournamentError> {
        if !snapshot.is_newer_than(self.last_sync) || !snapshot.is_external_to(&self.writer) {
            return Ok(false);
        }
        let stamp = snapshot.timestamp;
        let author = snapshot.modified_by.clone().unwrap_or_default();
        let action = snapshot.action.clone().unwrap_or_default();
        self.tournament = Tournament::from_snapshot(snapshot)?;
        self.last_sync = Some(stamp);
        log::info!("Tournament updated by {}: {}", author, action);
        Ok(true)
    }

    /// Read the store and [`receive`](Self::receive) whatever is there.
    pub fn sync(&mut self, store: &dyn SnapshotStore) -> Result<bool, TournamentError> {
        match store.read()? {
            Some(snapshot) => self.receive(snapshot),
            None => Ok(false),
        }
    }
}

/// Write `tournament` to `store` as `writer`; returns the snapshot timestamp.
fn write_stamped(
    store: &dyn SnapshotStore,
    tournament: &Tournament,
    writer: &str,
    action: Option<String>,
) -> Result<DateTime<Utc>, TournamentError> {
    let mut snapshot = tournament.to_snapshot();
    snapshot.modified_by = Some(writer.to_string());
    snapshot.action = action;
    let stamp = snapshot.timestamp;
    store.write(snapshot)?;
    Ok(stamp)
}
