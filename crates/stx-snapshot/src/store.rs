// store.rs — Append-only JSONL snapshot log.
//
// One JSON object per line, appended and flushed per record. Records stay
// until explicitly pruned; pruning rewrites the log through a temp file
// and an atomic rename so a crash mid-prune never loses unrelated records.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::SnapshotError;
use crate::snapshot::Snapshot;

/// Durable snapshot log backed by a JSONL file.
pub struct SnapshotStore {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl SnapshotStore {
    /// Open (or create) a snapshot log at the given path.
    ///
    /// Parent directories are created as needed; the reserved engine
    /// subtree does not exist until the first snapshot is recorded.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| SnapshotError::OpenFailed {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        // Append mode: existing records are never overwritten.
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SnapshotError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    /// Append a snapshot and flush it to disk.
    pub fn record(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let json = serde_json::to_string(snapshot)?;
        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;

        tracing::debug!(
            snapshot_id = %snapshot.snapshot_id,
            changeset_id = %snapshot.changeset_id,
            paths = snapshot.pre_images.len(),
            "snapshot recorded"
        );
        Ok(())
    }

    /// Load one snapshot by id.
    pub fn load(&self, id: Uuid) -> Result<Snapshot, SnapshotError> {
        self.load_all()?
            .into_iter()
            .find(|s| s.snapshot_id == id)
            .ok_or(SnapshotError::NotFound { id })
    }

    /// Read every snapshot in the log, oldest first. Blank lines are
    /// tolerated.
    pub fn load_all(&self) -> Result<Vec<Snapshot>, SnapshotError> {
        let file = File::open(&self.path).map_err(|source| SnapshotError::OpenFailed {
            path: self.path.clone(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut snapshots = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let snapshot: Snapshot = serde_json::from_str(&line)?;
            snapshots.push(snapshot);
        }

        Ok(snapshots)
    }

    /// Remove one snapshot from the log. Retention policy lives with the
    /// caller; the store only ever prunes on request.
    pub fn prune(&mut self, id: Uuid) -> Result<(), SnapshotError> {
        let remaining: Vec<Snapshot> = self
            .load_all()?
            .into_iter()
            .filter(|s| s.snapshot_id != id)
            .collect();

        let tmp_path = self.path.with_extension("jsonl.tmp");
        {
            let tmp = File::create(&tmp_path).map_err(|source| SnapshotError::OpenFailed {
                path: tmp_path.clone(),
                source,
            })?;
            let mut writer = BufWriter::new(tmp);
            for snapshot in &remaining {
                writeln!(writer, "{}", serde_json::to_string(snapshot)?)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        // Reopen the append handle against the renamed file.
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| SnapshotError::OpenFailed {
                path: self.path.clone(),
                source,
            })?;
        self.writer = BufWriter::new(file);

        tracing::debug!(snapshot_id = %id, "snapshot pruned");
        Ok(())
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
