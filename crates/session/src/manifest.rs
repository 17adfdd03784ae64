//! The recording manifest: the ordered file list of a multi-file recording.
//!
//! Capture sessions append an entry per rotated file; replay readers
//! resolve `NextFileId` chunk indices through it. Stored as JSON next to
//! the recording files.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SessionError};

/// One recording file and the time range it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// File name of the segment
    pub filename: String,
    /// Wall-clock time the segment opened
    pub start: DateTime<Utc>,
    /// Wall-clock time the segment closed; `None` while still being written
    pub end: Option<DateTime<Utc>>,
}

/// Ordered file list of one recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Unique id of the recording
    pub recording_id: Uuid,
    /// Segments in rotation order; `NextFileId` payloads index this list
    pub files: Vec<ManifestEntry>,
}

impl Manifest {
    /// Start a manifest for a new recording beginning at `first_file`.
    pub fn new(first_file: &str) -> Self {
        Manifest {
            recording_id: Uuid::new_v4(),
            files: vec![ManifestEntry {
                filename: first_file.to_string(),
                start: Utc::now(),
                end: None,
            }],
        }
    }

    /// Number of files in the recording.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the manifest lists no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// File name at a `NextFileId` index.
    pub fn filename(&self, index: usize) -> Option<&str> {
        self.files.get(index).map(|e| e.filename.as_str())
    }

    /// Close the current file's time range and append the next file.
    pub fn push_file(&mut self, filename: &str) {
        let now = Utc::now();
        if let Some(last) = self.files.last_mut() {
            last.end = Some(now);
        }
        self.files.push(ManifestEntry {
            filename: filename.to_string(),
            start: now,
            end: None,
        });
    }

    /// Close the final file's time range at recording end.
    pub fn finish(&mut self) {
        if let Some(last) = self.files.last_mut() {
            if last.end.is_none() {
                last.end = Some(Utc::now());
            }
        }
    }

    /// Write the manifest as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(SessionError::ManifestIo)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Load a manifest from JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(SessionError::ManifestIo)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}
