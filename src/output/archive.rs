//! Session Archive
//!
//! Optional on-disk copy of every completed recording. Each session is written
//! as pretty JSON next to a `.tmp` sibling that is renamed into place, so a
//! crash mid-write never leaves a truncated archive.

use crate::engine::session::CompletedSession;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Current archive format version
pub const CURRENT_FORMAT_VERSION: &str = "1.0";

fn default_format_version() -> String {
    CURRENT_FORMAT_VERSION.to_string()
}

/// A completed session as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedSession {
    pub id: Uuid,
    #[serde(default = "default_format_version")]
    pub format_version: String,
    pub saved_at: DateTime<Utc>,
    #[serde(flatten)]
    pub session: CompletedSession,
}

impl ArchivedSession {
    pub fn new(session: CompletedSession) -> Self {
        Self {
            id: Uuid::new_v4(),
            format_version: CURRENT_FORMAT_VERSION.to_string(),
            saved_at: Utc::now(),
            session,
        }
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let archived: ArchivedSession = serde_json::from_str(&content)?;
        if archived.format_version != CURRENT_FORMAT_VERSION {
            tracing::warn!(
                found = %archived.format_version,
                expected = CURRENT_FORMAT_VERSION,
                "session archive has a different format version"
            );
        }
        Ok(archived)
    }
}

#[derive(Debug, Clone)]
pub struct SessionArchive {
    dir: PathBuf,
}

impl SessionArchive {
    /// Open the archive directory, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> crate::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one session, returning its final path
    pub fn store(&self, session: &CompletedSession) -> crate::Result<PathBuf> {
        let archived = ArchivedSession::new(session.clone());
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let short_id = archived.id.simple().to_string();
        let path = self
            .dir
            .join(format!("session_{}_{}.json", stamp, &short_id[..8]));

        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&archived)?;
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(path)
    }

    /// All archived session files, oldest name first
    pub fn list(&self) -> crate::Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
                let is_session = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("session_"))
                    .unwrap_or(false);
                is_json && is_session
            })
            .collect();
        paths.sort();
        Ok(paths)
    }
}
