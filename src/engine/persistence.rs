//! Per-student JSON snapshots on local disk.
//!
//! Writes go to a temp file first and are renamed into place, so a crashed
//! flush leaves the previous snapshot intact. In-memory state stays
//! authoritative; a failed save is logged by the caller and retried on the
//! next flush tick.

use std::path::PathBuf;

use tracing::debug;

use crate::config::PersistenceConfig;
use crate::engine::types::StudentSnapshot;
use crate::error::PersistenceError;

pub struct SnapshotStore {
    data_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(config: &PersistenceConfig) -> Self {
        Self {
            data_dir: PathBuf::from(&config.data_dir),
        }
    }

    pub async fn save(
        &self,
        student_id: &str,
        snapshot: &StudentSnapshot,
    ) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let path = self.snapshot_path(student_id);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(snapshot).map_err(PersistenceError::Encode)?;
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(student_id = %student_id, bytes = body.len(), "snapshot saved");
        Ok(())
    }

    /// None when no snapshot exists yet; a decode failure is an error so a
    /// corrupt file is never silently treated as a new student.
    pub async fn load(&self, student_id: &str) -> Result<Option<StudentSnapshot>, PersistenceError> {
        let path = self.snapshot_path(student_id);
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_slice(&body).map_err(|source| PersistenceError::Decode {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Some(snapshot))
    }

    fn snapshot_path(&self, student_id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", sanitize(student_id)))
    }
}

/// Student ids come from the embedding application; keep file names flat.
fn sanitize(student_id: &str) -> String {
    student_id
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Interaction, StudentProfile};

    fn store(dir: &tempfile::TempDir) -> SnapshotStore {
        let config = PersistenceConfig {
            data_dir: dir.path().display().to_string(),
            ..PersistenceConfig::default()
        };
        SnapshotStore::new(&config)
    }

    fn snapshot(student_id: &str) -> StudentSnapshot {
        StudentSnapshot {
            profile: StudentProfile::new(student_id),
            interaction_tail: vec![Interaction::new(student_id, "merhaba")],
            saved_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    #[tokio::test]
    async fn missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert!(store.load("yok").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let original = snapshot("s1");
        store.save("s1", &original).await.unwrap();

        let loaded = store.load("s1").await.unwrap().unwrap();
        assert_eq!(loaded.profile.student_id, "s1");
        assert_eq!(loaded.interaction_tail.len(), 1);
        assert_eq!(loaded.saved_at, original.saved_at);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        tokio::fs::write(dir.path().join("s1.json"), b"{ bozuk").await.unwrap();
        assert!(matches!(
            store.load("s1").await,
            Err(PersistenceError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn odd_ids_map_to_flat_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.save("a/../b", &snapshot("a/../b")).await.unwrap();
        let loaded = store.load("a/../b").await.unwrap();
        assert!(loaded.is_some());
    }
}
