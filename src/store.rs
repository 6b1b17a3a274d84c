//! Outreach persistence
//!
//! The whole outreach document lives in a single JSON file. Every read loads a
//! fresh snapshot and every write replaces the file with a full snapshot.
//! There is no locking: two concurrent read-modify-write cycles race and the
//! later `save` wins, discarding changes it never saw. Writes go through a
//! temporary file and a rename so a reader never sees a half-written document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::OutreachResult;
use crate::models::OutreachData;

const OUTREACH_FILENAME: &str = "outreach.json";

/// JSON-file backed outreach store
#[derive(Debug, Clone)]
pub struct OutreachStore {
    path: PathBuf,
}

impl OutreachStore {
    /// Store rooted in `data_dir`
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(OUTREACH_FILENAME),
        }
    }

    /// Location of `outreach.json`
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current snapshot.
    ///
    /// Never fails: a missing file is the normal first-run state, and an
    /// unreadable or corrupt file is reported and treated as empty.
    pub async fn load(&self) -> OutreachData {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no outreach data yet");
                return OutreachData::default();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "outreach data unreadable, starting empty");
                return OutreachData::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "outreach data corrupt, starting empty");
                OutreachData::default()
            }
        }
    }

    /// Replace the stored document with `data`
    pub async fn save(&self, data: &OutreachData) -> OutreachResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Fresh opaque identifier (campaign ids, form tokens)
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Campaign, CampaignStats, CampaignStatus, TargetFilter};

    fn campaign(id: &str) -> Campaign {
        Campaign {
            id: id.into(),
            name: "Printemps".into(),
            created_at: chrono::Utc::now(),
            status: CampaignStatus::Draft,
            target_filter: TargetFilter::default(),
            email_template_id: String::new(),
            stats: CampaignStats::default(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutreachStore::new(dir.path());
        assert_eq!(store.load().await, OutreachData::default());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutreachStore::new(dir.path());
        std::fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load().await, OutreachData::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutreachStore::new(dir.path().join("nested"));

        let mut data = OutreachData::default();
        data.campaigns.push(campaign("c1"));
        store.save(&data).await.unwrap();

        assert_eq!(store.load().await, data);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_to_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the data directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = OutreachStore::new(&blocker);

        assert!(store.save(&OutreachData::default()).await.is_err());
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }
}
