use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::Provider;
use crate::error::Result;
use crate::meeting::Meeting;

/// Keychain-style secret storage. Absence of a key is reported as-is; the
/// pipeline maps it to `NoApiKey` and never caches keys itself.
pub trait SecretStore: Send + Sync {
    fn read_key(&self, provider: Provider) -> Option<String>;
}

/// The persistence collaborator's contract. The real store owns indexing
/// and full-text search over title+transcript; the pipeline only loads and
/// saves whole records.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<Meeting>>;
    async fn save(&self, meeting: &Meeting) -> Result<()>;
    /// Full snapshot in stable insertion order; the bulk-retry pass is
    /// deterministic because of it.
    async fn load_all(&self) -> Result<Vec<Meeting>>;
}

/// In-memory store for the CLI and tests. Keeps insertion order.
#[derive(Default)]
pub struct MemoryStore {
    meetings: Mutex<Vec<Meeting>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MeetingStore for MemoryStore {
    async fn load(&self, id: &str) -> Result<Option<Meeting>> {
        let meetings = self.meetings.lock().await;
        Ok(meetings.iter().find(|m| m.id == id).cloned())
    }

    async fn save(&self, meeting: &Meeting) -> Result<()> {
        let mut meetings = self.meetings.lock().await;
        match meetings.iter_mut().find(|m| m.id == meeting.id) {
            Some(existing) => *existing = meeting.clone(),
            None => meetings.push(meeting.clone()),
        }
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Meeting>> {
        Ok(self.meetings.lock().await.clone())
    }
}
