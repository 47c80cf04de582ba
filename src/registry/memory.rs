//! Process-local registry store.

use super::{AgentRecord, AgentRecordPatch, AgentRegistry, NewAgentRecord, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryAgentStore {
    inner: RwLock<Records>,
}

#[derive(Debug, Default)]
struct Records {
    by_id: HashMap<Uuid, AgentRecord>,
    /// Insertion order for `list`.
    order: Vec<Uuid>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRegistry for InMemoryAgentStore {
    async fn list(&self) -> Result<Vec<AgentRecord>> {
        let records = self.inner.read().await;
        Ok(records
            .order
            .iter()
            .filter_map(|id| records.by_id.get(id).cloned())
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<AgentRecord>> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn create(&self, data: NewAgentRecord) -> Result<AgentRecord> {
        let record = AgentRecord::create(data, Utc::now());
        let mut records = self.inner.write().await;
        records.order.push(record.id);
        records.by_id.insert(record.id, record.clone());
        tracing::info!(id = %record.id, name = %record.display_name, "Registry: agent created");
        Ok(record)
    }

    async fn update(&self, id: Uuid, patch: AgentRecordPatch) -> Result<Option<AgentRecord>> {
        let mut records = self.inner.write().await;
        let Some(current) = records.by_id.get(&id) else {
            return Ok(None);
        };
        let next = current.patched(patch, Utc::now())?;
        records.by_id.insert(id, next.clone());
        tracing::info!(id = %id, "Registry: agent updated");
        Ok(Some(next))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut records = self.inner.write().await;
        if records.by_id.remove(&id).is_none() {
            return Ok(false);
        }
        records.order.retain(|existing| *existing != id);
        tracing::info!(id = %id, "Registry: agent deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryError;
    use crate::registry::tests::{card, new_record};

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let store = InMemoryAgentStore::new();
        let a = store.create(new_record("a")).await.expect("create");
        let b = store.create(new_record("b")).await.expect("create");

        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(store.get(a.id).await.expect("get"), Some(a.clone()));

        let names: Vec<_> = store
            .list()
            .await
            .expect("list")
            .into_iter()
            .map(|r| r.display_name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at() {
        let store = InMemoryAgentStore::new();
        let created = store.create(new_record("a")).await.expect("create");

        let updated = store
            .update(
                created.id,
                AgentRecordPatch {
                    display_name: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("update")
            .expect("present");

        assert_eq!(updated.display_name, "renamed");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_rejected_patch_leaves_record_intact() {
        let store = InMemoryAgentStore::new();
        let created = store.create(new_record("a")).await.expect("create");

        let err = store
            .update(
                created.id,
                AgentRecordPatch {
                    display_name: Some("renamed".to_string()),
                    connection_url: Some("http://elsewhere.example".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect_err("stale card");
        assert!(matches!(err, RegistryError::StaleCard(_)));
        assert_eq!(store.get(created.id).await.expect("get"), Some(created));
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let store = InMemoryAgentStore::new();
        let id = Uuid::new_v4();
        assert_eq!(store.get(id).await.expect("get"), None);
        assert!(!store.delete(id).await.expect("delete"));
        let patch = AgentRecordPatch {
            connection_url: Some("http://x.example".to_string()),
            agent_card: Some(card("http://x.example/a2a")),
            ..Default::default()
        };
        assert_eq!(store.update(id, patch).await.expect("update"), None);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryAgentStore::new();
        let created = store.create(new_record("a")).await.expect("create");
        assert!(store.delete(created.id).await.expect("delete"));
        assert!(store.list().await.expect("list").is_empty());
    }
}
