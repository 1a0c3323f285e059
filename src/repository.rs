//! Persistence boundary. The engine performs all of its own graph
//! walking in memory; it only needs somewhere to load a `WorkflowSpec`
//! from and save/load `WorkflowInstance`s to. Mirrors the teacher's
//! `WorkflowRepository`/`InMemoryWorkflowRepository` pair.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::ids::WorkflowInstanceId;
use crate::instance::WorkflowInstance;
use crate::spec::WorkflowSpec;

pub type RepoResult<T> = Result<T, WorkflowError>;

#[async_trait]
pub trait WorkflowSpecRepository: Send + Sync {
    /// Fails with `SpecError::DuplicateWorkflowCode` if `spec.code` is
    /// already installed (spec.md §4.2).
    async fn save(&self, spec: WorkflowSpec) -> RepoResult<()>;

    async fn load(&self, code: &str) -> RepoResult<Option<WorkflowSpec>>;

    async fn list(&self) -> RepoResult<Vec<WorkflowSpec>>;
}

#[async_trait]
pub trait WorkflowInstanceRepository: Send + Sync {
    async fn save(&self, instance: &WorkflowInstance) -> RepoResult<()>;

    async fn load(&self, id: WorkflowInstanceId) -> RepoResult<Option<WorkflowInstance>>;

    async fn find_by_document(&self, document_type: &str, object_id: Uuid) -> RepoResult<Vec<WorkflowInstance>>;

    async fn delete(&self, id: WorkflowInstanceId) -> RepoResult<()>;
}

/// Reference in-memory implementation for tests and simple hosts.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowSpecRepository {
    specs: RwLock<HashMap<String, WorkflowSpec>>,
}

#[async_trait]
impl WorkflowSpecRepository for InMemoryWorkflowSpecRepository {
    async fn save(&self, spec: WorkflowSpec) -> RepoResult<()> {
        let mut specs = self.specs.write().await;
        if specs.contains_key(&spec.code) {
            return Err(WorkflowError::Spec(crate::error::SpecError::DuplicateWorkflowCode {
                code: spec.code,
            }));
        }
        specs.insert(spec.code.clone(), spec);
        Ok(())
    }

    async fn load(&self, code: &str) -> RepoResult<Option<WorkflowSpec>> {
        Ok(self.specs.read().await.get(code).cloned())
    }

    async fn list(&self) -> RepoResult<Vec<WorkflowSpec>> {
        Ok(self.specs.read().await.values().cloned().collect())
    }
}

/// Reference in-memory implementation for tests and simple hosts.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowInstanceRepository {
    instances: RwLock<HashMap<WorkflowInstanceId, WorkflowInstance>>,
}

#[async_trait]
impl WorkflowInstanceRepository for InMemoryWorkflowInstanceRepository {
    async fn save(&self, instance: &WorkflowInstance) -> RepoResult<()> {
        self.instances.write().await.insert(instance.id, instance.clone());
        Ok(())
    }

    async fn load(&self, id: WorkflowInstanceId) -> RepoResult<Option<WorkflowInstance>> {
        Ok(self.instances.read().await.get(&id).cloned())
    }

    async fn find_by_document(&self, document_type: &str, object_id: Uuid) -> RepoResult<Vec<WorkflowInstance>> {
        Ok(self
            .instances
            .read()
            .await
            .values()
            .filter(|i| i.document_type == document_type && i.object_id == object_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: WorkflowInstanceId) -> RepoResult<()> {
        self.instances.write().await.remove(&id);
        Ok(())
    }
}
