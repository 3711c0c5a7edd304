use std::collections::HashSet;

use tokio::sync::Mutex;

use crate::error::{RepositoryError, StorageError};
use crate::prompt::{IdGenerator, Prompt, PromptDraft};
use crate::storage::PromptStorage;

/// CRUD over the stored prompt collection. Each mutation rereads the
/// store, applies its change and writes the result back while holding one
/// lock, so writers in this process are queued and writes made by other
/// processes since the last call are kept.
pub struct PromptRepository {
    storage: PromptStorage,
    ids: Mutex<IdGenerator>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

impl PromptRepository {
    pub async fn open(storage: PromptStorage) -> Result<Self, StorageError> {
        let prompts = storage.load().await?;
        tracing::info!(count = prompts.len(), "Loaded prompts");
        let ids = IdGenerator::seeded(&prompts);
        Ok(PromptRepository {
            storage,
            ids: Mutex::new(ids),
        })
    }

    /// Reads the stored collection and keeps the id generator ahead of it.
    async fn load_current(&self, ids: &mut IdGenerator) -> Result<Vec<Prompt>, StorageError> {
        let prompts = self.storage.load().await?;
        if let Some(max) = prompts.iter().map(|p| p.id).max() {
            ids.observe(max);
        }
        Ok(prompts)
    }

    pub async fn create(&self, draft: &PromptDraft) -> Result<Prompt, RepositoryError> {
        let (title, content, tags) = draft.validate()?;

        let mut ids = self.ids.lock().await;
        let current = self.load_current(&mut ids).await?;
        let Some(id) = ids.next_id() else {
            let max = current.iter().map(|p| p.id).max().unwrap_or(i64::MAX);
            return Err(RepositoryError::IdsExhausted(max));
        };
        let prompt = Prompt::new(id, title, content, tags);

        let mut next = Vec::with_capacity(current.len() + 1);
        next.push(prompt.clone());
        next.extend(current);
        self.storage.save(&next).await?;

        tracing::info!(id = prompt.id, title = %prompt.title, "Created prompt");
        Ok(prompt)
    }

    /// Returns whether a prompt was removed. Unknown ids leave the
    /// collection and the store untouched.
    pub async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        let mut ids = self.ids.lock().await;
        let current = self.load_current(&mut ids).await?;
        if !current.iter().any(|p| p.id == id) {
            tracing::debug!(id, "Delete ignored, no such prompt");
            return Ok(false);
        }

        let next: Vec<Prompt> = current.into_iter().filter(|p| p.id != id).collect();
        self.storage.save(&next).await?;

        tracing::info!(id, "Deleted prompt");
        Ok(true)
    }

    pub async fn list(&self) -> Result<Vec<Prompt>, StorageError> {
        let mut ids = self.ids.lock().await;
        self.load_current(&mut ids).await
    }

    /// Merges backup records ahead of the current list, skipping ids that
    /// are already present and records that fail validation.
    pub async fn import(&self, incoming: Vec<Prompt>) -> Result<ImportSummary, StorageError> {
        let mut ids = self.ids.lock().await;
        let current = self.load_current(&mut ids).await?;
        let mut seen: HashSet<i64> = current.iter().map(|p| p.id).collect();
        let mut summary = ImportSummary::default();

        let mut next = Vec::with_capacity(incoming.len() + current.len());
        for prompt in incoming {
            if !prompt.is_valid() {
                summary.invalid += 1;
            } else if !seen.insert(prompt.id) {
                summary.duplicates += 1;
            } else {
                next.push(prompt);
            }
        }
        summary.added = next.len();

        if summary.added > 0 {
            for prompt in &next {
                ids.observe(prompt.id);
            }
            next.extend(current);
            self.storage.save(&next).await?;
        }

        tracing::info!(
            added = summary.added,
            duplicates = summary.duplicates,
            invalid = summary.invalid,
            "Imported prompts"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::storage::{FlakyStore, JsonFileStore, MemoryStore};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn memory_repo() -> PromptRepository {
        PromptRepository::open(PromptStorage::new(MemoryStore::default()))
            .await
            .unwrap()
    }

    async fn file_repo(path: &std::path::Path) -> PromptRepository {
        PromptRepository::open(PromptStorage::new(JsonFileStore::new(path)))
            .await
            .unwrap()
    }

    fn stored(id: i64, title: &str) -> Prompt {
        Prompt {
            id,
            title: title.to_string(),
            content: format!("{title} content"),
            tags: vec![],
            created_at: "2024-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_prepends_with_parsed_tags() {
        let repo = memory_repo().await;
        repo.create(&PromptDraft::new("Old", "older", "")).await.unwrap();
        let created = repo.create(&PromptDraft::new("T", "C", "a, b、c")).await.unwrap();

        let list = repo.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], created);
        assert_eq!(list[0].tags, vec!["a", "b", "c"]);
        assert_eq!(list[1].title, "Old");
    }

    #[tokio::test]
    async fn test_create_rejects_blank_fields_without_persisting() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");
        let repo = PromptRepository::open(PromptStorage::new(JsonFileStore::new(&path)))
            .await
            .unwrap();

        let err = repo.create(&PromptDraft::new("", "body", "x")).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Validation(ValidationError::MissingField)
        ));
        let err = repo.create(&PromptDraft::new("title", "   ", "x")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));

        assert!(repo.list().await.unwrap().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_noop() {
        let repo = memory_repo().await;
        repo.create(&PromptDraft::new("keep", "me", "")).await.unwrap();

        assert!(!repo.delete(42).await.unwrap());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_and_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");
        let repo = PromptRepository::open(PromptStorage::new(JsonFileStore::new(&path)))
            .await
            .unwrap();
        let a = repo.create(&PromptDraft::new("a", "a", "")).await.unwrap();
        let b = repo.create(&PromptDraft::new("b", "b", "")).await.unwrap();

        assert!(repo.delete(a.id).await.unwrap());

        let reopened = PromptRepository::open(PromptStorage::new(JsonFileStore::new(&path)))
            .await
            .unwrap();
        assert_eq!(reopened.list().await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn test_list_is_idempotent() {
        let repo = memory_repo().await;
        for title in ["one", "two", "three"] {
            repo.create(&PromptDraft::new(title, "body", "")).await.unwrap();
        }

        let first = repo.list().await.unwrap();
        let second = repo.list().await.unwrap();
        assert_eq!(first, second);
        let titles: Vec<_> = first.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["three", "two", "one"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_keep_every_write() {
        let repo = Arc::new(memory_repo().await);

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    repo.create(&PromptDraft::new(format!("p{i}"), "body", ""))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in futures::future::join_all(handles).await {
            handle.unwrap();
        }

        let list = repo.list().await.unwrap();
        assert_eq!(list.len(), 32);
        let ids: HashSet<i64> = list.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), 32);
        // Head-insertion order matches id order.
        assert!(list.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_prior_state() {
        let store = FlakyStore::default();
        let broken = Arc::clone(&store.broken);
        let repo = PromptRepository::open(PromptStorage::new(store)).await.unwrap();
        let kept = repo.create(&PromptDraft::new("kept", "body", "")).await.unwrap();

        broken.store(true, Ordering::SeqCst);
        let err = repo.create(&PromptDraft::new("lost", "body", "")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Storage(_)));
        assert!(repo.delete(kept.id).await.is_err());

        assert_eq!(repo.list().await.unwrap(), vec![kept]);
    }

    #[tokio::test]
    async fn test_import_skips_duplicates_and_invalid() {
        let repo = memory_repo().await;
        let existing = repo.create(&PromptDraft::new("mine", "body", "")).await.unwrap();

        let mut blank = stored(3, "blank");
        blank.content = "  ".to_string();
        let incoming = vec![
            stored(1, "first"),
            existing.clone(),
            stored(2, "second"),
            stored(1, "first again"),
            blank,
        ];

        let summary = repo.import(incoming).await.unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                added: 2,
                duplicates: 2,
                invalid: 1
            }
        );

        let titles: Vec<_> = repo.list().await.unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["first", "second", "mine"]);
    }

    #[tokio::test]
    async fn test_ids_after_import_do_not_collide() {
        let repo = memory_repo().await;
        let far_future = i64::MAX / 2;
        repo.import(vec![stored(far_future, "future")]).await.unwrap();

        let created = repo.create(&PromptDraft::new("new", "body", "")).await.unwrap();
        assert_eq!(created.id, far_future + 1);
    }

    #[tokio::test]
    async fn test_two_repositories_share_one_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");
        let popup = file_repo(&path).await;
        let cli = file_repo(&path).await;

        let from_cli = cli.create(&PromptDraft::new("from cli", "body", "")).await.unwrap();
        let from_popup = popup
            .create(&PromptDraft::new("from popup", "body", ""))
            .await
            .unwrap();
        assert!(from_popup.id > from_cli.id);

        let titles: Vec<_> = file_repo(&path)
            .await
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["from popup", "from cli"]);

        assert!(cli.delete(from_popup.id).await.unwrap());
        assert_eq!(popup.list().await.unwrap(), vec![from_cli]);
    }

    #[tokio::test]
    async fn test_create_fails_once_ids_are_exhausted() {
        let repo = memory_repo().await;
        repo.import(vec![stored(i64::MAX, "last")]).await.unwrap();

        let err = repo.create(&PromptDraft::new("one more", "body", "")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::IdsExhausted(i64::MAX)));
        let titles: Vec<_> = repo.list().await.unwrap().into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["last"]);
    }
}
