//! store::file_store
//!
//! JSON document store on the local filesystem.
//!
//! # Durability
//!
//! - Writes are atomic (write to a temp file, fsync, then rename)
//! - Read-modify-write cycles hold an exclusive `fs2` lock on a sidecar
//!   `.lock` file, so concurrent processes never lose each other's updates
//! - A missing document reads as empty
//!
//! File I/O runs on the blocking pool.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use tracing::debug;

use super::document::{StoreDocument, DOCUMENT_VERSION};
use super::traits::{ModuleStore, StoreError};
use crate::core::module::Module;
use crate::core::types::{Channel, ModuleId, Repository, RevisionMarker};

/// File-backed store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store at the default location, `~/.modsync/store.json`.
    pub fn new() -> Result<Self, StoreError> {
        let home = dirs::home_dir()
            .ok_or_else(|| StoreError::Unavailable("cannot determine home directory".into()))?;
        Ok(Self::with_path(home.join(".modsync").join("store.json")))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoreDocument, StoreError> {
        read_document(&self.path)
    }

    /// Apply `f` to the document under the exclusive lock and persist it.
    fn update<T>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let lock_path = self.path.with_extension("lock");
        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| StoreError::Unavailable(format!("cannot open lock file: {}", e)))?;
        lock.lock_exclusive()
            .map_err(|e| StoreError::Unavailable(format!("cannot lock store: {}", e)))?;

        let result = read_document(&self.path).and_then(|mut doc| {
            let value = f(&mut doc)?;
            write_document(&self.path, &doc)?;
            Ok(value)
        });

        // Released on close as well; unlocking explicitly keeps the window short.
        let _ = fs2::FileExt::unlock(&lock);
        result
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(FileStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(store))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store task failed: {}", e)))?
    }
}

fn read_document(path: &Path) -> Result<StoreDocument, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreDocument::default()),
        Err(e) => {
            return Err(StoreError::Unavailable(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let doc: StoreDocument = serde_json::from_str(&content)
        .map_err(|e| StoreError::Serialization(format!("cannot parse {}: {}", path.display(), e)))?;
    if doc.version != DOCUMENT_VERSION {
        return Err(StoreError::Serialization(format!(
            "unsupported store document version {} (expected {})",
            doc.version, DOCUMENT_VERSION
        )));
    }
    Ok(doc)
}

fn write_document(path: &Path, doc: &StoreDocument) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(doc)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    let temp_path = path.with_extension("tmp");
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| StoreError::Unavailable(format!("cannot create temp file: {}", e)))?;
        file.write_all(content.as_bytes())
            .map_err(|e| StoreError::Unavailable(format!("cannot write store: {}", e)))?;
        file.sync_all()
            .map_err(|e| StoreError::Unavailable(format!("cannot sync store: {}", e)))?;
    }

    fs::rename(&temp_path, path)
        .map_err(|e| StoreError::Unavailable(format!("cannot rename temp file: {}", e)))?;
    debug!(path = %path.display(), "store written");
    Ok(())
}

#[async_trait]
impl ModuleStore for FileStore {
    async fn list_repositories(&self) -> Result<Vec<Repository>, StoreError> {
        self.blocking(|s| Ok(s.read()?.repositories)).await
    }

    async fn upsert_repository(&self, repository: Repository) -> Result<(), StoreError> {
        self.blocking(move |s| {
            s.update(|doc| {
                doc.upsert_repository(repository);
                Ok(())
            })
        })
        .await
    }

    async fn channel_head(&self, source: &str, channel: &str) -> Result<Channel, StoreError> {
        let (source, channel) = (source.to_string(), channel.to_string());
        self.blocking(move |s| s.read()?.channel_head(&source, &channel))
            .await
    }

    async fn set_channel_head(
        &self,
        source: &str,
        channel: &str,
        version: &str,
        revision: RevisionMarker,
    ) -> Result<(), StoreError> {
        let (source, channel, version) =
            (source.to_string(), channel.to_string(), version.to_string());
        self.blocking(move |s| {
            s.update(|doc| doc.set_channel_head(&source, &channel, &version, revision))
        })
        .await
    }

    async fn upsert_module(&self, module: Module) -> Result<(), StoreError> {
        self.blocking(move |s| {
            s.update(|doc| {
                doc.upsert_module(module);
                Ok(())
            })
        })
        .await
    }

    async fn get_module(&self, id: &ModuleId) -> Result<Option<Module>, StoreError> {
        let id = id.clone();
        self.blocking(move |s| Ok(s.read()?.modules.remove(&id)))
            .await
    }

    async fn list_modules(&self) -> Result<Vec<Module>, StoreError> {
        self.blocking(|s| Ok(s.read()?.modules.into_values().collect()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::module::ModuleDefinition;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::with_path(dir.path().join("nested").join("store.json"));
        (dir, store)
    }

    fn module(source: &str) -> Module {
        let definition = ModuleDefinition {
            id: "acme/sensor".into(),
            name: "Sensor".into(),
            description: String::new(),
            version: "1.0.0".into(),
            license: None,
            author: None,
            tags: vec![],
            architectures: vec![],
            dependencies: BTreeMap::new(),
            configs: vec![],
        };
        let rev = RevisionMarker::resolve("abc", Utc::now(), Utc::now());
        Module::new(definition, source, "stable", rev, Utc::now())
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let (_dir, store) = create_test_store();
        assert!(store.list_repositories().await.unwrap().is_empty());
        assert!(store.list_modules().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn persistence_across_instances() {
        let (_dir, store) = create_test_store();
        let repo = Repository::new("github.com/acme/m", vec!["stable".into()], None).unwrap();
        store.upsert_repository(repo.clone()).await.unwrap();
        let m = module("github.com/acme/m");
        store.upsert_module(m.clone()).await.unwrap();

        let reopened = FileStore::with_path(store.path().to_path_buf());
        assert_eq!(reopened.list_repositories().await.unwrap(), vec![repo]);
        assert_eq!(reopened.get_module(&m.id).await.unwrap(), Some(m));
    }

    #[tokio::test]
    async fn channel_head_round_trip() {
        let (_dir, store) = create_test_store();
        let repo = Repository::new("github.com/acme/m", vec!["stable".into()], None).unwrap();
        store.upsert_repository(repo).await.unwrap();
        let rev = RevisionMarker::resolve("def", Utc::now(), Utc::now());

        store
            .set_channel_head("github.com/acme/m", "stable", "2.0.0", rev.clone())
            .await
            .unwrap();

        let head = store.channel_head("github.com/acme/m", "stable").await.unwrap();
        assert_eq!(head.version.as_deref(), Some("2.0.0"));
        assert_eq!(head.revision, Some(rev));
    }

    #[tokio::test]
    async fn failed_update_leaves_document_untouched() {
        let (_dir, store) = create_test_store();
        let err = store
            .set_channel_head(
                "github.com/missing/repo",
                "stable",
                "1",
                RevisionMarker::resolve("a", Utc::now(), Utc::now()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn corrupt_document_is_serialization_error() {
        let (_dir, store) = create_test_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(
            store.list_modules().await,
            Err(StoreError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn unknown_document_version_is_rejected() {
        let (_dir, store) = create_test_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"version": 99}"#).unwrap();
        assert!(matches!(
            store.list_repositories().await,
            Err(StoreError::Serialization(_))
        ));
    }
}
