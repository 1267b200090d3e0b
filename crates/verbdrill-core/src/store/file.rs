//! JSON-file record store.
//!
//! The file is the only copy of the data. Every call reloads it under an
//! advisory lock on a sidecar `.lock` file: shared for reads, exclusive for
//! writes. A write applies its change to the freshly loaded state and then
//! replaces the file through a temp file + rename, so separate processes
//! sharing one store never lose each other's updates and a failed write
//! leaves nothing behind.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{AttemptFilter, AttemptKey, AttemptRecord, Identity, User, Verb};
use crate::store::memory::{State, StoreSnapshot};
use crate::traits::RecordStore;

/// Record store persisted to a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// existing one must parse.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut lock_path = OsString::from(path.as_os_str());
        lock_path.push(".lock");
        let store = Self {
            path,
            lock_path: PathBuf::from(lock_path),
        };
        store.read(|_| ())?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self, exclusive: bool) -> Result<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .with_context(|| format!("failed to open {}", self.lock_path.display()))?;
        let locked = if exclusive {
            file.lock()
        } else {
            file.lock_shared()
        };
        locked.with_context(|| format!("failed to lock {}", self.lock_path.display()))?;
        Ok(file)
    }

    fn load(&self) -> Result<State> {
        if !self.path.exists() {
            return Ok(State::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read record store: {}", self.path.display()))?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse record store: {}", self.path.display()))?;
        Ok(snapshot.into())
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> Result<T> {
        if !self.path.exists() {
            return Ok(f(&State::default()));
        }
        let _lock = self.lock(false)?;
        let state = self.load()?;
        Ok(f(&state))
    }

    /// Load, apply `f`, and write back when `f` reports a change.
    fn update<T>(&self, f: impl FnOnce(&mut State) -> (T, bool)) -> Result<T> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let _lock = self.lock(true)?;
        let mut state = self.load()?;
        let (value, changed) = f(&mut state);
        if changed {
            self.write_snapshot(&state.to_snapshot())?;
        }
        Ok(value)
    }

    fn write_snapshot(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot).context("failed to serialize records")?;
        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&temp_path)
                .with_context(|| format!("failed to create {}", temp_path.display()))?;
            file.write_all(json.as_bytes())
                .with_context(|| format!("failed to write {}", temp_path.display()))?;
            file.sync_all()
                .with_context(|| format!("failed to sync {}", temp_path.display()))?;
        }
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn find_verb(&self, id: &str) -> Result<Option<Verb>> {
        self.read(|state| state.verbs.get(id).cloned())
    }

    async fn list_verbs(&self) -> Result<Vec<Verb>> {
        self.read(|state| state.verbs.values().cloned().collect())
    }

    async fn count_verbs(&self) -> Result<usize> {
        self.read(|state| state.verbs.len())
    }

    async fn upsert_verbs(&self, verbs: &[Verb]) -> Result<()> {
        self.update(|state| ((), state.upsert_verbs(verbs)))
    }

    async fn upsert_user(&self, identity: &Identity) -> Result<User> {
        self.update(|state| state.upsert_user(identity))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        self.read(|state| state.users.get(&id).cloned())
    }

    async fn find_attempts(&self, filter: &AttemptFilter) -> Result<Vec<AttemptRecord>> {
        self.read(|state| state.find_attempts(filter))
    }

    async fn record_attempt(
        &self,
        key: &AttemptKey,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<AttemptRecord> {
        self.update(|state| (state.record_attempt(key, correct, at), true))
    }

    async fn set_hint_marker(
        &self,
        user_id: Uuid,
        verb_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.update(|state| {
            state.set_hint_marker(user_id, verb_id, expires_at);
            ((), true)
        })
    }

    async fn hint_marker_active(
        &self,
        user_id: Uuid,
        verb_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.read(|state| state.hint_marker_active(user_id, verb_id, now))
    }

    async fn clear_hint_marker(&self, user_id: Uuid, verb_id: &str) -> Result<()> {
        self.update(|state| ((), state.clear_hint_marker(user_id, verb_id, Utc::now())))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::model::ExerciseDirection;

    fn key(user_id: Uuid) -> AttemptKey {
        AttemptKey {
            user_id,
            verb_id: "spise".into(),
            direction: ExerciseDirection::MeaningToVerb,
        }
    }

    fn spise() -> Verb {
        Verb::from_meaning_str("spise", "spise", "eat").unwrap()
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("records.json");

        let user_id = {
            let store = FileStore::open(&path).unwrap();
            store.upsert_verbs(&[spise()]).await.unwrap();
            let user = store.upsert_user(&Identity::new("u1")).await.unwrap();
            store.record_attempt(&key(user.id), true, Utc::now()).await.unwrap();
            store.record_attempt(&key(user.id), false, Utc::now()).await.unwrap();
            user.id
        };

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.count_verbs().await.unwrap(), 1);
        let records = reopened
            .find_attempts(&AttemptFilter::for_user(user_id))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_attempts, 2);
        assert_eq!(records[0].correct_attempts, 1);

        let same_user = reopened.upsert_user(&Identity::new("u1")).await.unwrap();
        assert_eq!(same_user.id, user_id);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, "not json").unwrap();
        let err = FileStore::open(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse record store"));
    }

    #[tokio::test]
    async fn two_handles_on_one_file_keep_both_increments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let first = FileStore::open(&path).unwrap();
        let second = FileStore::open(&path).unwrap();
        let user = Uuid::new_v4();

        first.record_attempt(&key(user), true, Utc::now()).await.unwrap();
        second.record_attempt(&key(user), true, Utc::now()).await.unwrap();

        let records = FileStore::open(&path)
            .unwrap()
            .find_attempts(&AttemptFilter::for_user(user))
            .await
            .unwrap();
        assert_eq!(
            (records[0].total_attempts, records[0].correct_attempts),
            (2, 2)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_handles_serialize_on_the_file_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let user = Uuid::new_v4();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::new(FileStore::open(&path).unwrap());
                tokio::spawn(async move {
                    for _ in 0..5 {
                        store.record_attempt(&key(user), true, Utc::now()).await.unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let records = FileStore::open(&path)
            .unwrap()
            .find_attempts(&AttemptFilter::for_user(user))
            .await
            .unwrap();
        assert_eq!(records[0].total_attempts, 20);
        assert_eq!(records[0].correct_attempts, 20);
    }

    #[tokio::test]
    async fn idle_handle_does_not_erase_newer_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let reader = FileStore::open(&path).unwrap();
        let writer = FileStore::open(&path).unwrap();

        let user = writer.upsert_user(&Identity::new("u1")).await.unwrap();
        writer.record_attempt(&key(user.id), true, Utc::now()).await.unwrap();

        let seen = reader
            .find_attempts(&AttemptFilter::for_user(user.id))
            .await
            .unwrap();
        assert_eq!(seen.len(), 1);

        reader.upsert_user(&Identity::new("u2")).await.unwrap();
        let records = writer
            .find_attempts(&AttemptFilter::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn failed_write_leaves_no_state() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();
        let store = FileStore::open(blocker.join("records.json")).unwrap();
        let user = Uuid::new_v4();

        assert!(store.record_attempt(&key(user), true, Utc::now()).await.is_err());
        assert!(store
            .find_attempts(&AttemptFilter::for_user(user))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unchanged_seed_does_not_rewrite_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let store = FileStore::open(&path).unwrap();
        store.upsert_verbs(&[spise()]).await.unwrap();
        store.upsert_user(&Identity::new("u1")).await.unwrap();

        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(old)
            .unwrap();

        store.upsert_verbs(&[spise()]).await.unwrap();
        store.upsert_user(&Identity::new("u1")).await.unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), old);
    }
}
