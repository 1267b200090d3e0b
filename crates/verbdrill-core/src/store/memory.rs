//! In-memory record store.
//!
//! Thread-safe implementation using `RwLock`. Every mutation holds the write
//! lock for its whole read-modify-write, so concurrent upserts serialize.
//! The mutations themselves live on `State` so the file store can run them
//! against a snapshot it loaded under a file lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AttemptFilter, AttemptKey, AttemptRecord, Identity, User, Verb};
use crate::traits::RecordStore;

#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) verbs: BTreeMap<String, Verb>,
    pub(crate) users: HashMap<Uuid, User>,
    attempts: HashMap<AttemptKey, AttemptRecord>,
    hint_markers: HashMap<(Uuid, String), DateTime<Utc>>,
}

/// Serializable copy of a store's contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub verbs: Vec<Verb>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub attempts: Vec<AttemptRecord>,
    #[serde(default)]
    pub hint_markers: Vec<HintMarker>,
}

/// A persisted "hint requested" marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HintMarker {
    pub user_id: Uuid,
    pub verb_id: String,
    pub expires_at: DateTime<Utc>,
}

impl From<StoreSnapshot> for State {
    fn from(snapshot: StoreSnapshot) -> Self {
        Self {
            verbs: snapshot
                .verbs
                .into_iter()
                .map(|v| (v.id.clone(), v))
                .collect(),
            users: snapshot.users.into_iter().map(|u| (u.id, u)).collect(),
            attempts: snapshot
                .attempts
                .into_iter()
                .map(|a| (a.key(), a))
                .collect(),
            hint_markers: snapshot
                .hint_markers
                .into_iter()
                .map(|h| ((h.user_id, h.verb_id), h.expires_at))
                .collect(),
        }
    }
}

impl State {
    /// Copy the contents out, in a stable order.
    pub(crate) fn to_snapshot(&self) -> StoreSnapshot {
        let mut users: Vec<User> = self.users.values().cloned().collect();
        users.sort_by(|a, b| a.subject_id.cmp(&b.subject_id));
        let mut attempts: Vec<AttemptRecord> = self.attempts.values().cloned().collect();
        attempts.sort_by(|a, b| {
            (a.user_id, &a.verb_id, a.direction).cmp(&(b.user_id, &b.verb_id, b.direction))
        });
        let mut hint_markers: Vec<HintMarker> = self
            .hint_markers
            .iter()
            .map(|((user_id, verb_id), expires_at)| HintMarker {
                user_id: *user_id,
                verb_id: verb_id.clone(),
                expires_at: *expires_at,
            })
            .collect();
        hint_markers.sort_by(|a, b| (a.user_id, &a.verb_id).cmp(&(b.user_id, &b.verb_id)));

        StoreSnapshot {
            verbs: self.verbs.values().cloned().collect(),
            users,
            attempts,
            hint_markers,
        }
    }

    pub(crate) fn find_attempts(&self, filter: &AttemptFilter) -> Vec<AttemptRecord> {
        let mut records: Vec<AttemptRecord> = self
            .attempts
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| (&a.verb_id, a.direction).cmp(&(&b.verb_id, b.direction)));
        records
    }

    /// Returns whether any verb was added or changed.
    pub(crate) fn upsert_verbs(&mut self, verbs: &[Verb]) -> bool {
        let mut changed = false;
        for verb in verbs {
            if self.verbs.get(&verb.id) != Some(verb) {
                self.verbs.insert(verb.id.clone(), verb.clone());
                changed = true;
            }
        }
        changed
    }

    /// Returns the user and whether anything was written.
    pub(crate) fn upsert_user(&mut self, identity: &Identity) -> (User, bool) {
        let email = identity.email.clone().unwrap_or_default();
        let name = identity
            .display_name
            .clone()
            .or_else(|| email.split('@').next().map(str::to_string))
            .unwrap_or_default();

        if let Some(user) = self
            .users
            .values_mut()
            .find(|u| u.subject_id == identity.subject_id)
        {
            let changed = user.email != email || user.name != name;
            user.email = email;
            user.name = name;
            return (user.clone(), changed);
        }

        let user = User {
            id: Uuid::new_v4(),
            subject_id: identity.subject_id.clone(),
            email,
            name,
            created_at: Utc::now(),
        };
        self.users.insert(user.id, user.clone());
        (user, true)
    }

    pub(crate) fn record_attempt(
        &mut self,
        key: &AttemptKey,
        correct: bool,
        at: DateTime<Utc>,
    ) -> AttemptRecord {
        let record = self
            .attempts
            .entry(key.clone())
            .or_insert_with(|| AttemptRecord {
                user_id: key.user_id,
                verb_id: key.verb_id.clone(),
                direction: key.direction,
                total_attempts: 0,
                correct_attempts: 0,
                last_attempt_at: at,
            });
        record.total_attempts += 1;
        if correct {
            record.correct_attempts += 1;
        }
        record.last_attempt_at = at;
        record.clone()
    }

    pub(crate) fn set_hint_marker(
        &mut self,
        user_id: Uuid,
        verb_id: &str,
        expires_at: DateTime<Utc>,
    ) {
        self.hint_markers
            .insert((user_id, verb_id.to_string()), expires_at);
    }

    pub(crate) fn hint_marker_active(
        &self,
        user_id: Uuid,
        verb_id: &str,
        now: DateTime<Utc>,
    ) -> bool {
        self.hint_markers
            .get(&(user_id, verb_id.to_string()))
            .is_some_and(|expires_at| *expires_at > now)
    }

    /// Drops expired markers and the given one. Returns whether anything was removed.
    pub(crate) fn clear_hint_marker(
        &mut self,
        user_id: Uuid,
        verb_id: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let before = self.hint_markers.len();
        self.hint_markers.retain(|_, expires_at| *expires_at > now);
        self.hint_markers.remove(&(user_id, verb_id.to_string()));
        self.hint_markers.len() != before
    }
}

/// In-memory record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot.into()),
        }
    }

    /// Copy the current contents out, in a stable order.
    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(self.read()?.to_snapshot())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| anyhow!("record store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| anyhow!("record store lock poisoned"))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_verb(&self, id: &str) -> Result<Option<Verb>> {
        Ok(self.read()?.verbs.get(id).cloned())
    }

    async fn list_verbs(&self) -> Result<Vec<Verb>> {
        Ok(self.read()?.verbs.values().cloned().collect())
    }

    async fn count_verbs(&self) -> Result<usize> {
        Ok(self.read()?.verbs.len())
    }

    async fn upsert_verbs(&self, verbs: &[Verb]) -> Result<()> {
        self.write()?.upsert_verbs(verbs);
        Ok(())
    }

    async fn upsert_user(&self, identity: &Identity) -> Result<User> {
        Ok(self.write()?.upsert_user(identity).0)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_attempts(&self, filter: &AttemptFilter) -> Result<Vec<AttemptRecord>> {
        Ok(self.read()?.find_attempts(filter))
    }

    async fn record_attempt(
        &self,
        key: &AttemptKey,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<AttemptRecord> {
        Ok(self.write()?.record_attempt(key, correct, at))
    }

    async fn set_hint_marker(
        &self,
        user_id: Uuid,
        verb_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.write()?.set_hint_marker(user_id, verb_id, expires_at);
        Ok(())
    }

    async fn hint_marker_active(
        &self,
        user_id: Uuid,
        verb_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self.read()?.hint_marker_active(user_id, verb_id, now))
    }

    async fn clear_hint_marker(&self, user_id: Uuid, verb_id: &str) -> Result<()> {
        self.write()?.clear_hint_marker(user_id, verb_id, Utc::now());
        Ok(())
    }
}
