use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use melvis_core::auth;
use melvis_core::session::{IssuedSession, Session, SessionRegistry, UserProfile};
use melvis_core::{AnswerSet, AssessmentError, ResponseCollector, ScoreResult, ScoringPolicy};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("email '{0}' is already registered")]
    EmailTaken(String),
}

#[derive(Debug, Clone)]
pub struct Account {
    pub profile: UserProfile,
    pub password_hash: String,
}

/// An attempt in progress, owned by exactly one user.
#[derive(Debug)]
pub struct AttemptEntry {
    pub owner: Uuid,
    pub started_at: DateTime<Utc>,
    /// Last time the owner read or changed the attempt
    pub last_touched: DateTime<Utc>,
    pub collector: ResponseCollector,
}

/// A completed, scored attempt kept in the user's history.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AssessmentRecord {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Selected option index keyed by question id
    #[schema(value_type = Object)]
    pub answers: AnswerSet,
    pub result: ScoreResult,
}

/// In-process storage for accounts, sessions, open attempts and history.
///
/// Each map has its own lock; no operation holds two locks at once.
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, Account>>,
    sessions: RwLock<SessionRegistry>,
    attempts: RwLock<HashMap<Uuid, AttemptEntry>>,
    history: RwLock<HashMap<Uuid, Vec<AssessmentRecord>>>,
}

impl MemoryStore {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            sessions: RwLock::new(SessionRegistry::new(session_ttl)),
            attempts: RwLock::new(HashMap::new()),
            history: RwLock::new(HashMap::new()),
        }
    }

    // --- accounts ---

    pub async fn create_account(
        &self,
        full_name: &str,
        email: &str,
        password_hash: String,
    ) -> Result<UserProfile, StoreError> {
        let key = auth::normalize_email(email);
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&key) {
            return Err(StoreError::EmailTaken(email.trim().to_string()));
        }
        let profile = UserProfile {
            id: Uuid::now_v7(),
            email: key.clone(),
            full_name: full_name.trim().to_string(),
            created_at: Utc::now(),
        };
        accounts.insert(
            key,
            Account {
                profile: profile.clone(),
                password_hash,
            },
        );
        Ok(profile)
    }

    pub async fn find_account(&self, email: &str) -> Option<Account> {
        self.accounts
            .read()
            .await
            .get(&auth::normalize_email(email))
            .cloned()
    }

    // --- sessions ---

    pub async fn open_session(&self, user: UserProfile) -> IssuedSession {
        self.sessions.write().await.open(user, Utc::now())
    }

    pub async fn resolve_session(&self, access_token: &str) -> Option<Session> {
        self.sessions
            .write()
            .await
            .resolve(access_token, Utc::now())
    }

    pub async fn close_session(&self, access_token: &str) -> bool {
        self.sessions.write().await.close(access_token)
    }

    pub async fn purge_expired_sessions(&self) -> usize {
        self.sessions.write().await.purge_expired(Utc::now())
    }

    // --- attempts ---

    pub async fn insert_attempt(&self, owner: Uuid, collector: ResponseCollector) -> Uuid {
        let attempt_id = Uuid::now_v7();
        let now = Utc::now();
        self.attempts.write().await.insert(
            attempt_id,
            AttemptEntry {
                owner,
                started_at: now,
                last_touched: now,
                collector,
            },
        );
        attempt_id
    }

    /// Run `f` against an attempt owned by `owner`. Attempts of other users
    /// are indistinguishable from missing ones.
    pub async fn with_attempt<R>(
        &self,
        owner: Uuid,
        attempt_id: Uuid,
        f: impl FnOnce(&mut AttemptEntry) -> R,
    ) -> Option<R> {
        let mut attempts = self.attempts.write().await;
        let entry = attempts
            .get_mut(&attempt_id)
            .filter(|entry| entry.owner == owner)?;
        entry.last_touched = Utc::now();
        Some(f(entry))
    }

    pub async fn remove_attempt(&self, owner: Uuid, attempt_id: Uuid) -> bool {
        let mut attempts = self.attempts.write().await;
        match attempts.get(&attempt_id) {
            Some(entry) if entry.owner == owner => attempts.remove(&attempt_id).is_some(),
            _ => false,
        }
    }

    /// Drop attempts nobody has touched for `max_idle`. Returns how many went.
    pub async fn purge_stale_attempts(&self, now: DateTime<Utc>, max_idle: Duration) -> usize {
        let mut attempts = self.attempts.write().await;
        let before = attempts.len();
        attempts.retain(|_, entry| now - entry.last_touched < max_idle);
        before - attempts.len()
    }

    /// Score an attempt and, on success, move it into the owner's history.
    /// A failed score leaves the attempt open so the respondent can fix it.
    pub async fn finish_attempt(
        &self,
        owner: Uuid,
        attempt_id: Uuid,
        policy: &ScoringPolicy,
    ) -> Option<Result<AssessmentRecord, AssessmentError>> {
        let (entry, result) = {
            let mut attempts = self.attempts.write().await;
            let entry = attempts
                .get(&attempt_id)
                .filter(|entry| entry.owner == owner)?;
            let result = match entry.collector.score(policy) {
                Ok(result) => result,
                Err(err) => return Some(Err(err)),
            };
            (attempts.remove(&attempt_id)?, result)
        };

        let record = AssessmentRecord {
            id: attempt_id,
            started_at: entry.started_at,
            completed_at: Utc::now(),
            answers: entry.collector.into_answers(),
            result,
        };

        self.history
            .write()
            .await
            .entry(owner)
            .or_default()
            .push(record.clone());
        Some(Ok(record))
    }

    /// The `limit` most recent completed assessments for `owner`, newest first.
    pub async fn history(&self, owner: Uuid, limit: usize) -> Vec<AssessmentRecord> {
        let history = self.history.read().await;
        history
            .get(&owner)
            .map(|records| records.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use melvis_core::{QuestionBank, ValidationError};

    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(Duration::hours(1))
    }

    fn collector() -> ResponseCollector {
        ResponseCollector::new(Arc::new(QuestionBank::standard()))
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let store = store();
        store
            .create_account("Ada", "ada@example.com", "hash".into())
            .await
            .unwrap();
        let err = store
            .create_account("Ada Again", " ADA@example.com", "hash".into())
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::EmailTaken("ADA@example.com".into()));
        assert!(store.find_account("Ada@Example.com").await.is_some());
    }

    #[tokio::test]
    async fn session_lifecycle() {
        let store = store();
        let user = store
            .create_account("Ada", "ada@example.com", "hash".into())
            .await
            .unwrap();
        let issued = store.open_session(user.clone()).await;
        let session = store.resolve_session(&issued.access_token).await.unwrap();
        assert_eq!(session.user, user);
        assert!(store.close_session(&issued.access_token).await);
        assert!(store.resolve_session(&issued.access_token).await.is_none());
        assert_eq!(store.purge_expired_sessions().await, 0);
    }

    #[tokio::test]
    async fn attempts_are_isolated_per_owner() {
        let store = store();
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        let id = store.insert_attempt(alice, collector()).await;

        assert!(
            store
                .with_attempt(bob, id, |e| e.collector.record_answer(1, 1))
                .await
                .is_none()
        );
        assert!(!store.remove_attempt(bob, id).await);
        store
            .with_attempt(alice, id, |e| e.collector.record_answer(1, 1))
            .await
            .unwrap()
            .unwrap();
        assert!(store.remove_attempt(alice, id).await);
    }

    #[tokio::test]
    async fn idle_attempts_are_purged() {
        let store = store();
        let owner = Uuid::now_v7();
        for _ in 0..1000 {
            store.insert_attempt(owner, collector()).await;
        }
        let later = Utc::now() + Duration::hours(2);
        assert_eq!(store.purge_stale_attempts(later, Duration::hours(1)).await, 1000);
        assert_eq!(store.purge_stale_attempts(later, Duration::hours(1)).await, 0);
    }

    #[tokio::test]
    async fn touched_attempts_survive_the_sweep() {
        let store = store();
        let owner = Uuid::now_v7();
        let active = store.insert_attempt(owner, collector()).await;
        let idle = store.insert_attempt(owner, collector()).await;
        store
            .with_attempt(owner, idle, |e| {
                e.last_touched -= Duration::hours(2);
            })
            .await
            .unwrap();
        store
            .with_attempt(owner, active, |e| e.collector.record_answer(1, 1))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.purge_stale_attempts(Utc::now(), Duration::hours(1)).await, 1);
        assert!(store.with_attempt(owner, active, |_| ()).await.is_some());
        assert!(store.with_attempt(owner, idle, |_| ()).await.is_none());
    }

    #[tokio::test]
    async fn failed_score_keeps_attempt_open() {
        let store = store();
        let owner = Uuid::now_v7();
        let id = store.insert_attempt(owner, collector()).await;

        let outcome = store
            .finish_attempt(owner, id, &ScoringPolicy::strict())
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            Err(AssessmentError::Validation(ValidationError::Incomplete { .. }))
        ));
        assert!(store.with_attempt(owner, id, |_| ()).await.is_some());
        assert!(store.history(owner, 10).await.is_empty());
    }

    #[tokio::test]
    async fn finished_attempt_moves_to_history() {
        let store = store();
        let owner = Uuid::now_v7();
        let first = store.insert_attempt(owner, collector()).await;
        let second = store.insert_attempt(owner, collector()).await;

        for id in [first, second] {
            let record = store
                .finish_attempt(owner, id, &ScoringPolicy::default())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(record.id, id);
        }

        assert!(store.with_attempt(owner, first, |_| ()).await.is_none());
        let history = store.history(owner, 10).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second);
        let newest = store.history(owner, 1).await;
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].id, second);
        assert!(
            store
                .finish_attempt(owner, first, &ScoringPolicy::default())
                .await
                .is_none()
        );
    }
}
