use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth;

/// Default session lifetime: one week.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

/// An authenticated session. Created at login, resolved from the bearer
/// token on every call, dropped at logout or expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: UserProfile,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A freshly opened session together with the only copy of its token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub session: Session,
}

/// Live sessions keyed by the SHA-256 of their token. The plain token is
/// never stored.
#[derive(Debug)]
pub struct SessionRegistry {
    ttl: Duration,
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: HashMap::new(),
        }
    }

    pub fn open(&mut self, user: UserProfile, now: DateTime<Utc>) -> IssuedSession {
        let (access_token, token_hash) = auth::generate_access_token();
        let session = Session {
            user,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        self.sessions.insert(token_hash, session.clone());
        IssuedSession {
            access_token,
            session,
        }
    }

    /// Look up a token. Expired sessions are evicted and reported as absent.
    pub fn resolve(&mut self, access_token: &str, now: DateTime<Utc>) -> Option<Session> {
        let token_hash = auth::hash_token(access_token);
        match self.sessions.get(&token_hash) {
            Some(session) if session.is_expired(now) => {
                self.sessions.remove(&token_hash);
                None
            }
            Some(session) => Some(session.clone()),
            None => None,
        }
    }

    /// End the session behind `access_token`. Returns whether one existed.
    pub fn close(&mut self, access_token: &str) -> bool {
        self.sessions
            .remove(&auth::hash_token(access_token))
            .is_some()
    }

    /// Drop every session that expired before `now`. Returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired(now));
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: Uuid::now_v7(),
            email: "sam@example.com".to_string(),
            full_name: "Sam Rivera".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn open_then_resolve() {
        let mut registry = SessionRegistry::default();
        let now = Utc::now();
        let issued = registry.open(profile(), now);
        let session = registry.resolve(&issued.access_token, now).unwrap();
        assert_eq!(session.user.email, "sam@example.com");
        assert_eq!(session.expires_at, now + Duration::hours(DEFAULT_SESSION_TTL_HOURS));
    }

    #[test]
    fn close_clears_session() {
        let mut registry = SessionRegistry::default();
        let now = Utc::now();
        let issued = registry.open(profile(), now);
        assert!(registry.close(&issued.access_token));
        assert!(registry.resolve(&issued.access_token, now).is_none());
        assert!(!registry.close(&issued.access_token));
    }

    #[test]
    fn expired_session_is_evicted_on_resolve() {
        let mut registry = SessionRegistry::new(Duration::minutes(5));
        let now = Utc::now();
        let issued = registry.open(profile(), now);
        assert!(
            registry
                .resolve(&issued.access_token, now + Duration::minutes(5))
                .is_none()
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_token_resolves_to_none() {
        let mut registry = SessionRegistry::default();
        assert!(registry.resolve("melvis_at_nope", Utc::now()).is_none());
    }

    #[test]
    fn purge_only_removes_expired() {
        let mut registry = SessionRegistry::new(Duration::minutes(10));
        let now = Utc::now();
        registry.open(profile(), now - Duration::minutes(20));
        let live = registry.open(profile(), now);
        assert_eq!(registry.purge_expired(now), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve(&live.access_token, now).is_some());
    }

    #[test]
    fn tokens_are_stored_hashed() {
        let mut registry = SessionRegistry::default();
        let issued = registry.open(profile(), Utc::now());
        assert!(!registry.sessions.contains_key(&issued.access_token));
        assert!(
            registry
                .sessions
                .contains_key(&auth::hash_token(&issued.access_token))
        );
    }
}
