//! # Sessions
//!
//! Server-side sessions correlated to the browser through a signed cookie.
//!
//! - `manager`: the middleware that loads a session before dispatch and
//!   persists it afterwards, with touch-after debouncing
//! - `flash`: one-shot messages queued in the session
//!
//! Records are stored through the `tower_sessions::SessionStore` trait, so
//! the SQLite store from `tower-sessions-sqlx-store` backs production and
//! `tower_sessions::MemoryStore` backs tests.

pub mod flash;
pub mod manager;
#[cfg(test)]
pub(crate) mod testing;

pub use manager::{manage_session, SessionManager};

use crate::error::AppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session layer is not installed")]
    MissingLayer,

    #[error("session value could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Where the session of the current request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Allocated for this request; nothing stored yet
    New,
    /// Loaded from the store; `expiry_date` as last persisted
    Loaded { expiry_date: OffsetDateTime },
    /// The store failed on load; never persisted
    Ephemeral,
}

#[derive(Debug)]
struct Inner {
    id: Id,
    data: HashMap<String, Value>,
    origin: Origin,
    modified: bool,
    /// Stored ids rotated away during this request
    retired: Vec<Id>,
}

/// Everything the manager needs to persist a session after dispatch
#[derive(Debug, Clone)]
pub(crate) struct Pending {
    pub id: Id,
    pub data: HashMap<String, Value>,
    pub origin: Origin,
    pub modified: bool,
    pub retired: Vec<Id>,
}

/// Handle to the current request's session
///
/// Cloning is cheap; all clones share the same record. Handlers extract it
/// directly: `async fn handler(session: Session)`.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
}

impl Session {
    fn with(id: Id, data: HashMap<String, Value>, origin: Origin) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                id,
                data,
                origin,
                modified: false,
                retired: Vec::new(),
            })),
        }
    }

    pub(crate) fn anonymous() -> Self {
        Self::with(Id::default(), HashMap::new(), Origin::New)
    }

    pub(crate) fn from_record(record: Record) -> Self {
        Self::with(
            record.id,
            record.data,
            Origin::Loaded {
                expiry_date: record.expiry_date,
            },
        )
    }

    pub(crate) fn ephemeral(id: Id) -> Self {
        Self::with(id, HashMap::new(), Origin::Ephemeral)
    }

    pub fn id(&self) -> Id {
        self.inner.lock().id
    }

    pub fn is_modified(&self) -> bool {
        self.inner.lock().modified
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        let inner = self.inner.lock();
        match inner.data.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Store a value; the session only counts as modified if the value changed
    pub fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<(), SessionError> {
        let value = serde_json::to_value(value)?;
        let mut inner = self.inner.lock();
        if inner.data.get(key) != Some(&value) {
            inner.data.insert(key.to_string(), value);
            inner.modified = true;
        }
        Ok(())
    }

    pub fn remove<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        match self.remove_value(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn remove_value(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.lock();
        let removed = inner.data.remove(key);
        if removed.is_some() {
            inner.modified = true;
        }
        removed
    }

    /// Give the session a fresh id, keeping its data
    ///
    /// Used on login and logout so a pre-authentication id cannot be reused.
    /// The previous record is deleted when the session is committed.
    pub fn cycle_id(&self) {
        let mut inner = self.inner.lock();
        if matches!(inner.origin, Origin::Loaded { .. }) {
            let old = inner.id;
            inner.retired.push(old);
        }
        inner.id = Id::default();
        inner.modified = true;
    }

    pub(crate) fn pending(&self) -> Pending {
        let inner = self.inner.lock();
        Pending {
            id: inner.id,
            data: inner.data.clone(),
            origin: inner.origin,
            modified: inner.modified,
            retired: inner.retired.clone(),
        }
    }

    /// Record the id the store settled on (create may reassign it on collision)
    pub(crate) fn persisted_as(&self, id: Id) {
        self.inner.lock().id = id;
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AppError::Session(SessionError::MissingLayer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn loaded() -> Session {
        Session::from_record(Record {
            id: Id::default(),
            data: HashMap::new(),
            expiry_date: OffsetDateTime::now_utc() + Duration::days(7),
        })
    }

    #[test]
    fn insert_marks_modified_only_on_change() {
        let session = loaded();
        session.insert("user", "abc").unwrap();
        assert!(session.is_modified());

        let session = Session::from_record(Record {
            id: Id::default(),
            data: HashMap::from([("user".to_string(), Value::from("abc"))]),
            expiry_date: OffsetDateTime::now_utc() + Duration::days(7),
        });
        session.insert("user", "abc").unwrap();
        assert!(!session.is_modified());
    }

    #[test]
    fn values_round_trip_through_the_handle() {
        let session = Session::anonymous();
        session.insert("count", 3u32).unwrap();

        assert_eq!(session.get::<u32>("count").unwrap(), Some(3));
        assert_eq!(session.remove::<u32>("count").unwrap(), Some(3));
        assert_eq!(session.get::<u32>("count").unwrap(), None);
    }

    #[test]
    fn removing_a_missing_key_changes_nothing() {
        let session = loaded();
        assert!(session.remove_value("nothing").is_none());
        assert!(!session.is_modified());
    }

    #[test]
    fn decoding_into_the_wrong_type_is_an_error() {
        let session = Session::anonymous();
        session.insert("user", "abc").unwrap();
        assert!(matches!(session.get::<u32>("user"), Err(SessionError::Codec(_))));
    }

    #[test]
    fn cycling_a_stored_session_retires_its_id() {
        let session = loaded();
        let before = session.id();
        session.cycle_id();

        let pending = session.pending();
        assert_ne!(pending.id, before);
        assert_eq!(pending.retired, vec![before]);
        assert!(pending.modified);
    }

    #[test]
    fn cycling_a_new_session_has_nothing_to_retire() {
        let session = Session::anonymous();
        session.cycle_id();
        assert!(session.pending().retired.is_empty());
    }
}
