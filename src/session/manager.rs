//! # Session Manager
//!
//! Loads the session named by the signed cookie before dispatch and persists
//! it after the handler completes.
//!
//! ## Persistence rules
//! - new sessions are always stored and always get a cookie
//! - modified sessions are stored
//! - unmodified sessions are stored only once their touch-after interval has
//!   elapsed since the last persist, which slides the expiry forward
//! - store failures are logged and never fail the request

use super::{Origin, Session};
use crate::config::SessionSettings;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use cookie::{Cookie, CookieJar, Key};
use sha2::{Digest, Sha512};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tower_sessions::{
    session::{Id, Record},
    SessionStore,
};

/// Debounce for re-persisting sessions that were only read
#[derive(Debug, Clone, Copy)]
pub struct TouchPolicy {
    touch_after: Duration,
}

impl TouchPolicy {
    pub fn new(touch_after: Duration) -> Self {
        Self { touch_after }
    }

    /// Whether an unmodified session last persisted at `last_persisted` is
    /// due for a write at `now`
    pub fn due(&self, last_persisted: OffsetDateTime, now: OffsetDateTime) -> bool {
        now - last_persisted >= self.touch_after
    }
}

struct Settings {
    cookie_name: String,
    key: Key,
    max_age: Duration,
    touch: TouchPolicy,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    settings: Arc<Settings>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, settings: &SessionSettings, secret: &str) -> Self {
        Self {
            store,
            settings: Arc::new(Settings {
                cookie_name: settings.cookie_name.clone(),
                key: signing_key(secret),
                max_age: settings.max_age,
                touch: TouchPolicy::new(settings.touch_after),
            }),
        }
    }

    /// Resolve the session for an inbound request
    ///
    /// A missing cookie, a bad signature, an unknown id or an expired record
    /// all yield a fresh anonymous session. A store failure yields an
    /// ephemeral session that lives for this request only.
    pub async fn load(&self, headers: &HeaderMap) -> Session {
        let Some(id) = self.presented_id(headers) else {
            return Session::anonymous();
        };

        match self.store.load(&id).await {
            Ok(Some(record)) if record.expiry_date > OffsetDateTime::now_utc() => {
                Session::from_record(record)
            }
            Ok(_) => {
                tracing::debug!("session unknown or expired, starting a new one");
                Session::anonymous()
            }
            Err(err) => {
                tracing::error!(error = %err, "session store error on load, session will not be saved");
                Session::ephemeral(id)
            }
        }
    }

    /// Persist the session if required and issue the cookie
    pub async fn commit(&self, session: &Session, response: &mut Response) {
        let now = OffsetDateTime::now_utc();
        let pending = session.pending();

        match pending.origin {
            Origin::Ephemeral => return,
            Origin::New => {}
            Origin::Loaded { expiry_date } => {
                let last_persisted = expiry_date - self.settings.max_age;
                if !pending.modified && !self.settings.touch.due(last_persisted, now) {
                    return;
                }
            }
        }

        for old in &pending.retired {
            if let Err(err) = self.store.delete(old).await {
                tracing::warn!(error = %err, "failed to delete rotated session");
            }
        }

        let mut record = Record {
            id: pending.id,
            data: pending.data,
            expiry_date: now + self.settings.max_age,
        };

        // Ids never stored before go through create, which avoids collisions
        let unsaved = pending.origin == Origin::New || !pending.retired.is_empty();
        let result = if unsaved {
            self.store.create(&mut record).await
        } else {
            self.store.save(&record).await
        };

        match result {
            Ok(()) => session.persisted_as(record.id),
            Err(err) => tracing::error!(error = %err, "session store error on save"),
        }

        self.set_cookie(response, &record.id, now);
    }

    fn presented_id(&self, headers: &HeaderMap) -> Option<Id> {
        let name = self.settings.cookie_name.as_str();
        let mut jar = CookieJar::new();

        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            for cookie in Cookie::split_parse(value.to_owned()).flatten() {
                if cookie.name() == name {
                    jar.add_original(cookie);
                }
            }
        }

        let verified = jar.signed(&self.settings.key).get(name)?;
        verified.value().parse::<Id>().ok()
    }

    fn set_cookie(&self, response: &mut Response, id: &Id, now: OffsetDateTime) {
        let name = self.settings.cookie_name.clone();
        let cookie = Cookie::build((name.clone(), id.to_string()))
            .path("/")
            .http_only(true)
            .max_age(self.settings.max_age)
            .expires(now + self.settings.max_age)
            .build();

        let mut jar = CookieJar::new();
        jar.signed_mut(&self.settings.key).add(cookie);

        let Some(signed) = jar.get(&name) else { return };
        match HeaderValue::from_str(&signed.to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(err) => tracing::error!(error = %err, "session cookie is not a valid header"),
        }
    }
}

/// `cookie::Key` needs 64 bytes of key material; any secret is stretched to
/// that with SHA-512.
fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Session middleware: load before dispatch, commit after
pub async fn manage_session(
    State(manager): State<SessionManager>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = manager.load(request.headers()).await;
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;
    manager.commit(&session, &mut response).await;
    response
}
