use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Redirect;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use hearth_booking::DraftReservation;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "hearth_session";

/// Everything a browser session carries between requests. The draft is the
/// booking flow's only cross-request state; the flash is a one-shot message
/// consumed by the next page view.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub draft: DraftReservation,
    pub flash: Option<String>,
    pub user_id: Option<i64>,
}

struct Entry {
    data: SessionData,
    expires_at: DateTime<Utc>,
}

/// In-process session store keyed by an opaque cookie token. Expired
/// entries are dropped on access; there is no background sweep. Each
/// persist slides the expiry forward.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, Entry>>>,
    ttl: Duration,
    cookie_secure: bool,
}

impl SessionStore {
    pub fn new(ttl_seconds: u64, cookie_secure: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl: Duration::seconds(ttl_seconds as i64),
            cookie_secure,
        }
    }

    fn load(&self, id: Uuid) -> Option<SessionData> {
        let mut sessions = self.inner.lock().expect("session store lock poisoned");
        match sessions.get(&id) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.data.clone()),
            Some(_) => {
                sessions.remove(&id);
                None
            }
            None => None,
        }
    }

    fn cookie_id(jar: &CookieJar) -> Option<Uuid> {
        jar.get(SESSION_COOKIE)
            .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
    }

    /// Resolve the inbound cookie to a session, minting a fresh empty one
    /// when the cookie is absent, unknown, or expired. Nothing is stored
    /// until [`persist`](Self::persist) runs.
    pub fn resolve(&self, jar: &CookieJar) -> (Uuid, SessionData) {
        if let Some(id) = Self::cookie_id(jar) {
            if let Some(data) = self.load(id) {
                return (id, data);
            }
        }
        (Uuid::new_v4(), SessionData::default())
    }

    /// Store the session and hand back a jar that sets its cookie.
    pub fn persist(&self, jar: CookieJar, id: Uuid, data: SessionData) -> CookieJar {
        let expires_at = Utc::now() + self.ttl;
        self.inner
            .lock()
            .expect("session store lock poisoned")
            .insert(id, Entry { data, expires_at });
        jar.add(self.build_cookie(id))
    }

    /// Move the session to a fresh token, dropping the old one. Run at
    /// privilege changes so a pre-login token never outlives the login.
    pub fn rotate(&self, jar: CookieJar, old: Uuid, data: SessionData) -> (Uuid, CookieJar) {
        self.inner
            .lock()
            .expect("session store lock poisoned")
            .remove(&old);
        let id = Uuid::new_v4();
        let jar = self.persist(jar, id, data);
        (id, jar)
    }

    /// Drop the session and expire its cookie.
    pub fn destroy(&self, jar: CookieJar, id: Uuid) -> CookieJar {
        self.inner
            .lock()
            .expect("session store lock poisoned")
            .remove(&id);
        let mut removal = Cookie::from(SESSION_COOKIE);
        removal.set_path("/");
        jar.remove(removal)
    }

    /// User id carried by the request's session, if it is logged in.
    pub fn authenticated_user(&self, jar: &CookieJar) -> Option<i64> {
        Self::cookie_id(jar)
            .and_then(|id| self.load(id))
            .and_then(|data| data.user_id)
    }

    /// Set a one-shot flash message and bounce the browser, persisting the
    /// session on the way out.
    pub fn flash_redirect(
        &self,
        jar: CookieJar,
        id: Uuid,
        mut data: SessionData,
        message: &str,
        to: &str,
    ) -> (CookieJar, Redirect) {
        data.flash = Some(message.to_string());
        let jar = self.persist(jar, id, data);
        (jar, Redirect::to(to))
    }

    fn build_cookie(&self, id: Uuid) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, id.to_string());
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_secure(self.cookie_secure);
        cookie
    }
}

/// Extractor for the admin surface: the session must carry a logged-in
/// user id, otherwise the request ends with a 401.
pub struct AdminUser(pub i64);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        state
            .sessions
            .authenticated_user(&jar)
            .map(AdminUser)
            .ok_or_else(|| ApiError::Unauthorized("authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jar_with(id: Uuid) -> CookieJar {
        CookieJar::new().add(Cookie::new(SESSION_COOKIE, id.to_string()))
    }

    #[test]
    fn test_persist_then_resolve_round_trips() {
        let store = SessionStore::new(3600, false);
        let (id, mut data) = store.resolve(&CookieJar::new());
        data.flash = Some("hello".to_string());
        store.persist(CookieJar::new(), id, data);

        let (resolved, data) = store.resolve(&jar_with(id));
        assert_eq!(resolved, id);
        assert_eq!(data.flash.as_deref(), Some("hello"));
    }

    #[test]
    fn test_unknown_cookie_mints_a_fresh_session() {
        let store = SessionStore::new(3600, false);
        let stranger = Uuid::new_v4();
        let (id, data) = store.resolve(&jar_with(stranger));
        assert_ne!(id, stranger);
        assert!(data.flash.is_none());
    }

    #[test]
    fn test_expired_session_is_dropped_on_access() {
        let store = SessionStore::new(0, false);
        let id = Uuid::new_v4();
        store.persist(CookieJar::new(), id, SessionData::default());

        let (resolved, _) = store.resolve(&jar_with(id));
        assert_ne!(resolved, id);
    }

    #[test]
    fn test_rotate_invalidates_the_old_token() {
        let store = SessionStore::new(3600, false);
        let old = Uuid::new_v4();
        let mut data = SessionData::default();
        data.user_id = Some(7);
        store.persist(CookieJar::new(), old, data.clone());

        let (fresh, _jar) = store.rotate(CookieJar::new(), old, data);
        assert_ne!(fresh, old);
        assert!(store.load(old).is_none());
        assert_eq!(store.load(fresh).unwrap().user_id, Some(7));
    }

    #[test]
    fn test_destroy_removes_entry_and_expires_cookie() {
        let store = SessionStore::new(3600, false);
        let id = Uuid::new_v4();
        store.persist(CookieJar::new(), id, SessionData::default());

        let jar = store.destroy(jar_with(id), id);
        assert!(store.load(id).is_none());
        // The removal cookie is what tells the browser to forget it.
        assert!(jar.get(SESSION_COOKIE).is_none());
    }

    #[test]
    fn test_authenticated_user_requires_a_user_id() {
        let store = SessionStore::new(3600, false);
        let id = Uuid::new_v4();
        store.persist(CookieJar::new(), id, SessionData::default());
        assert_eq!(store.authenticated_user(&jar_with(id)), None);

        let mut data = SessionData::default();
        data.user_id = Some(3);
        store.persist(CookieJar::new(), id, data);
        assert_eq!(store.authenticated_user(&jar_with(id)), Some(3));
    }
}
