//! Cookie-keyed session table.
//!
//! The cookie carries only a random id; session contents stay server-side.
//! The id is reissued whenever the signed-in user changes, and sessions
//! that are blank or idle too long are dropped.

use std::time::{Duration, Instant};

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};
use cms_core::Session;
use dashmap::DashMap;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "cms_session";

/// Sessions untouched for this long are forgotten.
const SESSION_IDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// A session checked out for the duration of one request.
#[derive(Debug)]
pub struct SessionHandle {
    id: Option<String>,
    username_at_load: Option<String>,
    pub session: Session,
}

#[derive(Debug)]
struct StoredSession {
    session: Session,
    touched: Instant,
}

/// In-memory session storage shared across requests.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, StoredSession>,
    idle_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl: SESSION_IDLE_TTL,
        }
    }

    /// Look up the caller's session, or start a blank one.
    pub fn load(&self, headers: &HeaderMap) -> SessionHandle {
        let found = cookie_value(headers, SESSION_COOKIE).and_then(|id| {
            let entry = self.sessions.get(id)?;
            let live = entry.touched.elapsed() < self.idle_ttl;
            let session = entry.session.clone();
            drop(entry);

            if live {
                Some((id.to_string(), session))
            } else {
                self.sessions.remove(id);
                None
            }
        });

        match found {
            Some((id, session)) => SessionHandle {
                id: Some(id),
                username_at_load: session.username.clone(),
                session,
            },
            None => SessionHandle {
                id: None,
                username_at_load: None,
                session: Session::default(),
            },
        }
    }

    /// Store the session back and return the `Set-Cookie` value the client
    /// needs, if any.
    ///
    /// - blank sessions are removed and their cookie expired;
    /// - a change of user moves the session to a fresh id;
    /// - new non-blank sessions get a fresh id.
    pub fn save(&self, handle: SessionHandle) -> Option<HeaderValue> {
        let SessionHandle {
            id,
            username_at_load,
            session,
        } = handle;

        if session == Session::default() {
            return id.and_then(|old| {
                self.sessions.remove(&old);
                HeaderValue::from_str(&expired_cookie()).ok()
            });
        }

        let stored = StoredSession {
            session,
            touched: Instant::now(),
        };
        match id {
            Some(id) if stored.session.username == username_at_load => {
                self.sessions.insert(id, stored);
                None
            }
            previous => {
                if let Some(old) = previous {
                    self.sessions.remove(&old);
                }
                self.purge_idle();

                let id = Uuid::new_v4().to_string();
                let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
                self.sessions.insert(id, stored);
                HeaderValue::from_str(&cookie).ok()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    fn purge_idle(&self) {
        let ttl = self.idle_ttl;
        self.sessions.retain(|_, stored| stored.touched.elapsed() < ttl);
    }
}

fn expired_cookie() -> String {
    format!(
        "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax",
        SESSION_COOKIE
    )
}

/// Find a cookie by name across all `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
