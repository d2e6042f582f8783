//! Per-visitor session state and the access guard over it.
//!
//! The transport layer owns persistence of a [`Session`]; this module only
//! reads and writes its two logical fields. Sessions are passed explicitly
//! into every operation.

use serde::{Deserialize, Serialize};

use crate::error::CmsError;

pub const WELCOME_MESSAGE: &str = "Welcome!";
pub const SIGNED_OUT_MESSAGE: &str = "You have been signed out.";

/// Session fields the service cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: Option<String>,
    pub message: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot message, replacing any pending one.
    pub fn flash(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Take the pending message. It will not be returned again.
    pub fn take_message(&mut self) -> Option<String> {
        self.message.take()
    }

    pub fn state(&self) -> AuthState<'_> {
        match self.username.as_deref() {
            Some(username) => AuthState::Authenticated(username),
            None => AuthState::Anonymous,
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.username.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState<'a> {
    Anonymous,
    Authenticated(&'a str),
}

/// Authorization transitions over a session's `username`.
pub struct AccessGuard;

impl AccessGuard {
    /// Anonymous → Authenticated.
    pub fn sign_in(session: &mut Session, username: &str) {
        session.username = Some(username.to_string());
        session.flash(WELCOME_MESSAGE);
    }

    /// Authenticated → Anonymous.
    pub fn sign_out(session: &mut Session) {
        session.username = None;
        session.flash(SIGNED_OUT_MESSAGE);
    }

    /// Pass through for authenticated sessions; `Unauthorized` otherwise.
    ///
    /// Must run before any other validation of a mutating request.
    pub fn require_signed_in(session: &Session) -> Result<&str, CmsError> {
        match session.state() {
            AuthState::Authenticated(username) => Ok(username),
            AuthState::Anonymous => Err(CmsError::Unauthorized),
        }
    }
}
