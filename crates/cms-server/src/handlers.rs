//! HTTP handlers.
//!
//! Each handler checks out the caller's session, runs one `CmsService`
//! operation against it, and stores it back. Redirect-class failures
//! (missing document, not signed in) become a flash plus `303` to `/`;
//! form errors answer `422` with the message. Gated handlers check the
//! session before they look at the request body.

use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use cms_core::{AccessGuard, CmsError, CmsService, Disposition, Session};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ServerError;
use crate::session::{SessionHandle, SessionStore};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub cms: CmsService,
    pub sessions: Arc<SessionStore>,
}

#[derive(Deserialize)]
pub struct NameForm {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
pub struct ContentForm {
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub storage: &'static str,
    pub sessions: usize,
}

/// Index listing.
#[derive(Serialize)]
pub struct IndexResponse {
    pub documents: Vec<String>,
    pub username: Option<String>,
    pub message: Option<String>,
}

fn home() -> Response {
    Redirect::to("/").into_response()
}

fn form<T>(form: Result<Form<T>, FormRejection>) -> Result<T, ServerError> {
    form.map(|Form(inner)| inner)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

/// Turn an operation result into a response and persist the session.
fn finish(
    state: &AppState,
    mut handle: SessionHandle,
    result: Result<Response, ServerError>,
) -> Response {
    let mut response = match result {
        Ok(response) => response,
        Err(ServerError::Cms(err)) if err.disposition() == Disposition::Redirect => {
            debug!("Redirecting with flash: {}", err);
            handle.session.flash(err.to_string());
            home()
        }
        Err(err) => err.into_response(),
    };

    if let Some(cookie) = state.sessions.save(handle) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

/// Parse a gated form, reporting a missing sign-in ahead of a bad body.
fn signed_in_form<T>(
    session: &Session,
    body: Result<Form<T>, FormRejection>,
) -> Result<T, ServerError> {
    AccessGuard::require_signed_in(session)?;
    form(body)
}

fn mutated(result: Result<(), CmsError>) -> Result<Response, ServerError> {
    result.map(|()| home()).map_err(ServerError::from)
}

/// GET /health - Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        storage: state.cms.documents().backend_name(),
        sessions: state.sessions.len(),
    })
}

/// GET / - List documents and surface the pending flash once.
pub async fn index_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut handle = state.sessions.load(&headers);
    let result = state.cms.list_documents().await.map(|documents| {
        let session: &mut Session = &mut handle.session;
        Json(IndexResponse {
            documents,
            username: session.username.clone(),
            message: session.take_message(),
        })
        .into_response()
    });
    finish(&state, handle, result.map_err(ServerError::from))
}

/// GET /documents/{name} - View a document.
pub async fn read_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    let handle = state.sessions.load(&headers);
    let result = state.cms.read_document(&name).await.map(|rendered| {
        (
            StatusCode::OK,
            [(CONTENT_TYPE, rendered.content_type)],
            rendered.body,
        )
            .into_response()
    });
    finish(&state, handle, result.map_err(ServerError::from))
}

/// GET /documents/{name}/edit - Raw content for the edit form.
pub async fn edit_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    let handle = state.sessions.load(&headers);
    let result = state
        .cms
        .edit_document(&handle.session, &name)
        .await
        .map(|document| Json(document).into_response());
    finish(&state, handle, result.map_err(ServerError::from))
}

/// POST /documents - Create an empty document.
pub async fn create_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Form<NameForm>, FormRejection>,
) -> Response {
    let mut handle = state.sessions.load(&headers);
    let result = match signed_in_form(&handle.session, body) {
        Ok(NameForm { name }) => mutated(state.cms.create_document(&mut handle.session, &name).await),
        Err(e) => Err(e),
    };
    finish(&state, handle, result)
}

/// POST /documents/{name} - Save edited content.
pub async fn update_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    body: Result<Form<ContentForm>, FormRejection>,
) -> Response {
    let mut handle = state.sessions.load(&headers);
    let result = match signed_in_form(&handle.session, body) {
        Ok(ContentForm { content }) => mutated(
            state
                .cms
                .update_document(&mut handle.session, &name, &content)
                .await,
        ),
        Err(e) => Err(e),
    };
    finish(&state, handle, result)
}

/// POST /documents/{name}/delete
pub async fn delete_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Response {
    let mut handle = state.sessions.load(&headers);
    let result = mutated(state.cms.delete_document(&mut handle.session, &name).await);
    finish(&state, handle, result)
}

/// POST /documents/{name}/duplicate
pub async fn duplicate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(source): Path<String>,
    body: Result<Form<NameForm>, FormRejection>,
) -> Response {
    let mut handle = state.sessions.load(&headers);
    let result = match signed_in_form(&handle.session, body) {
        Ok(NameForm { name }) => mutated(
            state
                .cms
                .duplicate_document(&mut handle.session, &source, &name)
                .await,
        ),
        Err(e) => Err(e),
    };
    finish(&state, handle, result)
}

/// POST /users/signin
pub async fn signin_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Form<CredentialsForm>, FormRejection>,
) -> Response {
    let mut handle = state.sessions.load(&headers);
    let result = match form(body) {
        Ok(CredentialsForm { username, password }) => mutated(
            state
                .cms
                .sign_in(&mut handle.session, &username, &password)
                .await,
        ),
        Err(e) => Err(e),
    };
    finish(&state, handle, result)
}

/// POST /users/signout
pub async fn signout_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut handle = state.sessions.load(&headers);
    state.cms.sign_out(&mut handle.session);
    finish(&state, handle, Ok(home()))
}

/// POST /users/signup
pub async fn signup_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Form<CredentialsForm>, FormRejection>,
) -> Response {
    let mut handle = state.sessions.load(&headers);
    let result = match form(body) {
        Ok(CredentialsForm { username, password }) => mutated(
            state
                .cms
                .sign_up(&mut handle.session, &username, &password)
                .await,
        ),
        Err(e) => Err(e),
    };
    finish(&state, handle, result)
}
