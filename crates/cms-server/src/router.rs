use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_handler, delete_handler, duplicate_handler, edit_handler, health_handler,
    index_handler, read_handler, signin_handler, signout_handler, signup_handler,
    update_handler, AppState,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/", get(index_handler))
        .route("/documents", post(create_handler))
        .route("/documents/{name}", get(read_handler).post(update_handler))
        .route("/documents/{name}/edit", get(edit_handler))
        .route("/documents/{name}/delete", post(delete_handler))
        .route("/documents/{name}/duplicate", post(duplicate_handler))
        .route("/users/signin", post(signin_handler))
        .route("/users/signout", post(signout_handler))
        .route("/users/signup", post(signup_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use cms_core::{
        CmsError, CmsService, CredentialBackend, DocumentBackend, MemoryCredentialStore,
        MemoryDocumentStore, PasswordHasher,
    };
    use serde_json::Value;
    use tower::util::ServiceExt;

    use super::*;
    use crate::session::SessionStore;

    /// Cheap, insecure hasher so router tests stay fast.
    struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash(&self, password: &str) -> Result<String, CmsError> {
            Ok(format!("plain${}", password))
        }

        fn verify(&self, password: &str, digest: &str) -> bool {
            digest.strip_prefix("plain$") == Some(password)
        }
    }

    async fn setup() -> Router {
        let documents = Arc::new(MemoryDocumentStore::new());
        documents.write("changes.txt", "Ruby 3.3 released").await.unwrap();
        documents.write("about.md", "# Ruby is...").await.unwrap();

        let credentials = MemoryCredentialStore::new(Arc::new(PlainHasher)).unwrap();
        credentials.add("admin", "secret").await.unwrap();

        build_router(AppState {
            cms: CmsService::new(documents, Arc::new(credentials)),
            sessions: Arc::new(SessionStore::new()),
        })
    }

    fn get_req(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_req(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        let value = response
            .headers()
            .get(SET_COOKIE)
            .expect("session cookie")
            .to_str()
            .unwrap();
        value.split(';').next().unwrap().to_string()
    }

    async fn signed_in(app: &Router) -> String {
        let response = send(
            app,
            post_req("/users/signin", "username=admin&password=secret", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        session_cookie(&response)
    }

    #[tokio::test]
    async fn test_health() {
        let app = setup().await;
        let response = send(&app, get_req("/health", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["storage"], "memory");
    }

    #[tokio::test]
    async fn test_index_lists_documents() {
        let app = setup().await;
        let response = send(&app, get_req("/", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());

        let json = body_json(response).await;
        assert_eq!(json["documents"], serde_json::json!(["about.md", "changes.txt"]));
        assert_eq!(json["username"], Value::Null);
    }

    #[tokio::test]
    async fn test_viewing_text_file() {
        let app = setup().await;
        let response = send(&app, get_req("/documents/changes.txt", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "Ruby 3.3 released");
    }

    #[tokio::test]
    async fn test_viewing_markdown_file() {
        let app = setup().await;
        let response = send(&app, get_req("/documents/about.md", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/html; charset=utf-8");
        assert!(body_text(response).await.contains("<h1>Ruby is...</h1>"));
    }

    #[tokio::test]
    async fn test_missing_document_flashes_once() {
        let app = setup().await;
        let response = send(&app, get_req("/documents/nonononono.json", None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/");
        let cookie = session_cookie(&response);

        let json = body_json(send(&app, get_req("/", Some(&cookie))).await).await;
        assert_eq!(json["message"], "nonononono.json does not exist.");

        let json = body_json(send(&app, get_req("/", Some(&cookie))).await).await;
        assert_eq!(json["message"], Value::Null);
    }

    #[tokio::test]
    async fn test_anonymous_mutations_redirect_with_flash() {
        let app = setup().await;

        let attempts = [
            post_req("/documents", "name=", None),
            post_req("/documents/changes.txt", "content=x", None),
            post_req("/documents/nonexistent.txt/delete", "", None),
            post_req("/documents/changes.txt/duplicate", "name=changes.txt", None),
            get_req("/documents/changes.txt/edit", None),
        ];

        for request in attempts {
            let response = send(&app, request).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            let cookie = session_cookie(&response);

            let json = body_json(send(&app, get_req("/", Some(&cookie))).await).await;
            assert_eq!(json["message"], "You must be signed in to do that.");
        }

        let text = body_text(send(&app, get_req("/documents/changes.txt", None)).await).await;
        assert_eq!(text, "Ruby 3.3 released");
    }

    #[tokio::test]
    async fn test_sign_in_failure_is_vague() {
        let app = setup().await;

        for body in ["username=admin&password=wrongpass", "username=ghost&password=secret"] {
            let response = send(&app, post_req("/users/signin", body, None)).await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            let json = body_json(response).await;
            assert_eq!(json["error"], "Invalid credentials.");
            assert_eq!(json["code"], "INVALID_CREDENTIALS");
        }
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let app = setup().await;
        let cookie = signed_in(&app).await;

        let json = body_json(send(&app, get_req("/", Some(&cookie))).await).await;
        assert_eq!(json["username"], "admin");
        assert_eq!(json["message"], "Welcome!");

        // Create
        let response = send(&app, post_req("/documents", "name=notes.md", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        // Update
        let response = send(
            &app,
            post_req("/documents/notes.md", "content=%23+Heading", Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let json = body_json(send(&app, get_req("/", Some(&cookie))).await).await;
        assert_eq!(json["message"], "notes.md has been updated.");

        // Edit view shows raw content
        let json = body_json(send(&app, get_req("/documents/notes.md/edit", Some(&cookie))).await).await;
        assert_eq!(json["content"], "# Heading");
        assert_eq!(json["kind"], "markup");

        // Viewing renders it
        let html = body_text(send(&app, get_req("/documents/notes.md", None)).await).await;
        assert!(html.contains("<h1>Heading</h1>"));

        // Duplicate
        let response = send(
            &app,
            post_req("/documents/notes.md/duplicate", "name=copy.md", Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let html = body_text(send(&app, get_req("/documents/copy.md", None)).await).await;
        assert!(html.contains("<h1>Heading</h1>"));

        // Delete
        let response = send(
            &app,
            post_req("/documents/notes.md/delete", "", Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let json = body_json(send(&app, get_req("/", Some(&cookie))).await).await;
        assert_eq!(json["message"], "notes.md was deleted.");
        assert_eq!(
            json["documents"],
            serde_json::json!(["about.md", "changes.txt", "copy.md"])
        );
    }

    #[tokio::test]
    async fn test_create_validation_errors() {
        let app = setup().await;
        let cookie = signed_in(&app).await;

        for body in ["name=", "name=notes.json"] {
            let response = send(&app, post_req("/documents", body, Some(&cookie))).await;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body_json(response).await["error"], "A valid name is required.");
        }

        let response = send(
            &app,
            post_req("/documents/changes.txt/duplicate", "name=changes.txt", Some(&cookie)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body_json(response).await["error"],
            "changes.txt already exists."
        );
    }

    #[tokio::test]
    async fn test_signup_and_signout() {
        let app = setup().await;

        let response = send(
            &app,
            post_req("/users/signup", "username=&password=whatever123", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["code"], "EMPTY_USERNAME");

        let response = send(
            &app,
            post_req("/users/signup", "username=bob&password=short", None),
        )
        .await;
        assert_eq!(body_json(response).await["code"], "WEAK_PASSWORD");

        let response = send(
            &app,
            post_req("/users/signup", "username=bob&password=longenough", None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = session_cookie(&response);

        let json = body_json(send(&app, get_req("/", Some(&cookie))).await).await;
        assert_eq!(json["username"], "bob");

        let response = send(&app, post_req("/users/signout", "", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let signed_out = session_cookie(&response);
        assert_ne!(signed_out, cookie);

        let json = body_json(send(&app, get_req("/", Some(&signed_out))).await).await;
        assert_eq!(json["username"], Value::Null);
        assert_eq!(json["message"], "You have been signed out.");

        let json = body_json(send(&app, get_req("/", Some(&cookie))).await).await;
        assert_eq!(json["username"], Value::Null);
    }

    #[tokio::test]
    async fn test_anonymous_malformed_body_is_unauthorized() {
        let app = setup().await;
        let request = Request::builder()
            .method("POST")
            .uri("/documents")
            .body(Body::from("name=x.txt"))
            .unwrap();

        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = session_cookie(&response);

        let json = body_json(send(&app, get_req("/", Some(&cookie))).await).await;
        assert_eq!(json["message"], "You must be signed in to do that.");
        assert_eq!(json["documents"], serde_json::json!(["about.md", "changes.txt"]));
    }

    #[tokio::test]
    async fn test_sign_in_reissues_session_cookie() {
        let app = setup().await;
        let response = send(&app, post_req("/documents/x.txt/delete", "", None)).await;
        let anonymous = session_cookie(&response);

        let response = send(
            &app,
            post_req("/users/signin", "username=admin&password=secret", Some(&anonymous)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let authenticated = session_cookie(&response);
        assert_ne!(authenticated, anonymous);

        let json = body_json(send(&app, get_req("/", Some(&anonymous))).await).await;
        assert_eq!(json["username"], Value::Null);
        let json = body_json(send(&app, get_req("/", Some(&authenticated))).await).await;
        assert_eq!(json["username"], "admin");
    }

    #[tokio::test]
    async fn test_consumed_flash_sessions_are_dropped() {
        let app = setup().await;

        for _ in 0..50 {
            let response = send(&app, post_req("/documents/x.txt/delete", "", None)).await;
            let cookie = session_cookie(&response);

            let response = send(&app, get_req("/", Some(&cookie))).await;
            let expired = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
            assert!(expired.contains("Max-Age=0"));
        }

        let json = body_json(send(&app, get_req("/health", None)).await).await;
        assert_eq!(json["sessions"], 0);
    }

    #[tokio::test]
    async fn test_missing_form_content_type_is_bad_request() {
        let app = setup().await;
        let cookie = signed_in(&app).await;
        let request = Request::builder()
            .method("POST")
            .uri("/documents")
            .header(COOKIE, &cookie)
            .body(Body::from("name=x.txt"))
            .unwrap();

        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
    }
}
