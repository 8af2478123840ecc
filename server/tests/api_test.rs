//! HTTP round trips against an in-memory server.

use eventdeck_server::config::Config;
use eventdeck_server::handlers::{CreatedResponse, SessionResponse};
use eventdeck_server::routes::HealthResponse;
use eventdeck_server::{app, AppState};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

struct TestServer {
    base: String,
    client: Client,
}

impl TestServer {
    async fn start() -> Self {
        let state = AppState::in_memory(Config::in_memory("127.0.0.1", 0));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app(state)).await.unwrap();
        });

        Self {
            base: format!("http://{}", addr),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn register(&self, email: &str) -> SessionResponse {
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(&json!({"email": email, "password": "secret1"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }

    async fn create_event(&self, token: &str, date: &str) -> reqwest::Response {
        self.client
            .post(self.url("/collections/events/documents"))
            .bearer_auth(token)
            .json(&json!({"fields": {
                "title": "Meetup",
                "description": "Team sync",
                "date": date,
            }}))
            .send()
            .await
            .unwrap()
    }

    async fn list(&self, query: &str) -> Vec<Value> {
        self.client
            .get(self.url(&format!("/collections/events/documents{}", query)))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let server = TestServer::start().await;
    let health: HealthResponse = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.connections, 0);
}

#[tokio::test]
async fn register_create_list_patch_delete_round_trip() {
    let server = TestServer::start().await;
    let ana = server.register("ana@example.com").await;

    let signed_in: SessionResponse = server
        .client
        .post(server.url("/auth/signin"))
        .json(&json!({"email": "ana@example.com", "password": "secret1"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(signed_in.uid, ana.uid);

    let me: Value = server
        .client
        .get(server.url("/auth/me"))
        .bearer_auth(&signed_in.token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["email"], "ana@example.com");

    // Create
    let response = server.create_event(&ana.token, "12-12-2026").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let CreatedResponse { id } = response.json().await.unwrap();

    // List, all and scoped to the owner
    let all = server.list("").await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["id"], id.as_str());
    assert_eq!(all[0]["fields"]["createdBy"], ana.uid.as_str());
    assert_eq!(all[0]["fields"]["isFavorite"], false);

    let mine = server
        .list(&format!("?field=createdBy&equals={}", ana.uid))
        .await;
    assert_eq!(mine.len(), 1);
    assert!(server.list("?field=isFavorite&equals=true").await.is_empty());

    // Owner edits, anyone favorites
    let doc_url = server.url(&format!("/collections/events/documents/{}", id));
    let response = server
        .client
        .patch(&doc_url)
        .bearer_auth(&ana.token)
        .json(&json!({"fields": {"title": "Retro"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = server
        .client
        .patch(&doc_url)
        .json(&json!({"fields": {"isFavorite": true}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let doc: Value = server
        .client
        .get(&doc_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(doc["fields"]["title"], "Retro");
    assert_eq!(doc["fields"]["isFavorite"], true);
    assert_eq!(server.list("?field=isFavorite&equals=true").await.len(), 1);

    // Delete
    let response = server
        .client
        .delete(&doc_url)
        .bearer_auth(&ana.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = server.client.get(&doc_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(server.list("").await.is_empty());

    // Sign out ends the session
    let response = server
        .client
        .post(server.url("/auth/signout"))
        .bearer_auth(&ana.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = server
        .client
        .get(server.url("/auth/me"))
        .bearer_auth(&ana.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_the_owner_edits_or_deletes() {
    let server = TestServer::start().await;
    let ana = server.register("ana@example.com").await;
    let ben = server.register("ben@example.com").await;

    let CreatedResponse { id } = server
        .create_event(&ana.token, "Aug 8, 2025")
        .await
        .json()
        .await
        .unwrap();
    let doc_url = server.url(&format!("/collections/events/documents/{}", id));

    let response = server
        .client
        .delete(&doc_url)
        .bearer_auth(&ben.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server.client.delete(&doc_url).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server
        .client
        .patch(&doc_url)
        .bearer_auth(&ben.token)
        .json(&json!({"fields": {"title": "Hijacked"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert_eq!(server.list("").await.len(), 1);
}

#[tokio::test]
async fn invalid_input_is_rejected() {
    let server = TestServer::start().await;
    let ana = server.register("ana@example.com").await;

    let response = server.create_event(&ana.token, "2025-08-08").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "bad date format");

    let response = server
        .client
        .post(server.url("/collections/events/documents"))
        .json(&json!({"fields": {"title": "Meetup", "description": "Team sync"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .client
        .post(server.url("/collections/events/documents"))
        .json(&json!({"fields": {
            "title": "Meetup",
            "description": "Team sync",
            "date": "12-12-2026",
            "color": "red",
        }}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .client
        .get(server.url("/collections/notes/documents"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert!(server.list("").await.is_empty());
}

#[tokio::test]
async fn account_errors() {
    let server = TestServer::start().await;
    server.register("ana@example.com").await;

    let cases = [
        ("/auth/register", "ana@example.com", "secret1", StatusCode::CONFLICT),
        ("/auth/register", "ben@example.com", "abc", StatusCode::BAD_REQUEST),
        ("/auth/register", "not-an-email", "secret1", StatusCode::BAD_REQUEST),
        ("/auth/signin", "ana@example.com", "wrong12", StatusCode::UNAUTHORIZED),
        ("/auth/signin", "", "", StatusCode::BAD_REQUEST),
    ];

    for (path, email, password, expected) in cases {
        let response = server
            .client
            .post(server.url(path))
            .json(&json!({"email": email, "password": password}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), expected, "{path} {email}");
    }

    let response = server
        .client
        .get(server.url("/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server
        .client
        .get(server.url("/auth/me"))
        .bearer_auth("made-up")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_events_are_owned_by_nobody() {
    let server = TestServer::start().await;
    let ana = server.register("ana@example.com").await;

    let response = server
        .client
        .post(server.url("/collections/events/documents"))
        .json(&json!({"fields": {
            "title": "Open mic",
            "description": "Anyone",
            "date": "1-1-2027",
        }}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let CreatedResponse { id } = response.json().await.unwrap();

    let docs = server.list("?field=createdBy&equals=anonymous").await;
    assert_eq!(docs.len(), 1);

    let response = server
        .client
        .delete(server.url(&format!("/collections/events/documents/{}", id)))
        .bearer_auth(&ana.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
