use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use taxonomy_db::config::AppConfig;
use taxonomy_db::store::ModelTermStore;
use taxonomy_db::{build_app, AppState, FieldConfiguration, MemoryStore, NewModelTerm};
use tokio::net::TcpListener;

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
    roles: Option<String>,
}

impl TestClient {
    fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            roles: None,
        }
    }

    /// Same server, sending the identity headers of an editor
    fn as_editor(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            roles: Some("authenticated,editor".to_string()),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.roles {
            Some(roles) => builder
                .header("X-User-Id", "7")
                .header("X-User-Name", "Editor")
                .header("X-User-Roles", roles),
            None => builder,
        }
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.request(reqwest::Method::POST, path)
            .json(&json)
            .send()
            .await
    }

    async fn put(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.request(reqwest::Method::PUT, path)
            .json(&json)
            .send()
            .await
    }

    async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.request(reqwest::Method::GET, path).send().await
    }

    async fn delete(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.request(reqwest::Method::DELETE, path).send().await
    }
}

/// Start the router on an ephemeral port over a fresh memory store
async fn spawn_app() -> (TestClient, MemoryStore) {
    let store = MemoryStore::new();

    let mut config = AppConfig::default();
    config.app.origin = "http://cms.test".to_string();
    config.pagination.default_limit = 2;
    config.pagination.max_limit = 3;

    let app = build_app(AppState::new(store.clone(), config));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (TestClient::new(format!("http://{}", addr)), store)
}

#[tokio::test]
async fn test_health() {
    let (client, _) = spawn_app().await;

    let response = client.get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_vocabulary_crud() {
    let (client, _) = spawn_app().await;
    let editor = client.as_editor();

    // Writes need a writer role
    let response = client
        .post("/api/vocabulary", json!({ "vocabulary": { "name": "Tags" } }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = editor
        .post(
            "/api/vocabulary",
            json!({ "vocabulary": { "name": "Tags", "description": "Free tags" } }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let id = body["vocabulary"]["id"].as_i64().unwrap();
    assert_eq!(body["vocabulary"]["name"], "Tags");
    assert_eq!(body["vocabulary"]["creatorId"], 7);
    assert_eq!(
        body["vocabulary"]["linkPermanent"],
        format!("http://cms.test/vocabulary/{}", id)
    );

    // Duplicate and blank names are rejected
    let response = editor
        .post("/api/vocabulary", json!({ "vocabulary": { "name": "Tags" } }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = editor
        .post("/api/vocabulary", json!({ "vocabulary": { "name": "  " } }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = editor
        .post("/api/vocabulary", json!({ "name": "Tags" }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client.get(&format!("/api/vocabulary/{}", id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = editor
        .put(
            &format!("/api/vocabulary/{}", id),
            json!({ "vocabulary": { "description": "Tags typed by editors" } }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["vocabulary"]["name"], "Tags");
    assert_eq!(body["vocabulary"]["description"], "Tags typed by editors");

    let response = client
        .delete(&format!("/api/vocabulary/{}", id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = editor
        .delete(&format!("/api/vocabulary/{}", id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client.get(&format!("/api/vocabulary/{}", id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = editor
        .delete(&format!("/api/vocabulary/{}", id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vocabulary_list_and_count() {
    let (client, _) = spawn_app().await;
    let editor = client.as_editor();

    for name in ["Tags", "Category", "Regions"] {
        let response = editor
            .post("/api/vocabulary", json!({ "vocabulary": { "name": name } }))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // default limit is 2, count covers every match
    let body: Value = client
        .get("/api/vocabulary?order=name%20asc")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["meta"]["count"], 3);
    let names: Vec<&str> = body["vocabulary"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Category", "Regions"]);

    let body: Value = client
        .get("/api/vocabulary?q=Reg")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["meta"]["count"], 1);
    assert_eq!(body["vocabulary"][0]["name"], "Regions");

    let body: Value = client
        .get("/api/vocabulary/count?q=a")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["meta"]["count"], 2);
}

#[tokio::test]
async fn test_term_crud() {
    let (client, _) = spawn_app().await;
    let editor = client.as_editor();

    let response = client
        .post("/api/vocabulary/Tags/term", json!({ "term": { "text": "rust" } }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // vocabulary comes from the path when the body omits it
    let response = editor
        .post("/api/vocabulary/Category/term", json!({ "term": { "text": "News" } }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let id = body["term"]["id"].as_i64().unwrap();
    assert_eq!(body["term"]["vocabularyName"], "Category");
    assert_eq!(
        body["term"]["linkPermanent"],
        format!("http://cms.test/vocabulary/Category/term/{}", id)
    );

    let response = editor
        .post("/api/vocabulary/Category/term", json!({ "term": { "text": "" } }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .get(&format!("/api/vocabulary/Category/term/{}", id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // a term is only reachable through its own vocabulary
    let response = client
        .get(&format!("/api/vocabulary/Tags/term/{}", id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = editor
        .put(
            &format!("/api/vocabulary/Category/term/{}", id),
            json!({ "term": { "description": "Daily news" } }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["term"]["text"], "News");
    assert_eq!(body["term"]["description"], "Daily news");

    let response = editor
        .delete(&format!("/api/vocabulary/Category/term/{}", id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(&format!("/api/vocabulary/Category/term/{}", id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_term_listing_filters() {
    let (client, _) = spawn_app().await;
    let editor = client.as_editor();

    for (vocabulary, text) in [
        ("Tags", "gaming"),
        ("Tags", "games"),
        ("Tags", "health"),
        ("Category", "Gaming News"),
    ] {
        let response = editor
            .post(
                &format!("/api/vocabulary/{}/term", vocabulary),
                json!({ "term": { "text": text } }),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let body: Value = client
        .get("/api/vocabulary/Tags/term?text=gam&limit=10")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["meta"]["count"], 2);
    assert_eq!(body["term"].as_array().unwrap().len(), 2);

    // limit is capped at 3
    let body: Value = client
        .get("/api/v1/term-texts?limit=50")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["meta"]["count"], 4);
    assert_eq!(body["term"].as_array().unwrap().len(), 3);

    let body: Value = client
        .get("/api/v1/term-texts?vocabulary=Tags&order=text%20asc&limit=3")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["term"], json!(["games", "gaming", "health"]));

    let body: Value = client
        .get("/api/vocabulary/Tags/term/count?q=ea")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["meta"]["count"], 1);
}

#[tokio::test]
async fn test_term_page() {
    let (client, store) = spawn_app().await;
    let editor = client.as_editor();

    let body: Value = editor
        .post(
            "/api/vocabulary/Tags/term",
            json!({ "term": { "text": "rust", "description": "Systems <language>" } }),
        )
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = body["term"]["id"].as_i64().unwrap();

    FieldConfiguration::tag("Article", "tags")
        .add_many(&store, 1, &["rust"])
        .await
        .unwrap();

    let response = client
        .get(&format!("/vocabulary/Tags/term/{}", id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("<title>rust</title>"));
    assert!(html.contains("Systems &lt;language&gt;"));
    assert!(html.contains("data-count=\"1\""));

    let response = client
        .client
        .get(format!("{}/vocabulary/Tags/term/{}", client.base_url, id))
        .header("Accept", "application/json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["term"]["text"], "rust");

    let response = client.get("/vocabulary/Tags/term/999").await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_term_page_lists_records_of_its_vocabulary_only() {
    let (client, store) = spawn_app().await;
    let editor = client.as_editor();

    let body: Value = editor
        .post("/api/vocabulary/Tags/term", json!({ "term": { "text": "rust" } }))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = body["term"]["id"].as_i64().unwrap();

    FieldConfiguration::tag("Article", "tags")
        .add_many(&store, 1, &["rust"])
        .await
        .unwrap();
    // same term id recorded under another vocabulary
    store
        .create_model_terms(vec![NewModelTerm {
            model_name: "Article".to_string(),
            model_id: 2,
            field: "category".to_string(),
            vocabulary_name: "Category".to_string(),
            term_id: id,
            order: 0,
        }])
        .await
        .unwrap();

    let html = client
        .get(&format!("/vocabulary/Tags/term/{}", id))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("data-count=\"1\""));
}
