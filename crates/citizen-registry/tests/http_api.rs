//! End-to-end tests against a real listener.

use std::sync::Arc;

use citizen_registry::api;
use citizen_registry::config::ServerConfig;
use citizen_registry::{CitizenStore, MemoryStore, SqliteStore};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<citizen_registry::Result<()>>,
}

impl TestServer {
    async fn start(store: Arc<dyn CitizenStore>, config: ServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel::<()>();

        let app = api::router(store, &config);
        let handle = tokio::spawn(api::serve(listener, app, async move {
            let _ = rx.await;
        }));

        Self {
            base,
            client: reqwest::Client::new(),
            shutdown: Some(tx),
            handle,
        }
    }

    async fn sqlite() -> Self {
        Self::start(
            Arc::new(SqliteStore::open_in_memory().unwrap()),
            ServerConfig::default(),
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> (StatusCode, Value) {
        let response = request.send().await.unwrap();
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.send(self.client.get(self.url(path))).await
    }

    async fn post(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    async fn put(&self, path: &str, body: &Value) -> (StatusCode, Value) {
        self.send(self.client.put(self.url(path)).json(body)).await
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        self.send(self.client.delete(self.url(path))).await
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

fn jane() -> Value {
    json!({
        "NDI_ID": "A1",
        "FirstName": "Jane",
        "LastName": "Doe",
        "DoB": "01-01-2000",
        "Email": "j@d.com",
        "Phone": "123",
        "Nationality": "X",
        "Blood_Group": "O+"
    })
}

fn kamal() -> Value {
    json!({
        "nic": "200012345678",
        "firstName": "Kamal",
        "lastName": "Perera",
        "dob": "2000-11-20",
        "email": "kamal@example.lk",
        "phone": "0771234567",
        "occupation": "Engineer, Driver , ",
        "nationality": "Sri Lankan",
        "bloodGroup": "B+"
    })
}

#[tokio::test]
async fn health_is_ok() {
    let server = TestServer::sqlite().await;

    let (status, body) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    server.stop().await;
}

#[tokio::test]
async fn create_twice_conflicts() {
    let server = TestServer::sqlite().await;

    let (status, body) = server.post("/api/citizens", &jane()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["fullName"], "Jane Doe");
    assert_eq!(body["data"]["Occupation"], json!([]));

    let (status, body) = server.post("/api/citizens", &jane()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["ok"], false);

    server.stop().await;
}

#[tokio::test]
async fn national_id_lifecycle() {
    let server = TestServer::sqlite().await;

    let (status, body) = server.post("/api/citizens", &kamal()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["Occupation"], json!(["Engineer", "Driver"]));

    let (status, body) = server.get("/api/citizens/200012345678").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["FirstName"], "Kamal");

    let (status, body) = server
        .put(
            "/api/citizens/200012345678",
            &json!({ "Phone": "0712223333", "NDI_ID": "999" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["Phone"], "0712223333");
    assert_eq!(body["data"]["NDI_ID"], "200012345678");
    assert_eq!(body["data"]["Email"], "kamal@example.lk");

    let (status, body) = server.delete("/api/citizens/200012345678").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], "200012345678");

    let (status, body) = server.get("/api/citizens/200012345678").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Citizen not found");

    server.stop().await;
}

#[tokio::test]
async fn listing_filters_by_query() {
    let server = TestServer::sqlite().await;
    server.post("/api/citizens", &jane()).await;
    server.post("/api/citizens", &kamal()).await;

    let (status, body) = server.get("/api/citizens").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["NDI_ID"], "200012345678");

    let (_, body) = server.get("/api/citizens?name=per").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["LastName"], "Perera");

    let (_, body) = server.get("/api/citizens?NDI_ID=A1").await;
    assert_eq!(body["count"], 1);

    let (_, body) = server.get("/api/citizens?email=nobody%40x.com").await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["data"], json!([]));

    server.stop().await;
}

#[tokio::test]
async fn legacy_routes_use_record_ids() {
    let server = TestServer::sqlite().await;

    let (status, created) = server.post("/citizens", &kamal()).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_i64().unwrap();

    let (status, body) = server.get(&format!("/citizens/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["NDI_ID"], "200012345678");

    let (status, body) = server.get("/citizens/65b2f0c1e4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid record id");

    let (status, body) = server
        .post("/citizens/findOne", &json!({ "nic": "200012345678" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);

    let (status, body) = server.post("/citizens/findOne", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Provide id OR nic/NDI_ID OR email to search");

    let (status, _) = server.delete(&format!("/citizens/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.delete(&format!("/citizens/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn legacy_routes_can_be_disabled() {
    let config = ServerConfig {
        legacy_routes: false,
        ..ServerConfig::default()
    };
    let server = TestServer::start(Arc::new(MemoryStore::new()), config).await;

    let (status, body) = server.get("/citizens").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["ok"], false);

    let (status, _) = server.get("/api/citizens").await;
    assert_eq!(status, StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn invalid_json_is_rejected() {
    let server = TestServer::sqlite().await;

    let request = server
        .client
        .post(server.url("/api/citizens"))
        .header("content-type", "application/json")
        .body("{not json");
    let (status, body) = server.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);

    server.stop().await;
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let config = ServerConfig {
        max_body_bytes: 64,
        ..ServerConfig::default()
    };
    let server = TestServer::start(Arc::new(MemoryStore::new()), config).await;

    let (status, _) = server.post("/api/citizens", &kamal()).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    server.stop().await;
}

#[tokio::test]
async fn missing_fields_are_reported() {
    let server = TestServer::sqlite().await;

    let (status, body) = server
        .post("/api/citizens", &json!({ "NDI_ID": "A1", "FirstName": "Jane" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Missing required fields"));

    let (_, body) = server.get("/api/citizens").await;
    assert_eq!(body["count"], 0);

    server.stop().await;
}

#[tokio::test]
async fn malformed_query_is_an_envelope() {
    let server = TestServer::sqlite().await;

    let response = server
        .client
        .get(server.url("/api/citizens?name=a&name=b"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json")));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("duplicate field"));

    server.stop().await;
}
