//! Shared harness for HTTP API tests.

#![allow(dead_code)]

use std::path::Path;

use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use stowage::{BlobStore, Config, Database, WebServer};

pub const JWT_SECRET: &str = "test-secret-key-for-testing-only";
pub const PASSWORD: &str = "password123";

/// A server over an in-memory database and a temporary blob directory.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub storage: BlobStore,
    _temp_dir: TempDir,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.auth.jwt_secret = JWT_SECRET.to_string();
    config.auth.access_token_expiry_secs = 900;
    config.storage.max_upload_size_mb = 1;
    config.listing.default_page_size = 20;
    config.listing.max_page_size = 50;
    config
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_max_blob_size(1024 * 1024).await
    }

    pub async fn with_max_blob_size(max_blob_size: u64) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open_in_memory()
            .await
            .expect("Failed to create test database");
        let storage = BlobStore::new(temp_dir.path().join("blobs"), max_blob_size)
            .expect("Failed to create blob store");

        let router = WebServer::new(&test_config(), db.clone(), storage.clone())
            .expect("Failed to create web server")
            .router();
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            db,
            storage,
            _temp_dir: temp_dir,
        }
    }

    /// Register a user and return the access token.
    pub async fn register(&self, email: &str) -> String {
        let response = self
            .server
            .post("/api/auth/register")
            .json(&json!({ "email": email, "password": PASSWORD }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        response.json::<Value>()["data"]["access_token"]
            .as_str()
            .expect("No access token")
            .to_string()
    }

    /// Create a folder and return its JSON representation.
    pub async fn create_folder(&self, token: &str, name: &str, parent_id: Option<i64>) -> Value {
        let response = self
            .server
            .post("/api/folders")
            .add_header(AUTHORIZATION, bearer(token))
            .json(&json!({ "name": name, "parent_id": parent_id }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    /// Upload a file as the `file` part.
    pub async fn upload(
        &self,
        token: &str,
        folder_id: Option<i64>,
        file_name: &str,
        content: &[u8],
    ) -> TestResponse {
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(content.to_vec()).file_name(file_name.to_string()),
        );
        self.send_upload(token, folder_id, form).await
    }

    /// Upload a multipart form.
    pub async fn send_upload(
        &self,
        token: &str,
        folder_id: Option<i64>,
        form: MultipartForm,
    ) -> TestResponse {
        let path = match folder_id {
            Some(id) => format!("/api/files/upload?folderId={id}"),
            None => "/api/files/upload".to_string(),
        };
        self.server
            .post(&path)
            .add_header(AUTHORIZATION, bearer(token))
            .multipart(form)
            .await
    }

    /// Upload a file and return its id.
    pub async fn upload_ok(
        &self,
        token: &str,
        folder_id: Option<i64>,
        file_name: &str,
        content: &[u8],
    ) -> i64 {
        let response = self.upload(token, folder_id, file_name, content).await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["data"]["id"]
            .as_i64()
            .expect("No file id")
    }

    /// GET with a bearer token.
    pub async fn get(&self, token: &str, path: &str) -> TestResponse {
        self.server
            .get(path)
            .add_header(AUTHORIZATION, bearer(token))
            .await
    }

    /// DELETE with a bearer token.
    pub async fn delete(&self, token: &str, path: &str) -> TestResponse {
        self.server
            .delete(path)
            .add_header(AUTHORIZATION, bearer(token))
            .await
    }

    /// Number of blobs currently in the store.
    pub fn blob_count(&self) -> usize {
        count_files(self.storage.root())
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| {
            let path = e.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}
