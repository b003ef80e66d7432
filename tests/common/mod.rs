use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::MockServer;

use cmdstash::api::credentials::MemoryStore;
use cmdstash::api::ApiClient;
use cmdstash::config::ApiConfig;

/// Builds a client against `server` with an in-memory credential store.
#[allow(dead_code)]
pub fn client_for(server: &MockServer) -> (Arc<ApiClient>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let config = ApiConfig {
        base_url: format!("{}/api/", server.uri()),
        timeout_seconds: 5,
        ..Default::default()
    };
    let client = ApiClient::new(&config, store.clone()).expect("failed to build client");
    (Arc::new(client), store)
}

/// A saved command as the backend sends it.
#[allow(dead_code)]
pub fn wire_command(id: i64, base: &str, arguments: &str, tags: &[&str]) -> Value {
    let tags: Vec<Value> = tags
        .iter()
        .enumerate()
        .map(|(i, name)| json!({"id": i as i64 + 1, "name": name}))
        .collect();
    json!({
        "id": id,
        "userId": 1,
        "arguments": arguments,
        "note": {},
        "createdAt": "2025-03-01T10:00:00.000Z",
        "command": {"id": 1, "command": base},
        "tags": tags,
        "isFavourite": false
    })
}

/// A `GET usercommand` page envelope.
#[allow(dead_code)]
pub fn page_body(commands: Vec<Value>, page: u32, total: u64, has_next: bool) -> Value {
    json!({
        "commands": {
            "data": commands,
            "page": page,
            "pageSize": 50,
            "total": total,
            "totalPages": (total + 49) / 50,
            "hasNextPage": has_next,
            "hasPrevPage": page > 1
        }
    })
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
