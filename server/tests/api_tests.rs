use std::io::Write;
use std::sync::Arc;

use credvault_crypto::KdfParams;
use credvault_keys::{EncryptionConfig, InMemoryCanaryStore, KeyDescriptor, KeyError};
use credvault_model::{Credential, CredentialStore, InMemoryCredentialStore};
use credvault_server::{
    build_router, AppState, HardwareConfig, HealthResponse, InfoResponse, KeyUsageResponse, ServerConfig,
};
use credvault_types::CredentialName;

fn fast_kdf() -> KdfParams {
    KdfParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

fn test_config(keys: Vec<KeyDescriptor>) -> ServerConfig {
    ServerConfig::new(
        "https://auth.example.com:8443",
        EncryptionConfig::new(keys).with_kdf(fast_kdf()),
    )
}

fn test_state(credentials: Arc<InMemoryCredentialStore>) -> Arc<AppState> {
    let config = test_config(vec![KeyDescriptor::software("server-test").active()]);
    let state = AppState::from_config(&config, Arc::new(InMemoryCanaryStore::new()), credentials).unwrap();
    Arc::new(state)
}

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
async fn spawn_test_server(state: Arc<AppState>) -> String {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

// ── Endpoints ────────────────────────────────────────────────────

#[tokio::test]
async fn info_endpoint_returns_auth_server_and_app() {
    let base = spawn_test_server(test_state(Arc::new(InMemoryCredentialStore::new()))).await;
    let resp = reqwest::get(format!("{}/info", base)).await.unwrap();
    assert_eq!(resp.status(), 200);

    let raw: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(raw["auth-server"]["url"], "https://auth.example.com:8443");
    assert_eq!(raw["app"]["name"], "credvault");

    let body: InfoResponse = serde_json::from_value(raw).unwrap();
    assert_eq!(body.app.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn health_endpoint_reports_up() {
    let base = spawn_test_server(test_state(Arc::new(InMemoryCredentialStore::new()))).await;
    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap().to_string();
    assert!(content_type.contains("application/json"));
    let body: HealthResponse = resp.json().await.unwrap();
    assert_eq!(body.status, "UP");
}

#[tokio::test]
async fn key_usage_counts_stored_credentials() {
    let credentials = Arc::new(InMemoryCredentialStore::new());
    let state = test_state(credentials.clone());
    let name = CredentialName::new("/app/secret").unwrap();
    credentials
        .save(Credential::value(name, &state.encryptor, "v").unwrap())
        .unwrap();

    let base = spawn_test_server(state).await;
    let resp = reqwest::get(format!("{}/api/v1/key-usage", base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: KeyUsageResponse = resp.json().await.unwrap();
    assert_eq!(
        body,
        KeyUsageResponse {
            active_key: 1,
            inactive_keys: 0,
            unknown_keys: 0
        }
    );
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let base = spawn_test_server(test_state(Arc::new(InMemoryCredentialStore::new()))).await;
    let resp = reqwest::get(format!("{}/api/v1/nonexistent", base)).await.unwrap();
    assert_eq!(resp.status(), 404);
}

// ── Startup ──────────────────────────────────────────────────────

#[test]
fn startup_fails_without_active_key() {
    let config = test_config(vec![KeyDescriptor::software("a"), KeyDescriptor::software("b")]);
    let result = AppState::from_config(
        &config,
        Arc::new(InMemoryCanaryStore::new()),
        Arc::new(InMemoryCredentialStore::new()),
    );
    assert!(matches!(result, Err(KeyError::KeyResolution(_))));
}

#[test]
fn startup_reuses_canaries_across_restarts() {
    let config = test_config(vec![KeyDescriptor::software("restart").active()]);
    let canaries = Arc::new(InMemoryCanaryStore::new());
    let first = AppState::from_config(&config, canaries.clone(), Arc::new(InMemoryCredentialStore::new())).unwrap();
    let second = AppState::from_config(&config, canaries, Arc::new(InMemoryCredentialStore::new())).unwrap();
    assert_eq!(
        first.encryptor.active_key_uuid().unwrap(),
        second.encryptor.active_key_uuid().unwrap()
    );
}

#[tokio::test]
async fn hardware_active_key_starts_and_serves() {
    let config = test_config(vec![
        KeyDescriptor::hardware("hsm-1").active(),
        KeyDescriptor::software("legacy"),
    ]);
    assert!(config.uses_hardware());
    let credentials = Arc::new(InMemoryCredentialStore::new());
    let state = AppState::from_config(&config, Arc::new(InMemoryCanaryStore::new()), credentials.clone()).unwrap();
    assert_eq!(state.encryptor.key_set().unwrap().len(), 2);

    let name = CredentialName::new("/hsm/secret").unwrap();
    let cred = Credential::value(name, &state.encryptor, "sealed by module").unwrap();
    assert_eq!(cred.secret(&state.encryptor).unwrap().as_deref(), Some("sealed by module"));
    credentials.save(cred).unwrap();

    let base = spawn_test_server(Arc::new(state)).await;
    let body: KeyUsageResponse = reqwest::get(format!("{}/api/v1/key-usage", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.active_key, 1);
}

#[test]
fn software_only_config_attaches_no_hardware() {
    let config = test_config(vec![KeyDescriptor::software("only").active()]);
    assert!(config.hardware_service().is_none());
    assert!(config.with_hardware(HardwareConfig::default()).hardware_service().is_some());
}

#[test]
fn restart_with_data_dir_keeps_key_identifier_and_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(vec![KeyDescriptor::software("durable").active()]).with_data_dir(dir.path());

    let first = AppState::open(&config).unwrap();
    let name = CredentialName::new("/kept").unwrap();
    first
        .credentials
        .save(Credential::value(name.clone(), &first.encryptor, "still here").unwrap())
        .unwrap();
    let first_active = first.encryptor.active_key_uuid().unwrap();
    drop(first);

    let second = AppState::open(&config).unwrap();
    assert_eq!(second.encryptor.active_key_uuid().unwrap(), first_active);
    let kept = second.credentials.find_or_err(&name).unwrap();
    assert_eq!(kept.secret(&second.encryptor).unwrap().as_deref(), Some("still here"));
}

#[test]
fn rotated_key_still_reads_data_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let before = test_config(vec![KeyDescriptor::software("v1").active()]).with_data_dir(dir.path());
    let state = AppState::open(&before).unwrap();
    let name = CredentialName::new("/old").unwrap();
    state
        .credentials
        .save(Credential::value(name.clone(), &state.encryptor, "v1 data").unwrap())
        .unwrap();
    drop(state);

    let after = test_config(vec![KeyDescriptor::software("v2").active(), KeyDescriptor::software("v1")])
        .with_data_dir(dir.path());
    let state = AppState::open(&after).unwrap();
    let old = state.credentials.find_or_err(&name).unwrap();
    assert_eq!(old.secret(&state.encryptor).unwrap().as_deref(), Some("v1 data"));
}

// ── Configuration file ───────────────────────────────────────────

#[test]
fn config_file_is_parsed_and_validated() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "auth_server_url": "https://uaa.local",
            "encryption": {{
                "kdf": {{ "memory_cost": 1024, "time_cost": 1, "parallelism": 1 }},
                "keys": [
                    {{ "provider": "software", "password": "current", "active": true }},
                    {{ "provider": "hardware", "key_label": "hsm-key" }}
                ]
            }}
        }}"#
    )
    .unwrap();

    let config = ServerConfig::from_file(file.path()).unwrap();
    assert_eq!(config.auth_server_url, "https://uaa.local");
    assert!(config.uses_hardware());
    assert!(config.data_dir.is_none());
    assert_eq!(config.encryption.keys.len(), 2);
    assert_eq!(config.encryption.kdf.memory_cost, 1024);
}

#[test]
fn config_with_two_active_keys_is_rejected() {
    let json = r#"{
        "auth_server_url": "https://uaa.local",
        "encryption": { "keys": [
            { "provider": "software", "password": "a", "active": true },
            { "provider": "software", "password": "b", "active": true }
        ] }
    }"#;
    assert!(ServerConfig::from_json(json).is_err());
}

#[test]
fn missing_config_file_is_an_error() {
    let err = ServerConfig::from_file(std::path::Path::new("/nonexistent/credvault.json")).unwrap_err();
    assert!(err.to_string().contains("Failed to read configuration file"));
}

#[test]
fn hardware_section_defaults_mismatch_code() {
    let json = r#"{
        "auth_server_url": "https://uaa.local",
        "data_dir": "/var/lib/credvault",
        "hardware": {},
        "encryption": { "keys": [ { "provider": "hardware", "key_label": "k", "active": true } ] }
    }"#;
    let config = ServerConfig::from_json(json).unwrap();
    assert_eq!(config.hardware, Some(HardwareConfig { mismatch_codes: vec![0x40] }));
    assert_eq!(config.data_dir.as_deref(), Some(std::path::Path::new("/var/lib/credvault")));
}
