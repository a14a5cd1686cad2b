//! Configuration, shared state, and HTTP API for the credvault server.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use credvault_crypto::{hardware::status, HardwareEncryptionService, HsmClient, ProviderKind, SoftHsm};
use credvault_keys::{
    CanaryStore, EncryptionConfig, EncryptionKeyCanaryMapper, Encryptor, FileCanaryStore, HardwareService,
    InMemoryCanaryStore, KeyResult,
};
use credvault_model::{key_usage, CredentialStore, FileCredentialStore, InMemoryCredentialStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const APP_NAME: &str = "credvault";

const CANARY_FILE: &str = "canaries.json";
const CREDENTIAL_FILE: &str = "credentials.json";

/// Contents of the server's JSON configuration file.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub auth_server_url: String,
    pub encryption: EncryptionConfig,
    /// Directory holding the canary and credential files. Without it both
    /// live in memory and are lost on exit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Hardware module settings. A module is attached whenever this is set
    /// or any key uses the hardware provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware: Option<HardwareConfig>,
}

/// Settings for the hardware key module.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HardwareConfig {
    /// Module status codes that mean "not this key" when checking canaries.
    #[serde(default = "default_mismatch_codes")]
    pub mismatch_codes: Vec<u32>,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            mismatch_codes: default_mismatch_codes(),
        }
    }
}

fn default_mismatch_codes() -> Vec<u32> {
    vec![status::ENCRYPTED_DATA_INVALID]
}

impl ServerConfig {
    pub fn new(auth_server_url: impl Into<String>, encryption: EncryptionConfig) -> Self {
        Self {
            auth_server_url: auth_server_url.into(),
            encryption,
            data_dir: None,
            hardware: None,
        }
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_hardware(mut self, hardware: HardwareConfig) -> Self {
        self.hardware = Some(hardware);
        self
    }

    pub fn uses_hardware(&self) -> bool {
        self.encryption
            .keys
            .iter()
            .any(|key| key.provider == ProviderKind::Hardware)
    }

    /// The hardware backend for this configuration, if one is needed.
    ///
    /// The module is the in-process [`SoftHsm`]; its keys live as long as the
    /// process does.
    pub fn hardware_service(&self) -> Option<Arc<HardwareService>> {
        if self.hardware.is_none() && !self.uses_hardware() {
            return None;
        }
        let settings = self.hardware.clone().unwrap_or_default();
        warn!("Using the in-process hardware module; its keys do not survive a restart");
        let client: Arc<dyn HsmClient> = Arc::new(SoftHsm::new());
        Some(Arc::new(
            HardwareEncryptionService::new(client).with_mismatch_codes(settings.mismatch_codes),
        ))
    }

    /// Opens the canary and credential stores under `data_dir`, or in-memory
    /// stores when no directory is configured.
    pub fn open_stores(&self) -> Result<(Arc<dyn CanaryStore>, Arc<dyn CredentialStore>)> {
        let Some(dir) = &self.data_dir else {
            warn!("No data_dir configured; canaries and credentials are kept in memory only");
            return Ok((
                Arc::new(InMemoryCanaryStore::new()),
                Arc::new(InMemoryCredentialStore::new()),
            ));
        };
        fs::create_dir_all(dir).with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        info!(dir = %dir.display(), "Opening data files");
        let canaries = FileCanaryStore::open(dir.join(CANARY_FILE)).context("Failed to open canary store")?;
        let credentials =
            FileCredentialStore::open(dir.join(CREDENTIAL_FILE)).context("Failed to open credential store")?;
        Ok((Arc::new(canaries), Arc::new(credentials)))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse server configuration")?;
        config
            .encryption
            .validate()
            .context("Invalid encryption configuration")?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_json(&json)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AuthServerInfo {
    pub url: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct InfoResponse {
    #[serde(rename = "auth-server")]
    pub auth_server: AuthServerInfo,
    pub app: AppInfo,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct KeyUsageResponse {
    pub active_key: usize,
    pub inactive_keys: usize,
    pub unknown_keys: usize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Everything the handlers need. Built once at startup.
pub struct AppState {
    pub info: InfoResponse,
    pub encryptor: Encryptor,
    pub credentials: Arc<dyn CredentialStore>,
}

impl AppState {
    pub fn new(auth_server_url: &str, encryptor: Encryptor, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            info: InfoResponse {
                auth_server: AuthServerInfo {
                    url: auth_server_url.to_string(),
                },
                app: AppInfo {
                    name: APP_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                },
            },
            encryptor,
            credentials,
        }
    }

    /// Opens the configured stores and resolves the keys against them.
    pub fn open(config: &ServerConfig) -> Result<Self> {
        let (canaries, credentials) = config.open_stores()?;
        Self::from_config(config, canaries, credentials).context("Failed to resolve encryption keys")
    }

    /// Resolves the configured keys against `canaries` and builds the state.
    /// Any key error must stop the server from starting.
    pub fn from_config(
        config: &ServerConfig,
        canaries: Arc<dyn CanaryStore>,
        credentials: Arc<dyn CredentialStore>,
    ) -> KeyResult<Self> {
        let mut mapper = EncryptionKeyCanaryMapper::new(config.encryption.clone(), canaries);
        if let Some(hardware) = config.hardware_service() {
            mapper = mapper.with_hardware(hardware);
        }
        let keys = mapper.resolve()?;
        Ok(Self::new(
            &config.auth_server_url,
            Encryptor::new(Arc::new(keys)),
            credentials,
        ))
    }
}

async fn info_handler(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(state.info.clone())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
    })
}

async fn key_usage_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<KeyUsageResponse>, (StatusCode, Json<ErrorResponse>)> {
    match key_usage(state.credentials.as_ref(), &state.encryptor) {
        Ok(usage) => Ok(Json(KeyUsageResponse {
            active_key: usage.active_key,
            inactive_keys: usage.inactive_keys,
            unknown_keys: usage.unknown_keys,
        })),
        Err(e) => {
            warn!(error = %e, "Key usage query failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "key usage unavailable".to_string(),
                }),
            ))
        }
    }
}

/// Build the HTTP API router over the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/info", get(info_handler))
        .route("/health", get(health_handler))
        .route("/api/v1/key-usage", get(key_usage_handler))
        .with_state(state)
}
