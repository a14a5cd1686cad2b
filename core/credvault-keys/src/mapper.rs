use crate::config::{EncryptionConfig, KeyDescriptor};
use crate::error::{KeyError, KeyResult};
use crate::key_set::EncryptionKeySet;
use crate::store::CanaryStore;
use credvault_crypto::{
    EncryptionService, HardwareEncryptionService, HsmClient, KeyProxy, PasswordEncryptionService,
    ProviderKind,
};
use credvault_types::{EncryptionKeyCanary, KeyUuid};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Hardware backend over any module client.
pub type HardwareService = HardwareEncryptionService<Arc<dyn HsmClient>>;

/// Reconciles configured keys with persisted canaries.
///
/// For each configured key, in order, the canaries are tried until one
/// matches; the key then takes that canary's identifier. A key that matches
/// nothing is new: it gets a fresh identifier and a canary is written for
/// it. Canaries nobody claims are left alone and reported.
pub struct EncryptionKeyCanaryMapper {
    config: EncryptionConfig,
    store: Arc<dyn CanaryStore>,
    software: Arc<PasswordEncryptionService>,
    hardware: Option<Arc<HardwareService>>,
}

impl EncryptionKeyCanaryMapper {
    pub fn new(config: EncryptionConfig, store: Arc<dyn CanaryStore>) -> Self {
        let software = Arc::new(PasswordEncryptionService::new(config.kdf.clone()));
        Self {
            config,
            store,
            software,
            hardware: None,
        }
    }

    /// Enables descriptors with `provider: hardware`.
    pub fn with_hardware(mut self, hardware: Arc<HardwareService>) -> Self {
        self.hardware = Some(hardware);
        self
    }

    pub fn config(&self) -> &EncryptionConfig {
        &self.config
    }

    /// Resolves every configured key and picks the active one.
    ///
    /// Any error here must stop startup.
    pub fn resolve(&self) -> KeyResult<EncryptionKeySet> {
        self.config.validate()?;
        let active_index = self.config.active_index()?;
        let canaries = self.store.find_all()?;

        let mut resolved: Vec<(KeyUuid, KeyProxy)> = Vec::with_capacity(self.config.keys.len());
        let mut claimed: HashSet<KeyUuid> = HashSet::new();
        let mut active = None;

        for (index, descriptor) in self.config.keys.iter().enumerate() {
            let name = descriptor.describe(index);
            let proxy = self.proxy_for(descriptor, &name)?;

            let uuid = match find_matching_canary(&proxy, &canaries, &name)? {
                Some(uuid) => {
                    if !claimed.insert(uuid) {
                        return Err(KeyError::KeyResolution(format!(
                            "{name} resolves to key {uuid}, which an earlier entry already claimed"
                        )));
                    }
                    info!(key = %uuid, entry = %name, "Matched configured key to existing canary");
                    uuid
                }
                None => {
                    let uuid = self.create_canary(&proxy, &name)?;
                    claimed.insert(uuid);
                    info!(key = %uuid, entry = %name, "Created canary for new key");
                    uuid
                }
            };

            if index == active_index {
                active = Some(uuid);
            }
            resolved.push((uuid, proxy));
        }

        let active = active.ok_or_else(|| KeyError::KeyResolution("active key was not resolved".into()))?;

        let unmatched: Vec<KeyUuid> = canaries
            .iter()
            .map(|c| c.uuid)
            .filter(|uuid| !claimed.contains(uuid))
            .collect();
        for uuid in &unmatched {
            warn!(key = %uuid, "Canary has no configured key; data encrypted under it cannot be read");
        }

        info!(
            active = %active,
            known = resolved.len(),
            unmatched = unmatched.len(),
            "Encryption keys resolved"
        );
        EncryptionKeySet::new(active, resolved, unmatched)
    }

    fn proxy_for(&self, descriptor: &KeyDescriptor, name: &str) -> KeyResult<KeyProxy> {
        match descriptor.provider {
            ProviderKind::Software => {
                let password = descriptor
                    .password
                    .as_deref()
                    .ok_or_else(|| KeyError::InvalidConfig(format!("{name} has no password")))?;
                let key = self
                    .software
                    .create_key(password, &descriptor.salt()?)
                    .map_err(|e| KeyError::KeyResolution(format!("{name}: {e}")))?;
                let service: Arc<dyn EncryptionService> = self.software.clone();
                Ok(KeyProxy::new(key, service))
            }
            ProviderKind::Hardware => {
                let hardware = self.hardware.as_ref().ok_or_else(|| {
                    KeyError::KeyResolution(format!("{name} needs a hardware module, none is configured"))
                })?;
                let label = descriptor
                    .key_label
                    .as_deref()
                    .ok_or_else(|| KeyError::InvalidConfig(format!("{name} has no key_label")))?;
                let key = hardware
                    .open_key(label)
                    .map_err(|e| KeyError::KeyResolution(format!("{name}: {e}")))?;
                let service: Arc<dyn EncryptionService> = hardware.clone();
                Ok(KeyProxy::new(key, service))
            }
        }
    }

    fn create_canary(&self, proxy: &KeyProxy, name: &str) -> KeyResult<KeyUuid> {
        let uuid = KeyUuid::new();
        let canary = proxy
            .create_canary(uuid)
            .map_err(|e| KeyError::KeyResolution(format!("{name}: could not write canary: {e}")))?;
        self.store.save(canary)?;
        Ok(uuid)
    }
}

fn find_matching_canary(
    proxy: &KeyProxy,
    canaries: &[EncryptionKeyCanary],
    name: &str,
) -> KeyResult<Option<KeyUuid>> {
    for canary in canaries {
        let matched = proxy
            .matches_canary(canary)
            .map_err(|e| KeyError::IncorrectKeyConfiguration {
                key: name.to_string(),
                reason: e.to_string(),
            })?;
        if matched {
            return Ok(Some(canary.uuid));
        }
    }
    Ok(None)
}
