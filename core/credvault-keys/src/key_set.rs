use crate::error::{KeyError, KeyResult};
use credvault_crypto::KeyProxy;
use credvault_types::KeyUuid;
use std::collections::HashMap;

/// The resolved keys: one active, the rest inactive but still able to
/// decrypt. Built once at startup and never modified.
#[derive(Debug)]
pub struct EncryptionKeySet {
    active: KeyUuid,
    keys: HashMap<KeyUuid, KeyProxy>,
    order: Vec<KeyUuid>,
    unmatched: Vec<KeyUuid>,
}

impl EncryptionKeySet {
    /// `keys` keeps configuration order. `unmatched` lists canaries that no
    /// configured key claimed.
    pub fn new(
        active: KeyUuid,
        keys: Vec<(KeyUuid, KeyProxy)>,
        unmatched: Vec<KeyUuid>,
    ) -> KeyResult<Self> {
        let order: Vec<KeyUuid> = keys.iter().map(|(uuid, _)| *uuid).collect();
        let map: HashMap<KeyUuid, KeyProxy> = keys.into_iter().collect();
        if map.len() != order.len() {
            return Err(KeyError::KeyResolution("duplicate key identifier".into()));
        }
        if !map.contains_key(&active) {
            return Err(KeyError::KeyResolution(format!(
                "active key {active} is not among the resolved keys"
            )));
        }
        Ok(Self {
            active,
            keys: map,
            order,
            unmatched,
        })
    }

    pub fn active_key_uuid(&self) -> KeyUuid {
        self.active
    }

    pub fn active_key(&self) -> &KeyProxy {
        &self.keys[&self.active]
    }

    pub fn get(&self, uuid: &KeyUuid) -> Option<&KeyProxy> {
        self.keys.get(uuid)
    }

    pub fn contains(&self, uuid: &KeyUuid) -> bool {
        self.keys.contains_key(uuid)
    }

    /// All known identifiers, in configuration order.
    pub fn key_uuids(&self) -> &[KeyUuid] {
        &self.order
    }

    /// Known identifiers other than the active one, in configuration order.
    pub fn inactive_key_uuids(&self) -> Vec<KeyUuid> {
        self.order.iter().copied().filter(|u| *u != self.active).collect()
    }

    /// Persisted canaries with no configured key. Data written under these
    /// keys cannot be decrypted by this process.
    pub fn unmatched_canaries(&self) -> &[KeyUuid] {
        &self.unmatched
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
