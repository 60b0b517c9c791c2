// src/registry/store.rs

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::config::ConfigFile;
use crate::errors::DispatchError;
use crate::types::RegistrationKind;

use super::model::Registration;

/// Read access to registrations.
pub trait RegistrationLookup: Send + Sync {
    /// The registration regardless of its enabled flag.
    fn find(&self, kind: RegistrationKind, id: &str) -> Option<Registration>;

    /// The registration, if the id is present, known and enabled.
    fn find_enabled(
        &self,
        kind: RegistrationKind,
        id: &str,
    ) -> Result<Registration, DispatchError> {
        let registration = self.find_existing(kind, id)?;
        if !registration.enabled {
            return Err(DispatchError::Disabled {
                kind,
                id: id.to_string(),
            });
        }
        Ok(registration)
    }

    /// The registration, if the id is present and known.
    fn find_existing(
        &self,
        kind: RegistrationKind,
        id: &str,
    ) -> Result<Registration, DispatchError> {
        if id.trim().is_empty() {
            return Err(DispatchError::MissingRegistrationId);
        }
        self.find(kind, id).ok_or_else(|| DispatchError::NotFound {
            kind,
            id: id.to_string(),
        })
    }
}

type Key = (RegistrationKind, String);

/// Registrations held in memory, seeded from the config file.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistrationStore {
    inner: Arc<RwLock<BTreeMap<Key, Registration>>>,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        let store = Self::new();
        for registration in cfg.registrations() {
            store.insert(registration);
        }
        debug!(count = store.len(), "registration store seeded from config");
        store
    }

    /// Insert or replace a registration. Returns the previous one, if any.
    pub fn insert(&self, registration: Registration) -> Option<Registration> {
        let key = (registration.kind, registration.id.clone());
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        map.insert(key, registration)
    }

    /// Flip the enabled flag. Returns `false` if the registration is unknown.
    pub fn set_enabled(&self, kind: RegistrationKind, id: &str, enabled: bool) -> bool {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        match map.get_mut(&(kind, id.to_string())) {
            Some(registration) => {
                registration.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// All registrations, ordered by kind then id.
    pub fn list(&self) -> Vec<Registration> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RegistrationLookup for InMemoryRegistrationStore {
    fn find(&self, kind: RegistrationKind, id: &str) -> Option<Registration> {
        let map = self.inner.read().unwrap_or_else(|e| e.into_inner());
        map.get(&(kind, id.to_string())).cloned()
    }
}
