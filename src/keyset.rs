//! Keysets: ordered keys with exactly one primary.
//!
//! A [`KeysetHandle`] owns key material and per-key metadata. It never
//! encrypts anything itself; [`KeysetHandle::primitive`] validates every
//! enabled key through the registry and hands them to the router.
//!
//! Invariants held by every mutating method:
//! - key ids are unique;
//! - the primary key exists and is enabled.

use serde::{Deserialize, Serialize};

use crate::error::FpeError;
use crate::keys::{self, FfxKey};
use crate::registry::{KeyTemplate, Registry};
use crate::router::{KeysetFpe, RouterEntry};

/// Length of the identifier written before prefixed ciphertexts.
pub const PREFIX_LEN: usize = 5;

const TINK_START_BYTE: u8 = 0x01;
const LEGACY_START_BYTE: u8 = 0x00;

/// Whether a key takes part in routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyStatus {
    Enabled,
    Disabled,
}

/// What a key writes in front of its ciphertexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputPrefixType {
    /// `0x01 || key id` (big-endian).
    Tink,
    /// `0x00 || key id` (big-endian).
    Legacy,
    /// Nothing.
    Raw,
}

impl OutputPrefixType {
    /// The identifier for `key_id`: [`PREFIX_LEN`] bytes, or empty for `Raw`.
    pub fn identifier(&self, key_id: u32) -> Vec<u8> {
        let start = match self {
            Self::Tink => TINK_START_BYTE,
            Self::Legacy => LEGACY_START_BYTE,
            Self::Raw => return Vec::new(),
        };
        let mut prefix = Vec::with_capacity(PREFIX_LEN);
        prefix.push(start);
        prefix.extend_from_slice(&key_id.to_be_bytes());
        prefix
    }

    pub fn is_prefixed(&self) -> bool {
        !matches!(self, Self::Raw)
    }
}

/// A key plus its keyset metadata.
#[derive(Debug)]
pub struct KeysetKey {
    id: u32,
    type_url: String,
    status: KeyStatus,
    output_prefix_type: OutputPrefixType,
    key: FfxKey,
}

impl KeysetKey {
    /// An enabled key.
    pub fn new(
        id: u32,
        type_url: impl Into<String>,
        key: FfxKey,
        output_prefix_type: OutputPrefixType,
    ) -> Self {
        Self {
            id,
            type_url: type_url.into(),
            status: KeyStatus::Enabled,
            output_prefix_type,
            key,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn type_url(&self) -> &str {
        &self.type_url
    }

    pub fn status(&self) -> KeyStatus {
        self.status
    }

    pub fn output_prefix_type(&self) -> OutputPrefixType {
        self.output_prefix_type
    }

    pub fn key(&self) -> &FfxKey {
        &self.key
    }

    fn is_enabled(&self) -> bool {
        self.status == KeyStatus::Enabled
    }

    fn info(&self) -> KeyInfo {
        KeyInfo {
            key_id: self.id,
            type_url: self.type_url.clone(),
            status: self.status,
            output_prefix_type: self.output_prefix_type,
        }
    }
}

/// Metadata of one key. Never contains key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub key_id: u32,
    pub type_url: String,
    pub status: KeyStatus,
    pub output_prefix_type: OutputPrefixType,
}

/// Metadata of a keyset, safe to log or export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysetInfo {
    pub primary_key_id: u32,
    pub key_info: Vec<KeyInfo>,
}

/// An ordered set of keys with one primary.
#[derive(Debug)]
pub struct KeysetHandle {
    primary_id: u32,
    keys: Vec<KeysetKey>,
}

impl KeysetHandle {
    /// A keyset holding one fresh key from `template`.
    pub fn generate(registry: &Registry, template: &KeyTemplate) -> Result<Self, FpeError> {
        let key = Self::new_keyset_key(registry, template, keys::random_key_id()?)?;
        Ok(Self::with_primary(key))
    }

    /// A keyset whose only key is `key`, which becomes primary. The key is
    /// enabled regardless of its previous status.
    pub fn with_primary(mut key: KeysetKey) -> Self {
        key.status = KeyStatus::Enabled;
        Self {
            primary_id: key.id,
            keys: vec![key],
        }
    }

    /// Add an imported key as a secondary key.
    pub fn add_key(&mut self, key: KeysetKey) -> Result<(), FpeError> {
        if self.find(key.id).is_some() {
            return Err(FpeError::DuplicateKey(key.id));
        }
        self.keys.push(key);
        Ok(())
    }

    /// Add a fresh secondary key from `template` and return its id.
    pub fn generate_key(&mut self, registry: &Registry, template: &KeyTemplate) -> Result<u32, FpeError> {
        let mut id = keys::random_key_id()?;
        while self.find(id).is_some() {
            id = keys::random_key_id()?;
        }
        let key = Self::new_keyset_key(registry, template, id)?;
        self.keys.push(key);
        Ok(id)
    }

    /// Make `id` the primary key. It must be enabled.
    pub fn set_primary(&mut self, id: u32) -> Result<(), FpeError> {
        let key = self.find(id).ok_or(FpeError::KeyNotFound(id))?;
        if !key.is_enabled() {
            return Err(FpeError::KeyDisabled(id));
        }
        self.primary_id = id;
        Ok(())
    }

    pub fn enable(&mut self, id: u32) -> Result<(), FpeError> {
        self.find_mut(id)?.status = KeyStatus::Enabled;
        Ok(())
    }

    /// Disable a secondary key. The primary cannot be disabled.
    pub fn disable(&mut self, id: u32) -> Result<(), FpeError> {
        if id == self.primary_id {
            return Err(FpeError::PrimaryKeyRequired(id));
        }
        self.find_mut(id)?.status = KeyStatus::Disabled;
        Ok(())
    }

    /// Remove a secondary key and its material. The primary cannot be removed.
    pub fn delete(&mut self, id: u32) -> Result<(), FpeError> {
        if id == self.primary_id {
            return Err(FpeError::PrimaryKeyRequired(id));
        }
        let pos = self
            .keys
            .iter()
            .position(|k| k.id == id)
            .ok_or(FpeError::KeyNotFound(id))?;
        self.keys.remove(pos);
        Ok(())
    }

    pub fn primary_id(&self) -> u32 {
        self.primary_id
    }

    pub fn keys(&self) -> &[KeysetKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn info(&self) -> KeysetInfo {
        KeysetInfo {
            primary_key_id: self.primary_id,
            key_info: self.keys.iter().map(KeysetKey::info).collect(),
        }
    }

    /// Build the router over every enabled key.
    ///
    /// # Errors
    /// - `UnknownKeyType` if a key's type has no manager in `registry`.
    /// - Whatever the manager's validation returns for an unusable key.
    /// - `NoPrimaryKey` if the primary is missing or disabled.
    pub fn primitive(&self, registry: &Registry) -> Result<KeysetFpe, FpeError> {
        let mut entries = Vec::with_capacity(self.keys.len());
        let mut primary = None;

        for key in self.keys.iter().filter(|k| k.is_enabled()) {
            let manager = registry.manager(&key.type_url)?;
            manager.validate_key(&key.key)?;
            if key.id == self.primary_id {
                primary = Some(entries.len());
            }
            entries.push(RouterEntry::new(
                key.id,
                key.output_prefix_type,
                manager.primitive(&key.key)?,
            ));
        }

        let primary = primary.ok_or(FpeError::NoPrimaryKey)?;
        Ok(KeysetFpe::new(entries, primary))
    }

    fn new_keyset_key(registry: &Registry, template: &KeyTemplate, id: u32) -> Result<KeysetKey, FpeError> {
        let key = registry.manager(&template.type_url)?.new_key(&template.format)?;
        Ok(KeysetKey::new(id, template.type_url.clone(), key, template.output_prefix_type))
    }

    fn find(&self, id: u32) -> Option<&KeysetKey> {
        self.keys.iter().find(|k| k.id == id)
    }

    fn find_mut(&mut self, id: u32) -> Result<&mut KeysetKey, FpeError> {
        self.keys
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or(FpeError::KeyNotFound(id))
    }
}
