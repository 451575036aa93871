//! Key managers, the key registry and key templates.
//!
//! A [`Registry`] maps a key type URL to the [`KeyManager`] that can create,
//! validate and instantiate keys of that type. Registries are plain values:
//! tests and embedders can build isolated ones with [`Registry::new`]. A
//! process-wide registry is also available, but only after an explicit call
//! to [`register`].

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::alphabet::{Alphabet, CharacterGroup};
use crate::cipher::{FfxCipher, Fpe};
use crate::error::FpeError;
use crate::keys::{self, FfxKey, FfxKeyParams, FfxMode, KeySize};
use crate::keyset::OutputPrefixType;

/// Type URL of FFX keys.
pub const FFX_KEY_TYPE_URL: &str = "type.fpeset/fpeset.FfxKey";

// ---------------------------------------------------------------------------
// Key formats and managers
// ---------------------------------------------------------------------------

/// What a new key should look like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFormat {
    pub key_size: KeySize,
    pub params: FfxKeyParams,
}

/// Creates and instantiates keys of one type.
pub trait KeyManager: Send + Sync {
    /// The type URL this manager handles.
    fn key_type(&self) -> &str;

    /// A fresh random key.
    fn new_key(&self, format: &KeyFormat) -> Result<FfxKey, FpeError>;

    /// A key read from a pseudorandom source.
    fn derive_key(&self, format: &KeyFormat, source: &mut dyn Read) -> Result<FfxKey, FpeError>;

    /// Check that `key` can be turned into a primitive.
    fn validate_key(&self, key: &FfxKey) -> Result<(), FpeError>;

    /// The primitive for `key`.
    fn primitive(&self, key: &FfxKey) -> Result<Box<dyn Fpe>, FpeError>;
}

/// Manager for FFX keys. Builds [`FfxCipher`] primitives.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfxKeyManager;

impl FfxKeyManager {
    fn validate_format(format: &KeyFormat) -> Result<(), FpeError> {
        match format.params.mode {
            FfxMode::Ff31 => Ok(()),
            mode => Err(FpeError::UnsupportedMode(mode.to_string())),
        }
    }
}

impl KeyManager for FfxKeyManager {
    fn key_type(&self) -> &str {
        FFX_KEY_TYPE_URL
    }

    fn new_key(&self, format: &KeyFormat) -> Result<FfxKey, FpeError> {
        Self::validate_format(format)?;
        let material = keys::generate(format.key_size)?;
        Ok(FfxKey::new(format.params.clone(), material))
    }

    fn derive_key(&self, format: &KeyFormat, source: &mut dyn Read) -> Result<FfxKey, FpeError> {
        Self::validate_format(format)?;
        let material = keys::derive(format.key_size, source)?;
        Ok(FfxKey::new(format.params.clone(), material))
    }

    fn validate_key(&self, key: &FfxKey) -> Result<(), FpeError> {
        if key.params().mode != FfxMode::Ff31 {
            return Err(FpeError::UnsupportedMode(key.params().mode.to_string()));
        }
        key.params().alphabet.redaction_char()?;
        Ok(())
    }

    fn primitive(&self, key: &FfxKey) -> Result<Box<dyn Fpe>, FpeError> {
        Ok(Box::new(FfxCipher::from_key(key)?))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Map from key type URL to manager.
#[derive(Default, Clone)]
pub struct Registry {
    managers: HashMap<String, Arc<dyn KeyManager>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in manager.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .managers
            .insert(FFX_KEY_TYPE_URL.to_string(), Arc::new(FfxKeyManager));
        registry
    }

    pub fn register(&mut self, manager: Arc<dyn KeyManager>) -> Result<(), FpeError> {
        let type_url = manager.key_type().to_string();
        if self.managers.contains_key(&type_url) {
            return Err(FpeError::DuplicateKeyType(type_url));
        }
        self.managers.insert(type_url, manager);
        Ok(())
    }

    pub fn manager(&self, type_url: &str) -> Result<&dyn KeyManager, FpeError> {
        self.managers
            .get(type_url)
            .map(|m| m.as_ref())
            .ok_or_else(|| FpeError::UnknownKeyType(type_url.to_string()))
    }

    pub fn contains(&self, type_url: &str) -> bool {
        self.managers.contains_key(type_url)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&String> = self.managers.keys().collect();
        types.sort();
        f.debug_struct("Registry").field("types", &types).finish()
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Initialise the process-wide registry with the built-in managers.
/// Safe to call more than once; later calls return the same registry.
pub fn register() -> &'static Registry {
    GLOBAL.get_or_init(|| {
        info!("initialising global fpeset key registry");
        Registry::with_defaults()
    })
}

/// The process-wide registry, if [`register`] has been called.
pub fn global() -> Result<&'static Registry, FpeError> {
    GLOBAL.get().ok_or(FpeError::RegistryNotInitialized)
}

// ---------------------------------------------------------------------------
// Key templates
// ---------------------------------------------------------------------------

/// Predefined FF3-1 key types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfxKeyType {
    Ff31_128Alphanumeric,
    Ff31_192Alphanumeric,
    Ff31_256Alphanumeric,
    Ff31_128Digits,
    Ff31_192Digits,
    Ff31_256Digits,
}

impl FfxKeyType {
    pub const ALL: [FfxKeyType; 6] = [
        Self::Ff31_128Alphanumeric,
        Self::Ff31_192Alphanumeric,
        Self::Ff31_256Alphanumeric,
        Self::Ff31_128Digits,
        Self::Ff31_192Digits,
        Self::Ff31_256Digits,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ff31_128Alphanumeric => "FPE_FF31_128_ALPHANUMERIC",
            Self::Ff31_192Alphanumeric => "FPE_FF31_192_ALPHANUMERIC",
            Self::Ff31_256Alphanumeric => "FPE_FF31_256_ALPHANUMERIC",
            Self::Ff31_128Digits => "FPE_FF31_128_DIGITS",
            Self::Ff31_192Digits => "FPE_FF31_192_DIGITS",
            Self::Ff31_256Digits => "FPE_FF31_256_DIGITS",
        }
    }

    pub fn key_size(&self) -> KeySize {
        match self {
            Self::Ff31_128Alphanumeric | Self::Ff31_128Digits => KeySize::Bits128,
            Self::Ff31_192Alphanumeric | Self::Ff31_192Digits => KeySize::Bits192,
            Self::Ff31_256Alphanumeric | Self::Ff31_256Digits => KeySize::Bits256,
        }
    }

    pub fn character_group(&self) -> CharacterGroup {
        match self {
            Self::Ff31_128Alphanumeric | Self::Ff31_192Alphanumeric | Self::Ff31_256Alphanumeric => {
                CharacterGroup::Alphanumeric
            }
            Self::Ff31_128Digits | Self::Ff31_192Digits | Self::Ff31_256Digits => CharacterGroup::Digits,
        }
    }

    /// Raw-prefixed template for this key type.
    pub fn template(&self) -> KeyTemplate {
        KeyTemplate::raw(KeyFormat {
            key_size: self.key_size(),
            params: FfxKeyParams {
                mode: FfxMode::Ff31,
                alphabet: Alphabet::from(self.character_group()),
            },
        })
    }
}

impl fmt::Display for FfxKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FfxKeyType {
    type Err = FpeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| FpeError::UnknownKeyType(s.to_string()))
    }
}

/// Everything needed to create a key inside a keyset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyTemplate {
    pub type_url: String,
    pub format: KeyFormat,
    pub output_prefix_type: OutputPrefixType,
}

impl KeyTemplate {
    /// A template whose keys emit no prefix.
    pub fn raw(format: KeyFormat) -> Self {
        Self {
            type_url: FFX_KEY_TYPE_URL.to_string(),
            format,
            output_prefix_type: OutputPrefixType::Raw,
        }
    }

    /// A template whose keys emit the 5-byte `0x01 || key id` prefix.
    pub fn tink(format: KeyFormat) -> Self {
        Self {
            output_prefix_type: OutputPrefixType::Tink,
            ..Self::raw(format)
        }
    }

    pub fn with_output_prefix_type(mut self, output_prefix_type: OutputPrefixType) -> Self {
        self.output_prefix_type = output_prefix_type;
        self
    }
}

impl From<FfxKeyType> for KeyTemplate {
    fn from(key_type: FfxKeyType) -> Self {
        key_type.template()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(mode: FfxMode) -> KeyFormat {
        KeyFormat {
            key_size: KeySize::Bits128,
            params: FfxKeyParams {
                mode,
                alphabet: Alphabet::from(CharacterGroup::Digits),
            },
        }
    }

    #[test]
    fn test_key_type_names_parse() {
        for key_type in FfxKeyType::ALL {
            assert_eq!(key_type.name().parse::<FfxKeyType>().unwrap(), key_type);
        }
        assert_eq!(FfxKeyType::Ff31_256Alphanumeric.to_string(), "FPE_FF31_256_ALPHANUMERIC");
        assert!("FPE_FF1_256_DIGITS".parse::<FfxKeyType>().is_err());
    }

    #[test]
    fn test_templates_default_to_raw() {
        let template = KeyTemplate::from(FfxKeyType::Ff31_192Digits);
        assert_eq!(template.output_prefix_type, OutputPrefixType::Raw);
        assert_eq!(template.format.key_size, KeySize::Bits192);
        assert_eq!(template.format.params.alphabet.radix(), 10);
        assert_eq!(KeyTemplate::tink(template.format.clone()).output_prefix_type, OutputPrefixType::Tink);
    }

    #[test]
    fn test_manager_rejects_ff1() {
        let manager = FfxKeyManager;
        assert!(matches!(manager.new_key(&format(FfxMode::Ff1)), Err(FpeError::UnsupportedMode(_))));
        let key = manager.new_key(&format(FfxMode::Ff31)).unwrap();
        assert!(manager.validate_key(&key).is_ok());
    }

    #[test]
    fn test_manager_derive_key_is_deterministic() {
        let manager = FfxKeyManager;
        let source = [9u8; 16];
        let a = manager.derive_key(&format(FfxMode::Ff31), &mut &source[..]).unwrap();
        let b = manager.derive_key(&format(FfxMode::Ff31), &mut &source[..]).unwrap();
        let pa = manager.primitive(&a).unwrap();
        let pb = manager.primitive(&b).unwrap();
        assert_eq!(pa.encrypt(b"4111111111111111").unwrap(), pb.encrypt(b"4111111111111111").unwrap());
    }

    #[test]
    fn test_registry_lookup_and_duplicates() {
        let mut registry = Registry::new();
        assert!(matches!(registry.manager(FFX_KEY_TYPE_URL), Err(FpeError::UnknownKeyType(_))));

        registry.register(Arc::new(FfxKeyManager)).unwrap();
        assert!(registry.contains(FFX_KEY_TYPE_URL));
        assert!(matches!(
            registry.register(Arc::new(FfxKeyManager)),
            Err(FpeError::DuplicateKeyType(_))
        ));
        assert_eq!(registry.manager(FFX_KEY_TYPE_URL).unwrap().key_type(), FFX_KEY_TYPE_URL);
    }
}
