//! Global and isolated key registries.
//!
//! Kept in its own test binary: the global registry is process-wide, and
//! the "not initialised" check must run before anything registers it.

use std::sync::Arc;

use fpeset::registry::{self, FfxKeyManager, KeyManager, FFX_KEY_TYPE_URL};
use fpeset::{FfxKeyType, Fpe, FpeError, KeysetHandle, Registry};

#[test]
fn test_global_registry_lifecycle() {
    assert!(matches!(registry::global(), Err(FpeError::RegistryNotInitialized)));

    let first = registry::register();
    let second = registry::register();
    assert!(std::ptr::eq(first, second));
    assert!(std::ptr::eq(registry::global().unwrap(), first));
    assert!(first.contains(FFX_KEY_TYPE_URL));

    let handle = KeysetHandle::generate(first, &FfxKeyType::Ff31_256Alphanumeric.template()).unwrap();
    let fpe = handle.primitive(registry::global().unwrap()).unwrap();
    let ciphertext = fpe.encrypt(b"Foobar").unwrap();
    assert_eq!(fpe.decrypt(&ciphertext).unwrap(), b"Foobar");
}

#[test]
fn test_isolated_registries_do_not_share_state() {
    let mut a = Registry::new();
    let b = Registry::new();
    a.register(Arc::new(FfxKeyManager)).unwrap();

    assert!(a.contains(FFX_KEY_TYPE_URL));
    assert!(!b.contains(FFX_KEY_TYPE_URL));

    let handle = KeysetHandle::generate(&a, &FfxKeyType::Ff31_128Digits.template()).unwrap();
    assert!(handle.primitive(&a).is_ok());
    assert!(matches!(handle.primitive(&b), Err(FpeError::UnknownKeyType(_))));
}

/// A manager that refuses every key.
struct RejectingManager;

impl KeyManager for RejectingManager {
    fn key_type(&self) -> &str {
        "type.example/Rejecting"
    }

    fn new_key(&self, format: &registry::KeyFormat) -> Result<fpeset::keys::FfxKey, FpeError> {
        FfxKeyManager.new_key(format)
    }

    fn derive_key(
        &self,
        format: &registry::KeyFormat,
        source: &mut dyn std::io::Read,
    ) -> Result<fpeset::keys::FfxKey, FpeError> {
        FfxKeyManager.derive_key(format, source)
    }

    fn validate_key(&self, _key: &fpeset::keys::FfxKey) -> Result<(), FpeError> {
        Err(FpeError::InvalidKey("rejected".into()))
    }

    fn primitive(&self, key: &fpeset::keys::FfxKey) -> Result<Box<dyn Fpe>, FpeError> {
        FfxKeyManager.primitive(key)
    }
}

#[test]
fn test_custom_manager_validation_is_enforced() {
    let mut registry = Registry::with_defaults();
    registry.register(Arc::new(RejectingManager)).unwrap();

    let mut template = FfxKeyType::Ff31_128Digits.template();
    template.type_url = "type.example/Rejecting".into();
    let handle = KeysetHandle::generate(&registry, &template).unwrap();
    assert!(matches!(handle.primitive(&registry), Err(FpeError::InvalidKey(_))));
}
