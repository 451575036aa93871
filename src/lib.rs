//! # fpeset
//!
//! Deterministic, format-preserving encryption of text.
//!
//! A plaintext over a known alphabet encrypts to a ciphertext of the same
//! length over the same alphabet, using FF3-1. Around the primitive the crate
//! provides:
//!
//! - unknown-character strategies ([`UnknownCharacterStrategy`]) so text may
//!   contain characters outside the alphabet;
//! - chunking, so text of any length can be encrypted by a primitive with a
//!   bounded input length;
//! - keysets with one primary key, key-identifier prefixes and raw fallback,
//!   so keys can be rotated without re-encrypting old data.
//!
//! ## Public API
//!
//! ```no_run
//! use fpeset::{registry, FfxKeyType, Fpe, FpeParams, KeysetHandle, UnknownCharacterStrategy};
//!
//! # fn main() -> Result<(), fpeset::error::FpeError> {
//! let registry = registry::register();
//! let handle = KeysetHandle::generate(registry, &FfxKeyType::Ff31_256Alphanumeric.template())?;
//! let fpe = handle.primitive(registry)?;
//!
//! let params = FpeParams::from(UnknownCharacterStrategy::Skip);
//! let ciphertext = fpe.encrypt_with(b"Foo bar", &params)?;
//! assert_eq!(fpe.decrypt_with(&ciphertext, &params)?, b"Foo bar");
//! # Ok(())
//! # }
//! ```

// Module declarations.
pub mod alphabet;
pub mod audit;
pub(crate) mod chunk;
pub mod cipher;
pub(crate) mod crypto;
pub mod error;
pub(crate) mod filter;
pub mod keys;
pub mod keyset;
pub mod params;
pub mod registry;
pub mod router;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub use alphabet::{Alphabet, CharacterGroup};
pub use chunk::{ChunkBounds, MAX_CHUNK, MIN_CHUNK};
pub use cipher::{FfxCipher, Fpe};
pub use error::FpeError;
pub use filter::UnknownCharacterStrategy;
pub use keyset::{KeyStatus, KeysetHandle, KeysetInfo, OutputPrefixType, PREFIX_LEN};
pub use params::{FpeParams, TextEncoding};
pub use registry::{FfxKeyType, KeyTemplate, Registry};
pub use router::KeysetFpe;

use keys::{FfxKey, FfxKeyParams, FfxMode, KeySize};

/// Generate a fresh FF3-1 key over `alphabet`.
///
/// Key bytes come from the system RNG and stay inside the crate; use
/// [`FfxCipher::from_key`] or a keyset to work with the key.
pub fn generate_key(size: KeySize, alphabet: Alphabet) -> Result<FfxKey, FpeError> {
    let material = keys::generate(size)?;
    Ok(FfxKey::new(
        FfxKeyParams {
            mode: FfxMode::Ff31,
            alphabet,
        },
        material,
    ))
}
