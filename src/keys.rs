//! Key material and ownership.
//!
//! This module owns two responsibilities:
//! 1. Producing key bytes, either fresh from the system RNG or read from a
//!    caller-supplied pseudorandom source.
//! 2. Holding key bytes in a type that is opaque, non-cloneable, redacted
//!    in `Debug`, and zeroised on drop.
//!
//! This is the only module that imports `ring`.

use std::fmt;
use std::io::{ErrorKind, Read};

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::alphabet::Alphabet;
use crate::error::FpeError;

// ---------------------------------------------------------------------------
// Key size
// ---------------------------------------------------------------------------

/// Supported AES key sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeySize {
    Bits128,
    Bits192,
    Bits256,
}

impl KeySize {
    pub fn bits(&self) -> usize {
        self.bytes() * 8
    }

    pub fn bytes(&self) -> usize {
        match self {
            Self::Bits128 => 16,
            Self::Bits192 => 24,
            Self::Bits256 => 32,
        }
    }

    pub fn from_bits(bits: usize) -> Result<Self, FpeError> {
        match bits {
            128 => Ok(Self::Bits128),
            192 => Ok(Self::Bits192),
            256 => Ok(Self::Bits256),
            _ => Err(FpeError::InvalidKey(format!("invalid key size: {} bits", bits))),
        }
    }

    pub fn from_byte_len(len: usize) -> Result<Self, FpeError> {
        Self::from_bits(len * 8)
    }
}

// ---------------------------------------------------------------------------
// Key material
// ---------------------------------------------------------------------------

/// Raw key bytes.
///
/// - Not `Clone`.
/// - Zeroised on drop.
/// - `Debug` prints the size only.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: Vec<u8>,
}

impl KeyMaterial {
    /// Wrap imported key bytes. The length must be 16, 24 or 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FpeError> {
        KeySize::from_byte_len(bytes.len())?;
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    pub fn size(&self) -> KeySize {
        // Length is checked on every construction path.
        match self.bytes.len() {
            16 => KeySize::Bits128,
            24 => KeySize::Bits192,
            _ => KeySize::Bits256,
        }
    }

    /// `pub(crate)`: raw bytes never leave the crate.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial({} bits, redacted)", self.bytes.len() * 8)
    }
}

// ---------------------------------------------------------------------------
// FFX keys
// ---------------------------------------------------------------------------

/// Cipher mode a key is meant for. Only FF3-1 has an implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FfxMode {
    Ff1,
    Ff31,
}

impl fmt::Display for FfxMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ff1 => write!(f, "FF1"),
            Self::Ff31 => write!(f, "FF3-1"),
        }
    }
}

/// Everything about a key except its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FfxKeyParams {
    pub mode: FfxMode,
    pub alphabet: Alphabet,
}

/// An FFX key: params plus material.
#[derive(Debug)]
pub struct FfxKey {
    params: FfxKeyParams,
    material: KeyMaterial,
}

impl FfxKey {
    pub fn new(params: FfxKeyParams, material: KeyMaterial) -> Self {
        Self { params, material }
    }

    pub fn params(&self) -> &FfxKeyParams {
        &self.params
    }

    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    pub fn size(&self) -> KeySize {
        self.material.size()
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Fresh key bytes from the system RNG.
pub fn generate(size: KeySize) -> Result<KeyMaterial, FpeError> {
    let mut bytes = vec![0u8; size.bytes()];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| FpeError::RandomnessFailure)?;
    Ok(KeyMaterial { bytes })
}

/// Read exactly `size` bytes of key material from `source`.
///
/// A source that ends early is an invalid key; any other read error is
/// returned as [`FpeError::Io`].
pub fn derive(size: KeySize, source: &mut dyn Read) -> Result<KeyMaterial, FpeError> {
    let mut bytes = vec![0u8; size.bytes()];
    match source.read_exact(&mut bytes) {
        Ok(()) => Ok(KeyMaterial { bytes }),
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
            bytes.zeroize();
            Err(FpeError::InvalidKey(format!(
                "not enough pseudorandomness for a {}-bit key",
                size.bits()
            )))
        }
        Err(err) => {
            bytes.zeroize();
            Err(FpeError::Io(err))
        }
    }
}

/// A random key id from the system RNG.
pub(crate) fn random_key_id() -> Result<u32, FpeError> {
    let mut bytes = [0u8; 4];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| FpeError::RandomnessFailure)?;
    Ok(u32::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_size_conversions() {
        assert_eq!(KeySize::from_bits(192).unwrap(), KeySize::Bits192);
        assert_eq!(KeySize::from_byte_len(32).unwrap().bits(), 256);
        assert!(matches!(KeySize::from_bits(64), Err(FpeError::InvalidKey(_))));
    }

    #[test]
    fn test_generate_has_requested_size_and_differs() {
        let a = generate(KeySize::Bits256).unwrap();
        let b = generate(KeySize::Bits256).unwrap();
        assert_eq!(a.as_bytes().len(), 32);
        assert_eq!(a.size(), KeySize::Bits256);
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_derive_reads_exact_bytes() {
        let source: Vec<u8> = (0u8..40).collect();
        let mut reader = &source[..];
        let key = derive(KeySize::Bits128, &mut reader).unwrap();
        assert_eq!(key.as_bytes(), &source[..16]);
        // The rest of the source is untouched.
        assert_eq!(reader.len(), 24);
    }

    #[test]
    fn test_derive_short_source_is_invalid_key() {
        let source = [1u8; 20];
        let result = derive(KeySize::Bits192, &mut &source[..]);
        assert!(matches!(result, Err(FpeError::InvalidKey(_))));
    }

    #[test]
    fn test_derive_propagates_io_errors() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(ErrorKind::Other, "device gone"))
            }
        }
        assert!(matches!(derive(KeySize::Bits128, &mut Broken), Err(FpeError::Io(_))));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = KeyMaterial::from_bytes(&[0xAB; 16]).unwrap();
        let printed = format!("{:?}", key);
        assert_eq!(printed, "KeyMaterial(128 bits, redacted)");
        assert!(!printed.contains("171"));
        assert!(KeyMaterial::from_bytes(&[0u8; 10]).is_err());
    }
}
