//! Error types for fpeset.
//!
//! Every variant is a distinct failure mode. Messages signal *what* failed
//! without echoing key material. Decryption through a keyset collapses every
//! per-key failure into [`FpeError::DecryptionFailed`] so callers cannot tell
//! which key was tried or why it was rejected.

use std::fmt;

/// The single error type for all fpeset operations.
#[derive(Debug)]
pub enum FpeError {
    /// Key material has an unsupported size or is otherwise malformed.
    InvalidKey(String),

    /// The `Fail` strategy met a character outside the alphabet.
    IncompatiblePlaintext { alphabet: String },

    /// The key asks for a cipher mode that has no implementation.
    UnsupportedMode(String),

    /// No key in the keyset could decrypt the ciphertext.
    DecryptionFailed,

    /// The alphabet holds none of the fallback redaction characters.
    RedactionCharUnavailable { alphabet: String },

    /// An explicitly requested redaction character is not in the alphabet.
    InvalidRedactionChar(char),

    /// The alphabet is empty, has duplicates, or has an unsupported radix.
    InvalidAlphabet(String),

    /// The tweak is neither 56 nor 64 bits long.
    InvalidTweak(usize),

    /// A chunk handed to the primitive is outside its supported length range.
    InvalidLength { len: usize, min: usize, max: usize },

    /// A character reached the primitive that is not in its alphabet.
    InvalidCharacter(char),

    /// Chunk bounds are inverted or exceed what the primitive supports.
    InvalidChunkBounds { min: usize, max: usize },

    /// Input bytes could not be decoded, or output could not be encoded,
    /// with the requested text encoding.
    InvalidEncoding(String),

    /// The system random number generator failed.
    RandomnessFailure,

    /// No key with this id exists in the keyset.
    KeyNotFound(u32),

    /// A key with this id already exists in the keyset.
    DuplicateKey(u32),

    /// The operation would disable or remove the primary key.
    PrimaryKeyRequired(u32),

    /// The key is disabled and cannot become the primary key.
    KeyDisabled(u32),

    /// The keyset has no enabled primary key.
    NoPrimaryKey,

    /// No key manager is registered for this type URL.
    UnknownKeyType(String),

    /// A key manager for this type URL is already registered.
    DuplicateKeyType(String),

    /// The process-wide registry was used before `registry::register()`.
    RegistryNotInitialized,

    /// Reading from a pseudorandom source failed.
    Io(std::io::Error),
}

impl fmt::Display for FpeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey(reason) => write!(f, "invalid key: {}", reason),
            Self::IncompatiblePlaintext { alphabet } => write!(
                f,
                "plaintext can only contain characters from the alphabet '{}'",
                alphabet
            ),
            Self::UnsupportedMode(mode) => write!(f, "unsupported mode: {}", mode),
            Self::DecryptionFailed => write!(f, "decryption failed"),
            Self::RedactionCharUnavailable { alphabet } => write!(
                f,
                "unable to deduce redaction character for alphabet '{}'",
                alphabet
            ),
            Self::InvalidRedactionChar(c) => {
                write!(f, "redaction character {:?} is not in the alphabet", c)
            }
            Self::InvalidAlphabet(reason) => write!(f, "invalid alphabet: {}", reason),
            Self::InvalidTweak(len) => write!(
                f,
                "invalid tweak: {} bits, expected 56 or 64",
                len * 8
            ),
            Self::InvalidLength { len, min, max } => write!(
                f,
                "invalid length: {} not in [{}, {}]",
                len, min, max
            ),
            Self::InvalidCharacter(c) => write!(f, "character {:?} is not in the alphabet", c),
            Self::InvalidChunkBounds { min, max } => {
                write!(f, "invalid chunk bounds: [{}, {}]", min, max)
            }
            Self::InvalidEncoding(reason) => write!(f, "invalid encoding: {}", reason),
            Self::RandomnessFailure => write!(f, "randomness source failed"),
            Self::KeyNotFound(id) => write!(f, "key not found: {}", id),
            Self::DuplicateKey(id) => write!(f, "key already exists: {}", id),
            Self::PrimaryKeyRequired(id) => {
                write!(f, "key {} is the primary key and must stay enabled", id)
            }
            Self::KeyDisabled(id) => write!(f, "key {} is disabled", id),
            Self::NoPrimaryKey => write!(f, "keyset has no enabled primary key"),
            Self::UnknownKeyType(url) => write!(f, "no key manager for type: {}", url),
            Self::DuplicateKeyType(url) => {
                write!(f, "key manager already registered for type: {}", url)
            }
            Self::RegistryNotInitialized => write!(f, "key registry not initialized"),
            Self::Io(err) => write!(f, "reading pseudorandomness failed: {}", err),
        }
    }
}

impl std::error::Error for FpeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FpeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
