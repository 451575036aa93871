//! The FPE cipher adapter.
//!
//! [`FfxCipher`] binds one key and one [`Alphabet`] to the FF3-1 primitive
//! and runs the full text pipeline:
//!
//! ```text
//! bytes -> decode -> unknown-character filter -> chunker -> FF3-1 x N
//!       -> chunker (reassemble) -> filter (reinject skipped) -> encode -> bytes
//! ```
//!
//! All validation that does not depend on the call happens in the
//! constructor, so a constructed cipher never fails for configuration
//! reasons later.

use std::fmt;

use tracing::trace;

use crate::alphabet::Alphabet;
use crate::chunk::{self, ChunkBounds};
use crate::crypto::{Ff3Cipher, Tweak};
use crate::error::FpeError;
use crate::filter::{self, UnknownCharacterStrategy};
use crate::keys::{FfxKey, FfxMode, KeySize};
use crate::params::FpeParams;

// ---------------------------------------------------------------------------
// Public trait
// ---------------------------------------------------------------------------

/// Format-preserving encryption of text.
///
/// Implemented by a single-key [`FfxCipher`] and by the keyset router.
pub trait Fpe: Send + Sync {
    /// Encrypt `plaintext` with explicit params.
    fn encrypt_with(&self, plaintext: &[u8], params: &FpeParams) -> Result<Vec<u8>, FpeError>;

    /// Decrypt `ciphertext` with explicit params. The strategy and tweak must
    /// match the ones used to encrypt.
    fn decrypt_with(&self, ciphertext: &[u8], params: &FpeParams) -> Result<Vec<u8>, FpeError>;

    /// Encrypt with the default params (Fail, zero tweak, UTF-8).
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, FpeError> {
        self.encrypt_with(plaintext, &FpeParams::default())
    }

    /// Decrypt with the default params.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, FpeError> {
        self.decrypt_with(ciphertext, &FpeParams::default())
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// One key and one alphabet bound to FF3-1.
pub struct FfxCipher {
    alphabet: Alphabet,
    redaction_char: char,
    bounds: ChunkBounds,
    ff3: Ff3Cipher,
}

impl FfxCipher {
    /// Bind raw key bytes to an alphabet.
    ///
    /// # Errors
    /// - `InvalidKey` if the key is not 128, 192 or 256 bits.
    /// - `RedactionCharUnavailable` if no fallback redaction character is in
    ///   the alphabet.
    pub fn new(key: &[u8], alphabet: Alphabet) -> Result<Self, FpeError> {
        KeySize::from_byte_len(key.len())?;
        let redaction_char = alphabet.redaction_char()?;
        let ff3 = Ff3Cipher::new(key, alphabet.radix())?;
        let bounds = ChunkBounds::for_radix(alphabet.radix());

        Ok(Self {
            alphabet,
            redaction_char,
            bounds,
            ff3,
        })
    }

    /// Build the cipher for a stored key. Only FF3-1 keys are supported.
    pub fn from_key(key: &FfxKey) -> Result<Self, FpeError> {
        match key.params().mode {
            FfxMode::Ff31 => Self::new(key.material().as_bytes(), key.params().alphabet.clone()),
            mode => Err(FpeError::UnsupportedMode(mode.to_string())),
        }
    }

    /// Override the chunk bounds. They must lie inside the primitive's
    /// supported length range for this alphabet.
    pub fn with_chunk_bounds(mut self, bounds: ChunkBounds) -> Result<Self, FpeError> {
        if bounds.min() < self.ff3.min_len() || bounds.max() > self.ff3.max_len() {
            return Err(FpeError::InvalidChunkBounds {
                min: bounds.min(),
                max: bounds.max(),
            });
        }
        self.bounds = bounds;
        Ok(self)
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn chunk_bounds(&self) -> ChunkBounds {
        self.bounds
    }

    /// The deduced redaction character for this alphabet.
    pub fn redaction_char(&self) -> char {
        self.redaction_char
    }

    /// Encrypt a single chunk. Every character must be in the alphabet and the
    /// length must be within the primitive's range.
    pub fn encrypt_chunk(&self, chunk: &str, tweak: &[u8]) -> Result<String, FpeError> {
        let tweak = Tweak::new(tweak)?;
        let chars: Vec<char> = chunk.chars().collect();
        Ok(self.apply(&chars, &tweak, Direction::Encrypt)?.into_iter().collect())
    }

    /// Inverse of [`FfxCipher::encrypt_chunk`].
    pub fn decrypt_chunk(&self, chunk: &str, tweak: &[u8]) -> Result<String, FpeError> {
        let tweak = Tweak::new(tweak)?;
        let chars: Vec<char> = chunk.chars().collect();
        Ok(self.apply(&chars, &tweak, Direction::Decrypt)?.into_iter().collect())
    }

    fn apply(&self, window: &[char], tweak: &Tweak, direction: Direction) -> Result<Vec<char>, FpeError> {
        let numerals = self.alphabet.to_numerals(window)?;
        let output = match direction {
            Direction::Encrypt => self.ff3.encrypt(&numerals, tweak)?,
            Direction::Decrypt => self.ff3.decrypt(&numerals, tweak)?,
        };
        Ok(self.alphabet.from_numerals(&output))
    }

    /// Redaction character for this call. Only checked under `Redact`.
    fn call_redaction_char(&self, params: &FpeParams) -> Result<char, FpeError> {
        match (params.strategy(), params.redaction_char()) {
            (UnknownCharacterStrategy::Redact, Some(c)) if !self.alphabet.contains(c) => {
                Err(FpeError::InvalidRedactionChar(c))
            }
            (_, Some(c)) => Ok(c),
            (_, None) => Ok(self.redaction_char),
        }
    }

    fn run(&self, input: &[u8], params: &FpeParams, direction: Direction) -> Result<Vec<u8>, FpeError> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        // 1. Validate the call options before touching the text.
        let tweak = Tweak::new(params.tweak())?;
        let encoding = params.encoding();

        // 2. Decode and filter.
        let text = encoding.decode(input)?;
        let filtered = match direction {
            Direction::Encrypt => filter::for_encryption(
                text,
                &self.alphabet,
                params.strategy(),
                self.call_redaction_char(params)?,
            )?,
            Direction::Decrypt => filter::for_decryption(text, &self.alphabet, params.strategy()),
        };

        // 3. Cipher each window.
        let mut windows = 0usize;
        let output = chunk::transform(filtered.text(), self.bounds, |window| {
            windows += 1;
            self.apply(window, &tweak, direction)
        })?;
        trace!(
            chars = filtered.text().len(),
            windows,
            "fpe pipeline ciphered text"
        );

        // 4. Undo the filter and encode.
        encoding.encode(&filtered.restore(output))
    }
}

impl Fpe for FfxCipher {
    fn encrypt_with(&self, plaintext: &[u8], params: &FpeParams) -> Result<Vec<u8>, FpeError> {
        self.run(plaintext, params, Direction::Encrypt)
    }

    fn decrypt_with(&self, ciphertext: &[u8], params: &FpeParams) -> Result<Vec<u8>, FpeError> {
        self.run(ciphertext, params, Direction::Decrypt)
    }
}

impl fmt::Debug for FfxCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FfxCipher")
            .field("alphabet", &self.alphabet)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}
