//! Chunking of long text into cipher-sized windows.
//!
//! FF3-1 only accepts inputs within a radix-dependent length range. Text is
//! walked left to right in non-overlapping windows of at most `max`
//! characters. Windows shorter than `min` cannot be ciphered on their own and
//! are passed through unchanged, so a short trailing fragment stays in
//! plaintext form inside otherwise ciphered output.
//!
//! Encryption and decryption window identically: both operate on strings of
//! the same length, so the window boundaries line up.

use crate::crypto;
use crate::error::FpeError;

/// Default minimum window length.
pub const MIN_CHUNK: usize = 4;

/// Default maximum window length.
pub const MAX_CHUNK: usize = 30;

/// Inclusive window length range handed to the primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBounds {
    min: usize,
    max: usize,
}

impl ChunkBounds {
    /// Explicit bounds. `min` must be at least 1 and not above `max`.
    pub fn new(min: usize, max: usize) -> Result<Self, FpeError> {
        if min == 0 || min > max {
            return Err(FpeError::InvalidChunkBounds { min, max });
        }
        Ok(Self { min, max })
    }

    /// The default bounds, clamped to what FF3-1 supports for `radix`.
    pub fn for_radix(radix: u32) -> Self {
        let (min_len, max_len) = crypto::length_bounds(radix);
        Self {
            min: MIN_CHUNK.max(min_len),
            max: MAX_CHUNK.min(max_len),
        }
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

impl Default for ChunkBounds {
    fn default() -> Self {
        Self {
            min: MIN_CHUNK,
            max: MAX_CHUNK,
        }
    }
}

/// Run `op` over every window of `text` that is long enough, and
/// concatenate the results with the short windows in order.
pub(crate) fn transform<F>(text: &[char], bounds: ChunkBounds, mut op: F) -> Result<Vec<char>, FpeError>
where
    F: FnMut(&[char]) -> Result<Vec<char>, FpeError>,
{
    let mut output = Vec::with_capacity(text.len());
    for window in text.chunks(bounds.max) {
        if window.len() < bounds.min {
            output.extend_from_slice(window);
        } else {
            output.extend(op(window)?);
        }
    }
    Ok(output)
}
