//! Per-call configuration.

use serde::{Deserialize, Serialize};

use crate::crypto::NULL_TWEAK;
use crate::error::FpeError;
use crate::filter::UnknownCharacterStrategy;

/// Byte encoding of plaintext and ciphertext.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// ISO-8859-1: every byte is the code point of the same value.
    Latin1,
}

impl TextEncoding {
    pub(crate) fn decode(&self, bytes: &[u8]) -> Result<Vec<char>, FpeError> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes)
                .map(|s| s.chars().collect())
                .map_err(|e| FpeError::InvalidEncoding(e.to_string())),
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }

    pub(crate) fn encode(&self, text: &[char]) -> Result<Vec<u8>, FpeError> {
        match self {
            Self::Utf8 => Ok(text.iter().collect::<String>().into_bytes()),
            Self::Latin1 => text
                .iter()
                .map(|&c| {
                    u8::try_from(c).map_err(|_| {
                        FpeError::InvalidEncoding(format!("{:?} has no Latin-1 encoding", c))
                    })
                })
                .collect(),
        }
    }
}

/// Options for one encrypt or decrypt call.
///
/// Defaults: [`UnknownCharacterStrategy::Fail`], a 56-bit zero tweak, the
/// alphabet's deduced redaction character, UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FpeParams {
    strategy: UnknownCharacterStrategy,
    tweak: Vec<u8>,
    redaction_char: Option<char>,
    encoding: TextEncoding,
}

impl Default for FpeParams {
    fn default() -> Self {
        Self {
            strategy: UnknownCharacterStrategy::default(),
            tweak: NULL_TWEAK.to_vec(),
            redaction_char: None,
            encoding: TextEncoding::default(),
        }
    }
}

impl FpeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: UnknownCharacterStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// 7 bytes (FF3-1) or 8 bytes (FF3). Checked when the call runs.
    pub fn with_tweak(mut self, tweak: impl Into<Vec<u8>>) -> Self {
        self.tweak = tweak.into();
        self
    }

    /// Only used by [`UnknownCharacterStrategy::Redact`].
    pub fn with_redaction_char(mut self, c: char) -> Self {
        self.redaction_char = Some(c);
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn strategy(&self) -> UnknownCharacterStrategy {
        self.strategy
    }

    pub fn tweak(&self) -> &[u8] {
        &self.tweak
    }

    pub fn redaction_char(&self) -> Option<char> {
        self.redaction_char
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

impl From<UnknownCharacterStrategy> for FpeParams {
    fn from(strategy: UnknownCharacterStrategy) -> Self {
        Self::default().with_strategy(strategy)
    }
}
