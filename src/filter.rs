//! Unknown-character handling.
//!
//! The FF3-1 primitive only accepts characters from its alphabet. Before the
//! cipher runs, exactly one [`UnknownCharacterStrategy`] is applied to the
//! input. Only `Skip` has a reverse step: skipped characters are injected back
//! at their original positions once the cipher has produced its output.

use serde::{Deserialize, Serialize};

use crate::alphabet::Alphabet;
use crate::error::FpeError;

/// How characters outside the alphabet are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnknownCharacterStrategy {
    /// Reject the input with [`FpeError::IncompatiblePlaintext`].
    #[default]
    Fail,
    /// Leave unknown characters unencrypted, at their original positions.
    Skip,
    /// Replace unknown characters with a redaction character. Lossy.
    Redact,
    /// Remove unknown characters. Lossy, and the output may be shorter.
    Delete,
}

/// A character removed by `Skip`, and where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexedCharacter {
    pub pos: usize,
    pub character: char,
}

/// Splits text into the characters the cipher may see and the ones it may not.
#[derive(Debug, Default)]
pub(crate) struct CharacterSkipper {
    skipped: Vec<IndexedCharacter>,
    retained: Vec<char>,
}

impl CharacterSkipper {
    pub fn new(text: &[char], alphabet: &Alphabet) -> Self {
        let mut skipper = Self::default();
        for (pos, &character) in text.iter().enumerate() {
            if alphabet.contains(character) {
                skipper.retained.push(character);
            } else {
                skipper.skipped.push(IndexedCharacter { pos, character });
            }
        }
        skipper
    }

    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }

    /// Insert the skipped characters back at their original indexes.
    ///
    /// `text` must be as long as the retained text. Positions are ascending,
    /// so each insert lands inside the text rebuilt so far.
    pub fn inject_into(&self, text: &mut Vec<char>) {
        for c in &self.skipped {
            text.insert(c.pos, c.character);
        }
    }
}

/// Text ready for the cipher, plus whatever is needed to undo the filter.
#[derive(Debug)]
pub(crate) struct Filtered {
    text: Vec<char>,
    skipper: Option<CharacterSkipper>,
}

impl Filtered {
    fn unchanged(text: Vec<char>) -> Self {
        Self { text, skipper: None }
    }

    fn skipped(text: &[char], alphabet: &Alphabet) -> Self {
        let mut skipper = CharacterSkipper::new(text, alphabet);
        let retained = std::mem::take(&mut skipper.retained);
        Self {
            text: retained,
            skipper: skipper.has_skipped().then_some(skipper),
        }
    }

    /// The text to hand to the cipher.
    pub fn text(&self) -> &[char] {
        &self.text
    }

    /// Apply the reverse step to the cipher output.
    pub fn restore(&self, mut output: Vec<char>) -> Vec<char> {
        if let Some(skipper) = &self.skipper {
            skipper.inject_into(&mut output);
        }
        output
    }
}

/// Prepare plaintext for encryption.
///
/// `redaction_char` is only used by `Redact`; the caller resolves it from the
/// params or the alphabet's default.
pub(crate) fn for_encryption(
    text: Vec<char>,
    alphabet: &Alphabet,
    strategy: UnknownCharacterStrategy,
    redaction_char: char,
) -> Result<Filtered, FpeError> {
    match strategy {
        UnknownCharacterStrategy::Fail => {
            if text.iter().all(|&c| alphabet.contains(c)) {
                Ok(Filtered::unchanged(text))
            } else {
                Err(FpeError::IncompatiblePlaintext {
                    alphabet: alphabet.to_string(),
                })
            }
        }
        UnknownCharacterStrategy::Skip => Ok(Filtered::skipped(&text, alphabet)),
        UnknownCharacterStrategy::Redact => Ok(Filtered::unchanged(
            text.into_iter()
                .map(|c| if alphabet.contains(c) { c } else { redaction_char })
                .collect(),
        )),
        UnknownCharacterStrategy::Delete => Ok(Filtered::unchanged(
            text.into_iter().filter(|&c| alphabet.contains(c)).collect(),
        )),
    }
}

/// Prepare ciphertext for decryption.
///
/// Redact and Delete have nothing to undo, and Fail has nothing to check that
/// the cipher would not reject anyway, so only Skip filters here.
pub(crate) fn for_decryption(
    text: Vec<char>,
    alphabet: &Alphabet,
    strategy: UnknownCharacterStrategy,
) -> Filtered {
    match strategy {
        UnknownCharacterStrategy::Skip => Filtered::skipped(&text, alphabet),
        UnknownCharacterStrategy::Fail
        | UnknownCharacterStrategy::Redact
        | UnknownCharacterStrategy::Delete => Filtered::unchanged(text),
    }
}
