//! Alphabets and redaction character deduction.
//!
//! An [`Alphabet`] is the ordered, duplicate-free set of symbols a key
//! encrypts over. The position of a symbol is its numeral value inside the
//! cipher, so an alphabet must never change once a key has been bound to it.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FpeError;

/// Largest radix the FF3-1 primitive accepts.
pub const MAX_RADIX: usize = 256;

/// Fallback redaction characters, in order of preference.
pub const REDACTION_CANDIDATES: [char; 7] = ['*', '?', '_', '-', 'X', 'x', '0'];

/// Predefined character groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CharacterGroup {
    /// `0123456789`
    Digits,
    /// `A-Z`, then `a-z`, then `0-9`.
    Alphanumeric,
    /// `A-Z`, then `a-z`.
    Alpha,
    /// `A-Z`
    UpperAlpha,
    /// `a-z`
    LowerAlpha,
}

impl CharacterGroup {
    pub const ALL: [CharacterGroup; 5] = [
        Self::Digits,
        Self::Alphanumeric,
        Self::Alpha,
        Self::UpperAlpha,
        Self::LowerAlpha,
    ];

    /// The symbols of this group, in alphabet order.
    pub fn chars(&self) -> &'static str {
        match self {
            Self::Digits => "0123456789",
            Self::Alphanumeric => "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789",
            Self::Alpha => "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz",
            Self::UpperAlpha => "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            Self::LowerAlpha => "abcdefghijklmnopqrstuvwxyz",
        }
    }
}

/// An ordered set of symbols. Radix is the number of symbols.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Alphabet {
    symbols: Vec<char>,
    index: HashMap<char, u16>,
}

impl Alphabet {
    /// Build an alphabet from its symbols, in order.
    ///
    /// Fails if there are fewer than two symbols, more than [`MAX_RADIX`], or
    /// any symbol appears twice.
    pub fn new(symbols: &str) -> Result<Self, FpeError> {
        let symbols: Vec<char> = symbols.chars().collect();
        if symbols.len() < 2 || symbols.len() > MAX_RADIX {
            return Err(FpeError::InvalidAlphabet(format!(
                "radix {} outside 2..={}",
                symbols.len(),
                MAX_RADIX
            )));
        }

        let mut index = HashMap::with_capacity(symbols.len());
        for (pos, &c) in symbols.iter().enumerate() {
            if index.insert(c, pos as u16).is_some() {
                return Err(FpeError::InvalidAlphabet(format!("duplicate symbol {:?}", c)));
            }
        }

        Ok(Self { symbols, index })
    }

    /// Concatenate character groups in order, then `extra` symbols such as
    /// a space.
    pub fn from_groups(groups: &[CharacterGroup], extra: &str) -> Result<Self, FpeError> {
        let mut symbols: String = groups.iter().map(|g| g.chars()).collect();
        symbols.push_str(extra);
        Self::new(&symbols)
    }

    /// Number of symbols.
    pub fn radix(&self) -> u32 {
        self.symbols.len() as u32
    }

    pub fn contains(&self, c: char) -> bool {
        self.index.contains_key(&c)
    }

    /// Numeral value of `c`, if it belongs to the alphabet.
    pub fn index_of(&self, c: char) -> Option<u16> {
        self.index.get(&c).copied()
    }

    /// The first of [`REDACTION_CANDIDATES`] present in this alphabet.
    pub fn redaction_char(&self) -> Result<char, FpeError> {
        REDACTION_CANDIDATES
            .iter()
            .copied()
            .find(|&c| self.contains(c))
            .ok_or_else(|| FpeError::RedactionCharUnavailable {
                alphabet: self.to_string(),
            })
    }

    /// Map characters to numerals. Every character must be in the alphabet.
    pub(crate) fn to_numerals(&self, text: &[char]) -> Result<Vec<u16>, FpeError> {
        text.iter()
            .map(|&c| self.index_of(c).ok_or(FpeError::InvalidCharacter(c)))
            .collect()
    }

    /// Map numerals back to characters. Numerals come from the primitive and
    /// are always below the radix.
    pub(crate) fn from_numerals(&self, numerals: &[u16]) -> Vec<char> {
        numerals.iter().map(|&n| self.symbols[n as usize]).collect()
    }
}

/// Every group has between 10 and 62 distinct symbols.
impl From<CharacterGroup> for Alphabet {
    fn from(group: CharacterGroup) -> Self {
        let symbols: Vec<char> = group.chars().chars().collect();
        let index = symbols
            .iter()
            .enumerate()
            .map(|(pos, &c)| (c, pos as u16))
            .collect();
        Self { symbols, index }
    }
}

impl TryFrom<String> for Alphabet {
    type Error = FpeError;

    fn try_from(symbols: String) -> Result<Self, Self::Error> {
        Self::new(&symbols)
    }
}

impl From<Alphabet> for String {
    fn from(alphabet: Alphabet) -> Self {
        alphabet.symbols.into_iter().collect()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.symbols.iter().try_for_each(|c| write!(f, "{}", c))
    }
}

impl fmt::Debug for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Alphabet").field(&self.to_string()).finish()
    }
}
