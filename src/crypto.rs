//! The FF3-1 format-preserving block cipher.
//!
//! This module is the only place in the crate that touches the `aes` block
//! cipher. Everything above it works in characters; this module works in
//! numeral strings (alphabet indexes) and knows nothing about alphabets,
//! unknown characters or chunking.
//!
//! Primitive choices:
//! - **Block cipher**: AES-128/192/256 on the byte-reversed key
//! - **Rounds**: 8 Feistel rounds
//! - **Tweak**: 56 bits (FF3-1), or 64 bits (original FF3)
//! - **Numerals**: interpreted least significant first ("reversed" strings)
//!
//! Every intermediate value stays below `radix^m <= 2^96`, so the round
//! arithmetic fits in `u128` without a big-integer type.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256, Block};
use zeroize::Zeroizing;

use crate::error::FpeError;

/// FF3-1 tweak length in bytes (56 bits).
pub const TWEAK_LEN: usize = 7;

/// FF3 tweak length in bytes (64 bits).
pub const TWEAK_LEN_FF3: usize = 8;

/// The tweak used when the caller does not supply one.
pub const NULL_TWEAK: [u8; TWEAK_LEN] = [0u8; TWEAK_LEN];

const NUM_ROUNDS: u8 = 8;
const BLOCK_LEN: usize = 16;

/// Smallest domain size (`radix^len`) FF3-1 allows.
const DOMAIN_MIN: u128 = 1_000_000;

/// Numerals of half a message must fit in 96 bits.
const HALF_DOMAIN_MAX: u128 = 1 << 96;

/// A validated 64-bit tweak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tweak([u8; TWEAK_LEN_FF3]);

impl Tweak {
    /// Accept a 56-bit tweak (expanded per FF3-1) or a 64-bit tweak.
    /// An empty slice means [`NULL_TWEAK`].
    pub fn new(bytes: &[u8]) -> Result<Self, FpeError> {
        let t = if bytes.is_empty() { &NULL_TWEAK[..] } else { bytes };
        match t.len() {
            TWEAK_LEN => Ok(Self([
                t[0],
                t[1],
                t[2],
                t[3] & 0xF0,
                t[4],
                t[5],
                t[6],
                (t[3] & 0x0F) << 4,
            ])),
            TWEAK_LEN_FF3 => {
                let mut full = [0u8; TWEAK_LEN_FF3];
                full.copy_from_slice(t);
                Ok(Self(full))
            }
            len => Err(FpeError::InvalidTweak(len)),
        }
    }

    fn left(&self) -> &[u8] {
        &self.0[..4]
    }

    fn right(&self) -> &[u8] {
        &self.0[4..]
    }
}

/// Supported message length range `[min, max]` for `radix`.
///
/// `min` is the smallest length with `radix^min >= 10^6`; `max` is twice the
/// largest length with `radix^len <= 2^96`.
pub(crate) fn length_bounds(radix: u32) -> (usize, usize) {
    let radix = radix.max(2) as u128;

    let mut min = 1;
    let mut domain = radix;
    while domain < DOMAIN_MIN {
        domain *= radix;
        min += 1;
    }

    let mut half = 0;
    let mut domain = 1u128;
    while domain * radix <= HALF_DOMAIN_MAX {
        domain *= radix;
        half += 1;
    }

    (min, 2 * half)
}

enum BlockCipher {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl BlockCipher {
    fn encrypt(&self, block: &mut Block) {
        match self {
            Self::Aes128(c) => c.encrypt_block(block),
            Self::Aes192(c) => c.encrypt_block(block),
            Self::Aes256(c) => c.encrypt_block(block),
        }
    }
}

/// FF3-1 bound to one key and one radix.
pub(crate) struct Ff3Cipher {
    aes: BlockCipher,
    radix: u32,
    min_len: usize,
    max_len: usize,
}

impl Ff3Cipher {
    /// Expand `key` for the given radix.
    pub fn new(key: &[u8], radix: u32) -> Result<Self, FpeError> {
        if !(2..=crate::alphabet::MAX_RADIX as u32).contains(&radix) {
            return Err(FpeError::InvalidAlphabet(format!("unsupported radix {}", radix)));
        }

        // FF3 runs AES on the byte-reversed key.
        let mut reversed = Zeroizing::new(key.to_vec());
        reversed.reverse();

        let invalid = |_| FpeError::InvalidKey(format!("invalid key size: {} bits", key.len() * 8));
        let aes = match key.len() {
            16 => BlockCipher::Aes128(Aes128::new_from_slice(&reversed).map_err(invalid)?),
            24 => BlockCipher::Aes192(Aes192::new_from_slice(&reversed).map_err(invalid)?),
            32 => BlockCipher::Aes256(Aes256::new_from_slice(&reversed).map_err(invalid)?),
            n => return Err(FpeError::InvalidKey(format!("invalid key size: {} bits", n * 8))),
        };

        let (min_len, max_len) = length_bounds(radix);
        Ok(Self {
            aes,
            radix,
            min_len,
            max_len,
        })
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Encrypt a numeral string. The output has the same length.
    pub fn encrypt(&self, numerals: &[u16], tweak: &Tweak) -> Result<Vec<u16>, FpeError> {
        let (u, v) = self.split(numerals)?;
        let mut a = numerals[..u].to_vec();
        let mut b = numerals[u..].to_vec();

        for round in 0..NUM_ROUNDS {
            let (m, w) = if round % 2 == 0 { (u, tweak.right()) } else { (v, tweak.left()) };
            let modulus = self.pow(m);
            let y = self.round_value(round, w, &b) % modulus;
            let c = (num_rev(&a, self.radix) + y) % modulus;
            a = std::mem::replace(&mut b, str_rev(c, self.radix, m));
        }

        a.extend_from_slice(&b);
        Ok(a)
    }

    /// Decrypt a numeral string produced by [`Ff3Cipher::encrypt`].
    pub fn decrypt(&self, numerals: &[u16], tweak: &Tweak) -> Result<Vec<u16>, FpeError> {
        let (u, v) = self.split(numerals)?;
        let mut a = numerals[..u].to_vec();
        let mut b = numerals[u..].to_vec();

        for round in (0..NUM_ROUNDS).rev() {
            let (m, w) = if round % 2 == 0 { (u, tweak.right()) } else { (v, tweak.left()) };
            let modulus = self.pow(m);
            let y = self.round_value(round, w, &a) % modulus;
            let c = (num_rev(&b, self.radix) + modulus - y) % modulus;
            b = std::mem::replace(&mut a, str_rev(c, self.radix, m));
        }

        a.extend_from_slice(&b);
        Ok(a)
    }

    /// Validate the length and numerals, and return the split point `(u, v)`.
    fn split(&self, numerals: &[u16]) -> Result<(usize, usize), FpeError> {
        let n = numerals.len();
        if n < self.min_len || n > self.max_len {
            return Err(FpeError::InvalidLength {
                len: n,
                min: self.min_len,
                max: self.max_len,
            });
        }
        debug_assert!(numerals.iter().all(|&d| u32::from(d) < self.radix));
        let u = n.div_ceil(2);
        Ok((u, n - u))
    }

    fn pow(&self, m: usize) -> u128 {
        (self.radix as u128).pow(m as u32)
    }

    /// `REV(CIPH(REV(P)))` as an integer, where `P = W xor [0,0,0,round] || NUM(REV(half))`.
    fn round_value(&self, round: u8, w: &[u8], half: &[u16]) -> u128 {
        let mut p = [0u8; BLOCK_LEN];
        p[..4].copy_from_slice(w);
        p[3] ^= round;
        p[4..].copy_from_slice(&num_rev(half, self.radix).to_be_bytes()[4..]);

        p.reverse();
        let mut block = Block::from(p);
        self.aes.encrypt(&mut block);

        let mut s = [0u8; BLOCK_LEN];
        s.copy_from_slice(block.as_slice());
        s.reverse();
        u128::from_be_bytes(s)
    }
}

/// Value of a numeral string read least significant digit first.
fn num_rev(numerals: &[u16], radix: u32) -> u128 {
    numerals
        .iter()
        .rev()
        .fold(0u128, |acc, &d| acc * radix as u128 + d as u128)
}

/// `m` numerals of `value`, least significant digit first.
fn str_rev(mut value: u128, radix: u32, m: usize) -> Vec<u16> {
    let radix = radix as u128;
    (0..m)
        .map(|_| {
            let digit = (value % radix) as u16;
            value /= radix;
            digit
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGITS: &str = "0123456789";
    const ALPHANUMERIC: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn to_numerals(alphabet: &str, s: &str) -> Vec<u16> {
        s.chars().map(|c| alphabet.find(c).unwrap() as u16).collect()
    }

    fn to_text(alphabet: &str, numerals: &[u16]) -> String {
        let symbols: Vec<char> = alphabet.chars().collect();
        numerals.iter().map(|&n| symbols[n as usize]).collect()
    }

    fn run(key: &str, tweak: &str, alphabet: &str, plaintext: &str) -> String {
        let cipher = Ff3Cipher::new(&hex(key), alphabet.chars().count() as u32).unwrap();
        let tweak = Tweak::new(&hex(tweak)).unwrap();
        let pt = to_numerals(alphabet, plaintext);
        let ct = cipher.encrypt(&pt, &tweak).unwrap();
        assert_eq!(cipher.decrypt(&ct, &tweak).unwrap(), pt);
        to_text(alphabet, &ct)
    }

    #[test]
    fn test_nist_ff3_sample_1() {
        let ct = run(
            "EF4359D8D580AA4F7F036D6F04FC6A94",
            "D8E7920AFA330A73",
            DIGITS,
            "890121234567890000",
        );
        assert_eq!(ct, "750918814058654607");
    }

    #[test]
    fn test_ff3_1_56_bit_tweak() {
        let ct = run(
            "EF4359D8D580AA4F7F036D6F04FC6A94",
            "D8E7920AFA330A",
            DIGITS,
            "890121234567890000",
        );
        assert_eq!(ct, "477064185124354662");
    }

    #[test]
    fn test_alphanumeric_256_bit_key() {
        let key = "6805e5059287b0ed824e6dc81ccf5b8e9b376124590f3fb76b880c40b92d1489";
        assert_eq!(run(key, "00000000000000", ALPHANUMERIC, "Foobar"), "6jZemW");
        assert_eq!(run(key, "CBD09280979564", ALPHANUMERIC, "Foobar"), "o8DR6y");
        assert_eq!(run(key, "00000000000000", ALPHANUMERIC, "abcd"), "QCeY");
    }

    #[test]
    fn test_alphanumeric_128_and_192_bit_keys() {
        assert_eq!(
            run("f8f7bf2c850351a4135a0636c5e0a3b8", "00000000000000", ALPHANUMERIC, "Foobar"),
            "pKklWj"
        );
        assert_eq!(
            run(
                "b3ae70377244dd74484adf15adad331ee8c106a431465c85",
                "00000000000000",
                ALPHANUMERIC,
                "Foobar"
            ),
            "O9GqW4"
        );
    }

    #[test]
    fn test_tweak_expansion() {
        let t = Tweak::new(&hex("D8E7920AFA330A")).unwrap();
        assert_eq!(t.0, [0xD8, 0xE7, 0x92, 0x00, 0xFA, 0x33, 0x0A, 0xA0]);
        assert_eq!(Tweak::new(&[]).unwrap(), Tweak::new(&NULL_TWEAK).unwrap());
        assert!(matches!(Tweak::new(&[0u8; 16]), Err(FpeError::InvalidTweak(16))));
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(length_bounds(10), (6, 56));
        assert_eq!(length_bounds(62), (4, 32));
        assert_eq!(length_bounds(256), (3, 24));
        assert_eq!(length_bounds(2), (20, 192));
    }

    #[test]
    fn test_rejects_out_of_range_length() {
        let cipher = Ff3Cipher::new(&[7u8; 16], 62).unwrap();
        let tweak = Tweak::new(&NULL_TWEAK).unwrap();
        assert!(matches!(
            cipher.encrypt(&[1, 2, 3], &tweak),
            Err(FpeError::InvalidLength { len: 3, min: 4, max: 32 })
        ));
        assert!(cipher.decrypt(&[0u16; 33], &tweak).is_err());
    }

    #[test]
    fn test_rejects_bad_key_sizes() {
        for len in [0, 8, 15, 17, 31, 33, 64] {
            assert!(matches!(Ff3Cipher::new(&vec![0u8; len], 10), Err(FpeError::InvalidKey(_))));
        }
    }
}
