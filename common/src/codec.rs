// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binary/text conversions for WebAuthn ceremony values.
//!
//! Browsers hand us credential ids, authenticator data and user handles as
//! base64 text, while the verification engine wants raw bytes. Every value
//! crossing that boundary goes through this module so that registration and
//! login agree on a single encoding.
//!
//! Three textual forms are involved:
//!
//! - **Standard base64** (`+`, `/`, `=` padding). This is what we emit.
//!   Incoming strings may have their padding stripped, and browsers send
//!   credential ids in the URL-safe alphabet (`-`, `_`), so every decode
//!   accepts both alphabets and pads first.
//! - **Latin-1 strings**: a `String` in which each `char` is one source byte
//!   (every code point ≤ U+00FF). This is the text view of an arbitrary
//!   buffer. It is never UTF-8 decoded, so bytes such as `0xFF` survive.
//! - **Raw bytes** (`Vec<u8>`).
//!
//! # Examples
//!
//! ```
//! use fidobridge_common::codec::{base64_from_bytes, bytes_from_base64, bytes_from_latin1};
//!
//! let bytes = bytes_from_latin1("AB").unwrap();
//! assert_eq!(bytes, vec![0x41, 0x42]);
//! assert_eq!(base64_from_bytes(&bytes), "QUI=");
//!
//! // Missing padding is tolerated
//! assert_eq!(bytes_from_base64("QUI").unwrap(), vec![0x41, 0x42]);
//! ```

use base64ct::{Base64, Encoding};
use thiserror::Error;

/// Highest code point representable as a single byte.
const LATIN1_MAX: u32 = 0xFF;

/// Standard base64 alphabet, indexed by sextet value
const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Errors raised when crossing the binary/text boundary
#[derive(Debug, Error)]
pub enum EncodingError {
    /// A character above U+00FF cannot be stored in one byte
    #[error(
        "string contains non-ASCII characters, which are not supported: \
         {ch:?} at position {index}"
    )]
    NonLatin1 { index: usize, ch: char },

    /// Base64 text could not be decoded
    #[error("error converting base64 to {target}: {source}")]
    Base64 {
        target: &'static str,
        #[source]
        source: base64ct::Error,
    },
}

pub type Result<T> = std::result::Result<T, EncodingError>;

/// Convert a Latin-1 string into bytes, one byte per character.
///
/// Fails on the first character whose code point is above `0xFF`. No
/// normalization or multi-byte expansion takes place.
pub fn bytes_from_latin1(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .enumerate()
        .map(|(index, ch)| match ch as u32 {
            code if code <= LATIN1_MAX => Ok(code as u8),
            _ => Err(EncodingError::NonLatin1 { index, ch }),
        })
        .collect()
}

/// Inverse of [`bytes_from_latin1`]; infallible because every byte maps to
/// exactly one code point.
pub fn latin1_from_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Append `=` until the length is a multiple of four.
///
/// The input is not validated: a string whose length leaves remainder 1
/// still receives three `=` and will fail later at decode time.
pub fn pad_base64(text: &str) -> String {
    let padding = (4 - text.len() % 4) % 4;
    let mut padded = String::with_capacity(text.len() + padding);
    padded.push_str(text);
    padded.extend(std::iter::repeat('=').take(padding));
    padded
}

/// Encode bytes as standard, padded base64.
pub fn base64_from_bytes(bytes: &[u8]) -> String {
    Base64::encode_string(bytes)
}

/// Decode (possibly unpadded) base64 into the exact original bytes.
///
/// The decoded bytes are routed through their Latin-1 string form and back so
/// that both decode paths in this module share one definition of "a byte".
pub fn bytes_from_base64(text: &str) -> Result<Vec<u8>> {
    let plain = decode_padded(text, "buffer")?;
    bytes_from_latin1(&plain)
}

/// Decode (possibly unpadded) base64 into a Latin-1 string.
///
/// Used where the decoded value serves as a string key (user handles).
pub fn latin1_from_base64(text: &str) -> Result<String> {
    decode_padded(text, "plain string")
}

fn decode_padded(text: &str, target: &'static str) -> Result<String> {
    let raw = Base64::decode_vec(&pad_base64(&canonicalize(text)))
        .map_err(|source| EncodingError::Base64 { target, source })?;
    Ok(latin1_from_bytes(&raw))
}

/// Rewrite `text` into canonical standard base64 without padding.
///
/// URL-safe `-`/`_` become `+`/`/`, trailing `=` are dropped, and the unused
/// low bits of a final partial group are cleared. Anything else is left for
/// the decoder to reject.
fn canonicalize(text: &str) -> String {
    let mut body: String = text
        .trim_end_matches('=')
        .chars()
        .map(|ch| match ch {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let unused_bits = match body.len() % 4 {
        2 => 4,
        3 => 2,
        _ => 0,
    };
    if unused_bits > 0 {
        let sextet = body
            .chars()
            .last()
            .and_then(|last| ALPHABET.iter().position(|&c| char::from(c) == last));
        if let Some(sextet) = sextet {
            body.pop();
            body.push(char::from(ALPHABET[sextet & !((1 << unused_bits) - 1)]));
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_from_latin1_ascii() {
        assert_eq!(bytes_from_latin1("AB").unwrap(), vec![0x41, 0x42]);
        assert_eq!(bytes_from_latin1("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_bytes_from_latin1_accepts_high_latin1() {
        assert_eq!(
            bytes_from_latin1("caf\u{e9}").unwrap(),
            vec![b'c', b'a', b'f', 0xE9]
        );
        assert_eq!(bytes_from_latin1("\u{ff}").unwrap(), vec![0xFF]);
        assert_eq!(bytes_from_latin1("\u{0}").unwrap(), vec![0x00]);
    }

    #[test]
    fn test_bytes_from_latin1_rejects_every_position() {
        for index in 0..4 {
            let mut chars = vec!['a'; 4];
            chars[index] = '\u{100}';
            let text: String = chars.into_iter().collect();

            match bytes_from_latin1(&text) {
                Err(EncodingError::NonLatin1 { index: at, ch }) => {
                    assert_eq!(at, index);
                    assert_eq!(ch, '\u{100}');
                }
                other => panic!("expected NonLatin1 at {}, got {:?}", index, other),
            }
        }
    }

    #[test]
    fn test_bytes_from_latin1_reports_char_position_not_byte_offset() {
        // 'é' is two UTF-8 bytes but one character
        let err = bytes_from_latin1("\u{e9}\u{e9}\u{20ac}").unwrap_err();
        assert!(matches!(err, EncodingError::NonLatin1 { index: 2, .. }));
        assert!(err.to_string().contains("non-ASCII characters"));
    }

    #[test]
    fn test_pad_base64_table() {
        assert_eq!(pad_base64(""), "");
        assert_eq!(pad_base64("QUJD"), "QUJD");
        assert_eq!(pad_base64("Q"), "Q===");
        assert_eq!(pad_base64("QQ"), "QQ==");
        assert_eq!(pad_base64("QUI"), "QUI=");
    }

    #[test]
    fn test_pad_base64_idempotent() {
        for s in ["QUJD", "QUI", "QQ", "Q", "QUI=", "QQ=="] {
            let once = pad_base64(s);
            assert_eq!(pad_base64(&once), once, "padding twice changed {:?}", s);
            assert_eq!(once.len() % 4, 0);
        }
    }

    #[test]
    fn test_base64_from_bytes_uses_standard_alphabet() {
        assert_eq!(base64_from_bytes(&[0x41, 0x42]), "QUI=");
        assert_eq!(base64_from_bytes(&[0xFB, 0xFF, 0xBF]), "+/+/");
        assert_eq!(base64_from_bytes(&[]), "");
    }

    #[test]
    fn test_bytes_from_base64_tolerates_missing_padding() {
        assert_eq!(bytes_from_base64("QUI").unwrap(), vec![0x41, 0x42]);
        assert_eq!(bytes_from_base64("QUI=").unwrap(), vec![0x41, 0x42]);
        assert_eq!(bytes_from_base64("QQ").unwrap(), vec![0x41]);
    }

    #[test]
    fn test_bytes_from_base64_boundary_bytes() {
        let all: Vec<u8> = (0..=255).collect();
        let encoded = base64_from_bytes(&all);
        assert_eq!(bytes_from_base64(&encoded).unwrap(), all);
        assert_eq!(
            bytes_from_base64(encoded.trim_end_matches('=')).unwrap(),
            all
        );
    }

    #[test]
    fn test_bytes_from_base64_rejects_malformed() {
        let err = bytes_from_base64("Q").unwrap_err();
        assert!(matches!(err, EncodingError::Base64 { target: "buffer", .. }));

        assert!(bytes_from_base64("QU!=").is_err());
        assert!(bytes_from_base64("QU\u{e9}").is_err());
    }

    #[test]
    fn test_bytes_from_base64_accepts_url_safe_alphabet() {
        let expected = vec![0xFB, 0xFF, 0xBF, 0x01];
        assert_eq!(bytes_from_base64("-_-_AQ").unwrap(), expected);
        assert_eq!(bytes_from_base64("-_-_AQ==").unwrap(), expected);
        assert_eq!(bytes_from_base64("+/+/AQ==").unwrap(), expected);
        assert_eq!(latin1_from_base64("-_-_").unwrap(), "\u{fb}\u{ff}\u{bf}");

        // Encoding stays on the standard alphabet
        assert_eq!(base64_from_bytes(&expected), "+/+/AQ==");
    }

    #[test]
    fn test_bytes_from_base64_ignores_trailing_bits() {
        // "QUJ" carries a stray bit after "AB"; canonical form is "QUI"
        assert_eq!(bytes_from_base64("QUJ").unwrap(), vec![0x41, 0x42]);
        assert_eq!(bytes_from_base64("QUJ=").unwrap(), vec![0x41, 0x42]);
        assert_eq!(bytes_from_base64("QR").unwrap(), vec![0x41]);
        assert_eq!(bytes_from_base64("Q_").unwrap(), vec![0x43]);
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize("-_-_"), "+/+/");
        assert_eq!(canonicalize("QUJ="), "QUI");
        assert_eq!(canonicalize("QUJD"), "QUJD");
        assert_eq!(canonicalize(""), "");
    }

    #[test]
    fn test_base64_error_keeps_source() {
        use std::error::Error as _;

        let err = latin1_from_base64("@@@@").unwrap_err();
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("error converting base64 to plain string"));
    }

    #[test]
    fn test_latin1_from_base64_is_not_utf8_decoded() {
        // 0xC3 0xA9 is "é" in UTF-8 but must stay two separate chars
        let plain = latin1_from_base64(&base64_from_bytes(&[0xC3, 0xA9])).unwrap();
        assert_eq!(plain.chars().count(), 2);
        assert_eq!(plain, "\u{c3}\u{a9}");
    }

    #[test]
    fn test_plain_text_round_trip() {
        for s in ["u1", "user@example.com", "", "caf\u{e9}", "\u{0}\u{ff}"] {
            let bytes = bytes_from_latin1(s).unwrap();
            assert_eq!(latin1_from_base64(&base64_from_bytes(&bytes)).unwrap(), s);
        }
    }
}
