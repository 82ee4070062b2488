//! Minimal DER reader for RSA `SubjectPublicKeyInfo`.
//!
//! Only the path needed to pull `n` and `e` out of an RSA public key is
//! supported:
//!
//! ```text
//! SubjectPublicKeyInfo ::= SEQUENCE {
//!     algorithm        AlgorithmIdentifier,   -- skipped
//!     subjectPublicKey BIT STRING {
//!         RSAPublicKey ::= SEQUENCE {
//!             modulus         INTEGER,
//!             publicExponent  INTEGER
//!         }
//!     }
//! }
//! ```

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use thiserror::Error;

const TAG_INTEGER: u8 = 0x02;
const TAG_BIT_STRING: u8 = 0x03;
const TAG_SEQUENCE: u8 = 0x30;

/// Longest long-form length accepted, in bytes.
const MAX_LENGTH_OCTETS: usize = 4;

/// Errors produced while walking DER input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DerError {
    /// Input ended inside a tag, length or value.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEnd {
        /// Byte offset where more input was needed.
        offset: usize,
    },

    /// A different element was found than the structure requires.
    #[error("expected tag 0x{expected:02x}, found 0x{found:02x} at offset {offset}")]
    UnexpectedTag {
        /// Tag required at this position.
        expected: u8,
        /// Tag actually present.
        found: u8,
        /// Byte offset of the tag.
        offset: usize,
    },

    /// Indefinite or oversized length encoding.
    #[error("unsupported length encoding 0x{0:02x}")]
    UnsupportedLength(u8),

    /// The BIT STRING declares unused bits, which a key never has.
    #[error("bit string has {0} unused bits")]
    UnusedBits(u8),

    /// An INTEGER with no content octets.
    #[error("empty integer")]
    EmptyInteger,
}

/// Raw RSA public key components, big-endian and unsigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicComponents {
    /// Modulus `n`, without the DER sign byte.
    pub modulus: Vec<u8>,
    /// Public exponent `e`.
    pub exponent: Vec<u8>,
}

impl RsaPublicComponents {
    /// Modulus as unpadded base64url, the JWK `n` member.
    #[must_use]
    pub fn modulus_b64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.modulus)
    }

    /// Exponent as unpadded base64url, the JWK `e` member.
    #[must_use]
    pub fn exponent_b64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.exponent)
    }
}

/// Extract `n` and `e` from a DER encoded RSA `SubjectPublicKeyInfo`.
///
/// One leading zero byte is stripped from the modulus; DER adds it whenever
/// the top bit of the first content byte is set.
///
/// # Errors
///
/// Returns [`DerError`] if the input does not follow the structure above.
///
/// # Examples
///
/// ```
/// use credential_issuer::keys::der::parse_public_key_components;
///
/// let spki = [
///     0x30, 0x1e, 0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01,
///     0x01, 0x05, 0x00, 0x03, 0x0d, 0x00, 0x30, 0x0a, 0x02, 0x03, 0x00, 0xc5, 0x01, 0x02,
///     0x03, 0x01, 0x00, 0x01,
/// ];
/// let components = parse_public_key_components(&spki).unwrap();
/// assert_eq!(components.modulus_b64url(), "xQE");
/// assert_eq!(components.exponent_b64url(), "AQAB");
/// ```
pub fn parse_public_key_components(spki: &[u8]) -> Result<RsaPublicComponents, DerError> {
    let mut outer = Reader::new(spki);
    let mut spki_body = outer.nested(TAG_SEQUENCE)?;

    spki_body.element(TAG_SEQUENCE)?;

    let bit_string = spki_body.element(TAG_BIT_STRING)?;
    let (&unused_bits, key_bytes) = bit_string
        .split_first()
        .ok_or(DerError::UnexpectedEnd { offset: spki_body.pos })?;
    if unused_bits != 0 {
        return Err(DerError::UnusedBits(unused_bits));
    }

    let mut key = Reader::new(key_bytes);
    let mut rsa_key = key.nested(TAG_SEQUENCE)?;

    let modulus = rsa_key.element(TAG_INTEGER)?;
    let exponent = rsa_key.element(TAG_INTEGER)?;
    if modulus.is_empty() || exponent.is_empty() {
        return Err(DerError::EmptyInteger);
    }

    let modulus = match modulus {
        [0x00, rest @ ..] if !rest.is_empty() => rest,
        other => other,
    };

    Ok(RsaPublicComponents {
        modulus: modulus.to_vec(),
        exponent: exponent.to_vec(),
    })
}

/// Decode a DER length field at the start of `bytes`.
///
/// Returns the decoded length and how many bytes the field occupied.
pub(crate) fn decode_length(bytes: &[u8]) -> Result<(usize, usize), DerError> {
    let first = *bytes.first().ok_or(DerError::UnexpectedEnd { offset: 0 })?;

    if first < 0x80 {
        return Ok((usize::from(first), 1));
    }

    let octets = usize::from(first & 0x7f);
    if octets == 0 || octets > MAX_LENGTH_OCTETS {
        return Err(DerError::UnsupportedLength(first));
    }

    let field = bytes
        .get(1..=octets)
        .ok_or(DerError::UnexpectedEnd { offset: bytes.len() })?;
    let length = field
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));

    Ok((length, 1 + octets))
}

/// Cursor over a DER byte slice.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Read one TLV with the given tag and return its content octets.
    fn element(&mut self, tag: u8) -> Result<&'a [u8], DerError> {
        let found = *self
            .bytes
            .get(self.pos)
            .ok_or(DerError::UnexpectedEnd { offset: self.pos })?;
        if found != tag {
            return Err(DerError::UnexpectedTag {
                expected: tag,
                found,
                offset: self.pos,
            });
        }

        let length_start = self.pos + 1;
        let rest = self
            .bytes
            .get(length_start..)
            .ok_or(DerError::UnexpectedEnd { offset: length_start })?;
        let (length, consumed) = decode_length(rest).map_err(|err| match err {
            DerError::UnexpectedEnd { offset } => DerError::UnexpectedEnd {
                offset: length_start + offset,
            },
            other => other,
        })?;

        let start = length_start + consumed;
        let end = start
            .checked_add(length)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(DerError::UnexpectedEnd {
                offset: self.bytes.len(),
            })?;

        self.pos = end;
        Ok(&self.bytes[start..end])
    }

    /// Read a constructed element and return a reader over its contents.
    fn nested(&mut self, tag: u8) -> Result<Reader<'a>, DerError> {
        self.element(tag).map(Reader::new)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// 2048-bit RSA public key, SubjectPublicKeyInfo DER.
    const SPKI_2048_HEX: &str = concat!(
        "30820122300d06092a864886f70d01010105000382010f003082010a0282010100",
        "b3779f79854a1bab286998634231bda9fdcc47b2a62e56c611132c1eb21e7c3c",
        "0e25fb4672bd9bf2b34b52aac0f4c1d688794e83aaf6a11d6ddac83aaae74e71",
        "30746525d3d81205f8fb56c3ddb43cc0a92a60b4aa36f5d6803600dfe977b3a7",
        "b8e229c51990256c970721ac2b8f78daadc8f171414f4c96cae4ea9519a9915b",
        "df0e5246bb462daec7ad49320df611ec54abfdb593b26757b66cc75a8a8f581c",
        "5025048b140f14a14d0154b2267c1d6608e20e7f2010c31e0f0c86df6891afc3",
        "4d5d890bd34606796172e63e6be3f56e3594890e21f1bf1cbd358a074a0852f7",
        "f3e556ae5e5c9570e5ce37cdeb4014b13a46522e0ded33c81ec6eac1e168642d",
        "0203010001",
    );

    const SPKI_2048_N: &str = concat!(
        "s3efeYVKG6soaZhjQjG9qf3MR7KmLlbGERMsHrIefDwOJftGcr2b8rNLUqrA9MHW",
        "iHlOg6r2oR1t2sg6qudOcTB0ZSXT2BIF-PtWw920PMCpKmC0qjb11oA2AN_pd7On",
        "uOIpxRmQJWyXByGsK4942q3I8XFBT0yWyuTqlRmpkVvfDlJGu0YtrsetSTIN9hHs",
        "VKv9tZOyZ1e2bMdaio9YHFAlBIsUDxShTQFUsiZ8HWYI4g5_IBDDHg8Mht9oka_D",
        "TV2JC9NGBnlhcuY-a-P1bjWUiQ4h8b8cvTWKB0oIUvfz5VauXlyVcOXON83rQBSx",
        "OkZSLg3tM8gexurB4WhkLQ",
    );

    /// Hand-built key: n = 0xc501 (sign byte present), e = 65537.
    const SPKI_TINY: [u8; 32] = [
        0x30, 0x1e, 0x30, 0x0d, 0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01,
        0x05, 0x00, 0x03, 0x0d, 0x00, 0x30, 0x0a, 0x02, 0x03, 0x00, 0xc5, 0x01, 0x02, 0x03, 0x01,
        0x00, 0x01,
    ];

    #[test]
    fn test_parses_2048_bit_key() {
        let spki = hex::decode(SPKI_2048_HEX).unwrap();
        assert_eq!(spki.len(), 294);

        let components = parse_public_key_components(&spki).unwrap();

        assert_eq!(components.modulus.len(), 256);
        assert_eq!(components.modulus[0], 0xb3);
        assert_eq!(components.modulus_b64url(), SPKI_2048_N);
        assert_eq!(components.exponent_b64url(), "AQAB");
    }

    #[test]
    fn test_parses_short_form_lengths_and_strips_sign_byte() {
        let components = parse_public_key_components(&SPKI_TINY).unwrap();

        assert_eq!(components.modulus, vec![0xc5, 0x01]);
        assert_eq!(components.exponent, vec![0x01, 0x00, 0x01]);
        assert_eq!(components.modulus_b64url(), "xQE");
        assert_eq!(components.exponent_b64url(), "AQAB");
    }

    #[test]
    fn test_modulus_without_sign_byte_is_kept() {
        let mut spki = SPKI_TINY;
        // Leading byte 0x01 is part of the value, not a sign byte.
        spki[24] = 0x01;
        let components = parse_public_key_components(&spki).unwrap();

        assert_eq!(components.modulus, vec![0x01, 0xc5, 0x01]);
    }

    #[test]
    fn test_rejects_wrong_outer_tag() {
        let mut spki = SPKI_TINY;
        spki[0] = 0x31;

        assert_eq!(
            parse_public_key_components(&spki),
            Err(DerError::UnexpectedTag {
                expected: TAG_SEQUENCE,
                found: 0x31,
                offset: 0,
            })
        );
    }

    #[test]
    fn test_rejects_truncated_input() {
        for cut in [0, 1, 10, 20, 31] {
            assert!(
                matches!(
                    parse_public_key_components(&SPKI_TINY[..cut]),
                    Err(DerError::UnexpectedEnd { .. })
                ),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_rejects_unused_bits() {
        let mut spki = SPKI_TINY;
        spki[19] = 0x03;

        assert_eq!(
            parse_public_key_components(&spki),
            Err(DerError::UnusedBits(3))
        );
    }

    #[test]
    fn test_rejects_indefinite_length() {
        assert_eq!(decode_length(&[0x80]), Err(DerError::UnsupportedLength(0x80)));
        assert_eq!(decode_length(&[0x85, 1, 2, 3, 4, 5]), Err(DerError::UnsupportedLength(0x85)));
    }

    #[test]
    fn test_decodes_long_form_lengths() {
        assert_eq!(decode_length(&[0x81, 0x80]), Ok((128, 2)));
        assert_eq!(decode_length(&[0x82, 0x01, 0x22]), Ok((290, 3)));
        assert_eq!(
            decode_length(&[0x82, 0x01]),
            Err(DerError::UnexpectedEnd { offset: 2 })
        );
    }

    fn encode_length(length: usize) -> Vec<u8> {
        if length < 0x80 {
            return vec![u8::try_from(length).unwrap()];
        }
        let be = length.to_be_bytes();
        let skip = be.iter().take_while(|b| **b == 0).count();
        let mut out = vec![0x80 | u8::try_from(be.len() - skip).unwrap()];
        out.extend_from_slice(&be[skip..]);
        out
    }

    proptest! {
        #[test]
        fn prop_length_decoder_inverts_encoding(length in 0usize..=0xffff_ffff) {
            let encoded = encode_length(length);
            prop_assert_eq!(decode_length(&encoded), Ok((length, encoded.len())));
        }

        #[test]
        fn prop_parser_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = parse_public_key_components(&bytes);
        }
    }
}
