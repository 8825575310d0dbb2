//! Byte-level helpers shared by every frame family: checksums, nibble
//! encoding and bounds-checked slicing.
//!
//! All functions are pure. Checksums are folded into ASCII "nibble"
//! characters by adding `0x30` to each 4-bit group, most significant first.

use crate::FiscalError;

/// Offset added to each 4-bit group when encoding it as an ASCII character.
pub const NIBBLE_OFFSET: u8 = 0x30;

/// Encode one byte as two ASCII nibble characters, high nibble first.
pub fn nibble_encode(byte: u8) -> [u8; 2] {
    [NIBBLE_OFFSET + (byte >> 4), NIBBLE_OFFSET + (byte & 0x0F)]
}

/// Encode a 16-bit value as four ASCII nibble characters, high nibble first.
pub fn nibble_encode_u16(value: u16) -> [u8; 4] {
    let [hi, lo] = value.to_be_bytes();
    let [a, b] = nibble_encode(hi);
    let [c, d] = nibble_encode(lo);
    [a, b, c, d]
}

/// Decode up to four ASCII nibble characters back into a value.
///
/// Every byte must lie in `0x30..=0x3F`.
pub fn nibble_decode(encoded: &[u8]) -> Result<u16, FiscalError> {
    if encoded.is_empty() || encoded.len() > 4 {
        return Err(FiscalError::MalformedFrame {
            details: format!("nibble field must be 1-4 bytes, got {}", encoded.len()),
        });
    }
    encoded.iter().try_fold(0u16, |acc, &b| {
        if !(NIBBLE_OFFSET..=NIBBLE_OFFSET + 0x0F).contains(&b) {
            return Err(FiscalError::MalformedFrame {
                details: format!("byte {b:#04X} is not a nibble character"),
            });
        }
        Ok((acc << 4) | u16::from(b - NIBBLE_OFFSET))
    })
}

/// Wrapping 16-bit additive sum (ISL, ISL-X).
pub fn additive_sum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(u16::from(b)))
}

/// Wrapping 8-bit additive sum (ICP).
pub fn additive_sum_u8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// XOR fold of all bytes (ZFP).
pub fn xor_sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Bounds-checked sub-slice `buffer[from..to]`.
///
/// Fails with [`FiscalError::Range`] when `from > to` or `to` is past the end.
pub fn slice_between(buffer: &[u8], from: usize, to: usize) -> Result<&[u8], FiscalError> {
    if from > to || to > buffer.len() {
        return Err(FiscalError::Range {
            from,
            to,
            len: buffer.len(),
        });
    }
    Ok(&buffer[from..to])
}

/// Decode pairs of ASCII hex digits (`"8A00..."`) into raw bytes.
///
/// A digit is `0-9`, `A-F`, `a-f`, or one of the 0x30-offset nibbles
/// `:;<=>?` standing for 10..15.
pub fn hex_pairs_decode(ascii: &[u8]) -> Result<Vec<u8>, FiscalError> {
    if ascii.len() % 2 != 0 {
        return Err(FiscalError::MalformedFrame {
            details: format!("odd number of hex digits ({})", ascii.len()),
        });
    }
    ascii
        .chunks_exact(2)
        .map(|pair| Ok((hex_value(pair[0])? << 4) | hex_value(pair[1])?))
        .collect()
}

fn hex_value(digit: u8) -> Result<u8, FiscalError> {
    match digit {
        b'0'..=b'?' => Ok(digit - b'0'),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        _ => Err(FiscalError::MalformedFrame {
            details: format!("byte {digit:#04X} is not a hex digit"),
        }),
    }
}

/// Format bytes as `01 33 25 ...` for log output.
pub(crate) fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{b:02X}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nibble_encode_byte() {
        assert_eq!(nibble_encode(0x00), [0x30, 0x30]);
        assert_eq!(nibble_encode(0xB1), [0x3B, 0x31]);
        assert_eq!(nibble_encode(0xFF), [0x3F, 0x3F]);
    }

    #[test]
    fn nibble_encode_word() {
        assert_eq!(nibble_encode_u16(0x03B1), [0x30, 0x33, 0x3B, 0x31]);
        assert_eq!(nibble_decode(&[0x30, 0x33, 0x3B, 0x31]).unwrap(), 0x03B1);
    }

    #[test]
    fn nibble_decode_rejects_foreign_bytes() {
        assert!(nibble_decode(b"0A").is_err());
        assert!(nibble_decode(&[]).is_err());
        assert!(nibble_decode(b"00000").is_err());
    }

    #[test]
    fn nibble_round_trip_every_byte() {
        for b in 0..=u8::MAX {
            assert_eq!(nibble_decode(&nibble_encode(b)).unwrap(), u16::from(b));
        }
    }

    #[test]
    fn sums() {
        assert_eq!(additive_sum(&[0xFF, 0xFF, 0x02]), 0x0200);
        assert_eq!(additive_sum_u8(&[0xFF, 0x02]), 0x01);
        assert_eq!(xor_sum(&[0x25, 0x25, 0x0F]), 0x0F);
        assert_eq!(additive_sum(&[]), 0);
    }

    #[test]
    fn slice_between_bounds() {
        let buf = [1u8, 2, 3, 4, 5];
        assert_eq!(slice_between(&buf, 1, 3).unwrap(), &[2, 3]);
        assert_eq!(slice_between(&buf, 2, 2).unwrap(), &[] as &[u8]);
        assert_eq!(slice_between(&buf, 0, 5).unwrap(), &buf);
        match slice_between(&buf, 3, 1).unwrap_err() {
            FiscalError::Range { from, to, len } => assert_eq!((from, to, len), (3, 1, 5)),
            other => panic!("expected Range, got {:?}", other),
        }
        assert!(slice_between(&buf, 0, 6).is_err());
    }

    #[test]
    fn hex_pairs() {
        assert_eq!(
            hex_pairs_decode(b"80a0FF000102").unwrap(),
            vec![0x80, 0xA0, 0xFF, 0x00, 0x01, 0x02]
        );
        assert_eq!(hex_pairs_decode(b"8:?0").unwrap(), vec![0x8A, 0xF0]);
        assert!(hex_pairs_decode(b"8").is_err());
        assert!(hex_pairs_decode(b"8@").is_err());
        assert!(hex_pairs_decode(b"8G").is_err());
    }

    #[test]
    fn hex_dump_format() {
        assert_eq!(hex_dump(&[0x01, 0x33, 0xAB]), "01 33 AB");
        assert_eq!(hex_dump(&[]), "");
    }
}
