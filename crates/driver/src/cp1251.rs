//! Windows-1251 (Cyrillic) code page.
//!
//! Fiscal printers render receipt text in this single-byte code page.
//! ASCII passes through unchanged, `0xC0..=0xFF` is the contiguous
//! `А..я` block, and `0x80..=0xBF` is looked up in [`HIGH`].

use tracing::warn;

/// Code points for bytes `0x80..=0xBF`. `0x98` is unassigned.
const HIGH: [char; 64] = [
    // 0x80–0x8F
    'Ђ', 'Ѓ', '‚', 'ѓ', '„', '…', '†', '‡', '€', '‰', 'Љ', '‹', 'Њ', 'Ќ', 'Ћ', 'Џ',
    // 0x90–0x9F
    'ђ', '‘', '’', '“', '”', '•', '–', '—', '\u{FFFD}', '™', 'љ', '›', 'њ', 'ќ', 'ћ', 'џ',
    // 0xA0–0xAF
    '\u{A0}', 'Ў', 'ў', 'Ј', '¤', 'Ґ', '¦', '§', 'Ё', '©', 'Є', '«', '¬', '\u{AD}', '®', 'Ї',
    // 0xB0–0xBF
    '°', '±', 'І', 'і', 'ґ', 'µ', '¶', '·', 'ё', '№', 'є', '»', 'ј', 'Ѕ', 'ѕ', 'ї',
];

/// Encode a Unicode string as Windows-1251 bytes.
///
/// Characters outside the code page are replaced with `?`.
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        match encode_char(ch) {
            Some(byte) => out.push(byte),
            None => {
                warn!(
                    "cp1251: unmapped character '{}' (U+{:04X}), replacing with '?'",
                    ch, ch as u32
                );
                out.push(b'?');
            }
        }
    }
    out
}

/// Decode Windows-1251 bytes into a Unicode string.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| decode_byte(b)).collect()
}

/// Map one byte to its code point.
pub fn decode_byte(byte: u8) -> char {
    match byte {
        0x00..=0x7F => char::from(byte),
        0x80..=0xBF => HIGH[usize::from(byte - 0x80)],
        // 0xC0..=0xFF → U+0410..=U+044F
        _ => char::from_u32(0x0410 + u32::from(byte - 0xC0)).unwrap_or('\u{FFFD}'),
    }
}

/// Map one code point to its byte, if the code page has it.
pub fn encode_char(ch: char) -> Option<u8> {
    let cp = ch as u32;
    match cp {
        0x00..=0x7F => Some(cp as u8),
        0x0410..=0x044F => Some((cp - 0x0410) as u8 + 0xC0),
        0xFFFD => None,
        _ => HIGH
            .iter()
            .position(|&c| c == ch)
            .map(|i| 0x80 + i as u8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passthrough() {
        assert_eq!(encode("Hello, 123"), b"Hello, 123");
        assert_eq!(decode(b"Hello, 123"), "Hello, 123");
    }

    #[test]
    fn empty_string() {
        assert!(encode("").is_empty());
    }

    #[test]
    fn bulgarian_text() {
        assert_eq!(encode("Хляб"), vec![0xD5, 0xEB, 0xFF, 0xE1]);
        assert_eq!(decode(&[0xD5, 0xEB, 0xFF, 0xE1]), "Хляб");
    }

    #[test]
    fn tax_group_letters() {
        assert_eq!(encode("АБВГДЕЖЗ"), vec![0xC0, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7]);
    }

    #[test]
    fn high_half_symbols() {
        assert_eq!(encode("№"), vec![0xB9]);
        assert_eq!(encode("€"), vec![0x88]);
        assert_eq!(encode("Ё ё"), vec![0xA8, 0x20, 0xB8]);
        assert_eq!(decode(&[0xB9, 0x88]), "№€");
    }

    #[test]
    fn unmapped_char_becomes_question_mark() {
        assert_eq!(encode("日"), b"?");
        assert_eq!(encode("\u{FFFD}"), b"?");
    }

    #[test]
    fn every_assigned_byte_round_trips() {
        for b in 0..=u8::MAX {
            if b == 0x98 {
                continue;
            }
            let ch = decode_byte(b);
            assert_eq!(encode_char(ch), Some(b), "byte {b:#04X}");
        }
    }
}
