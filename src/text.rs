//! Code page conversion for device text.
//!
//! Registers of this family print and report text in Windows-1251. Fiscal
//! document TLV values are transmitted in CP866. Only the upper half of each
//! table differs from ASCII, so both are kept as 128-entry lookup tables.

/// Windows-1251, bytes 0x80..=0xFF. `'\u{FFFD}'` marks the unassigned 0x98.
const CP1251_HIGH: [char; 128] = [
    'Ђ', 'Ѓ', '‚', 'ѓ', '„', '…', '†', '‡', '€', '‰', 'Љ', '‹', 'Њ', 'Ќ', 'Ћ', 'Џ',
    'ђ', '‘', '’', '“', '”', '•', '–', '—', '\u{FFFD}', '™', 'љ', '›', 'њ', 'ќ', 'ћ', 'џ',
    '\u{A0}', 'Ў', 'ў', 'Ј', '¤', 'Ґ', '¦', '§', 'Ё', '©', 'Є', '«', '¬', '\u{AD}', '®', 'Ї',
    '°', '±', 'І', 'і', 'ґ', 'µ', '¶', '·', 'ё', '№', 'є', '»', 'ј', 'Ѕ', 'ѕ', 'ї',
    'А', 'Б', 'В', 'Г', 'Д', 'Е', 'Ж', 'З', 'И', 'Й', 'К', 'Л', 'М', 'Н', 'О', 'П',
    'Р', 'С', 'Т', 'У', 'Ф', 'Х', 'Ц', 'Ч', 'Ш', 'Щ', 'Ъ', 'Ы', 'Ь', 'Э', 'Ю', 'Я',
    'а', 'б', 'в', 'г', 'д', 'е', 'ж', 'з', 'и', 'й', 'к', 'л', 'м', 'н', 'о', 'п',
    'р', 'с', 'т', 'у', 'ф', 'х', 'ц', 'ч', 'ш', 'щ', 'ъ', 'ы', 'ь', 'э', 'ю', 'я',
];

const UNMAPPABLE: u8 = b'?';

/// Encode text for the register. Characters outside the code page become `?`.
pub fn encode_cp1251(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            if c.is_ascii() {
                return c as u8;
            }
            CP1251_HIGH
                .iter()
                .position(|&h| h == c && h != '\u{FFFD}')
                .map(|i| 0x80 + i as u8)
                .unwrap_or(UNMAPPABLE)
        })
        .collect()
}

/// Decode text received from the register.
pub fn decode_cp1251(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b < 0x80 {
                b as char
            } else {
                CP1251_HIGH[(b - 0x80) as usize]
            }
        })
        .collect()
}

/// Encode text as CP866 (DOS Cyrillic). Only letters, `Ё`/`ё` and `№` are
/// mapped in the upper half; anything else non-ASCII becomes `?`.
pub fn encode_cp866(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            _ if c.is_ascii() => c as u8,
            'А'..='П' => 0x80 + (c as u32 - 'А' as u32) as u8,
            'Р'..='Я' => 0x90 + (c as u32 - 'Р' as u32) as u8,
            'а'..='п' => 0xA0 + (c as u32 - 'а' as u32) as u8,
            'р'..='я' => 0xE0 + (c as u32 - 'р' as u32) as u8,
            'Ё' => 0xF0,
            'ё' => 0xF1,
            '№' => 0xFC,
            _ => UNMAPPABLE,
        })
        .collect()
}

/// Trim NUL padding from both ends of a fixed-width text field.
pub fn strip_nul(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| b != 0).map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Encode, truncate to `width` bytes and NUL-pad a fixed-width text parameter.
pub fn pad_text(text: &str, width: usize) -> Vec<u8> {
    let mut out = encode_cp1251(text);
    out.truncate(width);
    out.resize(width, 0);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
