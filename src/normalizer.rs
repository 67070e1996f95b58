//! Deterministic text canonicalization (spec §4.1).
//!
//! Three stages, always run in order: strip invisible/combining Unicode and
//! fold homoglyphs, decode obfuscated payloads (base64/hex/URL/HTML-entity)
//! by appending their plaintext rather than replacing it, then lower-case
//! and collapse whitespace. `normalize` is total and idempotent.

use base64::{engine::general_purpose, Engine as _};
use regex::Regex;
use std::sync::OnceLock;

/// Zero-width / format characters stripped in stage 1.
const INVISIBLE_CHARS: [char; 6] = [
    '\u{200B}', // zero-width space
    '\u{200D}', // zero-width joiner
    '\u{FEFF}', // BOM
    '\u{00AD}', // soft hyphen
    '\u{2060}', // word joiner
    '\u{200C}', // zero-width non-joiner
];

/// Static Cyrillic-lookalike → Latin homoglyph map.
const HOMOGLYPHS: &[(char, char)] = &[
    ('а', 'a'),
    ('е', 'e'),
    ('о', 'o'),
    ('р', 'p'),
    ('с', 'c'),
    ('у', 'y'),
    ('х', 'x'),
    ('А', 'A'),
    ('В', 'B'),
    ('Е', 'E'),
    ('К', 'K'),
    ('М', 'M'),
    ('Н', 'H'),
    ('О', 'O'),
    ('Р', 'P'),
    ('С', 'C'),
    ('Т', 'T'),
    ('Х', 'X'),
];

fn base64_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9+/]{20,}={0,2}").unwrap())
}

fn hex_escape_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\x([0-9A-Fa-f]{2})").unwrap())
}

fn percent_escape_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%([0-9A-Fa-f]{2})").unwrap())
}

fn html_entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&#(\d{1,3});").unwrap())
}

/// Runs the full three-stage canonicalization pipeline.
pub fn normalize(text: &str) -> String {
    let stage1 = fold_unicode(text);
    let stage2 = decode_obfuscation(&stage1);
    fold_whitespace(&stage2)
}

fn fold_unicode(text: &str) -> String {
    let without_invisible: String = text.chars().filter(|c| !INVISIBLE_CHARS.contains(c)).collect();

    // NFD then strip combining marks U+0300-U+036F, then NFKC.
    use unicode_normalization::UnicodeNormalization;
    let nfd_stripped: String = without_invisible
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036F}').contains(c))
        .collect();
    let nfkc: String = nfd_stripped.nfc().collect::<String>().nfkc().collect();

    nfkc.chars()
        .map(|c| HOMOGLYPHS.iter().find(|(from, _)| *from == c).map(|(_, to)| *to).unwrap_or(c))
        .collect()
}

fn decode_obfuscation(text: &str) -> String {
    let mut appended = String::new();

    for m in base64_run_re().find_iter(text) {
        if let Ok(bytes) = general_purpose::STANDARD.decode(m.as_str()) {
            push_if_printable(&mut appended, &bytes);
        } else if let Ok(bytes) = general_purpose::URL_SAFE_NO_PAD.decode(m.as_str()) {
            push_if_printable(&mut appended, &bytes);
        }
    }

    let mut out = String::from(text);
    decode_escapes(&mut out, hex_escape_re(), 16);
    decode_escapes(&mut out, percent_escape_re(), 16);
    decode_escapes(&mut out, html_entity_re(), 10);

    if !appended.is_empty() {
        out.push(' ');
        out.push_str(appended.trim());
    }
    out
}

fn push_if_printable(appended: &mut String, bytes: &[u8]) {
    let printable_count = bytes.iter().filter(|b| b.is_ascii_graphic() || **b == b' ').count();
    if printable_count >= 4 && printable_count == bytes.len() {
        if let Ok(s) = std::str::from_utf8(bytes) {
            appended.push(' ');
            appended.push_str(s);
        }
    }
}

fn decode_escapes(text: &mut String, re: &Regex, radix: u32) {
    // Escapes are decoded in place preserving surrounding text. Unlike the
    // base64 path, a `\xHH`/`%HH`/`&#DD;` byte is unambiguous once matched,
    // so substitution rather than appending is correct here.
    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let m = caps.get(0).unwrap();
        result.push_str(&text[last..m.start()]);
        if let Ok(value) = u32::from_str_radix(&caps[1], radix) {
            if let Some(ch) = char::from_u32(value) {
                result.push(ch);
            } else {
                result.push_str(m.as_str());
            }
        } else {
            result.push_str(m.as_str());
        }
        last = m.end();
    }
    result.push_str(&text[last..]);
    *text = result;
}

fn fold_whitespace(text: &str) -> String {
    let lowered = text.to_lowercase();
    let collapsed: String = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim().to_string()
}
