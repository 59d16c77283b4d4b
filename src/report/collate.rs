//! Locale-aware string ordering for report tables.
//!
//! Approximates the root collation order used by browsers and ICU for the
//! characters that show up in header names:
//!
//! - primary: case is ignored; whitespace < punctuation < symbols < digits < letters
//! - tertiary: on an otherwise equal pair, lowercase sorts before uppercase
//! - last resort: code point order, so the ordering is total

use std::cmp::Ordering;

/// ASCII punctuation and symbols in root collation order.
const PUNCTUATION_ORDER: &str = "_-,;:!?.'\"()[]{}@*/\\&#%`^+<=>|~$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum CharClass {
    Whitespace,
    Punctuation,
    Digit,
    Letter,
    Other,
}

fn primary_key(c: char) -> (CharClass, u32) {
    if c.is_whitespace() {
        (CharClass::Whitespace, c as u32)
    } else if let Some(pos) = PUNCTUATION_ORDER.find(c) {
        (CharClass::Punctuation, pos as u32)
    } else if c.is_ascii_punctuation() {
        (CharClass::Punctuation, 0x100 + c as u32)
    } else if c.is_numeric() {
        (CharClass::Digit, c.to_digit(10).unwrap_or(c as u32))
    } else if c.is_alphabetic() {
        let folded = c.to_lowercase().next().unwrap_or(c);
        (CharClass::Letter, folded as u32)
    } else {
        (CharClass::Other, c as u32)
    }
}

fn tertiary_key(c: char) -> u8 {
    u8::from(c.is_uppercase())
}

/// Compares two strings the way a locale-aware, case-sensitive sort would.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(primary_key)
        .cmp(b.chars().map(primary_key))
        .then_with(|| a.chars().map(tertiary_key).cmp(b.chars().map(tertiary_key)))
        .then_with(|| a.cmp(b))
}
