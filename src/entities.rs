//! HTML character reference decoding
//!
//! Text runs and surfaced attribute values (href, class, id, meta content) are
//! entity-decoded after charset conversion. Named references use html5ever's
//! HTML5 entity table; numeric references follow the HTML5 rules, including
//! the C1 replacement table for `&#128;`..`&#159;`.
//!
//! Attribute values get the HTML5 attribute rule: a legacy reference without a
//! trailing `;` is left alone when it is followed by an alphanumeric or `=`, so
//! query strings such as `?a=1&copy=2` survive intact.

use html5ever::data::{C1_REPLACEMENTS, NAMED_ENTITIES};
use std::borrow::Cow;

/// Longest entity name in the HTML5 table (`&CounterClockwiseContourIntegral;`)
const MAX_ENTITY_NAME_LEN: usize = 32;

/// Decode character references in text content
///
/// # Examples
///
/// ```rust
/// use htmltext::entities::decode_text;
///
/// assert_eq!(decode_text("Fish &amp; Chips"), "Fish & Chips");
/// assert_eq!(decode_text("&#163;5 &#x20AC;6"), "£5 €6");
/// assert_eq!(decode_text("no references"), "no references");
/// ```
pub fn decode_text(input: &str) -> Cow<'_, str> {
    decode(input, false)
}

/// Decode character references in an attribute value
///
/// # Examples
///
/// ```rust
/// use htmltext::entities::decode_attribute;
///
/// assert_eq!(decode_attribute("?a=1&amp;b=2"), "?a=1&b=2");
/// assert_eq!(decode_attribute("?a=1&copy=2"), "?a=1&copy=2");
/// ```
pub fn decode_attribute(input: &str) -> Cow<'_, str> {
    decode(input, true)
}

fn decode(input: &str, in_attribute: bool) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut output = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        output.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match reference(after, in_attribute) {
            Some((decoded, consumed)) => {
                output.push_str(&decoded);
                rest = &after[consumed..];
            }
            None => {
                output.push('&');
                rest = after;
            }
        }
    }
    output.push_str(rest);
    Cow::Owned(output)
}

/// Decode the reference that starts right after a `&`
///
/// Returns the replacement text and the number of bytes consumed.
fn reference(after: &str, in_attribute: bool) -> Option<(String, usize)> {
    match after.strip_prefix('#') {
        Some(numeric) => numeric_reference(numeric).map(|(ch, len)| (ch.to_string(), len + 1)),
        None => named_reference(after, in_attribute),
    }
}

fn numeric_reference(input: &str) -> Option<(char, usize)> {
    let (digits_start, radix) = match input.as_bytes().first() {
        Some(b'x') | Some(b'X') => (1, 16),
        _ => (0, 10),
    };

    let digits: &str = &input[digits_start..];
    let digit_len = digits
        .bytes()
        .take_while(|b| (*b as char).is_digit(radix))
        .count();
    if digit_len == 0 {
        return None;
    }

    let mut consumed = digits_start + digit_len;
    if input[consumed..].starts_with(';') {
        consumed += 1;
    }

    // Overlong numbers are out of range whatever their value.
    let code = digits[..digit_len]
        .bytes()
        .try_fold(0u32, |acc, b| {
            let digit = (b as char).to_digit(radix)?;
            acc.checked_mul(radix)?.checked_add(digit)
        })
        .unwrap_or(u32::MAX);

    Some((numeric_char(code), consumed))
}

fn numeric_char(code: u32) -> char {
    match code {
        0 => char::REPLACEMENT_CHARACTER,
        0x80..=0x9F => C1_REPLACEMENTS[(code - 0x80) as usize]
            .unwrap_or_else(|| char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)),
        _ => char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER),
    }
}

fn named_reference(input: &str, in_attribute: bool) -> Option<(String, usize)> {
    let name_len = input
        .bytes()
        .take(MAX_ENTITY_NAME_LEN)
        .take_while(u8::is_ascii_alphanumeric)
        .count();
    if name_len == 0 {
        return None;
    }

    if input[name_len..].starts_with(';')
        && let Some(decoded) = lookup(&input[..=name_len])
    {
        return Some((decoded, name_len + 1));
    }

    // Legacy references without a semicolon, longest match first.
    for len in (1..=name_len).rev() {
        let Some(decoded) = lookup(&input[..len]) else {
            continue;
        };
        let next = input.as_bytes().get(len);
        if in_attribute && next.is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'=') {
            return None;
        }
        return Some((decoded, len));
    }

    None
}

fn lookup(name: &str) -> Option<String> {
    // Prefixes of real names are stored with a (0, 0) placeholder.
    let &(first, second) = NAMED_ENTITIES.get(name)?;
    if first == 0 {
        return None;
    }
    let mut decoded = String::with_capacity(4);
    decoded.push(char::from_u32(first)?);
    if second != 0 {
        decoded.push(char::from_u32(second)?);
    }
    Some(decoded)
}
