//! Character encoding resolution and conversion
//!
//! Text runs come out of the tokenizer as raw bytes. This module decides which
//! encoding to read them with and performs the conversion, remembering whether
//! any bytes could not be decoded.
//!
//! # Resolution Cascade
//!
//! 1. **Caller hint**: an encoding label (`"latin1"`) or a Content-Type value
//!    (`"text/html; charset=utf-8"`). When recognized, it is authoritative.
//! 2. **In-document declaration**: the first `<meta charset>` or
//!    `<meta http-equiv="Content-Type">` in the token stream.
//! 3. **Default**: windows-1252, which maps every byte to a character.
//!
//! A label that is unknown, or names an encoding that cannot be scanned as
//! ASCII (UTF-16, `replacement`), is rejected. Resolution then continues with
//! the next level and the document is flagged as badly encoded.
//!
//! # Examples
//!
//! ```rust
//! use htmltext::charset::{resolve, EncodingSource};
//! use htmltext::tokenizer::tokenize;
//!
//! let html = b"<meta charset=\"utf-8\"><title>Caf\xC3\xA9</title>";
//! let events: Vec<_> = tokenize(html).collect();
//!
//! let resolved = resolve(&events, None);
//! assert_eq!(resolved.charset.name(), "UTF-8");
//! assert_eq!(resolved.source, EncodingSource::DeclaredInDocument);
//!
//! let resolved = resolve(&events, Some("text/html; charset=ISO-8859-1"));
//! assert_eq!(resolved.charset.name(), "windows-1252");
//! assert_eq!(resolved.source, EncodingSource::ExplicitHint);
//! ```

use crate::entities;
use crate::error::ExtractError;
use crate::tokenizer::LexEvent;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

/// Encoding used when neither a hint nor a declaration is usable
const DEFAULT_CHARSET: &Encoding = WINDOWS_1252;

/// An ASCII-compatible character encoding
///
/// Markup is located by scanning for ASCII bytes before the encoding is known,
/// so only encodings that keep ASCII bytes meaning ASCII can be used.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

impl Charset {
    /// Wrap an encoding, rejecting encodings that are not ASCII-compatible
    pub fn new(encoding: &'static Encoding) -> Result<Self, ExtractError> {
        if encoding.is_ascii_compatible() {
            Ok(Self(encoding))
        } else {
            Err(ExtractError::NonAsciiCompatibleEncoding(encoding.name()))
        }
    }

    /// Look up an encoding by its WHATWG label
    ///
    /// # Examples
    ///
    /// ```rust
    /// use htmltext::charset::Charset;
    ///
    /// assert_eq!(Charset::for_label("utf8").unwrap().name(), "UTF-8");
    /// assert_eq!(Charset::for_label(" Latin1 ").unwrap().name(), "windows-1252");
    /// assert!(Charset::for_label("utf-16").is_err());
    /// assert!(Charset::for_label("x-klingon").is_err());
    /// ```
    pub fn for_label(label: &str) -> Result<Self, ExtractError> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| ExtractError::UnsupportedEncoding(label.to_string()))?;
        Self::new(encoding)
    }

    /// UTF-8
    pub fn utf8() -> Self {
        Self(UTF_8)
    }

    /// Canonical encoding name
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Underlying `encoding_rs` encoding
    pub fn encoding(&self) -> &'static Encoding {
        self.0
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self(DEFAULT_CHARSET)
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.name()).finish()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the resolved encoding came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingSource {
    /// Supplied by the caller
    ExplicitHint,
    /// Declared by a `<meta>` tag in the document
    DeclaredInDocument,
    /// Nothing usable was found
    DefaultFallback,
}

/// Result of the resolution cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEncoding {
    /// Encoding to decode text with
    pub charset: Charset,
    /// Cascade level that produced `charset`
    pub source: EncodingSource,
    /// Whether a hint or declaration was rejected along the way
    pub rejected: bool,
}

/// Resolve the encoding for a tokenized document
///
/// # Arguments
///
/// * `events` - Token stream of the whole document, scanned for a declaration
/// * `hint` - Optional encoding label or Content-Type value from the caller
///
/// # Returns
///
/// Always returns a usable encoding. `rejected` is set when an unusable hint
/// or declaration was skipped.
pub fn resolve(events: &[LexEvent<'_>], hint: Option<&str>) -> ResolvedEncoding {
    let mut rejected = false;

    if let Some(hint) = hint {
        match charset_for_hint(hint) {
            Ok(Some(charset)) => {
                debug!(charset = charset.name(), "using caller encoding hint");
                return ResolvedEncoding {
                    charset,
                    source: EncodingSource::ExplicitHint,
                    rejected,
                };
            }
            Ok(None) => {}
            Err(err) => {
                debug!(error = %err, "rejected caller encoding hint");
                rejected = true;
            }
        }
    }

    if let Some(label) = declared_charset(events) {
        match Charset::for_label(&label) {
            Ok(charset) => {
                debug!(charset = charset.name(), "using in-document declaration");
                return ResolvedEncoding {
                    charset,
                    source: EncodingSource::DeclaredInDocument,
                    rejected,
                };
            }
            Err(err) => {
                debug!(error = %err, "rejected in-document declaration");
                rejected = true;
            }
        }
    }

    ResolvedEncoding {
        charset: Charset::default(),
        source: EncodingSource::DefaultFallback,
        rejected,
    }
}

/// Interpret a caller-supplied encoding hint
///
/// Returns `Ok(None)` when the hint carries no encoding information, such as
/// an empty string or a media type without a `charset` parameter.
///
/// # Examples
///
/// ```rust
/// use htmltext::charset::{charset_for_hint, Charset};
///
/// assert_eq!(charset_for_hint("latin1"), Ok(Some(Charset::default())));
/// assert_eq!(charset_for_hint("text/html; charset=utf-8"), Ok(Some(Charset::utf8())));
/// assert_eq!(charset_for_hint("text/html"), Ok(None));
/// assert!(charset_for_hint("x-klingon").is_err());
/// ```
pub fn charset_for_hint(hint: &str) -> Result<Option<Charset>, ExtractError> {
    hint_label(hint)
        .map(|label| Charset::for_label(&label))
        .transpose()
}

/// Turn a caller hint into an encoding label
///
/// A Content-Type value contributes its `charset` parameter. A media type
/// without one carries no encoding information and counts as no hint.
fn hint_label(hint: &str) -> Option<String> {
    let hint = hint.trim();
    if hint.is_empty() {
        return None;
    }
    if let Some(charset) = extract_charset_from_content_type(hint) {
        return Some(charset);
    }
    if hint.contains(['/', ';']) {
        return None;
    }
    Some(hint.to_string())
}

/// Extract charset from a Content-Type value
///
/// # Supported Formats
///
/// - `text/html; charset=UTF-8`
/// - `text/html; charset="UTF-8"` and `charset='UTF-8'`
/// - `text/html;charset=UTF-8` (no space)
/// - `text/html; charset=UTF-8; boundary=...` (multiple parameters)
///
/// # Examples
///
/// ```rust
/// use htmltext::charset::extract_charset_from_content_type;
///
/// assert_eq!(
///     extract_charset_from_content_type("text/html; charset=UTF-8"),
///     Some("UTF-8".to_string())
/// );
///
/// assert_eq!(
///     extract_charset_from_content_type("text/html; charset=\"ISO-8859-1\""),
///     Some("ISO-8859-1".to_string())
/// );
///
/// assert_eq!(extract_charset_from_content_type("text/html"), None);
/// ```
pub fn extract_charset_from_content_type(content_type: &str) -> Option<String> {
    static CHARSET_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex =
        CHARSET_REGEX.get_or_init(|| Regex::new(r#"(?i)charset\s*=\s*["']?([^"';,\s]+)"#).ok());
    let regex = regex.as_ref()?;

    regex
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Find the charset declared by the document's markup
///
/// The scan stops at the first `<meta>` that carries a `charset` attribute or
/// whose `http-equiv` is `content-type`, even when that tag yields no label.
///
/// # Examples
///
/// ```rust
/// use htmltext::charset::declared_charset;
/// use htmltext::tokenizer::tokenize;
///
/// let events: Vec<_> = tokenize(b"<meta charset=\"koi8-r\">").collect();
/// assert_eq!(declared_charset(&events), Some("koi8-r".to_string()));
/// ```
pub fn declared_charset(events: &[LexEvent<'_>]) -> Option<String> {
    events.iter().find_map(|event| {
        let LexEvent::StartTag(tag) = event else {
            return None;
        };
        if tag.name != "meta" {
            return None;
        }

        if let Some(charset) = tag.attribute("charset") {
            return Some(Some(String::from_utf8_lossy(charset).trim().to_string()));
        }

        let is_content_type = tag
            .attribute("http-equiv")
            .is_some_and(|value| value.trim_ascii().eq_ignore_ascii_case(b"content-type"));
        if !is_content_type {
            return None;
        }

        let content = tag.attribute("content").unwrap_or_default();
        Some(extract_charset_from_content_type(&String::from_utf8_lossy(
            content,
        )))
    })?
}

/// Decode bytes with the given charset
///
/// Invalid sequences become U+FFFD and the returned flag is set.
///
/// # Examples
///
/// ```rust
/// use htmltext::charset::{convert, Charset};
///
/// let (text, had_errors) = convert(b"foo\xA3", Charset::default());
/// assert_eq!(text, "foo£");
/// assert!(!had_errors);
///
/// let (text, had_errors) = convert(b"foo\xA3", Charset::utf8());
/// assert_eq!(text, "foo\u{FFFD}");
/// assert!(had_errors);
/// ```
pub fn convert(bytes: &[u8], charset: Charset) -> (Cow<'_, str>, bool) {
    charset.encoding().decode_without_bom_handling(bytes)
}

/// Stateful decoder for one document
///
/// Applies the resolved charset and then entity decoding, remembering whether
/// any conversion lost information.
#[derive(Debug)]
pub struct TextConverter {
    charset: Charset,
    had_errors: bool,
}

impl TextConverter {
    pub fn new(charset: Charset) -> Self {
        Self {
            charset,
            had_errors: false,
        }
    }

    /// Decode a text run and its character references
    pub fn decode_text(&mut self, bytes: &[u8]) -> String {
        let text = self.decode(bytes);
        entities::decode_text(&text).into_owned()
    }

    /// Decode an attribute value and its character references
    pub fn decode_attribute(&mut self, bytes: &[u8]) -> String {
        let value = self.decode(bytes);
        entities::decode_attribute(&value).into_owned()
    }

    fn decode<'b>(&mut self, bytes: &'b [u8]) -> Cow<'b, str> {
        let (text, had_errors) = convert(bytes, self.charset);
        self.had_errors |= had_errors;
        text
    }

    /// Whether any decoded bytes were invalid in the charset
    pub fn had_errors(&self) -> bool {
        self.had_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use proptest::prelude::*;

    fn resolve_html(html: &[u8], hint: Option<&str>) -> ResolvedEncoding {
        let events: Vec<_> = tokenize(html).collect();
        resolve(&events, hint)
    }

    // ============================================================================
    // Unit Tests for Charset
    // ============================================================================

    #[test]
    fn test_charset_default_is_windows_1252() {
        assert_eq!(Charset::default().name(), "windows-1252");
    }

    #[test]
    fn test_charset_for_label_aliases() {
        assert_eq!(Charset::for_label("UTF-8").unwrap(), Charset::utf8());
        assert_eq!(Charset::for_label("utf8").unwrap(), Charset::utf8());
        assert_eq!(Charset::for_label("iso-8859-1").unwrap(), Charset::default());
        assert_eq!(Charset::for_label("shift_jis").unwrap().name(), "Shift_JIS");
    }

    #[test]
    fn test_charset_rejects_unknown_label() {
        assert_eq!(
            Charset::for_label("x-klingon"),
            Err(ExtractError::UnsupportedEncoding("x-klingon".to_string()))
        );
    }

    #[test]
    fn test_charset_rejects_non_ascii_compatible() {
        assert_eq!(
            Charset::for_label("utf-16"),
            Err(ExtractError::NonAsciiCompatibleEncoding("UTF-16LE"))
        );
        assert!(Charset::new(encoding_rs::UTF_16BE).is_err());
        assert!(Charset::new(encoding_rs::REPLACEMENT).is_err());
    }

    // ============================================================================
    // Unit Tests for Content-Type Charset Extraction
    // ============================================================================

    #[test]
    fn test_extract_charset_from_content_type_basic() {
        assert_eq!(
            extract_charset_from_content_type("text/html; charset=UTF-8"),
            Some("UTF-8".to_string())
        );
    }

    #[test]
    fn test_extract_charset_from_content_type_quoted() {
        assert_eq!(
            extract_charset_from_content_type("text/html; charset=\"UTF-8\""),
            Some("UTF-8".to_string())
        );
        assert_eq!(
            extract_charset_from_content_type("text/html; charset='UTF-8'"),
            Some("UTF-8".to_string())
        );
    }

    #[test]
    fn test_extract_charset_from_content_type_no_space() {
        assert_eq!(
            extract_charset_from_content_type("text/html;charset=UTF-8"),
            Some("UTF-8".to_string())
        );
    }

    #[test]
    fn test_extract_charset_from_content_type_multiple_params() {
        assert_eq!(
            extract_charset_from_content_type("text/html; charset=UTF-8; boundary=something"),
            Some("UTF-8".to_string())
        );
    }

    #[test]
    fn test_extract_charset_from_content_type_case_insensitive() {
        assert_eq!(
            extract_charset_from_content_type("text/html; CHARSET=UTF-8"),
            Some("UTF-8".to_string())
        );
    }

    #[test]
    fn test_extract_charset_from_content_type_bare_parameter() {
        assert_eq!(
            extract_charset_from_content_type("charset=utf8"),
            Some("utf8".to_string())
        );
    }

    #[test]
    fn test_extract_charset_from_content_type_no_charset() {
        assert_eq!(extract_charset_from_content_type("text/html"), None);
        assert_eq!(extract_charset_from_content_type(""), None);
    }

    // ============================================================================
    // Unit Tests for In-Document Declarations
    // ============================================================================

    #[test]
    fn test_declared_charset_html5_format() {
        let events: Vec<_> = tokenize(b"<head><meta charset=\"UTF-8\"></head>").collect();
        assert_eq!(declared_charset(&events), Some("UTF-8".to_string()));
    }

    #[test]
    fn test_declared_charset_http_equiv_format() {
        let html = b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=ISO-8859-1\">";
        let events: Vec<_> = tokenize(html).collect();
        assert_eq!(declared_charset(&events), Some("ISO-8859-1".to_string()));
    }

    #[test]
    fn test_declared_charset_case_insensitive() {
        let html = b"<META HTTP-EQUIV=CONTENT-TYPE CONTENT=\"text/html; CHARSET=koi8-r\">";
        let events: Vec<_> = tokenize(html).collect();
        assert_eq!(declared_charset(&events), Some("koi8-r".to_string()));
    }

    #[test]
    fn test_declared_charset_stops_at_first_qualifying_meta() {
        let html = b"<meta http-equiv=\"content-type\" content=\"text/html\">\
                     <meta charset=\"utf-8\">";
        let events: Vec<_> = tokenize(html).collect();
        assert_eq!(declared_charset(&events), None);
    }

    #[test]
    fn test_declared_charset_skips_other_meta() {
        let html = b"<meta name=\"description\" content=\"charset=big5\"><meta charset=utf-8>";
        let events: Vec<_> = tokenize(html).collect();
        assert_eq!(declared_charset(&events), Some("utf-8".to_string()));
    }

    #[test]
    fn test_declared_charset_ignores_comments() {
        let events: Vec<_> = tokenize(b"<!-- <meta charset=\"big5\"> --><p>x</p>").collect();
        assert_eq!(declared_charset(&events), None);
    }

    // ============================================================================
    // Unit Tests for Resolution Cascade
    // ============================================================================

    #[test]
    fn test_resolve_hint_has_priority() {
        let resolved = resolve_html(b"<meta charset=\"utf-8\">", Some("latin1"));
        assert_eq!(resolved.charset, Charset::default());
        assert_eq!(resolved.source, EncodingSource::ExplicitHint);
        assert!(!resolved.rejected);
    }

    #[test]
    fn test_resolve_content_type_hint() {
        let resolved = resolve_html(b"", Some("text/html; charset=utf-8"));
        assert_eq!(resolved.charset, Charset::utf8());
        assert_eq!(resolved.source, EncodingSource::ExplicitHint);
    }

    #[test]
    fn test_resolve_media_type_without_charset_is_no_hint() {
        let resolved = resolve_html(b"<meta charset=\"utf-8\">", Some("text/html"));
        assert_eq!(resolved.source, EncodingSource::DeclaredInDocument);
        assert!(!resolved.rejected);
    }

    #[test]
    fn test_resolve_rejected_hint_falls_through() {
        let resolved = resolve_html(b"<meta charset=\"utf-8\">", Some("x-klingon"));
        assert_eq!(resolved.charset, Charset::utf8());
        assert_eq!(resolved.source, EncodingSource::DeclaredInDocument);
        assert!(resolved.rejected);
    }

    #[test]
    fn test_resolve_declaration() {
        let html = b"<meta http-equiv=\"content-type\" content=\"charset=utf8\"/>";
        let resolved = resolve_html(html, None);
        assert_eq!(resolved.charset, Charset::utf8());
        assert_eq!(resolved.source, EncodingSource::DeclaredInDocument);
        assert!(!resolved.rejected);
    }

    #[test]
    fn test_resolve_utf16_declaration_is_rejected() {
        let resolved = resolve_html(b"<meta charset=\"utf-16\">", None);
        assert_eq!(resolved.charset, Charset::default());
        assert_eq!(resolved.source, EncodingSource::DefaultFallback);
        assert!(resolved.rejected);
    }

    #[test]
    fn test_resolve_default() {
        let resolved = resolve_html(b"<title>foo</title>", None);
        assert_eq!(resolved.charset, Charset::default());
        assert_eq!(resolved.source, EncodingSource::DefaultFallback);
        assert!(!resolved.rejected);
    }

    // ============================================================================
    // Unit Tests for Conversion
    // ============================================================================

    #[test]
    fn test_text_converter_tracks_errors() {
        let mut converter = TextConverter::new(Charset::utf8());
        assert_eq!(converter.decode_text(b"caf\xC3\xA9"), "café");
        assert!(!converter.had_errors());

        assert_eq!(converter.decode_text(b"foo\xA3"), "foo\u{FFFD}");
        assert!(converter.had_errors());

        // Errors are sticky for the rest of the document
        assert_eq!(converter.decode_text(b"ok"), "ok");
        assert!(converter.had_errors());
    }

    #[test]
    fn test_text_converter_decodes_entities_after_charset() {
        let mut converter = TextConverter::new(Charset::default());
        assert_eq!(converter.decode_text(b"&pound;5 \xA35"), "£5 £5");
        assert_eq!(converter.decode_attribute(b"/a?x=1&amp;y=2"), "/a?x=1&y=2");
    }

    // ============================================================================
    // Property-Based Tests
    // ============================================================================

    proptest! {
        #[test]
        fn prop_hint_has_priority_over_declaration(
            hint in prop::sample::select(vec!["utf-8", "iso-8859-2", "windows-1251", "shift_jis", "gbk"]),
            declared in prop::sample::select(vec!["UTF-8", "ISO-8859-2", "WINDOWS-1251", "SHIFT_JIS", "GBK"]),
        ) {
            let html = format!(r#"<html><head><meta charset="{declared}"></head><body>x</body></html>"#);
            let resolved = resolve_html(html.as_bytes(), Some(hint));

            prop_assert_eq!(resolved.source, EncodingSource::ExplicitHint);
            prop_assert_eq!(resolved.charset, Charset::for_label(hint).unwrap());
        }

        #[test]
        fn prop_declaration_used_without_hint(
            declared in prop::sample::select(vec!["utf-8", "iso-8859-2", "windows-1251", "shift_jis", "big5"]),
            use_http_equiv in any::<bool>(),
        ) {
            let html = if use_http_equiv {
                format!(r#"<head><meta http-equiv="Content-Type" content="text/html; charset={declared}"></head>"#)
            } else {
                format!(r#"<head><meta charset="{declared}"></head>"#)
            };

            let resolved = resolve_html(html.as_bytes(), Some("text/html"));
            prop_assert_eq!(resolved.source, EncodingSource::DeclaredInDocument);
            prop_assert_eq!(resolved.charset, Charset::for_label(declared).unwrap());
        }

        #[test]
        fn prop_default_charset_decodes_any_bytes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let (text, had_errors) = convert(&bytes, Charset::default());
            prop_assert!(!had_errors);
            prop_assert_eq!(text.chars().count(), bytes.len());
        }
    }
}
