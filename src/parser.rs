//! Document parsing entry points
//!
//! Parsing runs as a forward pipeline:
//!
//! 1. The input is tokenized once into a `Vec` of events
//! 2. The encoding is resolved from the hint or a pre-scan of those events
//! 3. The extractor consumes the events and builds the [`ParsedDocument`]
//!
//! Parsing never fails. Malformed markup is recovered from, and encoding
//! trouble is reported through [`ParsedDocument::badly_encoded`].
//!
//! # Examples
//!
//! ```rust
//! use htmltext::parser::{parse, parse_str};
//!
//! // Bytes in an unknown encoding fall back to windows-1252
//! let doc = parse(b"<title>foo\xA3</title>", None);
//! assert_eq!(doc.title, "foo£");
//! assert!(!doc.badly_encoded);
//!
//! // A caller hint wins over the document's own declaration
//! let doc = parse(b"<meta charset=\"latin1\"><p>\xC2\xA3</p>", Some("utf-8"));
//! assert_eq!(doc.content, "£");
//!
//! // Already-decoded text skips encoding resolution entirely
//! let doc = parse_str("<p>Hello  World</p>");
//! assert_eq!(doc.content, "Hello World");
//! ```

use crate::charset::{self, Charset, EncodingSource, ResolvedEncoding};
use crate::document::ParsedDocument;
use crate::error::ExtractError;
use crate::extractor::Extractor;
use crate::tokenizer::{LexEvent, tokenize};
use tracing::debug;

/// Parse settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Encoding label (`"utf-8"`) or Content-Type value
    /// (`"text/html; charset=utf-8"`) that overrides in-document declarations
    pub encoding_hint: Option<String>,
}

impl ParseOptions {
    /// Create options with an encoding hint
    pub fn with_encoding_hint(hint: impl Into<String>) -> Self {
        Self {
            encoding_hint: Some(hint.into()),
        }
    }

    /// Check the options ahead of parsing
    ///
    /// Parsing accepts any options and reports an unusable hint through
    /// `badly_encoded`; this lets a caller reject one up front instead.
    ///
    /// # Errors
    ///
    /// - `ExtractError::UnsupportedEncoding`: the hint names no known encoding
    /// - `ExtractError::NonAsciiCompatibleEncoding`: the hint names UTF-16 or
    ///   another encoding that cannot be scanned as ASCII
    pub fn validate(&self) -> Result<(), ExtractError> {
        if let Some(hint) = &self.encoding_hint {
            charset::charset_for_hint(hint)?;
        }
        Ok(())
    }
}

/// Parse an HTML document from bytes
///
/// # Arguments
///
/// * `html` - Raw document bytes
/// * `encoding_hint` - Optional encoding label or Content-Type value
pub fn parse(html: &[u8], encoding_hint: Option<&str>) -> ParsedDocument {
    let events: Vec<LexEvent<'_>> = tokenize(html).collect();
    let resolved = charset::resolve(&events, encoding_hint);
    extract(&events, resolved)
}

/// Parse an HTML document from bytes using [`ParseOptions`]
pub fn parse_with_options(html: &[u8], options: &ParseOptions) -> ParsedDocument {
    parse(html, options.encoding_hint.as_deref())
}

/// Parse an already-decoded HTML document
///
/// The text is read as UTF-8 and any in-document charset declaration is
/// ignored, so the result is never badly encoded.
pub fn parse_str(html: &str) -> ParsedDocument {
    let events: Vec<LexEvent<'_>> = tokenize(html.as_bytes()).collect();
    let resolved = ResolvedEncoding {
        charset: Charset::utf8(),
        source: EncodingSource::ExplicitHint,
        rejected: false,
    };
    extract(&events, resolved)
}

fn extract(events: &[LexEvent<'_>], resolved: ResolvedEncoding) -> ParsedDocument {
    let mut extractor = Extractor::new(resolved);
    for event in events {
        extractor.feed(event);
    }
    let doc = extractor.finish();

    debug!(
        encoding = doc.encoding.name(),
        source = ?doc.encoding_source,
        badly_encoded = doc.badly_encoded,
        content_len = doc.content.len(),
        paragraphs = doc.parastarts.len(),
        links = doc.links.len(),
        "parsed document"
    );

    doc
}
