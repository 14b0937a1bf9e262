//! Page metadata extraction
//!
//! Collects the document-level fields a search indexer needs from `<meta>`
//! tags:
//!
//! - `description`: the first non-empty `<meta name="description">`
//! - `keywords`: every `<meta name="keywords">`, joined with a space
//! - `robots`: `noindex`, `nofollow` and `none` directives
//!
//! The title is captured by the extractor, which owns the `<title>` state
//! machine, and stored here alongside the meta fields.
//!
//! # Examples
//!
//! ```rust
//! use htmltext::charset::{Charset, TextConverter};
//! use htmltext::metadata::PageMetadata;
//! use htmltext::tokenizer::{tokenize, LexEvent};
//!
//! let html = b"<meta name=\"robots\" content=\"noindex, follow\">";
//! let mut converter = TextConverter::new(Charset::utf8());
//! let mut metadata = PageMetadata::new();
//!
//! for event in tokenize(html) {
//!     if let LexEvent::StartTag(tag) = event {
//!         metadata.process_meta_tag(&tag, &mut converter);
//!     }
//! }
//!
//! assert!(!metadata.indexing_allowed);
//! assert!(metadata.following_allowed);
//! ```

use crate::charset::TextConverter;
use crate::tokenizer::StartTag;

/// Page metadata extracted from HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    /// Text of the first `<title>` element
    pub title: String,
    /// First non-empty meta description
    pub description: String,
    /// All meta keywords, space separated
    pub keywords: String,
    /// Cleared by a robots `noindex` or `none` directive
    pub indexing_allowed: bool,
    /// Cleared by a robots `nofollow` or `none` directive
    pub following_allowed: bool,
}

impl Default for PageMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            keywords: String::new(),
            indexing_allowed: true,
            following_allowed: true,
        }
    }
}

impl PageMetadata {
    /// Create empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a start tag, updating fields if it is a named `<meta>`
    ///
    /// Tags other than `<meta>`, and meta tags without both `name` and
    /// `content`, are ignored.
    pub fn process_meta_tag(&mut self, tag: &StartTag<'_>, converter: &mut TextConverter) {
        if tag.name != "meta" {
            return;
        }
        let (Some(name), Some(content)) = (tag.attribute("name"), tag.attribute("content")) else {
            return;
        };

        let name = converter.decode_attribute(name);
        match name.trim().to_ascii_lowercase().as_str() {
            "description" => {
                if self.description.is_empty() {
                    self.description = converter.decode_attribute(content);
                }
            }
            "keywords" => {
                if !self.keywords.is_empty() {
                    self.keywords.push(' ');
                }
                self.keywords.push_str(&converter.decode_attribute(content));
            }
            "robots" => {
                let directives = converter.decode_attribute(content);
                self.apply_robots(&directives);
            }
            _ => {}
        }
    }

    fn apply_robots(&mut self, directives: &str) {
        let tokens = directives
            .split(|ch: char| ch == ',' || ch.is_ascii_whitespace())
            .filter(|token| !token.is_empty());

        for token in tokens {
            if token.eq_ignore_ascii_case("none") {
                self.indexing_allowed = false;
                self.following_allowed = false;
            } else if token.eq_ignore_ascii_case("noindex") {
                self.indexing_allowed = false;
            } else if token.eq_ignore_ascii_case("nofollow") {
                self.following_allowed = false;
            }
        }
    }
}
