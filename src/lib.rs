//! Tolerant HTML text extraction for search indexing
//!
//! This library turns arbitrary, possibly malformed HTML into the plain text,
//! paragraph structure, links and metadata a search indexer needs. It never
//! fails on bad markup or bad bytes: it recovers, and reports encoding trouble
//! as a flag on the result.
//!
//! # Architecture
//!
//! The library is structured into several modules:
//! - `tokenizer`: Byte-level tokenizer producing borrowed lexical events
//! - `charset`: Encoding resolution (hint, `<meta>` declaration, default) and conversion
//! - `entities`: HTML character reference decoding
//! - `tag_stack`: Open-element tracking with implicit-close recovery
//! - `metadata`: Description, keywords and robots directives
//! - `extractor`: Content, paragraph, title and link extraction
//! - `document`: The [`ParsedDocument`] result
//! - `parser`: Entry points tying the pipeline together
//!
//! # Examples
//!
//! ```rust
//! let html = b"<html><head><title>Example</title>\
//!     <meta name=\"description\" content=\"A page\"></head>\
//!     <body><p>Hello <a href=\"/world\">world</a></p></body></html>";
//!
//! let doc = htmltext::parse(html, None);
//!
//! assert_eq!(doc.title, "Example");
//! assert_eq!(doc.description, "A page");
//! assert_eq!(doc.content, "Hello world");
//! assert_eq!(doc.links[0].target, "/world");
//! assert_eq!(doc.links[0].para, "Hello world");
//! ```

// Module declarations
pub mod charset;
pub mod document;
pub mod entities;
pub mod error;
pub mod extractor;
pub mod metadata;
pub mod parser;
pub mod tag_stack;
pub mod tokenizer;

// Re-export main types for convenience
pub use charset::{Charset, EncodingSource};
pub use document::{LinkRecord, ParsedDocument};
pub use error::ExtractError;
pub use parser::{ParseOptions, parse, parse_str, parse_with_options};
pub use tag_stack::TagFrame;
