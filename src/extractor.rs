//! Text, link and metadata extraction
//!
//! The extractor consumes the token stream in a single pass, keeping the open
//! element stack current and feeding decoded text into the content buffer.
//!
//! # Content Model
//!
//! Text runs are appended with whitespace collapsed: a run of spaces, tabs,
//! newlines, carriage returns or form feeds becomes one space, and a space is
//! only written between two words. Inline markup does not separate words, so
//! `mo<em>re</em>` yields `more`.
//!
//! Block-level elements start a new paragraph. The boundary is materialized
//! lazily when the next word arrives: the offset of the separating space is
//! recorded in `parastarts` (the first paragraph starts at 0).
//!
//! # Captures
//!
//! Two independent state machines run over the same events:
//!
//! - **Title**: the first `<title>` is captured into its own buffer and never
//!   reaches the content. Later titles are skipped along with their text.
//! - **Link**: an `<a href>` opens a pending link that closes when its element
//!   is popped (explicitly or implicitly), when another `<a>` opens, or at end
//!   of input. Every element opened inside it is recorded as a child frame.
//!
//! # Examples
//!
//! ```rust
//! use htmltext::charset::resolve;
//! use htmltext::extractor::Extractor;
//! use htmltext::tokenizer::tokenize;
//!
//! let html = b"<title>Home</title><p>Read <a href=\"/docs\">the docs</a></p>";
//! let events: Vec<_> = tokenize(html).collect();
//!
//! let mut extractor = Extractor::new(resolve(&events, None));
//! for event in &events {
//!     extractor.feed(event);
//! }
//! let doc = extractor.finish();
//!
//! assert_eq!(doc.title, "Home");
//! assert_eq!(doc.content, "Read the docs");
//! assert_eq!(doc.links[0].text, "the docs");
//! ```

use crate::charset::{ResolvedEncoding, TextConverter};
use crate::document::{LinkRecord, ParsedDocument, paragraph_index, paragraph_text};
use crate::metadata::PageMetadata;
use crate::tag_stack::{TagFrame, TagStack};
use crate::tokenizer::{LexEvent, StartTag, TextRun};
use std::mem;

/// Elements that start a paragraph at both their start and end tags
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "caption", "center", "dd", "details",
    "dir", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "iframe", "legend", "li", "listing", "main",
    "marquee", "menu", "nav", "ol", "option", "p", "pre", "q", "section", "select", "summary",
    "table", "td", "textarea", "th", "tr", "ul", "xmp",
];

/// Elements that start a paragraph at their start tag only
const BLOCK_START_ELEMENTS: &[&str] = &[
    "body",
    "embed",
    "img",
    "input",
    "isindex",
    "keygen",
    "multicol",
    "plaintext",
];

fn breaks_on_start(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name) || BLOCK_START_ELEMENTS.contains(&name)
}

fn breaks_on_end(name: &str) -> bool {
    BLOCK_ELEMENTS.contains(&name)
}

/// Whitespace collapsed by the content buffer
fn is_collapsible(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

/// Whitespace-collapsing text accumulator with paragraph tracking
#[derive(Debug, Default)]
struct ContentBuffer {
    text: String,
    parastarts: Vec<usize>,
    pending_space: bool,
    pending_boundary: bool,
}

impl ContentBuffer {
    fn len(&self) -> usize {
        self.text.len()
    }

    fn paragraph_boundary(&mut self) {
        self.pending_boundary = true;
    }

    fn push_text(&mut self, text: &str) {
        for (index, word) in text.split(is_collapsible).enumerate() {
            if index > 0 {
                self.pending_space = true;
            }
            if !word.is_empty() {
                self.push_word(word);
            }
        }
    }

    fn push_word(&mut self, word: &str) {
        let at = self.text.len();
        if self.parastarts.is_empty()
            || (self.pending_boundary && self.parastarts.last() != Some(&at))
        {
            self.parastarts.push(at);
        }
        if (self.pending_space || self.pending_boundary) && !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(word);
        self.pending_space = false;
        self.pending_boundary = false;
    }
}

#[derive(Debug, Default)]
enum TitleCapture {
    #[default]
    Idle,
    Capturing {
        depth: usize,
        text: ContentBuffer,
    },
    Skipping {
        depth: usize,
    },
    Done,
}

#[derive(Debug)]
struct PendingLink {
    target: String,
    start_pos: usize,
    /// Offset into the title buffer when the anchor opened inside the title
    title_start: Option<usize>,
    depth: usize,
    parent_tags: Vec<TagFrame>,
    child_tags: Vec<TagFrame>,
}

/// Single-pass extraction over a token stream
#[derive(Debug)]
pub struct Extractor {
    resolved: ResolvedEncoding,
    converter: TextConverter,
    stack: TagStack,
    content: ContentBuffer,
    metadata: PageMetadata,
    title: TitleCapture,
    link: Option<PendingLink>,
    links: Vec<LinkRecord>,
    in_raw_text: bool,
}

impl Extractor {
    /// Create an extractor decoding text with the resolved encoding
    pub fn new(resolved: ResolvedEncoding) -> Self {
        Self {
            converter: TextConverter::new(resolved.charset),
            resolved,
            stack: TagStack::new(),
            content: ContentBuffer::default(),
            metadata: PageMetadata::new(),
            title: TitleCapture::Idle,
            link: None,
            links: Vec::new(),
            in_raw_text: false,
        }
    }

    /// Process one event
    pub fn feed(&mut self, event: &LexEvent<'_>) {
        match event {
            LexEvent::StartTag(tag) => self.start_tag(tag),
            LexEvent::EndTag(name) => self.end_tag(name),
            LexEvent::Text(run) => self.text(run),
            LexEvent::Comment(_) | LexEvent::Declaration(_) => {}
        }
    }

    fn start_tag(&mut self, tag: &StartTag<'_>) {
        let converter = &mut self.converter;
        let frame = TagFrame::from_start_tag(tag, self.content.len(), |raw| {
            converter.decode_attribute(raw)
        });

        if tag.name == "a" {
            self.finish_link();
        } else if let Some(link) = &mut self.link {
            link.child_tags.push(frame.clone());
        }

        let depth = self.stack.open(frame);

        match (tag.name.as_str(), depth) {
            ("a", Some(depth)) => {
                if let Some(href) = tag.attribute("href") {
                    self.link = Some(PendingLink {
                        target: self.converter.decode_attribute(href),
                        start_pos: self.content.len(),
                        title_start: match &self.title {
                            TitleCapture::Capturing { text, .. } => Some(text.len()),
                            _ => None,
                        },
                        depth,
                        parent_tags: self.stack.snapshot(),
                        child_tags: Vec::new(),
                    });
                }
            }
            ("title", Some(depth)) => {
                self.title = match mem::take(&mut self.title) {
                    TitleCapture::Idle => TitleCapture::Capturing {
                        depth,
                        text: ContentBuffer::default(),
                    },
                    TitleCapture::Done => TitleCapture::Skipping { depth },
                    nested => nested,
                };
            }
            ("meta", _) => self.metadata.process_meta_tag(tag, &mut self.converter),
            ("script" | "style", _) => self.in_raw_text = true,
            _ => {}
        }

        if breaks_on_start(&tag.name) {
            self.paragraph_boundary();
        }
    }

    fn end_tag(&mut self, name: &str) {
        if let Some(depth) = self.stack.close(name) {
            if self.link.as_ref().is_some_and(|link| link.depth >= depth) {
                self.finish_link();
            }
            self.close_title(depth);
        }

        if matches!(name, "script" | "style") {
            self.in_raw_text = false;
        }

        if breaks_on_end(name) {
            self.paragraph_boundary();
        }
    }

    fn text(&mut self, run: &TextRun<'_>) {
        if self.in_raw_text {
            return;
        }
        let text = self.converter.decode_text(run.raw);
        match &mut self.title {
            TitleCapture::Capturing { text: title, .. } => title.push_text(&text),
            TitleCapture::Skipping { .. } => {}
            TitleCapture::Idle | TitleCapture::Done => self.content.push_text(&text),
        }
    }

    fn paragraph_boundary(&mut self) {
        match &mut self.title {
            TitleCapture::Capturing { text, .. } => text.paragraph_boundary(),
            _ => self.content.paragraph_boundary(),
        }
    }

    /// Close the title capture if its element was popped at `depth`
    fn close_title(&mut self, depth: usize) {
        match &mut self.title {
            TitleCapture::Capturing { depth: open, text } if *open >= depth => {
                self.metadata.title = mem::take(&mut text.text);
                self.title = TitleCapture::Done;
            }
            TitleCapture::Skipping { depth: open } if *open >= depth => {
                self.title = TitleCapture::Done;
            }
            _ => {}
        }
    }

    fn finish_link(&mut self) {
        let Some(link) = self.link.take() else {
            return;
        };
        let text = match (&self.title, link.title_start) {
            (TitleCapture::Capturing { text, .. }, Some(start)) => &text.text[start..],
            (_, Some(_)) => "",
            (_, None) => &self.content.text[link.start_pos..],
        };
        let text = text.strip_prefix(' ').unwrap_or(text);
        self.links.push(LinkRecord {
            target: link.target,
            text: text.to_string(),
            start_pos: link.start_pos,
            para: String::new(),
            parent_tags: link.parent_tags,
            child_tags: link.child_tags,
        });
    }

    /// Finalize open captures and build the document
    pub fn finish(mut self) -> ParsedDocument {
        self.finish_link();
        if let TitleCapture::Capturing { text, .. } = mem::take(&mut self.title) {
            self.metadata.title = text.text;
        }
        self.stack.finish();

        let ContentBuffer {
            text: content,
            parastarts,
            ..
        } = self.content;

        let links = self
            .links
            .into_iter()
            .map(|mut link| {
                link.para = paragraph_index(&parastarts, link.start_pos)
                    .map(|index| paragraph_text(&content, &parastarts, index).to_string())
                    .unwrap_or_default();
                link
            })
            .collect();

        let PageMetadata {
            title,
            description,
            keywords,
            indexing_allowed,
            following_allowed,
        } = self.metadata;

        ParsedDocument {
            title,
            description,
            keywords,
            indexing_allowed,
            following_allowed,
            badly_encoded: self.converter.had_errors() || self.resolved.rejected,
            content,
            parastarts,
            links,
            encoding: self.resolved.charset,
            encoding_source: self.resolved.source,
        }
    }
}
