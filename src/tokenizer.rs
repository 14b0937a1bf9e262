//! Tolerant byte-level HTML tokenizer
//!
//! The tokenizer scans raw input bytes and produces a lazy sequence of
//! [`LexEvent`]s. It never interprets character encodings: every payload is a
//! borrowed slice of the input, so the same event stream can be pre-scanned for
//! a charset declaration and then decoded once the encoding is known.
//!
//! # State Machine
//!
//! ```text
//! Text --'<'--> TagOpen --> TagName --> InTag --'>'--> Text
//!                                       InTag --> AttrName --> AttrValue --> InTag
//! Text --'<!--'--> Comment --'-->'--> Text
//! Text --'<script>' / '<style>'--> RawText --'</script>' / '</style>'--> Text
//! ```
//!
//! Each state is implemented by a scanning method on [`Tokenizer`]; the data,
//! raw-text and end-of-input states are tracked explicitly between events.
//!
//! # Recovery
//!
//! The tokenizer never fails. Constructs that cannot be read as markup degrade
//! to something harmless:
//!
//! - A `<` that is not followed by a tag name, `/`, `!` or `?` is literal text
//! - An unterminated quoted attribute value runs to the next `>`, or to the end
//!   of input when there is none
//! - End of input inside a tag, comment or declaration flushes what was read as
//!   a best-effort final event
//!
//! Tag and attribute names are ASCII-lowercased. Attribute values are returned
//! raw; entity decoding is the extraction layer's job.

use memchr::memchr;
use memchr::memmem;
use std::ops::Range;

/// One attribute of a start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Attribute name, ASCII-lowercased
    pub name: String,
    /// Raw attribute value bytes (empty for a bare attribute)
    pub value: &'a [u8],
}

/// A start tag with its attributes in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag<'a> {
    /// Tag name, ASCII-lowercased
    pub name: String,
    /// Attributes in source order, duplicates included
    pub attributes: Vec<Attribute<'a>>,
    /// Whether the tag ended with `/>`
    pub self_closing: bool,
}

impl<'a> StartTag<'a> {
    /// Raw value of the first attribute with the given (lowercase) name
    pub fn attribute(&self, name: &str) -> Option<&'a [u8]> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value)
    }
}

/// A run of character data between two pieces of markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun<'a> {
    /// Raw, undecoded bytes of the run
    pub raw: &'a [u8],
    /// Byte range of the run within the input
    pub range: Range<usize>,
}

/// Low-level lexical event produced by the tokenizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexEvent<'a> {
    /// `<name attr=value ...>`
    StartTag(StartTag<'a>),
    /// `</name>`, carrying the lowercased name
    EndTag(String),
    /// Character data, including the opaque contents of `script` and `style`
    Text(TextRun<'a>),
    /// Contents of a `<!-- ... -->` comment
    Comment(&'a [u8]),
    /// Contents of `<!...>` or `<?...>`, such as a DOCTYPE
    Declaration(&'a [u8]),
}

/// Elements whose contents are a single opaque text run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawTextElement {
    Script,
    Style,
}

impl RawTextElement {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "script" => Some(RawTextElement::Script),
            "style" => Some(RawTextElement::Style),
            _ => None,
        }
    }

    fn end_tag_name(self) -> &'static [u8] {
        match self {
            RawTextElement::Script => b"script",
            RawTextElement::Style => b"style",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    RawText(RawTextElement),
    Eof,
}

/// Lazy iterator of [`LexEvent`]s over a byte buffer
///
/// The iterator holds no state beyond its cursor, so tokenizing the same bytes
/// twice always yields the same events.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    input: &'a [u8],
    pos: usize,
    state: State,
}

/// Tokenize raw HTML bytes
///
/// # Examples
///
/// ```rust
/// use htmltext::tokenizer::{tokenize, LexEvent};
///
/// let events: Vec<_> = tokenize(b"<P class=x>Hi</p>").collect();
/// assert_eq!(events.len(), 3);
/// match &events[0] {
///     LexEvent::StartTag(tag) => {
///         assert_eq!(tag.name, "p");
///         assert_eq!(tag.attribute("class"), Some(&b"x"[..]));
///     }
///     other => panic!("unexpected event {other:?}"),
/// }
/// assert_eq!(events[2], LexEvent::EndTag("p".to_string()));
/// ```
pub fn tokenize(input: &[u8]) -> Tokenizer<'_> {
    Tokenizer {
        input,
        pos: 0,
        state: State::Data,
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = LexEvent<'a>;

    fn next(&mut self) -> Option<LexEvent<'a>> {
        loop {
            match self.state {
                State::Eof => return None,
                State::RawText(element) => {
                    self.state = State::Data;
                    if let Some(event) = self.raw_text(element) {
                        return Some(event);
                    }
                }
                State::Data => {
                    if self.pos >= self.input.len() {
                        self.state = State::Eof;
                        return None;
                    }
                    if self.starts_markup(self.pos) {
                        return Some(self.markup());
                    }
                    return Some(self.text());
                }
            }
        }
    }
}

impl<'a> Tokenizer<'a> {
    /// Whether the `<` at `at` opens something the tokenizer can read as markup
    fn starts_markup(&self, at: usize) -> bool {
        if self.input.get(at) != Some(&b'<') {
            return false;
        }
        match self.input.get(at + 1) {
            Some(b) if b.is_ascii_alphabetic() => true,
            Some(b'!') | Some(b'?') => true,
            Some(b'/') => self
                .input
                .get(at + 2)
                .is_some_and(|b| b.is_ascii_alphabetic()),
            _ => false,
        }
    }

    /// Text state: consume up to the next `<` that opens real markup
    fn text(&mut self) -> LexEvent<'a> {
        let start = self.pos;
        // The first byte is either plain text or a `<` that failed to open markup.
        let mut cursor = start + 1;
        let end = loop {
            match memchr(b'<', &self.input[cursor..]) {
                Some(offset) => {
                    let at = cursor + offset;
                    if self.starts_markup(at) {
                        break at;
                    }
                    cursor = at + 1;
                }
                None => break self.input.len(),
            }
        };
        self.pos = end;
        LexEvent::Text(TextRun {
            raw: &self.input[start..end],
            range: start..end,
        })
    }

    /// TagOpen state: dispatch on the byte after `<`
    fn markup(&mut self) -> LexEvent<'a> {
        match self.input[self.pos + 1] {
            b'!' if self.input[self.pos + 2..].starts_with(b"--") => self.comment(),
            b'!' | b'?' => self.declaration(),
            b'/' => self.end_tag(),
            _ => self.start_tag(),
        }
    }

    fn comment(&mut self) -> LexEvent<'a> {
        let start = self.pos + 4;
        let rest = &self.input[start..];

        // `<!-->` and `<!--->` are complete, empty comments.
        if rest.starts_with(b">") {
            self.pos = start + 1;
            return LexEvent::Comment(&[]);
        }
        if rest.starts_with(b"->") {
            self.pos = start + 2;
            return LexEvent::Comment(&[]);
        }

        match memmem::find(rest, b"-->") {
            Some(offset) => {
                self.pos = start + offset + 3;
                LexEvent::Comment(&rest[..offset])
            }
            None => {
                self.pos = self.input.len();
                LexEvent::Comment(rest)
            }
        }
    }

    fn declaration(&mut self) -> LexEvent<'a> {
        let start = self.pos + 2;
        let rest = &self.input[start..];
        match memchr(b'>', rest) {
            Some(offset) => {
                self.pos = start + offset + 1;
                LexEvent::Declaration(&rest[..offset])
            }
            None => {
                self.pos = self.input.len();
                LexEvent::Declaration(rest)
            }
        }
    }

    fn end_tag(&mut self) -> LexEvent<'a> {
        let (name, cursor) = self.tag_name(self.pos + 2);
        // Anything between the name and `>` is ignored.
        self.pos = match memchr(b'>', &self.input[cursor..]) {
            Some(offset) => cursor + offset + 1,
            None => self.input.len(),
        };
        LexEvent::EndTag(name)
    }

    /// TagName and InTag states
    fn start_tag(&mut self) -> LexEvent<'a> {
        let (name, mut cursor) = self.tag_name(self.pos + 1);
        let mut attributes = Vec::new();
        let mut self_closing = false;

        loop {
            cursor = self.skip_whitespace(cursor);
            match self.input.get(cursor) {
                None => break,
                Some(b'>') => {
                    cursor += 1;
                    break;
                }
                Some(b'/') => {
                    cursor += 1;
                    self_closing = self.input.get(cursor) == Some(&b'>');
                }
                Some(_) => {
                    let (attribute, next, tag_closed) = self.attribute(cursor);
                    attributes.push(attribute);
                    cursor = next;
                    if tag_closed {
                        break;
                    }
                }
            }
        }

        self.pos = cursor;
        if let Some(element) = RawTextElement::from_name(&name) {
            self.state = State::RawText(element);
        }

        LexEvent::StartTag(StartTag {
            name,
            attributes,
            self_closing,
        })
    }

    /// AttrName and AttrValue states
    ///
    /// Returns the attribute, the cursor after it, and whether the enclosing
    /// tag was closed while reading an unterminated quoted value.
    fn attribute(&self, start: usize) -> (Attribute<'a>, usize, bool) {
        // The first byte always belongs to the name, even if it is `=`.
        let mut cursor = start + 1;
        while let Some(&b) = self.input.get(cursor) {
            if is_whitespace(b) || matches!(b, b'=' | b'>' | b'/') {
                break;
            }
            cursor += 1;
        }
        let name = lowercase_name(&self.input[start..cursor]);

        let after_name = self.skip_whitespace(cursor);
        if self.input.get(after_name) != Some(&b'=') {
            let attribute = Attribute { name, value: &[] };
            return (attribute, cursor, false);
        }

        let value_start = self.skip_whitespace(after_name + 1);
        let (value, next, tag_closed) = match self.input.get(value_start) {
            Some(&quote) if quote == b'"' || quote == b'\'' => {
                self.quoted_value(value_start + 1, quote)
            }
            Some(b'>') | None => (&self.input[value_start..value_start], value_start, false),
            Some(_) => {
                let mut end = value_start;
                while let Some(&b) = self.input.get(end) {
                    if is_whitespace(b) || b == b'>' {
                        break;
                    }
                    end += 1;
                }
                (&self.input[value_start..end], end, false)
            }
        };

        (Attribute { name, value }, next, tag_closed)
    }

    fn quoted_value(&self, start: usize, quote: u8) -> (&'a [u8], usize, bool) {
        let input: &'a [u8] = self.input;
        let rest = &input[start..];
        if let Some(offset) = memchr(quote, rest) {
            return (&rest[..offset], start + offset + 1, false);
        }
        // Unterminated: the value runs to the end of the tag.
        match memchr(b'>', rest) {
            Some(offset) => (&rest[..offset], start + offset + 1, true),
            None => (rest, input.len(), true),
        }
    }

    /// Read a tag name starting at `start`; returns the name and the cursor after it
    fn tag_name(&self, start: usize) -> (String, usize) {
        let mut cursor = start;
        while let Some(&b) = self.input.get(cursor) {
            if is_whitespace(b) || matches!(b, b'/' | b'>') {
                break;
            }
            cursor += 1;
        }
        (lowercase_name(&self.input[start..cursor]), cursor)
    }

    fn skip_whitespace(&self, mut cursor: usize) -> usize {
        while self.input.get(cursor).is_some_and(|&b| is_whitespace(b)) {
            cursor += 1;
        }
        cursor
    }

    /// RawText state: everything up to the matching end tag is one text run
    fn raw_text(&mut self, element: RawTextElement) -> Option<LexEvent<'a>> {
        let start = self.pos;
        let name = element.end_tag_name();
        let finder = memmem::Finder::new(b"</");

        let mut cursor = start;
        let end = loop {
            let Some(offset) = finder.find(&self.input[cursor..]) else {
                break self.input.len();
            };
            let at = cursor + offset;
            let name_start = at + 2;
            let name_end = name_start + name.len();
            let name_matches = self
                .input
                .get(name_start..name_end)
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name));
            let terminated = match self.input.get(name_end) {
                None => true,
                Some(&b) => is_whitespace(b) || matches!(b, b'/' | b'>'),
            };
            if name_matches && terminated {
                break at;
            }
            cursor = at + 2;
        };

        self.pos = end;
        let input: &'a [u8] = self.input;
        (end > start).then(|| {
            LexEvent::Text(TextRun {
                raw: &input[start..end],
                range: start..end,
            })
        })
    }
}

/// HTML whitespace as used by the tokenizer (space, tab, LF, FF, CR)
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\x0C' | b'\r')
}

fn lowercase_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_ascii_lowercase()
}
