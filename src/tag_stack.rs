//! Open-tag context tracking
//!
//! [`TagStack`] keeps the frames of the elements that are currently open.
//! Real pages close tags out of order or not at all, so closing is forgiving:
//! an end tag pops everything down to and including the innermost frame with
//! the same name, and an end tag with no open match is ignored.

use crate::tokenizer::StartTag;
use tracing::trace;

/// Elements that never have content and are therefore never pushed
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "br", "col", "embed", "frame", "hr", "img", "input", "isindex",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Whether a (lowercase) tag name is a void element
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Snapshot of one open element
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagFrame {
    /// Lowercased tag name
    pub name: String,
    /// Decoded `class` attribute, empty when absent
    pub class: String,
    /// Decoded `id` attribute, empty when absent
    pub id: String,
    /// Content length when the element opened
    pub opened_at: usize,
}

impl TagFrame {
    /// Build a frame for a start tag
    ///
    /// `decode` turns raw attribute bytes into text, so frames carry values in
    /// the document's resolved encoding.
    pub fn from_start_tag(
        tag: &StartTag<'_>,
        opened_at: usize,
        mut decode: impl FnMut(&[u8]) -> String,
    ) -> Self {
        let mut attribute = |name: &str| tag.attribute(name).map(&mut decode).unwrap_or_default();
        let class = attribute("class");
        let id = attribute("id");
        Self {
            name: tag.name.clone(),
            class,
            id,
            opened_at,
        }
    }
}

/// Stack of currently open elements, outermost first
#[derive(Debug, Default)]
pub struct TagStack {
    frames: Vec<TagFrame>,
}

impl TagStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame for a start tag
    ///
    /// Returns the frame's depth, or `None` for void elements, which are
    /// never pushed.
    pub fn open(&mut self, frame: TagFrame) -> Option<usize> {
        if is_void_element(&frame.name) {
            return None;
        }
        self.frames.push(frame);
        Some(self.frames.len() - 1)
    }

    /// Close the innermost open element with the given name
    ///
    /// Every frame above it is closed implicitly. Returns the depth of the
    /// closed frame; frames at that depth or deeper are gone afterwards.
    /// Returns `None` and leaves the stack unchanged when nothing matches.
    pub fn close(&mut self, name: &str) -> Option<usize> {
        let Some(depth) = self.frames.iter().rposition(|frame| frame.name == name) else {
            trace!(tag = name, "ignoring end tag with no open element");
            return None;
        };
        self.frames.truncate(depth);
        Some(depth)
    }

    /// Copy of the open frames, outermost first
    pub fn snapshot(&self) -> Vec<TagFrame> {
        self.frames.clone()
    }

    pub fn frames(&self) -> &[TagFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Discard any frames still open at end of input
    pub fn finish(&mut self) {
        self.frames.clear();
    }
}
