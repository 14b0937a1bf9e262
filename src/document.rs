//! Extraction results

use crate::charset::{Charset, EncodingSource};
use crate::tag_stack::TagFrame;

/// A hyperlink found in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    /// Entity-decoded `href` value
    pub target: String,
    /// Visible anchor text, whitespace-collapsed
    pub text: String,
    /// Byte offset into the document content where the anchor opened
    pub start_pos: usize,
    /// Text of the paragraph containing `start_pos`
    pub para: String,
    /// Open elements at the anchor, outermost first, ending with the anchor
    pub parent_tags: Vec<TagFrame>,
    /// Elements opened inside the anchor, in document order
    pub child_tags: Vec<TagFrame>,
}

/// Text, links and metadata extracted from one HTML document
///
/// # Examples
///
/// ```rust
/// let doc = htmltext::parse(b"<p>One</p><p>Two <a href=\"/x\">three</a></p>", None);
///
/// assert_eq!(doc.content, "One Two three");
/// assert_eq!(doc.parastarts, vec![0, 3]);
/// assert_eq!(doc.paragraphs().collect::<Vec<_>>(), vec!["One", "Two three"]);
/// assert_eq!(doc.links[0].para, "Two three");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub indexing_allowed: bool,
    pub following_allowed: bool,
    /// Some input could not be decoded losslessly
    pub badly_encoded: bool,
    /// Whitespace-collapsed body text
    pub content: String,
    /// Byte offsets of paragraph starts in `content`, strictly increasing
    pub parastarts: Vec<usize>,
    pub links: Vec<LinkRecord>,
    /// Encoding the text was decoded with
    pub encoding: Charset,
    pub encoding_source: EncodingSource,
}

impl ParsedDocument {
    /// Iterate over paragraph texts in document order
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.parastarts.len()).map(|index| self.paragraph(index))
    }

    /// Text of the paragraph containing a content offset
    ///
    /// Returns `None` when the content is empty or the offset is past its end.
    pub fn paragraph_at(&self, offset: usize) -> Option<&str> {
        if offset >= self.content.len() {
            return None;
        }
        paragraph_index(&self.parastarts, offset).map(|index| self.paragraph(index))
    }

    fn paragraph(&self, index: usize) -> &str {
        paragraph_text(&self.content, &self.parastarts, index)
    }
}

/// Index of the paragraph whose interval contains `offset`
pub(crate) fn paragraph_index(parastarts: &[usize], offset: usize) -> Option<usize> {
    parastarts
        .partition_point(|&start| start <= offset)
        .checked_sub(1)
}

/// Text of a paragraph without its leading separator
pub(crate) fn paragraph_text<'c>(content: &'c str, parastarts: &[usize], index: usize) -> &'c str {
    let start = parastarts[index];
    let end = parastarts.get(index + 1).copied().unwrap_or(content.len());
    let text = &content[start..end];
    text.strip_prefix(' ').unwrap_or(text)
}
