//! Text model and chunking for speech-synchronized reading.

pub mod chunker;

pub use chunker::chunk_blocks;

/// Heading classification assigned by document extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    /// Top-level heading (h1)
    HeadingMajor,
    /// Section heading (h2/h3)
    HeadingMinor,
    /// Running text
    Body,
}

/// A unit of extracted document content.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub tag: BlockTag,
    pub text: String,
}

impl TextBlock {
    pub fn new(tag: BlockTag, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
        }
    }
}

/// SSML document element wrapping a tagged item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocTag {
    Sentence,
    Paragraph,
}

impl DocTag {
    /// The SSML element name.
    pub fn element(&self) -> &'static str {
        match self {
            DocTag::Sentence => "s",
            DocTag::Paragraph => "p",
        }
    }
}

/// SSML emphasis level applied to a tagged item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Strong,
    Moderate,
    None,
}

impl Emphasis {
    /// The SSML `level` attribute value.
    pub fn level(&self) -> &'static str {
        match self {
            Emphasis::Strong => "strong",
            Emphasis::Moderate => "moderate",
            Emphasis::None => "none",
        }
    }
}

/// One speakable item inside a chunk.
#[derive(Debug, Clone)]
pub struct TaggedItem {
    pub text: String,
    pub doc_tag: DocTag,
    pub emphasis: Emphasis,
}

/// A bounded group of tagged items synthesized as one audio request.
///
/// Chunks partition the document's token stream contiguously:
/// `token_count` and `end_token` are derived from `items`, so the
/// count/length invariant holds by construction.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// The items spoken in this chunk, in document order.
    pub items: Vec<TaggedItem>,
    /// Global index of this chunk's first token.
    pub start_token: usize,
}

impl Chunk {
    /// Number of tokens (tagged items) in this chunk.
    pub fn token_count(&self) -> usize {
        self.items.len()
    }

    /// Global index one past this chunk's last token.
    pub fn end_token(&self) -> usize {
        self.start_token + self.items.len()
    }

    /// Short text used for the table of contents. Headings start their own
    /// chunk, so the first item is the natural label.
    pub fn preview(&self) -> &str {
        self.items.first().map(|i| i.text.as_str()).unwrap_or("")
    }
}
