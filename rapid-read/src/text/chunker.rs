//! Splits tagged document blocks into bounded speakable chunks.

use super::{BlockTag, Chunk, DocTag, Emphasis, TaggedItem, TextBlock};

/// Default number of tagged items per synthesis request.
pub const DEFAULT_MAX_TOKENS: usize = 50;

/// Split document blocks into chunks of at most `max_tokens` items.
///
/// Heading blocks close the open chunk before starting their own, so a
/// heading is always the first item of its chunk. Empty blocks also close
/// the open chunk but contribute nothing. Chunks partition the token
/// stream contiguously and in order.
///
/// A document producing zero tokens yields zero chunks; the caller must
/// treat that as an unreadable document, not proceed silently.
pub fn chunk_blocks(blocks: &[TextBlock], max_tokens: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut items: Vec<TaggedItem> = Vec::new();
    let mut token_number = 0usize;

    for block in blocks {
        let (doc_tag, emphasis) = match block.tag {
            BlockTag::HeadingMajor => {
                flush(&mut items, &mut token_number, &mut chunks);
                (DocTag::Sentence, Emphasis::Strong)
            }
            BlockTag::HeadingMinor => {
                flush(&mut items, &mut token_number, &mut chunks);
                (DocTag::Sentence, Emphasis::Moderate)
            }
            BlockTag::Body => (DocTag::Paragraph, Emphasis::None),
        };

        if items.len() >= max_tokens {
            flush(&mut items, &mut token_number, &mut chunks);
        }
        if block.text.is_empty() {
            flush(&mut items, &mut token_number, &mut chunks);
            continue;
        }
        if block.text.split_whitespace().next().is_none() {
            continue;
        }

        items.push(TaggedItem {
            text: block.text.clone(),
            doc_tag,
            emphasis,
        });
    }

    flush(&mut items, &mut token_number, &mut chunks);
    chunks
}

/// Close the open accumulator into a chunk, if it holds any tokens.
fn flush(items: &mut Vec<TaggedItem>, token_number: &mut usize, chunks: &mut Vec<Chunk>) {
    if items.is_empty() {
        return;
    }
    let start_token = *token_number;
    *token_number += items.len();
    chunks.push(Chunk {
        items: std::mem::take(items),
        start_token,
    });
}
