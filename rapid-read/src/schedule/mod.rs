//! Converts word-boundary events from one synthesis call into the
//! per-word display schedule.

pub mod context;

pub use context::{ContextWindow, context_window, highlight_index};

use speech_client::WordEvent;

/// One scheduled word with timing and context strings.
#[derive(Debug, Clone)]
pub struct WordSlot {
    pub word: String,
    /// Offset of this word from the start of the chunk's audio.
    pub offset_ms: u64,
    /// How long this word stays on screen.
    pub duration_ms: u64,
    /// Neighbor words shown on the center line, before and after.
    pub left: String,
    pub right: String,
    /// Words beyond the neighbor window; `None` at chunk boundaries.
    pub previous: Option<String>,
    pub forward: Option<String>,
}

/// Build the display schedule for one chunk.
///
/// Events are sorted by offset (stable, so near-duplicate offsets keep
/// their arrival order). The duration of word `i` is the gap to word
/// `i + 1`; the last word takes the remainder of the audio. A malformed
/// event set that would produce a negative duration is clamped to zero
/// with a warning rather than an error.
///
/// An empty event set yields an empty schedule; the caller must treat
/// that chunk as a skip-forward condition, not a stall.
pub fn build_schedule(
    events: &[WordEvent],
    total_duration_ms: u64,
    window: usize,
) -> Vec<WordSlot> {
    let mut events: Vec<WordEvent> = events.to_vec();
    events.sort_by_key(|e| e.offset_ms);

    let n = events.len();
    if n == 0 {
        return Vec::new();
    }

    let mut durations = Vec::with_capacity(n);
    for i in 0..n {
        let start = events[i].offset_ms;
        let end = if i + 1 < n {
            events[i + 1].offset_ms
        } else {
            total_duration_ms
        };
        if end < start {
            log::warn!(
                "word {} at {}ms overruns audio end {}ms, clamping duration to 0",
                events[i].word,
                start,
                end
            );
            durations.push(0);
        } else {
            durations.push(end - start);
        }
    }

    let words: Vec<String> = events.iter().map(|e| e.word.clone()).collect();

    events
        .into_iter()
        .zip(durations)
        .enumerate()
        .map(|(i, (event, duration_ms))| {
            let ctx = context_window(&words, i, window);
            WordSlot {
                word: event.word,
                offset_ms: event.offset_ms,
                duration_ms,
                left: ctx.left,
                right: ctx.right,
                previous: ctx.previous,
                forward: ctx.forward,
            }
        })
        .collect()
}
