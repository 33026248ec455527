//! Neighbor-window computation for the word display.

/// Context strings surrounding one word of a chunk.
///
/// `left`/`right` are the immediate neighbor window shown on the center
/// line; `previous`/`forward` are everything further out. The outer pair
/// is `None` (not an empty string) when the window already reaches the
/// chunk boundary, so a renderer can skip the panel entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    pub left: String,
    pub right: String,
    pub previous: Option<String>,
    pub forward: Option<String>,
}

/// Compute the context windows for `words[index]`.
///
/// `left` holds up to `window` words before the index; `right` holds the
/// words in `(index, index + window)`. `previous` is absent iff
/// `index <= window`, `forward` is absent iff `index + window >= len`.
/// A zero window yields empty neighbor strings; the outer windows then
/// carry everything around the word.
pub fn context_window(words: &[String], index: usize, window: usize) -> ContextWindow {
    let left_start = index.saturating_sub(window);
    let left = words[left_start..index].join(" ");
    let previous = if index > window {
        Some(words[..index - window].join(" "))
    } else {
        None
    };

    let (right, forward) = if index + window < words.len() {
        // The neighbor window is exclusive of the word itself, so its
        // end never falls below its start.
        let right_end = (index + window).max(index + 1);
        (
            words[index + 1..right_end].join(" "),
            Some(words[index + window..].join(" ")),
        )
    } else {
        (words[index + 1..].join(" "), None)
    };

    ContextWindow {
        left,
        right,
        previous,
        forward,
    }
}

/// Letter index to highlight when centering a word on screen.
///
/// Reading research places the optimal recognition point left of center;
/// this is the fixed word-length table the display uses.
pub fn highlight_index(word_len: usize) -> Option<usize> {
    match word_len {
        0 => None,
        1 => Some(0),
        2..=5 => Some(1),
        6..=9 => Some(2),
        10..=13 => Some(3),
        _ => Some(4),
    }
}
