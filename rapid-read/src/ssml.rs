//! SSML document assembly for speech synthesis requests.

use crate::text::Chunk;

/// Voice, style, and rate settings applied to every synthesis request.
#[derive(Debug, Clone)]
pub struct SpeechStyle {
    /// Synthesis voice name.
    pub voice: String,
    /// Speaking style; `"default"` omits the style wrapper entirely.
    pub style: String,
    /// Prosody rate, e.g. `"+20.00%"`.
    pub rate: String,
}

impl Default for SpeechStyle {
    fn default() -> Self {
        Self {
            voice: "en-US-AriaNeural".to_string(),
            style: "narration-professional".to_string(),
            rate: "+20.00%".to_string(),
        }
    }
}

/// Build the SSML document for one chunk.
///
/// Each tagged item becomes an `<s>` or `<p>` element wrapping a style
/// expression (unless the style is `"default"`), a rate-controlled prosody
/// element, and an emphasis element at the item's level. Output is
/// deterministic for identical inputs.
pub fn build_ssml(chunk: &Chunk, style: &SpeechStyle) -> String {
    let mut out = format!(
        r#"<speak version="1.0" xmlns="http://www.w3.org/2001/10/synthesis" xmlns:mstts="https://www.w3.org/2001/mstts" xml:lang="en-US"><voice name="{}">"#,
        style.voice
    );

    for item in &chunk.items {
        let text = escape_text(&item.text);
        let tag = item.doc_tag.element();
        let emphasis = item.emphasis.level();
        if style.style != "default" {
            out.push_str(&format!(
                r#"<{tag}><mstts:express-as style="{}"><prosody rate="{}"><emphasis level="{emphasis}">{text}</emphasis></prosody></mstts:express-as></{tag}>"#,
                style.style, style.rate
            ));
        } else {
            out.push_str(&format!(
                r#"<{tag}><prosody rate="{}"><emphasis level="{emphasis}">{text}</emphasis></prosody></{tag}>"#,
                style.rate
            ));
        }
    }

    out.push_str("</voice></speak>");
    out
}

/// Escape markup-reserved characters and fold embedded newlines to spaces.
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\n', " ")
}
