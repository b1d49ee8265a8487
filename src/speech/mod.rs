pub mod tacotron2;
pub mod wavenet;

use crate::config::SpeechEngine;
use anyhow::Result;
use std::path::Path;

/// Turns an ordered list of sentences into one WAV file.
pub trait SpeechBackend {
    /// Whether sentences may carry speech markup (SSML).
    fn supports_markup(&self) -> bool;

    /// Synthesize `sentences` in order into a single WAV at `output`.
    fn synthesize(&self, sentences: &[String], output: &Path) -> Result<()>;
}

pub fn from_config(engine: &SpeechEngine) -> Result<Box<dyn SpeechBackend>> {
    Ok(match engine {
        SpeechEngine::Wavenet(params) => Box::new(wavenet::WavenetBackend::new(params.clone())?),
        SpeechEngine::Tacotron2(params) => {
            Box::new(tacotron2::Tacotron2Backend::new(params.clone())?)
        }
    })
}

/// Escape plain text for inclusion in SSML.
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_markup(r#"Tom & Jerry said "<hi>" isn't it"#),
            "Tom &amp; Jerry said &quot;&lt;hi&gt;&quot; isn&apos;t it"
        );
    }
}
