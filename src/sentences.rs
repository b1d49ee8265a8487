use unicode_segmentation::UnicodeSegmentation;

/// Split chapter text into sentences for synthesis.
///
/// Japanese and Chinese are split on their full-width terminators; every other
/// language uses Unicode sentence boundaries over whitespace-flattened text, so
/// hard-wrapped lines do not end sentences. Blank sentences are dropped.
pub fn split_sentences(text: &str, language: &str) -> Vec<String> {
    let primary = language
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    let flattened;
    let raw: Vec<&str> = match primary.as_str() {
        "ja" => split_keeping_terminator(text, &['。', '！', '？']),
        "zh" => split_keeping_terminator(text, &['。', '！', '？', '；']),
        _ => {
            flattened = flatten_whitespace(text);
            flattened.unicode_sentences().collect()
        }
    };

    raw.into_iter().filter_map(normalize_sentence).collect()
}

fn split_keeping_terminator<'a>(text: &'a str, terminators: &[char]) -> Vec<&'a str> {
    text.split_inclusive(terminators).collect()
}

fn flatten_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_sentence(sentence: &str) -> Option<String> {
    let joined = flatten_whitespace(sentence);
    (!joined.is_empty()).then_some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_english_on_sentence_boundaries() {
        let sentences = split_sentences("It was a dark night. The rain fell!  Was it cold?", "en");
        assert_eq!(
            sentences,
            vec!["It was a dark night.", "The rain fell!", "Was it cold?"]
        );
    }

    #[test]
    fn flattens_line_breaks_and_drops_blanks() {
        let sentences = split_sentences("CHAPTER I.\n\nI am by birth\na Genevese.\n\n", "en-GB");
        assert_eq!(sentences, vec!["CHAPTER I.", "I am by birth a Genevese."]);
    }

    #[test]
    fn japanese_keeps_terminators() {
        let sentences = split_sentences("吾輩は猫である。名前はまだ無い。", "ja-JP");
        assert_eq!(sentences, vec!["吾輩は猫である。", "名前はまだ無い。"]);
    }

    #[test]
    fn empty_text_has_no_sentences() {
        assert!(split_sentences(" \n\t", "en").is_empty());
    }
}
