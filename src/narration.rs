use crate::config::OutputLayout;
use crate::metadata::Credits;
use crate::sentences::split_sentences;
use crate::speech::{escape_markup, SpeechBackend};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

/// SSML announcement of title, author and narrator.
pub fn title_markup(credits: &Credits) -> String {
    let mut ssml = format!(
        r#"<emphasis level="strong"> {} </emphasis> "#,
        escape_markup(&credits.title)
    );
    if let Some(author) = &credits.author {
        ssml.push_str(&format!(
            r#"<break time="400ms"/> by {} "#,
            escape_markup(author)
        ));
    }
    if let Some(narrator) = &credits.narrator {
        ssml.push_str(&format!(
            r#"<break time="400ms"/> narrated by {}"#,
            escape_markup(narrator)
        ));
    }
    ssml.push_str(r#"<break time="400ms"/>"#);
    ssml
}

/// Plain-text announcement for backends without markup.
pub fn title_plain(credits: &Credits) -> String {
    let mut title = format!("{}.", credits.title);
    if let Some(author) = &credits.author {
        title.push_str(&format!(" by {author}."));
    }
    if let Some(narrator) = &credits.narrator {
        title.push_str(&format!(" narrated by {narrator}."));
    }
    title
}

/// Narrates chapters in order. The first chapter opens with the title
/// announcement, and any failure stops the run.
pub struct Narrator<'a> {
    backend: &'a dyn SpeechBackend,
    layout: &'a OutputLayout,
    language: &'a str,
    credits: &'a Credits,
}

impl<'a> Narrator<'a> {
    pub fn new(
        backend: &'a dyn SpeechBackend,
        layout: &'a OutputLayout,
        language: &'a str,
        credits: &'a Credits,
    ) -> Self {
        Self {
            backend,
            layout,
            language,
            credits,
        }
    }

    /// Sentences sent to the backend for the chapter at 0-based `index`.
    fn chapter_sentences(&self, index: usize, text: &str) -> Vec<String> {
        let markup = self.backend.supports_markup();
        let mut sentences: Vec<String> = split_sentences(text, self.language)
            .into_iter()
            .map(|s| if markup { escape_markup(&s) } else { s })
            .collect();
        if index == 0 {
            let title = if markup {
                title_markup(self.credits)
            } else {
                title_plain(self.credits)
            };
            sentences.insert(0, title);
        }
        sentences
    }

    /// Narrate every chapter, returning the audio files in chapter order.
    pub fn narrate(&self, chapters: &[String]) -> Result<Vec<PathBuf>> {
        let mut outputs = Vec::with_capacity(chapters.len());
        for (i, chapter) in chapters.iter().enumerate() {
            info!(chapter = i + 1, of = chapters.len(), "Narrating chapter");
            let sentences = self.chapter_sentences(i, chapter);
            let output = self.layout.audio_path(i);
            self.backend
                .synthesize(&sentences, &output)
                .with_context(|| format!("Failed to narrate chapter {}", i + 1))?;
            info!(
                chapter = i + 1,
                sentences = sentences.len(),
                path = %output.display(),
                "Wrote chapter audio"
            );
            outputs.push(output);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::cell::RefCell;
    use std::path::Path;

    struct Recording {
        markup: bool,
        fail_on: Option<usize>,
        calls: RefCell<Vec<(Vec<String>, PathBuf)>>,
    }

    impl Recording {
        fn new(markup: bool) -> Self {
            Self {
                markup,
                fail_on: None,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl SpeechBackend for Recording {
        fn supports_markup(&self) -> bool {
            self.markup
        }

        fn synthesize(&self, sentences: &[String], output: &Path) -> Result<()> {
            let call = self.calls.borrow().len();
            if self.fail_on == Some(call) {
                bail!("synthesis unavailable");
            }
            self.calls
                .borrow_mut()
                .push((sentences.to_vec(), output.to_path_buf()));
            Ok(())
        }
    }

    fn credits() -> Credits {
        Credits {
            title: "Frankenstein".to_string(),
            author: Some("Mary Shelley".to_string()),
            narrator: Some("Ada".to_string()),
        }
    }

    fn chapters() -> Vec<String> {
        vec![
            "Letter one. You will rejoice.".to_string(),
            "Chapter two & more.".to_string(),
        ]
    }

    #[test]
    fn announcement_formats() {
        assert_eq!(
            title_plain(&credits()),
            "Frankenstein. by Mary Shelley. narrated by Ada."
        );
        assert_eq!(
            title_markup(&credits()),
            r#"<emphasis level="strong"> Frankenstein </emphasis> <break time="400ms"/> by Mary Shelley <break time="400ms"/> narrated by Ada<break time="400ms"/>"#
        );
    }

    #[test]
    fn announcement_skips_unknown_names() {
        let credits = Credits {
            title: "Dracula".to_string(),
            author: None,
            narrator: None,
        };
        assert_eq!(title_plain(&credits), "Dracula.");
        assert_eq!(
            title_markup(&credits),
            r#"<emphasis level="strong"> Dracula </emphasis> <break time="400ms"/>"#
        );
    }

    #[test]
    fn title_prefixes_only_the_first_chapter() {
        let backend = Recording::new(false);
        let layout = OutputLayout::new(Path::new("out"), "Frankenstein", "audio");
        let credits = credits();
        let narrator = Narrator::new(&backend, &layout, "en", &credits);

        let outputs = narrator.narrate(&chapters()).unwrap();
        let calls = backend.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].0,
            vec![
                "Frankenstein. by Mary Shelley. narrated by Ada.".to_string(),
                "Letter one.".to_string(),
                "You will rejoice.".to_string(),
            ]
        );
        assert_eq!(calls[1].0, vec!["Chapter two & more.".to_string()]);
        assert_eq!(
            outputs,
            vec![
                PathBuf::from("out/Frankenstein/audio/Frankenstein-Ch001.wav"),
                PathBuf::from("out/Frankenstein/audio/Frankenstein-Ch002.wav"),
            ]
        );
    }

    #[test]
    fn markup_backends_get_escaped_sentences_and_ssml_title() {
        let backend = Recording::new(true);
        let layout = OutputLayout::new(Path::new("out"), "Frankenstein", "audio");
        let credits = credits();
        let narrator = Narrator::new(&backend, &layout, "en", &credits);

        narrator.narrate(&chapters()).unwrap();
        let calls = backend.calls.borrow();
        assert!(calls[0].0[0].starts_with("<emphasis"));
        assert_eq!(calls[1].0, vec!["Chapter two &amp; more.".to_string()]);
    }

    #[test]
    fn failure_stops_remaining_chapters() {
        let mut backend = Recording::new(false);
        backend.fail_on = Some(1);
        let layout = OutputLayout::new(Path::new("out"), "book", "audio");
        let credits = credits();
        let narrator = Narrator::new(&backend, &layout, "en", &credits);

        let mut three = chapters();
        three.push("Third.".to_string());
        let err = narrator.narrate(&three).unwrap_err();
        assert!(format!("{err:#}").contains("chapter 2"));
        assert_eq!(backend.calls.borrow().len(), 1);
    }
}
