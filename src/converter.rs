use crate::chapter_writer::ChapterFiles;
use crate::config::{ChapterSource, Config};
use crate::epub_reader::EpubData;
use crate::html_reader::HtmlBook;
use crate::metadata::{self, Credits};
use crate::narration::Narrator;
use crate::pdf_reader::PdfBook;
use crate::reader::{BookReader, Metadata};
use crate::speech;
use crate::video::VideoMaker;
use anyhow::Result;
use std::path::Path;
use tracing::info;

/// Chapter texts of a run plus whatever metadata the source carried.
pub struct Chapters {
    pub texts: Vec<String>,
    pub metadata: Metadata,
}

/// Produce the chapter sequence: re-read an earlier run's texts, or split
/// the source and persist the result.
pub fn load_chapters(config: &Config) -> Result<Chapters> {
    let files = ChapterFiles::new(config.output.text_dir(), &config.output.name);

    let reader: Box<dyn BookReader> = match &config.source {
        ChapterSource::ExistingText => {
            return Ok(Chapters {
                texts: files.read_existing()?,
                metadata: Metadata::default(),
            });
        }
        ChapterSource::Epub(params) => {
            Box::new(EpubData::open(Path::new(&config.input.path), params.clone())?)
        }
        ChapterSource::Html(params) => {
            Box::new(HtmlBook::new(config.input.path.clone(), params.clone()))
        }
        ChapterSource::Pdf(params) => Box::new(PdfBook::open(
            Path::new(&config.input.path),
            params.clone(),
            &config.output.pdf_dir(),
            &config.output.name,
        )?),
    };

    let texts = reader.chapters()?;
    files.write_all(&texts)?;
    Ok(Chapters {
        texts,
        metadata: reader.metadata(),
    })
}

pub fn convert(config: &Config) -> Result<()> {
    info!(
        kind = %config.input.kind,
        input = %config.input.path,
        output = %config.output.root.display(),
        "Starting conversion"
    );
    let chapters = load_chapters(config)?;
    info!(
        chapters = chapters.texts.len(),
        title = ?chapters.metadata.title,
        "Chapter texts ready"
    );

    if !config.speech.read {
        info!("Speech disabled; stopping after chapter texts");
        return Ok(());
    }

    let credits: Credits = metadata::resolve_credits(&config.input, &chapters.metadata);
    let backend = speech::from_config(&config.speech.engine)?;
    let narrator = Narrator::new(
        backend.as_ref(),
        &config.output,
        &config.speech.language,
        &credits,
    );
    let audio_files = narrator.narrate(&chapters.texts)?;
    info!(
        files = audio_files.len(),
        dir = %config.output.audio_dir.display(),
        "Narration finished"
    );

    if let Some(video) = &config.video {
        let videos = VideoMaker::new(video, &config.output.root).make_all(&audio_files)?;
        info!(files = videos.len(), "Videos finished");
    }

    Ok(())
}
