use crate::cut::CutRange;
use crate::pdf_reader;
use crate::speech::tacotron2::Tacotron2Params;
use crate::speech::wavenet::WavenetParams;
use crate::video::VideoConfig;
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Validated, immutable run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub input: InputFile,
    pub output: OutputLayout,
    pub source: ChapterSource,
    pub speech: SpeechConfig,
    pub video: Option<VideoConfig>,
    pub log_level: LogLevel,
}

/// Where the chapter sequence for this run comes from.
#[derive(Debug, Clone)]
pub enum ChapterSource {
    /// Re-read chapter texts persisted by an earlier run.
    ExistingText,
    Epub(EpubParams),
    Html(HtmlParams),
    Pdf(PdfParams),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Epub,
    Html,
    Pdf,
}

impl FromStr for InputKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "epub" => Ok(InputKind::Epub),
            "html" => Ok(InputKind::Html),
            "pdf" => Ok(InputKind::Pdf),
            other => Err(anyhow!(
                "Input file type must be either epub, html file/link, or pdf (got `{other}`)"
            )),
        }
    }
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InputKind::Epub => "epub",
            InputKind::Html => "html",
            InputKind::Pdf => "pdf",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone)]
pub struct InputFile {
    pub kind: InputKind,
    /// File path, or a URL for HTML input.
    pub path: String,
    pub book_name: String,
    pub author: Option<String>,
    pub narrator: Option<String>,
}

/// Output directory layout derived from the `outputfile` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Prefix for every persisted artifact.
    pub name: String,
    /// `{outputfile.dir}/{outputfile.name}`
    pub root: PathBuf,
    pub audio_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(dir: &Path, name: &str, subdir_audio: &str) -> Self {
        let root = dir.join(name);
        let audio_dir = root.join(subdir_audio);
        Self {
            name: name.to_string(),
            root,
            audio_dir,
        }
    }

    pub fn text_dir(&self) -> PathBuf {
        self.root.join("chaptertexts")
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.root.join("chapterpdfs")
    }

    pub fn audio_path(&self, index: usize) -> PathBuf {
        self.audio_dir
            .join(format!("{}-Ch{:03}.wav", self.name, index + 1))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EpubParams {
    #[serde(default)]
    pub cut_start: Option<usize>,
    #[serde(default)]
    pub cut_end: Option<usize>,
}

impl EpubParams {
    pub fn cut(&self) -> CutRange {
        CutRange::new(self.cut_start, self.cut_end)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HtmlParams {
    pub split_regex: String,
    #[serde(default)]
    pub cut_start: Option<usize>,
    #[serde(default)]
    pub cut_end: Option<usize>,
}

impl HtmlParams {
    pub fn cut(&self) -> CutRange {
        CutRange::new(self.cut_start, self.cut_end)
    }

    pub fn split_regex(&self) -> Result<Regex> {
        Regex::new(&self.split_regex)
            .with_context(|| format!("Invalid split_regex `{}`", self.split_regex))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PdfParams {
    /// Chapter start pages, 1-indexed; the last entry is the book's last page.
    pub ch_page_list: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub read: bool,
    /// Language used to pick a sentence segmenter.
    pub language: String,
    pub engine: SpeechEngine,
}

#[derive(Debug, Clone)]
pub enum SpeechEngine {
    Wavenet(WavenetParams),
    Tacotron2(Tacotron2Params),
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    inputfile: RawInputFile,
    outputfile: RawOutputFile,
    #[serde(default)]
    speech: RawSpeech,
    #[serde(default)]
    param_epub: Option<EpubParams>,
    #[serde(default)]
    param_html: Option<HtmlParams>,
    #[serde(default)]
    param_pdf: Option<PdfParams>,
    #[serde(default)]
    video: Option<VideoConfig>,
    #[serde(default)]
    log_level: LogLevel,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInputFile {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    book_name: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    narrator: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOutputFile {
    name: String,
    dir: PathBuf,
    #[serde(default = "default_subdir_audio")]
    subdir_audio: String,
    #[serde(default)]
    use_exist_text: bool,
}

fn default_subdir_audio() -> String {
    "audio".to_string()
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSpeech {
    #[serde(default)]
    read: bool,
    #[serde(default)]
    tech: SpeechTech,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    params: serde_yaml::Value,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum SpeechTech {
    #[default]
    GcWavenet,
    Tacotron2,
}

/// Load and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&data).with_context(|| format!("Invalid config file: {}", path.display()))
}

pub fn parse_config(data: &str) -> Result<Config> {
    let raw: RawConfig = serde_yaml::from_str(data).context("Failed to parse YAML")?;

    let kind: InputKind = raw.inputfile.kind.parse()?;
    if raw.outputfile.name.trim().is_empty() {
        bail!("outputfile.name must not be empty");
    }

    let source = if raw.outputfile.use_exist_text {
        ChapterSource::ExistingText
    } else {
        match kind {
            InputKind::Epub => ChapterSource::Epub(raw.param_epub.unwrap_or_default()),
            InputKind::Html => {
                let params = raw
                    .param_html
                    .ok_or_else(|| anyhow!("param_html section is required for html input"))?;
                params.split_regex()?;
                ChapterSource::Html(params)
            }
            InputKind::Pdf => {
                let params = raw
                    .param_pdf
                    .ok_or_else(|| anyhow!("param_pdf section is required for pdf input"))?;
                pdf_reader::chapter_page_ranges(&params.ch_page_list)?;
                ChapterSource::Pdf(params)
            }
        }
    };

    let engine = match raw.speech.tech {
        SpeechTech::GcWavenet => SpeechEngine::Wavenet(
            speech_params(raw.speech.params).context("Invalid gc_wavenet speech params")?,
        ),
        SpeechTech::Tacotron2 => SpeechEngine::Tacotron2(
            speech_params(raw.speech.params).context("Invalid tacotron2 speech params")?,
        ),
    };

    Ok(Config {
        input: InputFile {
            kind,
            path: raw.inputfile.path,
            book_name: raw.inputfile.book_name,
            author: non_blank(raw.inputfile.author),
            narrator: non_blank(raw.inputfile.narrator),
        },
        output: OutputLayout::new(
            &raw.outputfile.dir,
            &raw.outputfile.name,
            &raw.outputfile.subdir_audio,
        ),
        source,
        speech: SpeechConfig {
            read: raw.speech.read,
            language: raw.speech.language.unwrap_or_else(|| "en".to_string()),
            engine,
        },
        video: raw.video,
        log_level: raw.log_level,
    })
}

fn speech_params<T: DeserializeOwned + Default>(value: serde_yaml::Value) -> Result<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_yaml::from_value(value)?)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
