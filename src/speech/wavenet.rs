use super::SpeechBackend;
use crate::wav::WavAssembler;
use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Input limit of one synthesize request, in bytes.
const MAX_INPUT_BYTES: usize = 5000;
const SPEAK_OPEN: &str = "<speak>";
const SPEAK_CLOSE: &str = "</speak>";
const API_KEY_ENV: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WavenetParams {
    /// Falls back to the `GOOGLE_API_KEY` environment variable.
    pub api_key: Option<String>,
    pub endpoint: String,
    pub language_code: String,
    pub voice_name: String,
    pub ssml_gender: Option<String>,
    pub speaking_rate: f32,
    pub pitch: f32,
    pub sample_rate_hertz: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for WavenetParams {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://texttospeech.googleapis.com/v1/text:synthesize".to_string(),
            language_code: "en-US".to_string(),
            voice_name: "en-US-Wavenet-D".to_string(),
            ssml_gender: None,
            speaking_rate: 1.0,
            pitch: 0.0,
            sample_rate_hertz: None,
            timeout_secs: 120,
        }
    }
}

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    ssml: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ssml_gender: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f32,
    pitch: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate_hertz: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Google Cloud Text-to-Speech over REST. Sentences are packed into `<speak>`
/// documents under the per-request input limit.
pub struct WavenetBackend {
    params: WavenetParams,
    api_key: String,
    client: Client,
}

impl WavenetBackend {
    pub fn new(params: WavenetParams) -> Result<Self> {
        let api_key = params
            .api_key
            .clone()
            .or_else(|| env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("gc_wavenet needs speech.params.api_key or the {API_KEY_ENV} environment variable")
            })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(params.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        info!(
            voice = %params.voice_name,
            language = %params.language_code,
            "Using Google Cloud WaveNet speech"
        );
        Ok(Self {
            params,
            api_key,
            client,
        })
    }

    fn request(&self, ssml: &str) -> Result<Vec<u8>> {
        let body = SynthesizeRequest {
            input: SynthesisInput { ssml },
            voice: VoiceSelection {
                language_code: &self.params.language_code,
                name: &self.params.voice_name,
                ssml_gender: self.params.ssml_gender.as_deref(),
            },
            audio_config: AudioConfig {
                audio_encoding: "LINEAR16",
                speaking_rate: self.params.speaking_rate,
                pitch: self.params.pitch,
                sample_rate_hertz: self.params.sample_rate_hertz,
            },
        };

        let response: SynthesizeResponse = self
            .client
            .post(&self.params.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .context("Speech synthesis request failed")?
            .error_for_status()
            .context("Speech synthesis service returned an error")?
            .json()
            .context("Unexpected speech synthesis response")?;

        STANDARD
            .decode(response.audio_content.as_bytes())
            .context("Speech synthesis returned invalid base64 audio")
    }
}

impl SpeechBackend for WavenetBackend {
    fn supports_markup(&self) -> bool {
        true
    }

    fn synthesize(&self, sentences: &[String], output: &Path) -> Result<()> {
        let documents = pack_ssml(sentences)?;
        let mut audio = WavAssembler::new(Duration::ZERO);
        for (i, document) in documents.iter().enumerate() {
            debug!(
                request = i + 1,
                of = documents.len(),
                bytes = document.len(),
                "Synthesizing SSML"
            );
            audio.push_wav(&self.request(document)?)?;
        }
        audio.finish(output)
    }
}

/// Pack SSML fragments into as few `<speak>` documents as fit the input limit.
fn pack_ssml(sentences: &[String]) -> Result<Vec<String>> {
    let budget = MAX_INPUT_BYTES - SPEAK_OPEN.len() - SPEAK_CLOSE.len();
    let mut documents = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        for piece in fit_to_budget(sentence, budget)? {
            let needed = if current.is_empty() {
                piece.len()
            } else {
                current.len() + 1 + piece.len()
            };
            if needed > budget {
                documents.push(wrap_speak(&current));
                current.clear();
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(piece);
        }
    }
    if !current.is_empty() {
        documents.push(wrap_speak(&current));
    }

    Ok(documents)
}

/// Split an over-long sentence at spaces so every piece fits `budget`.
fn fit_to_budget(sentence: &str, budget: usize) -> Result<Vec<&str>> {
    if sentence.len() <= budget {
        return Ok(vec![sentence]);
    }

    let mut pieces = Vec::new();
    let mut rest = sentence.trim();
    while rest.len() > budget {
        let mut cut = budget;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let Some(split) = rest[..cut].rfind(' ') else {
            bail!(
                "Sentence has a {}-byte run without spaces; the synthesis limit is {} bytes",
                rest.len(),
                budget
            );
        };
        pieces.push(rest[..split].trim_end());
        rest = rest[split..].trim_start();
    }
    if !rest.is_empty() {
        pieces.push(rest);
    }
    Ok(pieces)
}

fn wrap_speak(body: &str) -> String {
    format!("{SPEAK_OPEN}{body}{SPEAK_CLOSE}")
}
