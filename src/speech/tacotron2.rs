use super::SpeechBackend;
use crate::wav::WavAssembler;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tacotron2Params {
    pub server_url: String,
    pub sentence_pause_ms: u64,
    pub timeout_secs: u64,
}

impl Default for Tacotron2Params {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5002".to_string(),
            sentence_pause_ms: 250,
            timeout_secs: 300,
        }
    }
}

/// One `GET /api/tts?text=` request per sentence against a Tacotron2 server.
pub struct Tacotron2Backend {
    endpoint: Url,
    pause: Duration,
    client: Client,
}

impl Tacotron2Backend {
    pub fn new(params: Tacotron2Params) -> Result<Self> {
        let endpoint = tts_endpoint(&params.server_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(params.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        info!(%endpoint, "Using Tacotron2 speech server");
        Ok(Self {
            endpoint,
            pause: Duration::from_millis(params.sentence_pause_ms),
            client,
        })
    }

    fn request(&self, sentence: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(self.endpoint.clone())
            .query(&[("text", sentence)])
            .send()
            .context("Speech synthesis request failed")?
            .error_for_status()
            .context("Speech synthesis server returned an error")?
            .bytes()
            .context("Failed to read synthesized audio")?;
        Ok(bytes.to_vec())
    }
}

fn tts_endpoint(server_url: &str) -> Result<Url> {
    let base = Url::parse(server_url)
        .with_context(|| format!("Invalid tacotron2 server_url `{server_url}`"))?;
    base.join("/api/tts")
        .with_context(|| format!("Invalid tacotron2 server_url `{server_url}`"))
}

impl SpeechBackend for Tacotron2Backend {
    fn supports_markup(&self) -> bool {
        false
    }

    fn synthesize(&self, sentences: &[String], output: &Path) -> Result<()> {
        let mut audio = WavAssembler::new(self.pause);
        for (i, sentence) in sentences.iter().enumerate() {
            debug!(sentence = i + 1, of = sentences.len(), "Synthesizing sentence");
            let clip = self
                .request(sentence)
                .with_context(|| format!("Failed to synthesize sentence {}", i + 1))?;
            audio.push_wav(&clip)?;
        }
        audio.finish(output)
    }
}
