use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Accumulates 16-bit PCM clips that share one format.
pub struct WavAssembler {
    spec: Option<WavSpec>,
    samples: Vec<i16>,
    clips: usize,
    pause: Duration,
}

impl WavAssembler {
    /// `pause` of silence is inserted between consecutive clips.
    pub fn new(pause: Duration) -> Self {
        Self {
            spec: None,
            samples: Vec::new(),
            clips: 0,
            pause,
        }
    }

    /// Append one complete WAV file (header included).
    pub fn push_wav(&mut self, bytes: &[u8]) -> Result<()> {
        let mut reader = WavReader::new(Cursor::new(bytes)).context("Invalid WAV clip")?;
        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            bail!(
                "Unsupported WAV clip: {} bits {:?}, expected 16-bit PCM",
                spec.bits_per_sample,
                spec.sample_format
            );
        }
        match self.spec {
            Some(existing) if existing != spec => bail!(
                "WAV clip format {}Hz/{}ch does not match earlier clips at {}Hz/{}ch",
                spec.sample_rate,
                spec.channels,
                existing.sample_rate,
                existing.channels
            ),
            Some(_) => self.push_silence(spec),
            None => self.spec = Some(spec),
        }

        let clip = reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to decode WAV samples")?;
        debug!(samples = clip.len(), "Appended WAV clip");
        self.samples.extend(clip);
        self.clips += 1;
        Ok(())
    }

    fn push_silence(&mut self, spec: WavSpec) {
        let frames = (spec.sample_rate as u128 * self.pause.as_millis() / 1000) as usize;
        let count = frames * spec.channels as usize;
        self.samples.extend(std::iter::repeat(0i16).take(count));
    }

    /// Write every clip so far to `output`.
    pub fn finish(self, output: &Path) -> Result<()> {
        let Some(spec) = self.spec else {
            bail!("No audio was synthesized for {}", output.display());
        };
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        debug!(clips = self.clips, path = %output.display(), "Writing assembled WAV");
        let mut writer = WavWriter::create(output, spec)
            .with_context(|| format!("Failed to create {}", output.display()))?;
        for sample in &self.samples {
            writer.write_sample(*sample)?;
        }
        writer
            .finalize()
            .with_context(|| format!("Failed to finish {}", output.display()))?;
        Ok(())
    }
}

/// Encode samples as an in-memory WAV file.
#[cfg(test)]
pub(crate) fn encode_wav(spec: WavSpec, samples: &[i16]) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for s in samples {
            writer.write_sample(*s).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[cfg(test)]
pub(crate) fn mono_16k() -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}
