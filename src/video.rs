use anyhow::{bail, Context, Result};
use hound::WavReader;
use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VideoConfig {
    pub cover_image: PathBuf,
    #[serde(default)]
    pub intro_clip: Option<PathBuf>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_subdir")]
    pub subdir: String,
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,
}

fn default_width() -> u32 {
    1920
}

fn default_height() -> u32 {
    1080
}

fn default_subdir() -> String {
    "video".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

/// Renders one video per chapter with `ffmpeg`: the cover image over the
/// narration, optionally after an intro clip.
pub struct VideoMaker<'a> {
    config: &'a VideoConfig,
    out_dir: PathBuf,
}

impl<'a> VideoMaker<'a> {
    pub fn new(config: &'a VideoConfig, output_root: &Path) -> Self {
        Self {
            config,
            out_dir: output_root.join(&config.subdir),
        }
    }

    pub fn video_path(&self, index: usize) -> PathBuf {
        self.out_dir.join(format!("Chapter {}.mp4", index + 1))
    }

    /// Scale to fit inside the frame, then pad to exactly the frame size.
    fn fit_filter(&self) -> String {
        let (w, h) = (self.config.width, self.config.height);
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,format=yuv420p"
        )
    }

    /// `ffmpeg` arguments for one chapter whose narration lasts `audio_secs`.
    pub fn ffmpeg_args(
        &self,
        audio: &Path,
        output: &Path,
        audio_secs: f64,
        first_chapter: bool,
    ) -> Vec<OsString> {
        let fit = self.fit_filter();
        let mut args: Vec<OsString> = vec!["-y".into(), "-hide_banner".into()];

        let (filter, maps): (String, Vec<&str>) = match &self.config.intro_clip {
            None => {
                args.extend(["-loop", "1", "-i"].map(OsString::from));
                args.push(self.config.cover_image.clone().into());
                args.push("-i".into());
                args.push(audio.into());
                (format!("[0:v]{fit}[v]"), vec!["[v]", "1:a"])
            }
            Some(intro) => {
                args.push("-i".into());
                args.push(intro.into());
                args.extend(["-loop", "1", "-t"].map(OsString::from));
                args.push(format!("{audio_secs:.3}").into());
                args.push("-i".into());
                args.push(self.config.cover_image.clone().into());
                args.push("-i".into());
                args.push(audio.into());
                if first_chapter {
                    (
                        format!("[0:v]{fit}[iv];[1:v]{fit}[cv];[iv][0:a][cv][2:a]concat=n=2:v=1:a=1[v][a]"),
                        vec!["[v]", "[a]"],
                    )
                } else {
                    (
                        format!("[0:v]{fit}[iv];[1:v]{fit}[cv];[iv][cv]concat=n=2:v=1:a=0[v]"),
                        vec!["[v]", "2:a"],
                    )
                }
            }
        };

        args.push("-filter_complex".into());
        args.push(filter.into());
        for map in maps {
            args.push("-map".into());
            args.push(map.into());
        }
        args.extend(
            [
                "-c:v", "libx264", "-tune", "stillimage", "-c:a", "aac", "-pix_fmt", "yuv420p",
            ]
            .map(OsString::from),
        );
        if !(first_chapter && self.config.intro_clip.is_some()) {
            args.push("-shortest".into());
        }
        args.push(output.into());
        args
    }

    fn run_ffmpeg(&self, args: &[OsString], output: &Path) -> Result<()> {
        let result = Command::new(&self.config.ffmpeg)
            .args(args)
            .output()
            .with_context(|| format!("Failed to start {}", self.config.ffmpeg))?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            bail!(
                "{} failed for {}: {}",
                self.config.ffmpeg,
                output.display(),
                stderr.trim()
            );
        }
        Ok(())
    }

    /// Render one video per chapter audio file, in chapter order.
    pub fn make_all(&self, audio_files: &[PathBuf]) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("Failed to create {}", self.out_dir.display()))?;

        let mut videos = Vec::with_capacity(audio_files.len());
        for (i, audio) in audio_files.iter().enumerate() {
            let output = self.video_path(i);
            let secs = wav_duration_secs(audio)?;
            let args = self.ffmpeg_args(audio, &output, secs, i == 0);
            info!(chapter = i + 1, seconds = secs, "Rendering chapter video");
            self.run_ffmpeg(&args, &output)?;
            info!(chapter = i + 1, path = %output.display(), "Wrote chapter video");
            videos.push(output);
        }
        Ok(videos)
    }
}

pub fn wav_duration_secs(path: &Path) -> Result<f64> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open audio: {}", path.display()))?;
    let rate = reader.spec().sample_rate;
    Ok(reader.duration() as f64 / rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::{encode_wav, mono_16k};

    fn config(intro: Option<&str>) -> VideoConfig {
        VideoConfig {
            cover_image: PathBuf::from("cover.jpg"),
            intro_clip: intro.map(PathBuf::from),
            width: 1280,
            height: 720,
            subdir: default_subdir(),
            ffmpeg: default_ffmpeg(),
        }
    }

    fn joined(args: &[OsString]) -> String {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn names_videos_by_chapter() {
        let config = config(None);
        let maker = VideoMaker::new(&config, Path::new("out/book"));
        assert_eq!(maker.video_path(0), PathBuf::from("out/book/video/Chapter 1.mp4"));
    }

    #[test]
    fn cover_only_video_follows_audio_length() {
        let config = config(None);
        let maker = VideoMaker::new(&config, Path::new("out"));
        let args = joined(&maker.ffmpeg_args(Path::new("ch1.wav"), Path::new("ch1.mp4"), 12.5, true));
        assert!(args.starts_with("-y -hide_banner -loop 1 -i cover.jpg -i ch1.wav"));
        assert!(args.contains("scale=1280:720:force_original_aspect_ratio=decrease,pad=1280:720"));
        assert!(args.contains("-map [v] -map 1:a"));
        assert!(args.ends_with("-shortest ch1.mp4"));
    }

    #[test]
    fn first_chapter_plays_intro_then_cover() {
        let config = config(Some("intro.mp4"));
        let maker = VideoMaker::new(&config, Path::new("out"));
        let args = joined(&maker.ffmpeg_args(Path::new("ch1.wav"), Path::new("ch1.mp4"), 61.25, true));
        assert!(args.contains("-i intro.mp4 -loop 1 -t 61.250 -i cover.jpg -i ch1.wav"));
        assert!(args.contains("[iv][0:a][cv][2:a]concat=n=2:v=1:a=1[v][a]"));
        assert!(args.contains("-map [v] -map [a]"));
        assert!(!args.contains("-shortest"));
    }

    #[test]
    fn later_chapters_lay_audio_over_intro_and_cover() {
        let config = config(Some("intro.mp4"));
        let maker = VideoMaker::new(&config, Path::new("out"));
        let args = joined(&maker.ffmpeg_args(Path::new("ch2.wav"), Path::new("ch2.mp4"), 30.0, false));
        assert!(args.contains("[iv][cv]concat=n=2:v=1:a=0[v]"));
        assert!(args.contains("-map [v] -map 2:a"));
        assert!(args.ends_with("-shortest ch2.mp4"));
    }

    #[test]
    fn measures_wav_duration() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ch.wav");
        fs::write(&path, encode_wav(mono_16k(), &vec![0; 8_000])).unwrap();
        assert!((wav_duration_secs(&path).unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn missing_ffmpeg_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let audio = tmp.path().join("ch.wav");
        fs::write(&audio, encode_wav(mono_16k(), &[0; 160])).unwrap();

        let mut config = config(None);
        config.ffmpeg = "definitely-not-an-ffmpeg-binary".to_string();
        let maker = VideoMaker::new(&config, tmp.path());
        assert!(maker.make_all(&[audio]).is_err());
    }
}
