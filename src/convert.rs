//! Conversion run: configuration, validation and orchestration of the
//! extract → render → composite pipeline.

use std::path::PathBuf;
use std::time::Duration;

use crate::anchor::Anchor;
use crate::animate::{self, Progress};
use crate::compose::{ComposeConfig, composite};
use crate::encode::EncodeConfig;
use crate::error::{PitchlineError, PitchlineResult};
use crate::exec;
use crate::extract::YinExtractor;
use crate::plot::{CANVAS_HEIGHT, CANVAS_WIDTH, PlotRenderer};
use crate::probe::probe_resolution;
use crate::theme::Theme;
use crate::tone::{self, Note, PitchBound, Tone};
use crate::track::PitchExtractor as _;

pub const DEFAULT_FPS: u32 = 15;
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(3600);

/// Immutable configuration for one conversion run.
#[derive(Clone, Debug)]
pub struct ConvertConfig {
    pub audio: PathBuf,
    pub video: PathBuf,
    /// Defaults to the video path with a `_with_pitch.mp4` suffix.
    pub output: Option<PathBuf>,
    /// Root of the key whose major scale provides the reference lines.
    pub key: Tone,
    pub fps: u32,
    pub min_pitch: PitchBound,
    pub max_pitch: PitchBound,
    /// Fixed overlay width in pixels; when set, the resolution probe is
    /// skipped and the overlay height follows at 16:9.
    pub overlay_width: Option<u32>,
    pub anchor: Anchor,
    pub theme: Theme,
    pub accel: bool,
    /// Explicit encoder binary; otherwise `ffmpeg` is discovered on PATH.
    pub ffmpeg: Option<PathBuf>,
    pub process_timeout: Duration,
}

impl ConvertConfig {
    pub fn new(audio: impl Into<PathBuf>, video: impl Into<PathBuf>, key: Tone) -> Self {
        Self {
            audio: audio.into(),
            video: video.into(),
            output: None,
            key,
            fps: DEFAULT_FPS,
            min_pitch: PitchBound::Note(Note { tone: Tone::D, octave: 2 }),
            max_pitch: PitchBound::Note(Note { tone: Tone::G, octave: 5 }),
            overlay_width: None,
            anchor: Anchor::default(),
            theme: Theme::default(),
            accel: false,
            ffmpeg: None,
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
        }
    }

    /// Eager validation, run before any expensive work starts.
    pub fn validate(&self) -> PitchlineResult<()> {
        if self.fps == 0 {
            return Err(PitchlineError::validation("fps must be at least 1"));
        }

        let min = self.min_pitch.resolve();
        let max = self.max_pitch.resolve();
        if !min.is_finite() || !max.is_finite() {
            return Err(PitchlineError::bounds("bounds must be finite"));
        }
        if max <= min {
            return Err(PitchlineError::bounds(format!(
                "max ({max:.2} Hz) must be above min ({min:.2} Hz)"
            )));
        }
        let lowest = Note { tone: Tone::C, octave: 0 }.frequency();
        let highest = Note { tone: Tone::B, octave: 7 }.frequency();
        if min < lowest || max > highest {
            return Err(PitchlineError::bounds(format!(
                "bounds must lie within the representable {lowest:.2}..{highest:.2} Hz range"
            )));
        }

        if self.overlay_width == Some(0) {
            return Err(PitchlineError::validation("overlay width must be non-zero"));
        }
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => {
                let stem = self
                    .video
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "output".to_string());
                self.video.with_file_name(format!("{stem}_with_pitch.mp4"))
            }
        }
    }
}

/// Removes the intermediate overlay file on every exit path.
struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

pub struct Converter {
    cfg: ConvertConfig,
}

impl Converter {
    pub fn new(cfg: ConvertConfig) -> PitchlineResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Run the whole pipeline and return the composited output path.
    #[tracing::instrument(skip(self, progress))]
    pub fn run(&self, progress: &mut dyn Progress) -> PitchlineResult<PathBuf> {
        let cfg = &self.cfg;
        let ffmpeg = exec::locate_ffmpeg(cfg.ffmpeg.as_deref())?;

        let scale_width = match cfg.overlay_width {
            Some(width) => width,
            None => probe_resolution(&cfg.video, cfg.process_timeout)?.0 / 2,
        };

        let min_freq = cfg.min_pitch.resolve();
        let max_freq = cfg.max_pitch.resolve();

        let extractor = YinExtractor::new(ffmpeg.clone(), cfg.process_timeout);
        let track = extractor.extract(&cfg.audio, min_freq, max_freq)?;
        let references = tone::reference_points(cfg.key, min_freq, max_freq);

        let overlay_path = std::env::temp_dir().join(format!(
            "pitchline_overlay_{}_{}.mp4",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        let _overlay_tmp = TempFileGuard(Some(overlay_path.clone()));

        let mut renderer = PlotRenderer::new(cfg.theme);
        let encode_cfg = EncodeConfig {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            fps: cfg.fps,
            out_path: overlay_path.clone(),
            ffmpeg: ffmpeg.clone(),
            finish_timeout: cfg.process_timeout,
        };
        animate::render_overlay_video(
            &track,
            &references,
            cfg.fps,
            &mut renderer,
            encode_cfg,
            progress,
        )?;

        let output = cfg.output_path();
        composite(&ComposeConfig {
            ffmpeg,
            video: cfg.video.clone(),
            overlay: overlay_path,
            output: output.clone(),
            scale_width,
            anchor: cfg.anchor,
            accel: cfg.accel,
            timeout: cfg.process_timeout,
        })?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ConvertConfig {
        ConvertConfig::new("song.wav", "take.mp4", Tone::G)
    }

    #[test]
    fn defaults_validate() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn default_bounds_are_d2_to_g5() {
        let cfg = base_config();
        assert!((cfg.min_pitch.resolve() - 73.42).abs() < 0.01);
        assert!((cfg.max_pitch.resolve() - 783.99).abs() < 0.01);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let mut cfg = base_config();
        cfg.min_pitch = PitchBound::Hz(500.0);
        cfg.max_pitch = PitchBound::Hz(100.0);
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, PitchlineError::InvalidFrequencyBounds(_)));
    }

    #[test]
    fn out_of_range_bounds_are_rejected() {
        let mut cfg = base_config();
        cfg.min_pitch = PitchBound::Hz(1.0);
        assert!(cfg.validate().is_err());

        let mut cfg = base_config();
        cfg.max_pitch = PitchBound::Hz(20_000.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_fps_is_rejected() {
        let mut cfg = base_config();
        cfg.fps = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_output_derives_from_the_video_path() {
        let cfg = base_config();
        assert_eq!(cfg.output_path(), PathBuf::from("take_with_pitch.mp4"));

        let mut cfg = base_config();
        cfg.video = PathBuf::from("/clips/show.mkv");
        assert_eq!(
            cfg.output_path(),
            PathBuf::from("/clips/show_with_pitch.mp4")
        );

        let mut cfg = base_config();
        cfg.output = Some(PathBuf::from("final.mp4"));
        assert_eq!(cfg.output_path(), PathBuf::from("final.mp4"));
    }
}
