//! Streaming overlay-video encoder.
//!
//! Raw RGB24 frames are written in frame-index order to ffmpeg's stdin and
//! come out as an H.264 file at the run's fps. The encoder contract is
//! strictly ordered, gapless delivery; any failure aborts the run.

use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context as _;

use crate::error::{PitchlineError, PitchlineResult};
use crate::exec;

#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
    pub ffmpeg: PathBuf,
    /// Bound on the wait for ffmpeg to finalize the file after the last
    /// frame is written.
    pub finish_timeout: Duration,
}

impl EncodeConfig {
    pub fn validate(&self) -> PitchlineResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PitchlineError::validation(
                "encode width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // yuv420p output needs even dimensions.
            return Err(PitchlineError::validation(
                "encode width/height must be even (required for yuv420p output)",
            ));
        }
        if self.fps == 0 {
            return Err(PitchlineError::validation("encode fps must be non-zero"));
        }
        Ok(())
    }
}

/// One raster frame, tightly packed RGB24.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgb {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

pub fn ensure_parent_dir(path: &Path) -> PitchlineResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

pub struct OverlayEncoder {
    cfg: EncodeConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<Vec<u8>>>,
}

impl OverlayEncoder {
    pub fn new(cfg: EncodeConfig) -> PitchlineResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;

        let mut cmd = Command::new(&cfg.ffmpeg);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
        ])
        .arg(&cfg.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            PitchlineError::process("ffmpeg", format!("failed to spawn encoder: {e}"))
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            PitchlineError::process("ffmpeg", "failed to open encoder stdin (unexpected)")
        })?;
        let stderr = child.stderr.take().map(exec::drain_on_thread);

        Ok(Self {
            cfg,
            child,
            stdin: Some(stdin),
            stderr,
        })
    }

    pub fn write_frame(&mut self, frame: &FrameRgb) -> PitchlineResult<()> {
        if frame.width != self.cfg.width || frame.height != self.cfg.height {
            return Err(PitchlineError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, self.cfg.width, self.cfg.height
            )));
        }
        let expected = (self.cfg.width * self.cfg.height * 3) as usize;
        if frame.data.len() != expected {
            return Err(PitchlineError::validation(
                "frame.data size mismatch with width*height*3",
            ));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(PitchlineError::process(
                "ffmpeg",
                "encoder is already finalized",
            ));
        };

        use std::io::Write as _;
        stdin.write_all(&frame.data).map_err(|e| {
            PitchlineError::process("ffmpeg", format!("failed to write frame to encoder: {e}"))
        })?;

        Ok(())
    }

    /// Close the stream and wait (bounded) for ffmpeg to finalize the file.
    pub fn finish(mut self) -> PitchlineResult<()> {
        drop(self.stdin.take());

        let status = exec::wait_with_timeout(&mut self.child, "ffmpeg", self.cfg.finish_timeout)?;
        let stderr = self.stderr.take().map(exec::join_drained).unwrap_or_default();

        if !status.success() {
            return Err(PitchlineError::process(
                "ffmpeg",
                format!(
                    "encoder exited with {status}: {}",
                    String::from_utf8_lossy(&stderr).trim()
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(width: u32, height: u32, fps: u32) -> EncodeConfig {
        EncodeConfig {
            width,
            height,
            fps,
            out_path: PathBuf::from("out/overlay.mp4"),
            ffmpeg: PathBuf::from("ffmpeg"),
            finish_timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn config_validation_catches_bad_values() {
        assert!(cfg(0, 10, 30).validate().is_err());
        assert!(cfg(11, 10, 30).validate().is_err());
        assert!(cfg(10, 11, 30).validate().is_err());
        assert!(cfg(10, 10, 0).validate().is_err());
        assert!(cfg(960, 540, 15).validate().is_ok());
    }
}
