//! Final composite: scale the overlay video and merge it onto the source
//! video with a two-input ffmpeg filter graph, copying the source audio
//! unmodified.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use crate::anchor::Anchor;
use crate::encode::ensure_parent_dir;
use crate::error::{PitchlineError, PitchlineResult};
use crate::exec;

/// Distance between a corner-anchored overlay and the source frame's edges.
const CORNER_MARGIN: u32 = 10;

#[derive(Clone, Debug)]
pub struct ComposeConfig {
    pub ffmpeg: PathBuf,
    pub video: PathBuf,
    pub overlay: PathBuf,
    pub output: PathBuf,
    /// Width the overlay is scaled to; height follows the aspect ratio.
    pub scale_width: u32,
    pub anchor: Anchor,
    pub accel: bool,
    pub timeout: Duration,
}

/// The overlay position expression for the configured anchor. Corner names
/// resolve against the source and overlay geometry with a fixed margin;
/// explicit offsets pass through as literal pixels.
pub fn overlay_position(anchor: Anchor) -> String {
    let m = CORNER_MARGIN;
    match anchor {
        Anchor::TopLeft => format!("{m}:{m}"),
        Anchor::TopRight => format!("main_w-overlay_w-{m}:{m}"),
        Anchor::BottomLeft => format!("{m}:main_h-overlay_h-{m}"),
        Anchor::BottomRight => format!("main_w-overlay_w-{m}:main_h-overlay_h-{m}"),
        Anchor::Offset { x, y } => format!("{x}:{y}"),
    }
}

/// The two-input filter graph. Input 0 is the source video, input 1 the
/// overlay. The accelerated variant uploads both inputs to device memory
/// and substitutes the CUDA scale/overlay filters.
pub fn filter_graph(scale_width: u32, anchor: Anchor, accel: bool) -> String {
    let position = overlay_position(anchor);
    if accel {
        format!(
            "[0:v]hwupload [base];\
             [1:v]hwupload, scale_cuda={scale_width}:-1 [pitch];\
             [base][pitch]overlay_cuda={position} [outv]"
        )
    } else {
        format!(
            "[1:v]scale={scale_width}:-1 [pitch]; [0:v][pitch]overlay={position} [outv]"
        )
    }
}

/// Run the composite. A non-zero exit is fatal and carries the encoder's
/// diagnostics; the partially-written output file is removed on failure.
#[tracing::instrument(skip(cfg))]
pub fn composite(cfg: &ComposeConfig) -> PitchlineResult<()> {
    ensure_parent_dir(&cfg.output)?;

    let mut cmd = Command::new(&cfg.ffmpeg);
    cmd.args(["-y", "-loglevel", "error"]);

    for input in [&cfg.video, &cfg.overlay] {
        if cfg.accel {
            cmd.args(["-hwaccel", "cuvid", "-hwaccel_output_format", "cuda"]);
        }
        cmd.arg("-i").arg(input);
    }
    if cfg.accel {
        cmd.args(["-c:v", "h264_nvenc"]);
    }

    cmd.arg("-filter_complex")
        .arg(filter_graph(cfg.scale_width, cfg.anchor, cfg.accel))
        .args(["-map", "[outv]", "-map", "0:a"])
        .arg(&cfg.output);

    match exec::run_captured(cmd, "ffmpeg", cfg.timeout) {
        Ok(_) => Ok(()),
        Err(err) => {
            if cfg.output.exists() {
                let _ = std::fs::remove_file(&cfg.output);
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_positions_carry_the_margin() {
        assert_eq!(overlay_position(Anchor::TopLeft), "10:10");
        assert_eq!(overlay_position(Anchor::TopRight), "main_w-overlay_w-10:10");
        assert_eq!(
            overlay_position(Anchor::BottomLeft),
            "10:main_h-overlay_h-10"
        );
        assert_eq!(
            overlay_position(Anchor::BottomRight),
            "main_w-overlay_w-10:main_h-overlay_h-10"
        );
        assert_eq!(overlay_position(Anchor::Offset { x: 42, y: 7 }), "42:7");
    }

    #[test]
    fn software_graph_scales_then_overlays() {
        let graph = filter_graph(960, Anchor::TopRight, false);
        assert_eq!(
            graph,
            "[1:v]scale=960:-1 [pitch]; [0:v][pitch]overlay=main_w-overlay_w-10:10 [outv]"
        );
    }

    #[test]
    fn accelerated_graph_uploads_and_uses_cuda_filters() {
        let graph = filter_graph(640, Anchor::BottomLeft, true);
        assert!(graph.starts_with("[0:v]hwupload [base];"));
        assert!(graph.contains("scale_cuda=640:-1"));
        assert!(graph.contains("overlay_cuda=10:main_h-overlay_h-10"));
        assert!(graph.ends_with("[outv]"));
    }

    #[test]
    fn composite_failure_removes_partial_output() {
        let dir = std::env::temp_dir().join(format!("pitchline_compose_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let output = dir.join("out.mp4");
        std::fs::write(&output, b"partial").unwrap();

        let cfg = ComposeConfig {
            ffmpeg: PathBuf::from("/nonexistent/ffmpeg"),
            video: PathBuf::from("missing.mp4"),
            overlay: PathBuf::from("missing_overlay.mp4"),
            output: output.clone(),
            scale_width: 960,
            anchor: Anchor::TopRight,
            accel: false,
            timeout: Duration::from_secs(5),
        };
        assert!(composite(&cfg).is_err());
        assert!(!output.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
