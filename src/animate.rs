//! Animation driver: turns a pitch track into the intermediate overlay
//! video, one frame state per frame index, in order, into one encoder
//! stream.
//!
//! The only serial dependency between frames is the carried y-limit pair, so
//! the driver runs the per-frame local averages as a parallel pre-pass and
//! then resolves the carry chain in a single cheap sequential fold before
//! rendering.

use rayon::prelude::*;

use crate::encode::{EncodeConfig, OverlayEncoder};
use crate::error::{PitchlineError, PitchlineResult};
use crate::plot::OverlayRenderer;
use crate::state::{AVERAGE_HALF_WINDOW, FrameState, resolve_y_limits};
use crate::tone::ReferencePoint;
use crate::track::PitchTrack;

/// Progress sink injected by the caller. The driver reports one advance per
/// encoded frame and owns no UI concerns.
pub trait Progress {
    fn advance(&mut self, n: u64);

    /// Called once before the first frame with the total frame count.
    fn begin(&mut self, _total: u64) {}
}

pub struct NullProgress;

impl Progress for NullProgress {
    fn advance(&mut self, _n: u64) {}
}

/// Per-frame y-limits for the whole run: parallel pre-pass of the local
/// averages, then a sequential fold resolving the carried fallback.
pub fn resolve_y_limit_chain(track: &PitchTrack, fps: u32, frame_count: u64) -> Vec<(f64, f64)> {
    let averages: Vec<Option<f64>> = (0..frame_count)
        .into_par_iter()
        .map(|frame| track.local_average(frame as f64 / f64::from(fps), AVERAGE_HALF_WINDOW))
        .collect();

    let mut limits = Vec::with_capacity(averages.len());
    let mut prev = None;
    for avg in averages {
        let y = resolve_y_limits(avg, prev);
        limits.push(y);
        prev = Some(y);
    }
    limits
}

/// Render every frame of the track into the encoder configured by
/// `encode_cfg`. Frames are delivered strictly in index order; a renderer or
/// encoder failure aborts the run. Returns the number of frames encoded.
#[tracing::instrument(skip(track, references, renderer, progress))]
pub fn render_overlay_video(
    track: &PitchTrack,
    references: &[ReferencePoint],
    fps: u32,
    renderer: &mut dyn OverlayRenderer,
    encode_cfg: EncodeConfig,
    progress: &mut dyn Progress,
) -> PitchlineResult<u64> {
    let frame_count = track.frame_count(fps);
    if frame_count == 0 {
        return Err(PitchlineError::validation(
            "audio is shorter than one output frame",
        ));
    }

    let limits = resolve_y_limit_chain(track, fps, frame_count);

    progress.begin(frame_count);
    let mut encoder = OverlayEncoder::new(encode_cfg)?;
    for frame in 0..frame_count {
        let state =
            FrameState::with_y_limits(frame, fps, track, references, limits[frame as usize]);
        let raster = renderer.render(&state)?;
        encoder.write_frame(&raster)?;
        progress.advance(1);
    }
    encoder.finish()?;

    Ok(frame_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::PitchSample;

    fn intermittent_track() -> PitchTrack {
        // Voiced burst, a long unvoiced gap, then another burst.
        let samples = (0..1000)
            .map(|i| {
                let time = i as f64 / 100.0;
                let voiced = time < 2.0 || time > 7.5;
                PitchSample {
                    time,
                    freq: voiced.then_some(294.0),
                }
            })
            .collect();
        PitchTrack::new(samples, 10.0).unwrap()
    }

    #[test]
    fn chain_resolution_matches_sequential_evaluation() {
        let track = intermittent_track();
        let fps = 15;
        let frame_count = track.frame_count(fps);
        let limits = resolve_y_limit_chain(&track, fps, frame_count);

        let mut prev = None;
        for frame in 0..frame_count {
            let state = FrameState::compute(frame, fps, &track, &[], prev);
            assert_eq!(state.y_limits, limits[frame as usize], "frame {frame}");
            prev = Some(state.y_limits);
        }
    }

    #[test]
    fn unvoiced_stretches_carry_the_previous_limits() {
        let track = intermittent_track();
        let limits = resolve_y_limit_chain(&track, 15, track.frame_count(15));
        // t = 5.0 (frame 75) is deep in the unvoiced gap.
        assert_eq!(limits[75], limits[74]);
        assert_eq!(limits[75], limits[40]);
    }
}
