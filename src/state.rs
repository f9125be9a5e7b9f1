//! Per-frame visual state of the scrolling pitch graph.
//!
//! The computation is a pure function of the frame index, the immutable
//! pitch track and reference points, and the previous frame's y-limits (the
//! single carried value). Everything else is recomputed from scratch each
//! frame.

use crate::tone::ReferencePoint;
use crate::track::PitchTrack;

/// Half of the visible scroll window, in seconds. The window is a fixed
/// 5 seconds regardless of fps.
pub const SCROLL_HALF_WINDOW: f64 = 2.5;

/// Half-width of the rolling-average window used for vertical autoscale.
pub const AVERAGE_HALF_WINDOW: f64 = 0.4;

/// Tick tie-break thresholds on the fractional part of the current time.
/// The lowest candidate tick is dropped while the fraction is in
/// `[TICK_LOW_BOUND, 1/2]`; the highest is withheld while it is in
/// `[1/2, TICK_HIGH_BOUND]`. This keeps labels from popping in or out
/// mid-glyph as the window crosses an integer second.
pub const TICK_LOW_BOUND: f64 = 24.0 / 60.0;
pub const TICK_HIGH_BOUND: f64 = 34.0 / 60.0;

/// Vertical limits relative to the local average: one octave below the
/// geometric midpoint, a bit over one octave above.
pub const Y_LOW_RATIO: f64 = 0.70710678;
pub const Y_HIGH_RATIO: f64 = 1.81712059;

/// Autoscale limits used until the first frame with a defined local average.
pub const DEFAULT_Y_LIMITS: (f64, f64) = (256.0 * 0.7, 256.0 * 1.7);

/// Horizontal offset of the reference labels from the window's left edge.
pub const LABEL_INSET: f64 = 0.02;

/// One x-axis tick: an integer second and its rendered `M:SS` label.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tick {
    pub time: f64,
    pub label: String,
}

/// A reference point visible at the current y-limits.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VisibleReference {
    pub label: String,
    pub freq: f64,
}

/// Fully-specified visual state of one overlay frame.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameState {
    pub frame: u64,
    pub time: f64,
    pub x_limits: (f64, f64),
    pub y_limits: (f64, f64),
    pub ticks: Vec<Tick>,
    pub references: Vec<VisibleReference>,
    /// Voiced samples inside the scroll window; unvoiced gaps are preserved
    /// by omission, never interpolated.
    pub points: Vec<(f64, f64)>,
    /// Horizontal anchor of the reference labels.
    pub label_x: f64,
    /// The current-time marker line.
    pub marker_x: f64,
}

impl FrameState {
    /// Compute the state for `frame`, deriving this frame's y-limits from
    /// the local average (falling back to `prev_y_limits`, or the fixed
    /// default on the first frame).
    #[tracing::instrument(skip(track, references))]
    pub fn compute(
        frame: u64,
        fps: u32,
        track: &PitchTrack,
        references: &[ReferencePoint],
        prev_y_limits: Option<(f64, f64)>,
    ) -> FrameState {
        let time = frame as f64 / f64::from(fps);
        let avg = track.local_average(time, AVERAGE_HALF_WINDOW);
        let y_limits = resolve_y_limits(avg, prev_y_limits);
        Self::with_y_limits(frame, fps, track, references, y_limits)
    }

    /// Layout for `frame` with the y-limits already resolved. Used by the
    /// driver after its pre-pass has folded the carry chain.
    pub fn with_y_limits(
        frame: u64,
        fps: u32,
        track: &PitchTrack,
        references: &[ReferencePoint],
        y_limits: (f64, f64),
    ) -> FrameState {
        let time = frame as f64 / f64::from(fps);
        let x_limits = (time - SCROLL_HALF_WINDOW, time + SCROLL_HALF_WINDOW);

        let ticks = tick_seconds(time, x_limits.0, x_limits.1)
            .into_iter()
            .map(|s| Tick {
                time: s as f64,
                label: format_tick(s),
            })
            .collect();

        let points = track
            .windowed(time, SCROLL_HALF_WINDOW)
            .iter()
            .filter_map(|s| s.freq.map(|f| (s.time, f)))
            .collect();

        let references = references
            .iter()
            .filter(|r| y_limits.0 <= r.freq && r.freq <= y_limits.1)
            .map(|r| VisibleReference {
                label: r.label.clone(),
                freq: r.freq,
            })
            .collect();

        FrameState {
            frame,
            time,
            x_limits,
            y_limits,
            ticks,
            references,
            points,
            label_x: x_limits.0 + LABEL_INSET,
            marker_x: time,
        }
    }
}

/// This frame's y-limits: scaled around the local average when it is
/// defined, otherwise the previous frame's limits carried forward unchanged
/// (the fixed default when there is no previous frame).
pub fn resolve_y_limits(avg: Option<f64>, prev: Option<(f64, f64)>) -> (f64, f64) {
    match avg {
        Some(avg) => (avg * Y_LOW_RATIO, avg * Y_HIGH_RATIO),
        None => prev.unwrap_or(DEFAULT_Y_LIMITS),
    }
}

/// Integer tick seconds for the window `[start, end]` at current time `t`.
fn tick_seconds(t: f64, start: f64, end: f64) -> Vec<i64> {
    let decimal = t.rem_euclid(1.0);
    let mut first = start.ceil() as i64;
    if (TICK_LOW_BOUND..=0.5).contains(&decimal) {
        first += 1;
    }
    let mut last = end.floor() as i64;
    if (0.5..=TICK_HIGH_BOUND).contains(&decimal) {
        last -= 1;
    }
    (first..=last).collect()
}

/// `M:SS` with zero-padded seconds; negative times render as `-:--`.
pub fn format_tick(seconds: i64) -> String {
    if seconds < 0 {
        return "-:--".to_string();
    }
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
