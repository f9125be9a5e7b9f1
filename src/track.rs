//! Immutable time-indexed pitch series and the extraction collaborator seam.

use std::path::Path;

use crate::error::{PitchlineError, PitchlineResult};

/// One analysis frame of the pitch track. `freq` is `None` for unvoiced or
/// undetected frames.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PitchSample {
    pub time: f64,
    pub freq: Option<f64>,
}

/// Time-ordered pitch samples plus the total duration of the source audio.
/// Built once per conversion run, read-only afterward.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PitchTrack {
    samples: Vec<PitchSample>,
    duration: f64,
}

impl PitchTrack {
    /// Non-positive and non-finite frequencies are normalized to unvoiced.
    pub fn new(mut samples: Vec<PitchSample>, duration: f64) -> PitchlineResult<Self> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(PitchlineError::validation(
                "pitch track duration must be finite and non-negative",
            ));
        }
        let sorted = samples.windows(2).all(|w| w[0].time <= w[1].time);
        if !sorted {
            return Err(PitchlineError::validation(
                "pitch samples must be ordered by time",
            ));
        }
        for sample in &mut samples {
            if let Some(freq) = sample.freq
                && (!freq.is_finite() || freq <= 0.0)
            {
                sample.freq = None;
            }
        }
        Ok(Self { samples, duration })
    }

    pub fn samples(&self) -> &[PitchSample] {
        &self.samples
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Samples with `time` in `[center - half_width, center + half_width]`,
    /// both ends inclusive. An empty slice near the track boundaries is a
    /// valid result, not a failure.
    pub fn windowed(&self, center: f64, half_width: f64) -> &[PitchSample] {
        let lo = self
            .samples
            .partition_point(|s| s.time < center - half_width);
        let hi = self
            .samples
            .partition_point(|s| s.time <= center + half_width);
        &self.samples[lo..hi]
    }

    /// Arithmetic mean of the voiced frequencies in the window, or `None`
    /// when every sample there is unvoiced (or the window is empty).
    pub fn local_average(&self, center: f64, half_width: f64) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0u64;
        for sample in self.windowed(center, half_width) {
            if let Some(freq) = sample.freq {
                sum += freq;
                count += 1;
            }
        }
        (count > 0).then(|| sum / count as f64)
    }

    pub fn frame_count(&self, fps: u32) -> u64 {
        (self.duration * f64::from(fps)).floor().max(0.0) as u64
    }
}

/// External pitch-extraction collaborator: produces the track for an audio
/// source given the analysis floor and ceiling frequencies.
pub trait PitchExtractor {
    fn extract(&self, audio: &Path, floor_hz: f64, ceiling_hz: f64) -> PitchlineResult<PitchTrack>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(samples: &[(f64, Option<f64>)], duration: f64) -> PitchTrack {
        let samples = samples
            .iter()
            .map(|&(time, freq)| PitchSample { time, freq })
            .collect();
        PitchTrack::new(samples, duration).unwrap()
    }

    #[test]
    fn construction_normalizes_unvoiced_values() {
        let t = track(&[(0.0, Some(0.0)), (0.1, Some(f64::NAN)), (0.2, Some(220.0))], 0.3);
        assert_eq!(t.samples()[0].freq, None);
        assert_eq!(t.samples()[1].freq, None);
        assert_eq!(t.samples()[2].freq, Some(220.0));
    }

    #[test]
    fn construction_rejects_unordered_samples() {
        let samples = vec![
            PitchSample { time: 1.0, freq: None },
            PitchSample { time: 0.5, freq: None },
        ];
        assert!(PitchTrack::new(samples, 2.0).is_err());
    }

    #[test]
    fn windowed_is_inclusive_on_both_ends() {
        let t = track(
            &[(0.0, None), (1.0, Some(100.0)), (2.0, Some(200.0)), (3.0, None)],
            3.0,
        );
        let w = t.windowed(2.0, 1.0);
        assert_eq!(w.len(), 3);
        assert_eq!(w[0].time, 1.0);
        assert_eq!(w[2].time, 3.0);
    }

    #[test]
    fn windowed_past_the_boundaries_is_empty_not_an_error() {
        let t = track(&[(0.0, Some(100.0)), (1.0, Some(100.0))], 1.0);
        assert!(t.windowed(-5.0, 0.4).is_empty());
        assert!(t.windowed(10.0, 0.4).is_empty());
    }

    #[test]
    fn local_average_ignores_unvoiced_samples() {
        let t = track(&[(0.0, Some(100.0)), (0.1, None), (0.2, Some(300.0))], 0.3);
        assert_eq!(t.local_average(0.1, 0.2), Some(200.0));
    }

    #[test]
    fn local_average_of_an_all_unvoiced_window_is_undefined() {
        let t = track(&[(0.0, None), (0.1, None)], 0.2);
        assert_eq!(t.local_average(0.05, 0.1), None);
        assert_eq!(t.local_average(99.0, 0.1), None);
    }

    #[test]
    fn frame_count_floors() {
        let t = track(&[], 5.0);
        assert_eq!(t.frame_count(15), 75);
        let t = track(&[], 1.999);
        assert_eq!(t.frame_count(10), 19);
    }
}
