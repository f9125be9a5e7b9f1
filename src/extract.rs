//! Shipped pitch-extraction collaborator.
//!
//! Audio is decoded to mono f32 PCM by piping through ffmpeg, then tracked
//! per hop with YIN: squared-difference function, cumulative mean normalized
//! difference, absolute-threshold minimum pick, parabolic refinement.
//! Hops with no acceptable minimum, or whose frequency falls outside the
//! configured floor/ceiling, are unvoiced.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::error::{PitchlineError, PitchlineResult};
use crate::exec;
use crate::track::{PitchExtractor, PitchSample, PitchTrack};

const DEFAULT_SAMPLE_RATE: u32 = 44_100;
const DEFAULT_WINDOW: usize = 2048;
const DEFAULT_THRESHOLD: f64 = 0.1;

/// Hops per second of audio; 10 ms matches the analysis rate the graph is
/// tuned for.
const HOPS_PER_SECOND: u32 = 100;

pub struct YinExtractor {
    ffmpeg: PathBuf,
    sample_rate: u32,
    window: usize,
    threshold: f64,
    decode_timeout: Duration,
}

impl YinExtractor {
    pub fn new(ffmpeg: PathBuf, decode_timeout: Duration) -> Self {
        Self {
            ffmpeg,
            sample_rate: DEFAULT_SAMPLE_RATE,
            window: DEFAULT_WINDOW,
            threshold: DEFAULT_THRESHOLD,
            decode_timeout,
        }
    }

    fn decode_mono_f32(&self, audio: &Path) -> PitchlineResult<Vec<f32>> {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-v", "error", "-i"])
            .arg(audio)
            .args([
                "-vn",
                "-f",
                "f32le",
                "-acodec",
                "pcm_f32le",
                "-ac",
                "1",
                "-ar",
                &self.sample_rate.to_string(),
                "pipe:1",
            ]);

        let out = exec::run_captured(cmd, "ffmpeg", self.decode_timeout)?;
        if !out.stdout.len().is_multiple_of(4) {
            return Err(PitchlineError::process(
                "ffmpeg",
                "decoded audio byte length is not aligned to f32 samples",
            ));
        }
        let mut pcm = Vec::with_capacity(out.stdout.len() / 4);
        for chunk in out.stdout.chunks_exact(4) {
            pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        Ok(pcm)
    }

    /// Track an already-decoded PCM buffer. Split out from [`extract`] so
    /// the analysis is testable without an ffmpeg invocation.
    pub fn track_from_pcm(
        &self,
        pcm: &[f32],
        floor_hz: f64,
        ceiling_hz: f64,
    ) -> PitchlineResult<PitchTrack> {
        let sr = f64::from(self.sample_rate);
        let duration = pcm.len() as f64 / sr;
        let hop = (self.sample_rate / HOPS_PER_SECOND).max(1) as usize;

        let mut yin = Yin::new(sr, self.window, floor_hz, ceiling_hz, self.threshold);
        let mut samples = Vec::new();
        let mut pos = 0usize;
        while pos + self.window <= pcm.len() {
            let time = (pos + self.window / 2) as f64 / sr;
            let freq = yin.detect(&pcm[pos..pos + self.window]);
            samples.push(PitchSample { time, freq });
            pos += hop;
        }

        PitchTrack::new(samples, duration)
    }
}

impl PitchExtractor for YinExtractor {
    #[tracing::instrument(skip(self))]
    fn extract(&self, audio: &Path, floor_hz: f64, ceiling_hz: f64) -> PitchlineResult<PitchTrack> {
        let pcm = self.decode_mono_f32(audio)?;
        self.track_from_pcm(&pcm, floor_hz, ceiling_hz)
    }
}

struct Yin {
    sample_rate: f64,
    threshold: f64,
    min_tau: usize,
    max_tau: usize,
    diff: Vec<f64>,
    cmndf: Vec<f64>,
}

impl Yin {
    fn new(sample_rate: f64, window: usize, floor_hz: f64, ceiling_hz: f64, threshold: f64) -> Self {
        let half = window / 2;
        let min_tau = ((sample_rate / ceiling_hz) as usize).max(2);
        let max_tau = ((sample_rate / floor_hz) as usize + 1).min(half.saturating_sub(1));
        Self {
            sample_rate,
            threshold,
            min_tau,
            max_tau,
            diff: vec![0.0; half],
            cmndf: vec![0.0; half],
        }
    }

    fn detect(&mut self, frame: &[f32]) -> Option<f64> {
        if self.min_tau >= self.max_tau {
            return None;
        }
        self.difference(frame);
        self.cumulative_mean_normalized();
        let tau = self.pick_tau()?;
        let refined = self.parabolic(tau);
        let freq = self.sample_rate / refined;
        (freq >= self.sample_rate / self.max_tau as f64
            && freq <= self.sample_rate / self.min_tau as f64)
            .then_some(freq)
    }

    fn difference(&mut self, frame: &[f32]) {
        let half = self.diff.len();
        for tau in 0..=self.max_tau {
            let mut sum = 0.0f64;
            for j in 0..half {
                let d = f64::from(frame[j]) - f64::from(frame[j + tau]);
                sum += d * d;
            }
            self.diff[tau] = sum;
        }
    }

    fn cumulative_mean_normalized(&mut self) {
        self.cmndf[0] = 1.0;
        let mut running = 0.0;
        for tau in 1..=self.max_tau {
            running += self.diff[tau];
            self.cmndf[tau] = if running > 0.0 {
                self.diff[tau] * tau as f64 / running
            } else {
                1.0
            };
        }
    }

    fn pick_tau(&self) -> Option<usize> {
        // First local minimum below the threshold wins.
        for tau in self.min_tau..self.max_tau {
            if self.cmndf[tau] < self.threshold && self.cmndf[tau] < self.cmndf[tau + 1] {
                return Some(tau);
            }
        }

        // Otherwise take the global minimum, but only a reasonably deep one;
        // shallow dips mean an unvoiced frame.
        let mut best = self.min_tau;
        for tau in self.min_tau..self.max_tau {
            if self.cmndf[tau] < self.cmndf[best] {
                best = tau;
            }
        }
        (self.cmndf[best] < 0.5).then_some(best)
    }

    fn parabolic(&self, tau: usize) -> f64 {
        if tau == 0 || tau + 1 >= self.cmndf.len() {
            return tau as f64;
        }
        let s0 = self.cmndf[tau - 1];
        let s1 = self.cmndf[tau];
        let s2 = self.cmndf[tau + 1];
        let denom = 2.0 * (s0 - 2.0 * s1 + s2);
        if denom == 0.0 {
            return tau as f64;
        }
        let adjustment = (s0 - s2) / denom;
        if adjustment.is_finite() && adjustment.abs() < 1.0 {
            tau as f64 + adjustment
        } else {
            tau as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> YinExtractor {
        YinExtractor::new(PathBuf::from("ffmpeg"), Duration::from_secs(60))
    }

    fn sine(freq: f64, sample_rate: u32, seconds: f64) -> Vec<f32> {
        let n = (f64::from(sample_rate) * seconds) as usize;
        (0..n)
            .map(|i| {
                let t = i as f64 / f64::from(sample_rate);
                (0.6 * (2.0 * std::f64::consts::PI * freq * t).sin()) as f32
            })
            .collect()
    }

    #[test]
    fn tracks_a_steady_sine() {
        let pcm = sine(440.0, DEFAULT_SAMPLE_RATE, 0.5);
        let track = extractor().track_from_pcm(&pcm, 73.0, 784.0).unwrap();

        let voiced: Vec<f64> = track.samples().iter().filter_map(|s| s.freq).collect();
        assert!(voiced.len() > track.samples().len() / 2);
        for freq in voiced {
            assert!((freq - 440.0).abs() < 3.0, "detected {freq}");
        }
    }

    #[test]
    fn silence_is_unvoiced() {
        let pcm = vec![0.0f32; DEFAULT_SAMPLE_RATE as usize / 2];
        let track = extractor().track_from_pcm(&pcm, 73.0, 784.0).unwrap();
        assert!(track.samples().iter().all(|s| s.freq.is_none()));
    }

    #[test]
    fn voiced_detections_stay_within_the_configured_bounds() {
        // 1 kHz sits above the 784 Hz ceiling; whatever the tracker makes of
        // it (unvoiced, or a subharmonic) must stay inside the bounds.
        let pcm = sine(1000.0, DEFAULT_SAMPLE_RATE, 0.25);
        let track = extractor().track_from_pcm(&pcm, 73.0, 784.0).unwrap();
        for freq in track.samples().iter().filter_map(|s| s.freq) {
            assert!((72.0..=790.0).contains(&freq), "detected {freq}");
        }
    }

    #[test]
    fn duration_covers_the_whole_buffer() {
        let pcm = sine(220.0, DEFAULT_SAMPLE_RATE, 1.0);
        let track = extractor().track_from_pcm(&pcm, 73.0, 784.0).unwrap();
        assert!((track.duration() - 1.0).abs() < 1e-6);
    }
}
