//! Tonal reference model: chromatic tones, octave-qualified notes and the
//! in-range reference points of a key's major scale.

use std::fmt;
use std::str::FromStr;

use crate::error::{PitchlineError, PitchlineResult};

/// Frequency of C0 in Hz. Every other note derives from it as
/// `2^(tone_index/12 + octave) * C0_HZ`.
pub const C0_HZ: f64 = 16.3516;

/// Semitone offsets of the major scale relative to its root.
const MAJOR_SCALE_OFFSETS: [usize; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Octaves 0..=7 are representable.
pub const MAX_OCTAVE: u8 = 7;

/// The 12 chromatic tone names in canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Tone {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl Tone {
    pub const ALL: [Tone; 12] = [
        Tone::C,
        Tone::Cs,
        Tone::D,
        Tone::Ds,
        Tone::E,
        Tone::F,
        Tone::Fs,
        Tone::G,
        Tone::Gs,
        Tone::A,
        Tone::As,
        Tone::B,
    ];

    /// Position in the canonical chromatic ordering (C = 0 .. B = 11).
    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|&t| t == self)
            .unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        match self {
            Tone::C => "C",
            Tone::Cs => "C#",
            Tone::D => "D",
            Tone::Ds => "D#",
            Tone::E => "E",
            Tone::F => "F",
            Tone::Fs => "F#",
            Tone::G => "G",
            Tone::Gs => "G#",
            Tone::A => "A",
            Tone::As => "A#",
            Tone::B => "B",
        }
    }

    /// Cyclic transposition by `semitones` upward.
    pub fn offset(self, semitones: usize) -> Tone {
        Self::ALL[(self.index() + semitones) % Self::ALL.len()]
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tone {
    type Err = PitchlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| PitchlineError::tone(s))
    }
}

/// An octave-qualified note such as `A4`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Note {
    pub tone: Tone,
    pub octave: u8,
}

impl Note {
    pub fn new(tone: Tone, octave: u8) -> PitchlineResult<Self> {
        if octave > MAX_OCTAVE {
            return Err(PitchlineError::tone(format!("{}{octave}", tone.name())));
        }
        Ok(Self { tone, octave })
    }

    pub fn frequency(self) -> f64 {
        2f64.powf(self.tone.index() as f64 / 12.0 + f64::from(self.octave)) * C0_HZ
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.tone, self.octave)
    }
}

impl FromStr for Note {
    type Err = PitchlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s.len().checked_sub(1).ok_or_else(|| PitchlineError::tone(s))?;
        if !s.is_char_boundary(split) {
            return Err(PitchlineError::tone(s));
        }
        let (name, octave) = s.split_at(split);
        let tone = Tone::from_str(name).map_err(|_| PitchlineError::tone(s))?;
        let octave: u8 = octave.parse().map_err(|_| PitchlineError::tone(s))?;
        Note::new(tone, octave).map_err(|_| PitchlineError::tone(s))
    }
}

/// A frequency bound given either as a literal Hz value or as a note name.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum PitchBound {
    Hz(f64),
    Note(Note),
}

impl PitchBound {
    /// Numeric values pass through unchanged; note names are looked up.
    pub fn resolve(self) -> f64 {
        match self {
            PitchBound::Hz(hz) => hz,
            PitchBound::Note(note) => note.frequency(),
        }
    }
}

impl FromStr for PitchBound {
    type Err = PitchlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(hz) = s.parse::<f64>() {
            return Ok(PitchBound::Hz(hz));
        }
        Note::from_str(s).map(PitchBound::Note)
    }
}

impl fmt::Display for PitchBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PitchBound::Hz(hz) => write!(f, "{hz}"),
            PitchBound::Note(note) => note.fmt(f),
        }
    }
}

/// The seven tones of a root's major scale, in root-relative degree order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scale {
    root: Tone,
    degrees: [Tone; 7],
}

impl Scale {
    pub fn major(root: Tone) -> Self {
        let mut degrees = [root; 7];
        for (slot, offset) in degrees.iter_mut().zip(MAJOR_SCALE_OFFSETS) {
            *slot = root.offset(offset);
        }
        Self { root, degrees }
    }

    pub fn root(self) -> Tone {
        self.root
    }

    pub fn degrees(self) -> [Tone; 7] {
        self.degrees
    }

    pub fn contains(self, tone: Tone) -> bool {
        self.degrees.contains(&tone)
    }
}

/// A labelled horizontal reference line on the pitch graph.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReferencePoint {
    pub label: String,
    pub freq: f64,
}

/// Reference points of `root`'s major scale with frequency inside
/// `[min_freq, max_freq]`, both ends inclusive.
///
/// Emission order is octave-major, then scale-degree order within each
/// octave. Degrees are emitted in root-relative order, so for roots whose
/// scale wraps past B the sequence is *not* strictly ascending in frequency.
pub fn reference_points(root: Tone, min_freq: f64, max_freq: f64) -> Vec<ReferencePoint> {
    let scale = Scale::major(root);
    let mut points = Vec::new();
    for octave in 0..=MAX_OCTAVE {
        for tone in scale.degrees() {
            let note = Note { tone, octave };
            let freq = note.frequency();
            if min_freq <= freq && freq <= max_freq {
                points.push(ReferencePoint {
                    label: note.to_string(),
                    freq,
                });
            }
        }
    }
    points
}
