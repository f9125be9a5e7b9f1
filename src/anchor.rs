//! Semantic overlay anchor: a named corner or an explicit pixel offset.
//!
//! The mapping to any particular compositor's filter syntax lives in the
//! compositor module; this type only carries the meaning.

use std::fmt;
use std::str::FromStr;

use crate::error::PitchlineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Anchor {
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
    /// Explicit pixel offset from the source video's top-left corner.
    Offset { x: u32, y: u32 },
}

impl Default for Anchor {
    fn default() -> Self {
        Anchor::TopRight
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::TopRight => f.write_str("top_right"),
            Anchor::TopLeft => f.write_str("top_left"),
            Anchor::BottomRight => f.write_str("bottom_right"),
            Anchor::BottomLeft => f.write_str("bottom_left"),
            Anchor::Offset { x, y } => write!(f, "{x}:{y}"),
        }
    }
}

impl FromStr for Anchor {
    type Err = PitchlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top_right" => return Ok(Anchor::TopRight),
            "top_left" => return Ok(Anchor::TopLeft),
            "bottom_right" => return Ok(Anchor::BottomRight),
            "bottom_left" => return Ok(Anchor::BottomLeft),
            _ => {}
        }
        let (x, y) = s.split_once(':').ok_or_else(|| PitchlineError::anchor(s))?;
        let x = x.parse::<u32>().map_err(|_| PitchlineError::anchor(s))?;
        let y = y.parse::<u32>().map_err(|_| PitchlineError::anchor(s))?;
        Ok(Anchor::Offset { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_names_parse_case_insensitively() {
        assert_eq!("top_right".parse::<Anchor>().unwrap(), Anchor::TopRight);
        assert_eq!("Bottom_Left".parse::<Anchor>().unwrap(), Anchor::BottomLeft);
    }

    #[test]
    fn pixel_offsets_parse() {
        assert_eq!(
            "40:120".parse::<Anchor>().unwrap(),
            Anchor::Offset { x: 40, y: 120 }
        );
    }

    #[test]
    fn malformed_specs_are_rejected() {
        assert!("center".parse::<Anchor>().is_err());
        assert!("40".parse::<Anchor>().is_err());
        assert!("40:".parse::<Anchor>().is_err());
        assert!("-3:10".parse::<Anchor>().is_err());
        assert!("a:b".parse::<Anchor>().is_err());
    }
}
