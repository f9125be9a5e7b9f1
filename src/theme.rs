//! Color themes for the overlay graph.
//!
//! Themes are a closed enumeration; unknown names are rejected while the
//! configuration is validated, before any rendering work starts.

use std::fmt;
use std::str::FromStr;

use crate::error::PitchlineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// The seven color roles of the overlay graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ThemeColors {
    pub text: Rgb,
    pub background: Rgb,
    pub edge_line: Rgb,
    pub pitch_marker: Rgb,
    pub tone_line: Rgb,
    pub time_marker: Rgb,
    pub time_label: Rgb,
}

const DARK: ThemeColors = ThemeColors {
    text: Rgb(230, 230, 230),
    background: Rgb(18, 20, 28),
    edge_line: Rgb(90, 96, 120),
    pitch_marker: Rgb(236, 196, 128),
    tone_line: Rgb(60, 68, 88),
    time_marker: Rgb(217, 79, 79),
    time_label: Rgb(170, 176, 192),
};

const LIGHT: ThemeColors = ThemeColors {
    text: Rgb(32, 32, 32),
    background: Rgb(247, 247, 245),
    edge_line: Rgb(128, 128, 128),
    pitch_marker: Rgb(208, 96, 32),
    tone_line: Rgb(200, 200, 200),
    time_marker: Rgb(204, 51, 51),
    time_label: Rgb(64, 64, 64),
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn colors(self) -> &'static ThemeColors {
        match self {
            Theme::Dark => &DARK,
            Theme::Light => &LIGHT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = PitchlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(PitchlineError::theme(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_parse() {
        assert_eq!("dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!("light".parse::<Theme>().unwrap(), Theme::Light);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = "solarized".parse::<Theme>().unwrap_err();
        assert!(err.to_string().contains("unknown theme"));
    }
}
