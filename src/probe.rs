//! Source video resolution probe.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::error::{PitchlineError, PitchlineResult};
use crate::exec;

/// Query the source video's `(width, height)` with ffprobe. The output
/// format consumed is a single `WIDTHxHEIGHT` line.
pub fn probe_resolution(video: &Path, timeout: Duration) -> PitchlineResult<(u32, u32)> {
    let mut cmd = Command::new("ffprobe");
    cmd.args([
        "-v",
        "error",
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=width,height",
        "-of",
        "csv=s=x:p=0",
    ])
    .arg(video);

    let out = exec::run_captured(cmd, "ffprobe", timeout)?;
    parse_resolution(&String::from_utf8_lossy(&out.stdout))
}

pub(crate) fn parse_resolution(line: &str) -> PitchlineResult<(u32, u32)> {
    let malformed = || {
        PitchlineError::process(
            "ffprobe",
            format!("unexpected resolution output '{}'", line.trim()),
        )
    };
    let (w, h) = line.trim().split_once('x').ok_or_else(malformed)?;
    let width = w.parse::<u32>().map_err(|_| malformed())?;
    let height = h.parse::<u32>().map_err(|_| malformed())?;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_output_parses() {
        assert_eq!(parse_resolution("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_resolution("1280x720\n").unwrap(), (1280, 720));
    }

    #[test]
    fn malformed_output_is_an_error_not_a_panic() {
        assert!(parse_resolution("1920").is_err());
        assert!(parse_resolution("1920xabc").is_err());
        assert!(parse_resolution("x1080").is_err());
        assert!(parse_resolution("").is_err());
    }
}
