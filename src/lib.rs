#![forbid(unsafe_code)]

pub mod anchor;
pub mod animate;
pub mod compose;
pub mod convert;
pub mod encode;
pub mod error;
pub mod exec;
pub mod extract;
pub mod plot;
pub mod probe;
pub mod state;
pub mod theme;
pub mod tone;
pub mod track;

pub use anchor::Anchor;
pub use animate::{NullProgress, Progress, render_overlay_video, resolve_y_limit_chain};
pub use convert::{ConvertConfig, Converter, DEFAULT_FPS};
pub use encode::{EncodeConfig, FrameRgb, OverlayEncoder};
pub use error::{PitchlineError, PitchlineResult};
pub use extract::YinExtractor;
pub use plot::{CANVAS_HEIGHT, CANVAS_WIDTH, OverlayRenderer, PlotRenderer};
pub use state::FrameState;
pub use theme::Theme;
pub use tone::{Note, PitchBound, ReferencePoint, Tone, reference_points};
pub use track::{PitchExtractor, PitchSample, PitchTrack};
