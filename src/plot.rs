//! Raster rendering of frame states.
//!
//! The overlay graph is drawn with plotters into a plain RGB24 buffer that
//! feeds straight into the streaming encoder. Rendering consumes an
//! immutable [`FrameState`]; no drawing object survives between frames, so
//! frames can be produced in any order.

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::encode::FrameRgb;
use crate::error::{PitchlineError, PitchlineResult};
use crate::state::FrameState;
use crate::theme::{Rgb, Theme, ThemeColors};

/// Overlay canvas geometry before compositor scaling.
pub const CANVAS_WIDTH: u32 = 960;
pub const CANVAS_HEIGHT: u32 = 540;

const X_LABEL_AREA: u32 = 26;
const MARGIN: u32 = 8;
const REFERENCE_FONT_PX: u32 = 14;
const TICK_FONT_PX: u32 = 12;

/// Rendering-backend collaborator: one frame state in, one raster frame out.
pub trait OverlayRenderer {
    fn render(&mut self, state: &FrameState) -> PitchlineResult<FrameRgb>;
}

/// Plotters-backed renderer drawing into a reusable RGB24 buffer.
pub struct PlotRenderer {
    width: u32,
    height: u32,
    colors: &'static ThemeColors,
}

impl PlotRenderer {
    pub fn new(theme: Theme) -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            colors: theme.colors(),
        }
    }
}

impl OverlayRenderer for PlotRenderer {
    fn render(&mut self, state: &FrameState) -> PitchlineResult<FrameRgb> {
        let mut data = vec![0u8; (self.width * self.height * 3) as usize];
        draw_state(&mut data, self.width, self.height, self.colors, state)?;
        Ok(FrameRgb {
            width: self.width,
            height: self.height,
            data,
        })
    }
}

fn color(c: Rgb) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

fn draw_err<E: std::fmt::Debug>(e: E) -> PitchlineError {
    PitchlineError::render(format!("plot backend: {e:?}"))
}

fn draw_state(
    buf: &mut [u8],
    width: u32,
    height: u32,
    colors: &ThemeColors,
    state: &FrameState,
) -> PitchlineResult<()> {
    let (x0, x1) = state.x_limits;
    let (y0, y1) = state.y_limits;

    let root = BitMapBackend::with_buffer(buf, (width, height)).into_drawing_area();
    root.fill(&color(colors.background)).map_err(draw_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .build_cartesian_2d(x0..x1, (y0..y1).log_scale())
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(0)
        .y_labels(0)
        .axis_style(ShapeStyle::from(&color(colors.edge_line)).stroke_width(1))
        .draw()
        .map_err(draw_err)?;

    // Reference tone lines, already filtered to the visible range.
    let tone_style = ShapeStyle::from(&color(colors.tone_line)).stroke_width(1);
    for reference in &state.references {
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(x0, reference.freq), (x1, reference.freq)],
                tone_style,
            )))
            .map_err(draw_err)?;
    }

    // Voiced pitch samples inside the window; gaps stay gaps.
    let marker_fill = color(colors.pitch_marker).filled();
    chart
        .draw_series(
            state
                .points
                .iter()
                .filter(|&&(_, f)| y0 <= f && f <= y1)
                .map(|&(t, f)| Circle::new((t, f), 3, marker_fill)),
        )
        .map_err(draw_err)?;

    // Current-time marker.
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(state.marker_x, y0), (state.marker_x, y1)],
            ShapeStyle::from(&color(colors.time_marker)).stroke_width(2),
        )))
        .map_err(draw_err)?;

    // Reference labels sit just above their line, scrolling with the window.
    let label_style = ("sans-serif", REFERENCE_FONT_PX)
        .into_font()
        .color(&color(colors.text))
        .pos(Pos::new(HPos::Left, VPos::Bottom));
    for reference in &state.references {
        chart
            .draw_series(std::iter::once(Text::new(
                reference.label.clone(),
                (state.label_x, reference.freq),
                label_style.clone(),
            )))
            .map_err(draw_err)?;
    }

    // Tick marks and labels live in the x-label area, in pixel space.
    let tick_style = ShapeStyle::from(&color(colors.edge_line)).stroke_width(1);
    let tick_font = ("sans-serif", TICK_FONT_PX)
        .into_font()
        .color(&color(colors.time_label))
        .pos(Pos::new(HPos::Center, VPos::Top));
    for tick in &state.ticks {
        let (px, py) = chart.backend_coord(&(tick.time, y0));
        root.draw(&PathElement::new(vec![(px, py), (px, py + 4)], tick_style))
            .map_err(draw_err)?;
        root.draw(&Text::new(tick.label.clone(), (px, py + 6), tick_font.clone()))
            .map_err(draw_err)?;
    }

    root.present().map_err(draw_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FrameState;
    use crate::tone::{Tone, reference_points};
    use crate::track::{PitchSample, PitchTrack};

    fn test_track() -> PitchTrack {
        let samples = (0..2000)
            .map(|i| PitchSample {
                time: i as f64 / 100.0,
                freq: Some(440.0),
            })
            .collect();
        PitchTrack::new(samples, 20.0).unwrap()
    }

    #[test]
    fn renders_a_full_frame_buffer() {
        let track = test_track();
        let refs = reference_points(Tone::C, 70.0, 800.0);
        let state = FrameState::compute(150, 15, &track, &refs, None);

        let mut renderer = PlotRenderer::new(Theme::Dark);
        let frame = renderer.render(&state).unwrap();
        assert_eq!(frame.width, CANVAS_WIDTH);
        assert_eq!(frame.height, CANVAS_HEIGHT);
        assert_eq!(frame.data.len(), (CANVAS_WIDTH * CANVAS_HEIGHT * 3) as usize);

        // The canvas is not uniformly background-colored once drawn.
        let bg = Theme::Dark.colors().background;
        let uniform = frame
            .data
            .chunks_exact(3)
            .all(|px| px == [bg.0, bg.1, bg.2]);
        assert!(!uniform);
    }

    #[test]
    fn rendering_is_deterministic() {
        let track = test_track();
        let refs = reference_points(Tone::C, 70.0, 800.0);
        let state = FrameState::compute(42, 15, &track, &refs, None);

        let mut renderer = PlotRenderer::new(Theme::Light);
        let a = renderer.render(&state).unwrap();
        let b = renderer.render(&state).unwrap();
        assert_eq!(a.data, b.data);
    }
}
