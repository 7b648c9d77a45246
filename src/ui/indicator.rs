use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

use crate::clock::Phase;
use crate::scheduler::indicator_position;

const TRACK_SYMBOL: &str = "│";
const DOT_SYMBOL: &str = "●";

/// Vertical track with a dot that rises on Inhale and falls on Exhale.
#[derive(Debug, Clone, Copy)]
pub struct Indicator {
    pub phase: Phase,
    pub progress: f64,
    pub pulse: f64,
}

impl Indicator {
    /// Row of the dot inside `area`.
    pub fn dot_row(&self, area: Rect) -> u16 {
        let top = area.top() as f64;
        let bottom = area.bottom().saturating_sub(1) as f64;
        let y = indicator_position(self.phase, self.progress, top, bottom).round();
        (y as u16).clamp(area.top(), area.bottom().saturating_sub(1))
    }
}

impl Widget for Indicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let x = area.x + area.width / 2;

        let track_style = Style::default().add_modifier(Modifier::DIM);
        for y in area.top()..area.bottom() {
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_symbol(TRACK_SYMBOL);
                cell.set_style(track_style);
            }
        }

        let color = match self.phase {
            Phase::Inhale => Color::Cyan,
            Phase::Exhale => Color::Magenta,
        };
        let mut dot_style = Style::default().fg(color);
        // brief highlight right after a boundary
        if self.pulse > 0.0 {
            dot_style = dot_style.add_modifier(Modifier::BOLD);
        }

        if let Some(cell) = buf.cell_mut((x, self.dot_row(area))) {
            cell.set_symbol(DOT_SYMBOL);
            cell.set_style(dot_style);
        }
    }
}
