pub mod indicator;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
    Frame,
};

use crate::app::{App, AppState, Preset};
use crate::scheduler::{countdown_display, progress};
use indicator::Indicator;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub const TITLE: &str = "Coherent Breathing";

/// `MM:SS`, truncating fractional seconds.
pub fn format_time(secs: f64) -> String {
    let total = secs.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

pub fn draw(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state() {
            AppState::Setup => render_setup(self, area, buf),
            AppState::Breathing => render_breathing(self, area, buf),
            AppState::Complete => render_complete(self, area, buf),
        }
    }
}

fn bold_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn legend_style() -> Style {
    Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM)
}

fn centered(text: impl Into<Line<'static>>) -> Paragraph<'static> {
    Paragraph::new(text.into()).alignment(Alignment::Center)
}

fn render_setup(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(
            [
                Constraint::Min(0),
                Constraint::Length(1), // title
                Constraint::Length(1),
                Constraint::Length(1), // sound
                Constraint::Length(1), // time limit
                Constraint::Length(1),
                Constraint::Length(1), // prompt
                Constraint::Length(1),
                Constraint::Length(1), // presets
                Constraint::Min(0),
                Constraint::Length(1), // legend
            ]
            .as_ref(),
        )
        .split(area);

    centered(Span::styled(TITLE, bold_style().fg(Color::Cyan))).render(chunks[1], buf);

    let sound = if app.sound() { "On" } else { "Off" };
    centered(format!("Sound: {sound}")).render(chunks[3], buf);

    let field = app.time_limit();
    let minutes = if field.is_empty() {
        Span::styled("__", legend_style())
    } else {
        Span::styled(field.as_str().to_owned(), bold_style())
    };
    centered(Line::from(vec![
        Span::raw("Time limit (minutes, optional): "),
        minutes,
    ]))
    .render(chunks[4], buf);

    centered(Span::styled(
        "Press space to begin",
        bold_style().fg(Color::Green),
    ))
    .render(chunks[6], buf);

    let presets = Preset::ALL
        .iter()
        .map(|p| format!("({}) {}", p.key(), p))
        .collect::<Vec<_>>()
        .join("   ");
    centered(format!("Presets: {presets}")).render(chunks[8], buf);

    centered(Span::styled(
        "(space) start / (0-9) minutes / (s)ound / (q)uit",
        legend_style(),
    ))
    .render(chunks[10], buf);
}

fn render_breathing(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(snapshot) = app.snapshot() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(
            [
                Constraint::Length(1), // total time
                Constraint::Length(1),
                Constraint::Length(1), // instruction
                Constraint::Length(1), // countdown
                Constraint::Length(1),
                Constraint::Min(1), // indicator
                Constraint::Length(1),
                Constraint::Length(1), // legend
            ]
            .as_ref(),
        )
        .split(area);

    centered(format!(
        "Total Time: {}",
        format_time(snapshot.session_elapsed_secs)
    ))
    .render(chunks[0], buf);

    let mut instruction = vec![Span::styled(snapshot.phase.to_string(), bold_style())];
    if app.is_paused() {
        instruction.push(Span::styled(
            "  (Paused)",
            Style::default().fg(Color::Yellow),
        ));
    }
    centered(Line::from(instruction)).render(chunks[2], buf);

    let countdown = countdown_display(snapshot.phase_elapsed_secs, snapshot.phase_duration_secs);
    centered(Span::styled(
        countdown.to_string(),
        bold_style().add_modifier(Modifier::DIM),
    ))
    .render(chunks[3], buf);

    Indicator {
        phase: snapshot.phase,
        progress: progress(snapshot.phase_elapsed_secs, snapshot.phase_duration_secs),
        pulse: app.pulse(),
    }
    .render(chunks[5], buf);

    let legend = if app.is_paused() {
        "(space) resume / (r)eset / (q)uit"
    } else {
        "(space) pause / (q)uit"
    };
    centered(Span::styled(legend, legend_style())).render(chunks[7], buf);
}

fn render_complete(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(snapshot) = app.snapshot() else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(
            [
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    centered(Span::styled("Complete!", bold_style().fg(Color::Green))).render(chunks[1], buf);

    let cycles = snapshot.cycles_completed;
    centered(format!(
        "{cycles} {} in {}",
        if cycles == 1 { "cycle" } else { "cycles" },
        format_time(snapshot.session_elapsed_secs)
    ))
    .render(chunks[3], buf);

    centered(Span::styled(
        "(r) back to start / (q)uit",
        legend_style(),
    ))
    .render(chunks[5], buf);
}
