use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
};
use slapper_core::runner::{
    ChartFeed, ChartView, Outcome, RateGovernor, RunStats, RunSummary, Runner,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::human::format::{format_duration, format_ms, format_pct};
use super::{OutputFormatter, RunHeader};

const FRAME_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) struct TuiOutput;

impl TuiOutput {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl OutputFormatter for TuiOutput {
    fn print_header(&self, _header: &RunHeader) {}

    fn progress(&self) -> Option<slapper_core::runner::ProgressFn> {
        None
    }

    fn attach(&self, runner: &Runner) -> Option<JoinHandle<anyhow::Result<()>>> {
        let state = UiState {
            feed: runner.feed(),
            stats: runner.stats(),
            governor: runner.governor(),
            cancel: runner.cancel_token(),
            started: Instant::now(),
            workers: runner.config().workers,
        };
        Some(tokio::task::spawn_blocking(move || run_ui(&state)))
    }

    fn print_summary(&self, summary: &RunSummary) -> anyhow::Result<()> {
        print!("{}", super::human::render(summary));
        Ok(())
    }
}

struct UiState {
    feed: Arc<ChartFeed>,
    stats: Arc<RunStats>,
    governor: Arc<RateGovernor>,
    cancel: CancellationToken,
    started: Instant,
    workers: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Quit,
    RateUp,
    RateDown,
}

fn key_action(key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        // Raw mode swallows SIGINT, so Ctrl-C arrives as a key.
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Up | KeyCode::Char('+') => Some(Action::RateUp),
        KeyCode::Down | KeyCode::Char('-') => Some(Action::RateDown),
        _ => None,
    }
}

/// Step the rate by about 10%, always by at least one, never below one.
fn next_rate(current: u64, up: bool) -> u64 {
    let step = (current / 10).max(1);
    if up {
        current.saturating_add(step)
    } else {
        current.saturating_sub(step).max(1)
    }
}

fn run_ui(state: &UiState) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let res = ui_loop(&mut terminal, state);

    // Restore the terminal even when drawing failed.
    let _ = disable_raw_mode();
    let _ = execute!(terminal.backend_mut(), LeaveAlternateScreen);
    let _ = terminal.show_cursor();

    if res.is_err() {
        state.cancel.cancel();
    }
    res
}

fn ui_loop<B: Backend>(terminal: &mut Terminal<B>, state: &UiState) -> anyhow::Result<()> {
    while !state.cancel.is_cancelled() {
        let view = state.feed.snapshot();
        terminal.draw(|f| draw_ui(f, state, &view))?;

        if event::poll(FRAME_INTERVAL)?
            && let Event::Key(key) = event::read()?
        {
            match key_action(key) {
                Some(Action::Quit) => state.cancel.cancel(),
                Some(Action::RateUp) => {
                    let _ = state.governor.set_rate(next_rate(state.governor.rate(), true));
                }
                Some(Action::RateDown) => {
                    let _ = state.governor.set_rate(next_rate(state.governor.rate(), false));
                }
                None => {}
            }
        }
    }
    Ok(())
}

fn outcome_color(outcome: Outcome) -> Color {
    match outcome {
        Outcome::Success => Color::Green,
        Outcome::HttpError => Color::Yellow,
        Outcome::TransportError => Color::Red,
        Outcome::Timeout => Color::Magenta,
    }
}

fn draw_ui(frame: &mut Frame, state: &UiState, view: &ChartView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(8),    // Chart
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    let totals = state.stats.totals();
    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                "slapper",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "  elapsed={}  rate={}/s  workers={}",
                format_duration(state.started.elapsed()),
                state.governor.rate(),
                state.workers
            )),
        ]),
        Line::from(Outcome::ALL.iter().fold(
            vec![Span::raw(format!("sent={} ", totals.total()))],
            |mut spans, &outcome| {
                spans.push(Span::styled(
                    format!(" {}={}", outcome, totals.get(outcome)),
                    Style::default().fg(outcome_color(outcome)),
                ));
                spans
            },
        )),
    ])
    .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let series: Vec<(Outcome, Vec<(f64, f64)>)> = Outcome::ALL
        .iter()
        .map(|&outcome| (outcome, view.series(outcome)))
        .collect();
    let datasets = series
        .iter()
        .map(|(outcome, points)| {
            Dataset::default()
                .name(outcome.to_string())
                .marker(Marker::Braille)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(outcome_color(*outcome)))
                .data(points)
        })
        .collect::<Vec<_>>();

    let (x_lo, x_hi) = view.x_bounds();
    let (y_lo, y_hi) = (view.bounds.min_ms(), view.bounds.max_ms());
    let title = format!(
        " latency ({} shown, {} clipped, error rate {}) ",
        view.points.len(),
        view.clipped(),
        format_pct(totals.error_rate())
    );

    let chart = Chart::new(datasets)
        .block(Block::default().title(title).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .title("time")
                .style(Style::default().fg(Color::Gray))
                .bounds([x_lo, x_hi])
                .labels(vec![
                    format_duration(Duration::from_secs_f64(x_lo)),
                    format_duration(Duration::from_secs_f64(x_hi)),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("latency")
                .style(Style::default().fg(Color::Gray))
                .bounds([y_lo, y_hi])
                .labels(vec![
                    format_ms(y_lo),
                    format_ms((y_lo + y_hi) / 2.0),
                    format_ms(y_hi),
                ]),
        );
    frame.render_widget(chart, chunks[1]);

    let footer = Paragraph::new("[q] Quit  [↑/↓] Rate ±10%")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[2]);
}
