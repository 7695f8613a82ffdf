//! Application core — event loop, key mapping, snapshot polling, rendering.
//!
//! The screen is redrawn only after something happened: a key, a resize,
//! a coalesced registry change, or the liveness refresh tick.

use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Cell, Paragraph, Row, Table, TableState},
};
use tracing::{debug, info};

use badgewatch_core::{DeviceView, IngestCounters, Monitor};

use crate::event::{Event, EventReader};
use crate::theme;
use crate::widgets::{signal_bars, status_indicator};

/// Minimum spacing between redraws caused by new readings.
const REDRAW_SETTLE: Duration = Duration::from_millis(100);

/// Everything a key press or tick can ask the app to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    SelectNext,
    SelectPrev,
    SelectFirst,
    SelectLast,
    Refresh,
}

/// Map a key event to an action.
pub fn map_key(key: KeyEvent) -> Option<Action> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) | (_, KeyCode::Char('q')) => {
            Some(Action::Quit)
        }
        (_, KeyCode::Char('j') | KeyCode::Down) => Some(Action::SelectNext),
        (_, KeyCode::Char('k') | KeyCode::Up) => Some(Action::SelectPrev),
        (_, KeyCode::Char('g') | KeyCode::Home) => Some(Action::SelectFirst),
        (_, KeyCode::Char('G') | KeyCode::End) => Some(Action::SelectLast),
        (_, KeyCode::Char('r')) => Some(Action::Refresh),
        _ => None,
    }
}

/// Top-level application state and event loop.
pub struct App {
    monitor: Monitor,
    /// Snapshot poll interval.
    refresh: Duration,
    views: Vec<DeviceView>,
    stats: IngestCounters,
    table_state: TableState,
    running: bool,
}

impl App {
    pub fn new(monitor: Monitor, refresh: Duration) -> Self {
        Self {
            monitor,
            refresh,
            views: Vec::new(),
            stats: IngestCounters::default(),
            table_state: TableState::default(),
            running: true,
        }
    }

    /// Run the main event loop until the user quits.
    pub async fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.apply(Action::Refresh);
        terminal.draw(|frame| self.render(frame))?;

        let mut events = EventReader::new(self.monitor.subscribe(), self.refresh, REDRAW_SETTLE);
        info!(refresh_ms = self.refresh.as_millis(), "TUI event loop started");

        while self.is_running() {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => match map_key(key) {
                    Some(action) => self.apply(action),
                    None => continue,
                },
                Event::Refresh | Event::Changed => self.apply(Action::Refresh),
                Event::Resize(cols, rows) => debug!(cols, rows, "terminal resized"),
            }

            if self.is_running() {
                terminal.draw(|frame| self.render(frame))?;
            }
        }

        events.stop();
        info!("TUI event loop ended");
        Ok(())
    }

    /// Update state for one action.
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::Refresh => self.refresh_snapshot(),
            Action::SelectNext => {
                let next = self.table_state.selected().map_or(0, |i| i + 1);
                self.select_clamped(next);
            }
            Action::SelectPrev => {
                let prev = self.table_state.selected().map_or(0, |i| i.saturating_sub(1));
                self.select_clamped(prev);
            }
            Action::SelectFirst => self.select_clamped(0),
            Action::SelectLast => self.select_clamped(usize::MAX),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn selected(&self) -> Option<&DeviceView> {
        self.table_state.selected().and_then(|i| self.views.get(i))
    }

    /// Pull a fresh snapshot, keeping the selection on the same badge.
    fn refresh_snapshot(&mut self) {
        let selected_address = self.selected().map(|v| v.address.clone());
        self.views = self.monitor.snapshot();
        self.stats = self.monitor.stats();

        let index = selected_address
            .and_then(|addr| self.views.iter().position(|v| v.address == addr))
            .or(self.table_state.selected())
            .unwrap_or(0);
        self.select_clamped(index);
        debug!(badges = self.views.len(), "snapshot refreshed");
    }

    fn select_clamped(&mut self, index: usize) {
        if self.views.is_empty() {
            self.table_state.select(None);
        } else {
            self.table_state
                .select(Some(index.min(self.views.len() - 1)));
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    /// Render the full application frame.
    pub fn render(&mut self, frame: &mut Frame) {
        let [header_area, table_area, status_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        self.render_header(frame, header_area);
        self.render_table(frame, table_area);
        self.render_status_bar(frame, status_area);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let online = self.views.iter().filter(|v| v.online).count();
        let line = Line::from(vec![
            Span::styled(" badgewatch", theme::title_style()),
            Span::styled(
                format!(
                    "  ·  layout {}  ·  {} badges, {online} online",
                    self.monitor.config().protocol.layout,
                    self.views.len()
                ),
                Style::default().fg(theme::DIM_WHITE),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_table(&mut self, frame: &mut Frame, area: Rect) {
        let show_posture = self.monitor.config().protocol.layout.has_posture();

        let mut columns = vec![
            ("Name", Constraint::Min(14)),
            ("Address", Constraint::Length(18)),
            ("ID", Constraint::Length(10)),
            ("Status", Constraint::Length(10)),
        ];
        if show_posture {
            columns.push(("Posture", Constraint::Length(8)));
        }
        columns.extend([
            ("RSSI", Constraint::Length(9)),
            ("Last Seen", Constraint::Length(11)),
            ("Online", Constraint::Length(9)),
        ]);

        let header = Row::new(
            columns
                .iter()
                .map(|(title, _)| Cell::from(*title).style(theme::table_header())),
        );

        let selected = self.table_state.selected();
        let rows: Vec<Row> = self
            .views
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let is_selected = selected == Some(i);
                let prefix = if is_selected { "▸" } else { " " };
                let mut cells = vec![
                    Cell::from(format!("{prefix}{}", v.name)).style(
                        Style::default().fg(theme::NEON_CYAN).add_modifier(if is_selected {
                            Modifier::BOLD
                        } else {
                            Modifier::empty()
                        }),
                    ),
                    Cell::from(v.address.clone()).style(Style::default().fg(theme::CORAL)),
                    Cell::from(v.device_id.to_string()),
                    Cell::from(v.status_label.clone()),
                ];
                if show_posture {
                    cells.push(Cell::from(v.posture_label.clone().unwrap_or_else(|| "─".into())));
                }
                cells.extend([
                    Cell::from(signal_bars::signal_span(v.rssi, v.signal)),
                    Cell::from(format!("{:.1}s ago", v.age)),
                    Cell::from(status_indicator::presence_span(v.online)),
                ]);
                Row::new(cells).style(theme::table_row())
            })
            .collect();

        let widths: Vec<Constraint> = columns.iter().map(|(_, width)| *width).collect();

        let block = Block::bordered()
            .title(" Badges ")
            .title_style(theme::title_style())
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(theme::table_selected());

        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let s = &self.stats;
        let line = Line::from(vec![
            Span::styled(
                format!(
                    " rx {}  ok {}  filtered {}  dropped {}  malformed {}",
                    s.received, s.accepted, s.filtered, s.dropped, s.malformed
                ),
                Style::default().fg(theme::DIM_WHITE),
            ),
            Span::styled(" │ ", theme::key_hint()),
            Span::styled("j/k ", theme::key_hint_key()),
            Span::styled("navigate  ", theme::key_hint()),
            Span::styled("q ", theme::key_hint_key()),
            Span::styled("quit", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeDelta, Utc};
    use pretty_assertions::assert_eq;
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use badgewatch_core::{
        MonitorConfig, PayloadLayout, PostureCode, ProtocolConfig, Reading, StatusCode,
    };

    fn reading(id: u32, rssi: i16) -> Reading {
        Reading {
            device_id: id,
            status: StatusCode(2),
            posture: Some(PostureCode(1)),
            flags: None,
            rssi,
        }
    }

    fn app_with(names: &[&str]) -> App {
        app_with_config(MonitorConfig::default(), names)
    }

    fn app_with_config(config: MonitorConfig, names: &[&str]) -> App {
        let monitor = Monitor::new(config).unwrap();
        for (i, name) in names.iter().enumerate() {
            let id = u32::try_from(i).unwrap();
            monitor.record(&format!("AA:{i:02}"), name, reading(id, -60), Utc::now());
        }
        let mut app = App::new(monitor, Duration::from_millis(500));
        app.apply(Action::Refresh);
        app
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn key_bindings() {
        assert_eq!(map_key(key(KeyCode::Char('q'))), Some(Action::Quit));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
        assert_eq!(map_key(key(KeyCode::Char('j'))), Some(Action::SelectNext));
        assert_eq!(map_key(key(KeyCode::Up)), Some(Action::SelectPrev));
        assert_eq!(map_key(key(KeyCode::Char('c'))), None);
    }

    #[test]
    fn selection_is_clamped() {
        let mut app = app_with(&["BLE Badge 01", "BLE Badge 02", "BLE Badge 03"]);
        assert_eq!(app.selected().unwrap().name, "BLE Badge 01");

        app.apply(Action::SelectPrev);
        assert_eq!(app.selected().unwrap().name, "BLE Badge 01");

        for _ in 0..5 {
            app.apply(Action::SelectNext);
        }
        assert_eq!(app.selected().unwrap().name, "BLE Badge 03");

        app.apply(Action::SelectFirst);
        assert_eq!(app.selected().unwrap().name, "BLE Badge 01");

        app.apply(Action::Quit);
        assert!(!app.is_running());
    }

    #[test]
    fn empty_registry_has_no_selection() {
        let mut app = app_with(&[]);
        app.apply(Action::SelectNext);
        assert!(app.selected().is_none());
    }

    #[test]
    fn selection_follows_badge_across_refresh() {
        let mut app = app_with(&["BLE Badge 02"]);
        assert_eq!(app.selected().unwrap().address, "AA:00");

        // A badge that sorts first shows up; the selection stays put.
        app.monitor
            .record("ZZ:99", "BLE Badge 01", reading(9, -50), Utc::now());
        app.apply(Action::Refresh);
        assert_eq!(app.selected().unwrap().address, "AA:00");
    }

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(110, 8)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(ratatui::buffer::Cell::symbol)
            .collect()
    }

    #[test]
    fn posture_column_follows_layout() {
        let mut with_posture = app_with(&["BLE Badge 01"]);
        assert!(screen(&mut with_posture).contains("Posture"));

        let config = MonitorConfig {
            protocol: ProtocolConfig {
                layout: PayloadLayout::A,
                ..ProtocolConfig::default()
            },
            ..MonitorConfig::default()
        };
        let mut without = app_with_config(config, &["BLE Badge 01"]);
        let text = screen(&mut without);
        assert!(!text.contains("Posture"), "{text}");
        assert!(text.contains("HEARTBEAT"));
    }

    #[test]
    fn renders_rows_and_stats() {
        let mut app = app_with(&["BLE Badge 01"]);
        app.monitor.record(
            "BB:01",
            "BLE Badge 02",
            reading(7, -85),
            Utc::now() - TimeDelta::seconds(60),
        );
        app.apply(Action::Refresh);

        let text = screen(&mut app);
        assert!(text.contains("BLE Badge 01"), "{text}");
        assert!(text.contains("FALLEN"));
        assert!(text.contains("● online"));
        assert!(text.contains("○ offline"));
        assert!(text.contains("2 badges, 1 online"));
        assert!(text.contains("dropped 0"));
    }
}
