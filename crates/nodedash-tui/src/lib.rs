// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use nodedash_app::{
    DashboardCommand, DashboardEvent, DashboardState, Machine, MachineId, MachineStatus,
    SortDirection, SortKey, SortState, StatusCounts, ViewResult,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, info, warn};

const SORT_MARK_ASC: &str = "▲";
const SORT_MARK_DESC: &str = "▼";
const POLL_INTERVAL: Duration = Duration::from_millis(120);
const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);

/// Where the dashboard gets its rows. Loads are synchronous; the loop draws
/// a loading frame before each call.
pub trait DashboardRuntime {
    fn load_machines(&mut self) -> Result<Vec<Machine>>;
    fn source_label(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum LoadState {
    #[default]
    Loading,
    Ready(Vec<Machine>),
    Failed(String),
}

impl LoadState {
    fn rows(&self) -> &[Machine] {
        match self {
            Self::Ready(rows) => rows,
            Self::Loading | Self::Failed(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    load: LoadState,
    /// Index into the visible rows of the current page.
    cursor: usize,
    /// `Some` while the filter prompt is open.
    filter_input: Option<String>,
    help_visible: bool,
    status_token: u64,
    last_refresh: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Quit,
    ToggleHelp,
    Reload,
    OpenFilter,
    MoveCursor(isize),
    ClickCursor,
    ExpandCursor,
    ClearSelection,
    Sort(SortKey),
    NextPage,
    PrevPage,
    CyclePageSize,
}

pub fn run_app<R: DashboardRuntime>(state: &mut DashboardState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();
    let source = runtime.source_label();
    info!(source = %source, "dashboard started");

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data, &source)) {
            result = Err(error).context("draw frame");
            break;
        }

        if view_data.load == LoadState::Loading {
            reload(state, runtime, &mut view_data, &internal_tx);
            continue;
        }

        let has_event = match event::poll(POLL_INTERVAL).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if !has_event {
            continue;
        }
        match event::read().context("read event") {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if handle_key_event(state, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    info!("dashboard stopped");
    result
}

fn process_internal_events(
    state: &mut DashboardState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(DashboardCommand::ClearStatus, view_data.load.rows());
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn reload<R: DashboardRuntime>(
    state: &mut DashboardState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    match runtime.load_machines() {
        Ok(rows) => {
            let count = rows.len();
            info!(count, "machines loaded");
            view_data.load = LoadState::Ready(rows);
            view_data.last_refresh = Some(OffsetDateTime::now_utc());
            dispatch(state, view_data, internal_tx, DashboardCommand::RowsReplaced);
            emit_status(state, view_data, internal_tx, format!("loaded {count} machines"));
        }
        Err(error) => {
            let message = format!("{error:#}");
            warn!(error = %message, "machine load failed");
            view_data.load = LoadState::Failed(message);
            emit_status(state, view_data, internal_tx, "load failed; press r to retry");
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut DashboardState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    dispatch(
        state,
        view_data,
        internal_tx,
        DashboardCommand::SetStatus(message.into()),
    );
}

fn dispatch(
    state: &mut DashboardState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: DashboardCommand,
) {
    let events = state.dispatch(command, view_data.load.rows());
    let mut status_changed = false;
    for event in &events {
        match event {
            DashboardEvent::StatusUpdated(_) => status_changed = true,
            other => debug!(event = ?other, "dashboard event"),
        }
    }
    if status_changed {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
    clamp_cursor(state, view_data);
}

fn clamp_cursor(state: &DashboardState, view_data: &mut ViewData) {
    let visible = state.view(view_data.load.rows()).visible_rows.len();
    view_data.cursor = view_data.cursor.min(visible.saturating_sub(1));
}

fn cursor_row_id(state: &DashboardState, view_data: &ViewData) -> Option<MachineId> {
    state
        .view(view_data.load.rows())
        .visible_rows
        .get(view_data.cursor)
        .map(|machine| machine.id.clone())
}

/// Returns `true` when the dashboard should quit.
fn handle_key_event(
    state: &mut DashboardState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.filter_input.is_some() {
        handle_filter_key(state, view_data, internal_tx, key);
        return false;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    let Some(action) = action_for_key(key) else {
        return false;
    };
    apply_action(state, view_data, internal_tx, action)
}

fn handle_filter_key(
    state: &mut DashboardState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc => {
            view_data.filter_input = None;
            emit_status(state, view_data, internal_tx, "filter unchanged");
        }
        KeyCode::Enter => {
            let query = view_data.filter_input.take().unwrap_or_default();
            dispatch(state, view_data, internal_tx, DashboardCommand::SetFilter(query));
        }
        KeyCode::Backspace => {
            if let Some(input) = view_data.filter_input.as_mut() {
                input.pop();
            }
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(input) = view_data.filter_input.as_mut() {
                input.push(ch);
            }
        }
        _ => {}
    }
}

fn action_for_key(key: KeyEvent) -> Option<KeyAction> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), KeyModifiers::NONE) => Some(KeyAction::Quit),
        (KeyCode::Char('?'), _) => Some(KeyAction::ToggleHelp),
        (KeyCode::Char('r'), KeyModifiers::NONE) => Some(KeyAction::Reload),
        (KeyCode::Char('/'), _) => Some(KeyAction::OpenFilter),
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(KeyAction::MoveCursor(1)),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(KeyAction::MoveCursor(-1)),
        (KeyCode::Enter, _) | (KeyCode::Char(' '), _) => Some(KeyAction::ClickCursor),
        (KeyCode::Char('e'), KeyModifiers::NONE) => Some(KeyAction::ExpandCursor),
        (KeyCode::Esc, _) => Some(KeyAction::ClearSelection),
        (KeyCode::Char('1'), _) => Some(KeyAction::Sort(SortKey::Name)),
        (KeyCode::Char('2'), _) => Some(KeyAction::Sort(SortKey::Status)),
        (KeyCode::Char('3'), _) => Some(KeyAction::Sort(SortKey::LastSeen)),
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(KeyAction::NextPage),
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(KeyAction::PrevPage),
        (KeyCode::Char('+'), _) => Some(KeyAction::CyclePageSize),
        _ => None,
    }
}

fn apply_action(
    state: &mut DashboardState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    action: KeyAction,
) -> bool {
    let command = match action {
        KeyAction::Quit => return true,
        KeyAction::ToggleHelp => {
            view_data.help_visible = !view_data.help_visible;
            return false;
        }
        KeyAction::Reload => {
            view_data.load = LoadState::Loading;
            emit_status(state, view_data, internal_tx, "reloading");
            return false;
        }
        KeyAction::OpenFilter => {
            view_data.filter_input = Some(state.filter.clone());
            return false;
        }
        KeyAction::MoveCursor(delta) => {
            let visible = state.view(view_data.load.rows()).visible_rows.len();
            let next = view_data.cursor.saturating_add_signed(delta);
            view_data.cursor = next.min(visible.saturating_sub(1));
            return false;
        }
        KeyAction::ClickCursor | KeyAction::ExpandCursor => {
            let Some(id) = cursor_row_id(state, view_data) else {
                emit_status(state, view_data, internal_tx, "no machine under cursor");
                return false;
            };
            if action == KeyAction::ClickCursor {
                DashboardCommand::ClickRow(id)
            } else {
                DashboardCommand::ToggleExpanded(id)
            }
        }
        KeyAction::ClearSelection => DashboardCommand::ClearSelection,
        KeyAction::Sort(key) => DashboardCommand::RequestSort(key),
        KeyAction::NextPage => DashboardCommand::NextPage,
        KeyAction::PrevPage => DashboardCommand::PrevPage,
        KeyAction::CyclePageSize => DashboardCommand::CyclePageSize,
    };
    dispatch(state, view_data, internal_tx, command);
    false
}

fn render(
    frame: &mut ratatui::Frame<'_>,
    state: &DashboardState,
    view_data: &ViewData,
    source: &str,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let title = Paragraph::new(title_text(state, view_data, source))
        .block(Block::default().title("nodedash").borders(Borders::ALL));
    frame.render_widget(title, layout[0]);

    match &view_data.load {
        LoadState::Loading => {
            let body = Paragraph::new(format!("loading machines from {source}..."))
                .block(Block::default().title("machines").borders(Borders::ALL));
            frame.render_widget(body, layout[2]);
        }
        LoadState::Failed(error) => {
            let body = Paragraph::new(format!("load failed: {error}\n\npress r to retry"))
                .style(Style::default().fg(Color::Red))
                .block(Block::default().title("machines").borders(Borders::ALL));
            frame.render_widget(body, layout[2]);
        }
        LoadState::Ready(rows) => {
            let view = state.view(rows);
            render_summary_cards(frame, layout[1], &view.status_counts);
            render_table(frame, layout[2], state, view_data, &view);
            let footer = match &view_data.filter_input {
                Some(input) => format!("filter: {input}_"),
                None => footer_text(state, &view),
            };
            frame.render_widget(Paragraph::new(footer), layout[3]);
        }
    }

    let status = Paragraph::new(status_text(state))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[4]);

    if view_data.help_visible {
        let area = centered_rect(60, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_summary_cards(frame: &mut ratatui::Frame<'_>, area: Rect, counts: &StatusCounts) {
    let cards = counts.summary();
    let constraints = vec![Constraint::Ratio(1, cards.len() as u32); cards.len()];
    let slots = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (card, slot) in cards.iter().zip(slots.iter()) {
        let style = match card.status {
            Some(status) => status_style(status),
            None => Style::default().add_modifier(Modifier::BOLD),
        };
        let widget = Paragraph::new(card.value.to_string())
            .style(style)
            .block(Block::default().title(card.label).borders(Borders::ALL));
        frame.render_widget(widget, *slot);
    }
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &DashboardState,
    view_data: &ViewData,
    view: &ViewResult,
) {
    let header_cells = SortKey::ALL.iter().map(|key| {
        Cell::from(header_label(*key, state.sort)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells);

    let mut rows = Vec::with_capacity(view.visible_rows.len() + view.padding_rows);
    for (index, machine) in view.visible_rows.iter().enumerate() {
        let mut style = Style::default();
        if index == view_data.cursor {
            style = style.bg(Color::DarkGray);
        }
        if state.is_selected(&machine.id) {
            style = Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD);
        }
        rows.push(
            Row::new(vec![
                Cell::from(name_cell_text(machine)),
                Cell::from(machine.status.label()).style(status_style(machine.status)),
                Cell::from(format_last_seen(machine.last_seen)),
            ])
            .style(style),
        );
        if state.is_expanded(&machine.id) {
            rows.push(
                Row::new(vec![Cell::from(detail_text(machine))])
                    .style(Style::default().fg(Color::DarkGray)),
            );
        }
    }
    rows.extend((0..view.padding_rows).map(|_| Row::default()));

    let widths = [
        Constraint::Percentage(50),
        Constraint::Percentage(20),
        Constraint::Percentage(30),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(format!("machines ({})", view.filtered_count))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

fn status_style(status: MachineStatus) -> Style {
    match status {
        MachineStatus::Online => Style::default().fg(Color::Green),
        MachineStatus::Offline => Style::default().fg(Color::Red),
        MachineStatus::Pending => Style::default().fg(Color::Yellow),
    }
}

fn title_text(state: &DashboardState, view_data: &ViewData, source: &str) -> String {
    let mut parts = vec![format!("source: {source}")];
    if let Some(refreshed) = view_data.last_refresh {
        let clock = refreshed
            .format(format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_default();
        parts.push(format!("refreshed {clock} UTC"));
    }
    if let Some(selected) = &state.selected {
        parts.push(format!("{selected} selected"));
    }
    parts.join(" | ")
}

fn summary_text(counts: &StatusCounts) -> String {
    counts
        .summary()
        .iter()
        .map(|card| format!("{} {}", card.label, card.value))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn header_label(key: SortKey, sort: SortState) -> String {
    if sort.key != key {
        return key.label().to_owned();
    }
    let mark = match sort.direction {
        SortDirection::Asc => SORT_MARK_ASC,
        SortDirection::Desc => SORT_MARK_DESC,
    };
    format!("{} {mark}", key.label())
}

fn name_cell_text(machine: &Machine) -> String {
    format!("{} ({})", machine.name, machine.id)
}

fn format_last_seen(days: u32) -> String {
    match days {
        1 => "1 day ago".to_owned(),
        days => format!("{days} days ago"),
    }
}

fn detail_text(machine: &Machine) -> String {
    format!(
        "  id {} | status {} | last seen {}",
        machine.id,
        machine.status.as_str(),
        format_last_seen(machine.last_seen)
    )
}

fn pagination_text(page: usize, page_size: usize, filtered_count: usize) -> String {
    let start = page.saturating_mul(page_size).min(filtered_count);
    let end = start.saturating_add(page_size).min(filtered_count);
    let first = if end > start { start + 1 } else { start };
    format!("rows per page: {page_size} | {first}-{end} of {filtered_count}")
}

fn footer_text(state: &DashboardState, view: &ViewResult) -> String {
    let mut footer = pagination_text(state.page, state.page_size.get(), view.filtered_count);
    if !state.filter.is_empty() {
        footer.push_str(&format!(" | filter: {}", state.filter));
    }
    format!("{footer} | {}", summary_text(&view.status_counts))
}

fn status_text(state: &DashboardState) -> String {
    let default = "1/2/3 sort | j/k move | enter select | e expand | h/l page | + size | / filter | r reload | ? help | q quit";
    match &state.status_line {
        Some(status) => format!("{status} | {default}"),
        None => default.to_owned(),
    }
}

fn help_overlay_text() -> &'static str {
    "sort: 1 name | 2 status | 3 last seen (again to reverse)\n\
rows: j/k or up/down move | enter/space select | e expand | esc clear selection\n\
pages: l/right next | h/left prev | + rows per page\n\
filter: / open | type query | enter apply | esc cancel\n\
global: r reload | ? help | q or ctrl+q quit"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        DashboardRuntime, InternalEvent, KeyAction, LoadState, ViewData, action_for_key,
        emit_status, format_last_seen, handle_key_event, header_label, pagination_text,
        process_internal_events, reload, render, status_text, summary_text, title_text,
    };
    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use nodedash_app::{
        DashboardState, Machine, MachineId, PageSize, SortDirection, SortKey, SortState,
        StatusCounts,
    };
    use nodedash_testkit::{FleetFaker, reference_fleet};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::mpsc;

    #[derive(Debug, Default)]
    struct TestRuntime {
        machines: Vec<Machine>,
        failure: Option<String>,
        loads: usize,
    }

    impl TestRuntime {
        fn with_machines(machines: Vec<Machine>) -> Self {
            Self {
                machines,
                ..Self::default()
            }
        }
    }

    impl DashboardRuntime for TestRuntime {
        fn load_machines(&mut self) -> Result<Vec<Machine>> {
            self.loads += 1;
            match &self.failure {
                Some(message) => Err(anyhow!("{message}")),
                None => Ok(self.machines.clone()),
            }
        }

        fn source_label(&self) -> String {
            "test".to_owned()
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn loaded(machines: Vec<Machine>) -> (DashboardState, ViewData, mpsc::Sender<InternalEvent>) {
        let mut state = DashboardState::default();
        let mut view_data = ViewData::default();
        let (tx, _rx) = mpsc::channel();
        let mut runtime = TestRuntime::with_machines(machines);
        reload(&mut state, &mut runtime, &mut view_data, &tx);
        (state, view_data, tx)
    }

    fn press_all(
        state: &mut DashboardState,
        view_data: &mut ViewData,
        tx: &mpsc::Sender<InternalEvent>,
        keys: &[KeyEvent],
    ) {
        for key in keys {
            let _ = handle_key_event(state, view_data, tx, *key);
        }
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let area = buffer.area;
        let mut text = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn reload_success_populates_rows() {
        let (state, view_data, _tx) = loaded(reference_fleet());
        assert!(matches!(&view_data.load, LoadState::Ready(rows) if rows.len() == 7));
        assert!(view_data.last_refresh.is_some());
        assert_eq!(state.status_line.as_deref(), Some("loaded 7 machines"));
    }

    #[test]
    fn reload_failure_keeps_error_text() {
        let mut state = DashboardState::default();
        let mut view_data = ViewData::default();
        let tx = mpsc::channel().0;
        let mut runtime = TestRuntime {
            failure: Some("cannot reach http://localhost:2979".to_owned()),
            ..TestRuntime::default()
        };

        reload(&mut state, &mut runtime, &mut view_data, &tx);
        assert_eq!(runtime.loads, 1);
        assert_eq!(
            view_data.load,
            LoadState::Failed("cannot reach http://localhost:2979".to_owned())
        );
        assert_eq!(
            state.status_line.as_deref(),
            Some("load failed; press r to retry")
        );
    }

    #[test]
    fn r_key_returns_to_loading() {
        let (mut state, mut view_data, tx) = loaded(reference_fleet());
        press_all(&mut state, &mut view_data, &tx, &[key(KeyCode::Char('r'))]);
        assert_eq!(view_data.load, LoadState::Loading);
    }

    #[test]
    fn number_keys_request_sorts() {
        let (mut state, mut view_data, tx) = loaded(reference_fleet());

        press_all(&mut state, &mut view_data, &tx, &[key(KeyCode::Char('3'))]);
        assert_eq!(state.sort, SortState::new(SortKey::LastSeen, SortDirection::Asc));

        press_all(&mut state, &mut view_data, &tx, &[key(KeyCode::Char('3'))]);
        assert_eq!(state.sort, SortState::new(SortKey::LastSeen, SortDirection::Desc));

        press_all(&mut state, &mut view_data, &tx, &[key(KeyCode::Char('1'))]);
        assert_eq!(state.sort, SortState::new(SortKey::Name, SortDirection::Asc));
    }

    #[test]
    fn page_keys_move_between_pages() {
        let (mut state, mut view_data, tx) = loaded(FleetFaker::new(3).fleet(12));

        press_all(
            &mut state,
            &mut view_data,
            &tx,
            &[key(KeyCode::Char('l')), key(KeyCode::Right)],
        );
        assert_eq!(state.page, 2);

        press_all(&mut state, &mut view_data, &tx, &[key(KeyCode::Left)]);
        assert_eq!(state.page, 1);

        press_all(&mut state, &mut view_data, &tx, &[key(KeyCode::Char('+'))]);
        assert_eq!(state.page_size, PageSize::Ten);
        assert_eq!(state.page, 0);
    }

    #[test]
    fn cursor_stays_on_visible_rows() {
        let (mut state, mut view_data, tx) = loaded(reference_fleet());
        let keys = vec![key(KeyCode::Char('j')); 10];
        press_all(&mut state, &mut view_data, &tx, &keys);
        assert_eq!(view_data.cursor, 4);

        press_all(&mut state, &mut view_data, &tx, &[key(KeyCode::Char('l'))]);
        assert_eq!(view_data.cursor, 1);

        let keys = vec![key(KeyCode::Up); 3];
        press_all(&mut state, &mut view_data, &tx, &keys);
        assert_eq!(view_data.cursor, 0);
    }

    #[test]
    fn enter_selects_and_esc_clears() {
        let (mut state, mut view_data, tx) = loaded(reference_fleet());
        let first = state.view(view_data.load.rows()).visible_rows[0].id.clone();

        press_all(&mut state, &mut view_data, &tx, &[key(KeyCode::Enter)]);
        assert_eq!(state.selected, Some(first.clone()));
        assert!(title_text(&state, &view_data, "test").contains(&format!("{first} selected")));

        press_all(&mut state, &mut view_data, &tx, &[key(KeyCode::Char(' '))]);
        assert_eq!(state.selected, None);

        press_all(
            &mut state,
            &mut view_data,
            &tx,
            &[key(KeyCode::Enter), key(KeyCode::Esc)],
        );
        assert_eq!(state.selected, None);
    }

    #[test]
    fn e_toggles_expansion_of_cursor_row() {
        let (mut state, mut view_data, tx) = loaded(reference_fleet());
        press_all(
            &mut state,
            &mut view_data,
            &tx,
            &[key(KeyCode::Char('j')), key(KeyCode::Char('e'))],
        );
        let second = state.view(view_data.load.rows()).visible_rows[1].id.clone();
        assert!(state.is_expanded(&second));
        assert_eq!(state.expanded.len(), 1);
    }

    #[test]
    fn row_keys_without_rows_report_status() {
        let mut state = DashboardState::default();
        let mut view_data = ViewData::default();
        let tx = mpsc::channel().0;
        press_all(&mut state, &mut view_data, &tx, &[key(KeyCode::Enter)]);
        assert_eq!(state.selected, None);
        assert_eq!(state.status_line.as_deref(), Some("no machine under cursor"));
    }

    #[test]
    fn filter_prompt_applies_on_enter() {
        let (mut state, mut view_data, tx) = loaded(vec![
            Machine::new("a", "web01", nodedash_app::MachineStatus::Online, 0),
            Machine::new("b", "db01", nodedash_app::MachineStatus::Online, 0),
            Machine::new("c", "web02", nodedash_app::MachineStatus::Offline, 3),
        ]);

        press_all(
            &mut state,
            &mut view_data,
            &tx,
            &[
                key(KeyCode::Char('/')),
                key(KeyCode::Char('w')),
                key(KeyCode::Char('e')),
                key(KeyCode::Char('x')),
                key(KeyCode::Backspace),
                key(KeyCode::Char('b')),
            ],
        );
        assert_eq!(view_data.filter_input.as_deref(), Some("web"));
        assert!(state.filter.is_empty());
        assert!(state.expanded.is_empty());

        press_all(&mut state, &mut view_data, &tx, &[key(KeyCode::Enter)]);
        assert_eq!(view_data.filter_input, None);
        assert_eq!(state.filter, "web");
        assert_eq!(state.view(view_data.load.rows()).filtered_count, 2);
    }

    #[test]
    fn filter_prompt_esc_keeps_previous_filter() {
        let (mut state, mut view_data, tx) = loaded(reference_fleet());
        state.filter = "al".to_owned();

        press_all(
            &mut state,
            &mut view_data,
            &tx,
            &[
                key(KeyCode::Char('/')),
                key(KeyCode::Char('x')),
                key(KeyCode::Esc),
            ],
        );
        assert_eq!(view_data.filter_input, None);
        assert_eq!(state.filter, "al");
    }

    #[test]
    fn quit_keys() {
        let (mut state, mut view_data, tx) = loaded(reference_fleet());
        assert!(handle_key_event(
            &mut state,
            &mut view_data,
            &tx,
            key(KeyCode::Char('q'))
        ));

        view_data.filter_input = Some(String::new());
        assert!(!handle_key_event(
            &mut state,
            &mut view_data,
            &tx,
            key(KeyCode::Char('q'))
        ));
        assert!(handle_key_event(
            &mut state,
            &mut view_data,
            &tx,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL)
        ));
    }

    #[test]
    fn help_swallows_keys_until_closed() {
        let (mut state, mut view_data, tx) = loaded(reference_fleet());
        press_all(
            &mut state,
            &mut view_data,
            &tx,
            &[key(KeyCode::Char('?')), key(KeyCode::Char('1'))],
        );
        assert!(view_data.help_visible);
        assert_eq!(state.sort, SortState::default());

        press_all(&mut state, &mut view_data, &tx, &[key(KeyCode::Esc)]);
        assert!(!view_data.help_visible);
    }

    #[test]
    fn action_for_key_maps_bindings() {
        assert_eq!(
            action_for_key(key(KeyCode::Char('2'))),
            Some(KeyAction::Sort(SortKey::Status))
        );
        assert_eq!(action_for_key(key(KeyCode::Down)), Some(KeyAction::MoveCursor(1)));
        assert_eq!(action_for_key(key(KeyCode::Char('+'))), Some(KeyAction::CyclePageSize));
        assert_eq!(action_for_key(key(KeyCode::Char('z'))), None);
    }

    #[test]
    fn stale_status_clear_is_ignored() {
        let mut state = DashboardState::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = mpsc::channel();

        emit_status(&mut state, &mut view_data, &tx, "first");
        emit_status(&mut state, &mut view_data, &tx, "second");
        tx.send(InternalEvent::ClearStatus { token: 1 })
            .expect("channel open");
        process_internal_events(&mut state, &mut view_data, &rx);
        assert_eq!(state.status_line.as_deref(), Some("second"));

        tx.send(InternalEvent::ClearStatus { token: 2 })
            .expect("channel open");
        process_internal_events(&mut state, &mut view_data, &rx);
        assert_eq!(state.status_line, None);
    }

    #[test]
    fn text_helpers() {
        assert_eq!(pagination_text(0, 5, 12), "rows per page: 5 | 1-5 of 12");
        assert_eq!(pagination_text(2, 5, 12), "rows per page: 5 | 11-12 of 12");
        assert_eq!(pagination_text(0, 5, 0), "rows per page: 5 | 0-0 of 0");

        assert_eq!(format_last_seen(0), "0 days ago");
        assert_eq!(format_last_seen(1), "1 day ago");
        assert_eq!(format_last_seen(12), "12 days ago");

        let counts = StatusCounts {
            online: 3,
            offline: 0,
            pending: 2,
        };
        assert_eq!(summary_text(&counts), "Online 3 | Pending 2 | Total 5");
        assert_eq!(summary_text(&StatusCounts::default()), "Total 0");

        let sort = SortState::new(SortKey::Status, SortDirection::Desc);
        assert_eq!(header_label(SortKey::Status, sort), "STATUS ▼");
        assert_eq!(header_label(SortKey::Name, sort), "DISPLAY NAME & ID");

        let mut state = DashboardState::default();
        assert!(status_text(&state).starts_with("1/2/3 sort"));
        state.status_line = Some("page 2 of 3".to_owned());
        assert!(status_text(&state).starts_with("page 2 of 3 | "));
    }

    #[test]
    fn render_draws_table_and_footer() -> Result<()> {
        let (mut state, mut view_data, tx) = loaded(reference_fleet());
        state.selected = Some(MachineId::from("n3"));
        press_all(&mut state, &mut view_data, &tx, &[key(KeyCode::Char('e'))]);

        let mut terminal = Terminal::new(TestBackend::new(120, 30))?;
        terminal.draw(|frame| render(frame, &state, &view_data, "demo"))?;
        let text = buffer_text(&terminal);

        assert!(text.contains("source: demo"));
        assert!(text.contains("n3 selected"));
        assert!(text.contains("STATUS ▲"));
        assert!(text.contains("rows per page: 5 | 1-5 of 7"));
        assert!(text.contains("machines (7)"));
        assert!(text.contains("Total"));
        assert!(text.contains("  id "));
        Ok(())
    }

    #[test]
    fn render_shows_loading_and_failure() -> Result<()> {
        let state = DashboardState::default();
        let mut view_data = ViewData::default();
        let mut terminal = Terminal::new(TestBackend::new(80, 20))?;

        terminal.draw(|frame| render(frame, &state, &view_data, "file x.json"))?;
        assert!(buffer_text(&terminal).contains("loading machines from file x.json"));

        view_data.load = LoadState::Failed("boom".to_owned());
        terminal.draw(|frame| render(frame, &state, &view_data, "file x.json"))?;
        assert!(buffer_text(&terminal).contains("load failed: boom"));
        Ok(())
    }
}
