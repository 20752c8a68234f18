use crate::error::{Error, Result};
use crate::models::transaction::{Category, Transaction, TransactionType};
use crate::operations::delete_workflow::DeleteOutcome;
use crate::operations::filter::{self, TransactionFilter, parse_date_range};
use crate::session::Session;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::{Alignment, Color, Constraint, Direction, Layout, Modifier, Rect, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use std::cmp::{max, min};
use std::io;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortOrder {
    DateDesc,
    DateAsc,
}

impl SortOrder {
    fn toggle(self) -> Self {
        match self {
            SortOrder::DateDesc => SortOrder::DateAsc,
            SortOrder::DateAsc => SortOrder::DateDesc,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SortOrder::DateDesc => "date ↓",
            SortOrder::DateAsc => "date ↑",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    List,
    Details,
    Input(InputKind),
    ConfirmDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Category,
    DateRange,
}

struct BrowseState {
    mode: Mode,

    transactions: Vec<Transaction>,
    visible: Vec<usize>,

    table_state: TableState,

    filter: TransactionFilter,
    sort_order: SortOrder,

    input_buffer: String,
    input_error: Option<String>,

    status: Option<String>,

    // Rows that fit in the table, updated on every draw.
    last_page_size: usize,
}

impl BrowseState {
    fn new(transactions: Vec<Transaction>) -> Self {
        let mut state = Self {
            mode: Mode::List,
            transactions,
            visible: Vec::new(),
            table_state: TableState::default(),
            filter: TransactionFilter::default(),
            sort_order: SortOrder::DateDesc,
            input_buffer: String::new(),
            input_error: None,
            status: None,
            last_page_size: 10,
        };
        state.recompute();
        state
    }

    fn selected_transaction(&self) -> Option<&Transaction> {
        let selected = self.table_state.selected()?;
        let idx = *self.visible.get(selected)?;
        self.transactions.get(idx)
    }

    fn recompute(&mut self) {
        self.visible = (0..self.transactions.len())
            .filter(|&i| filter::matches(&self.transactions[i], &self.filter))
            .collect();

        let txs = &self.transactions;
        match self.sort_order {
            SortOrder::DateDesc => self
                .visible
                .sort_by(|&a, &b| txs[b].date.cmp(&txs[a].date).then_with(|| b.cmp(&a))),
            SortOrder::DateAsc => self
                .visible
                .sort_by(|&a, &b| txs[a].date.cmp(&txs[b].date).then_with(|| a.cmp(&b))),
        }

        if self.visible.is_empty() {
            self.table_state.select(None);
        } else {
            let selected = match self.table_state.selected() {
                Some(sel) => min(sel, self.visible.len().saturating_sub(1)),
                None => 0,
            };
            self.table_state.select(Some(selected));
        }
    }

    /// Picks up the session's snapshot after a mutation.
    fn sync(&mut self, session: &Session) {
        self.transactions = session.snapshot().to_vec();
        self.recompute();
    }

    fn move_selection(&mut self, delta: i32) {
        if self.visible.is_empty() {
            self.table_state.select(None);
            return;
        }

        let current = self.table_state.selected().unwrap_or(0) as i32;
        let max_index = self.visible.len().saturating_sub(1) as i32;
        let next = (current + delta).clamp(0, max_index) as usize;
        self.table_state.select(Some(next));
    }

    fn page_up(&mut self) {
        let page = max(1, self.last_page_size) as i32;
        self.move_selection(-page);
    }

    fn page_down(&mut self) {
        let page = max(1, self.last_page_size) as i32;
        self.move_selection(page);
    }

    fn cycle_type_filter(&mut self) {
        self.filter.transaction_type = match self.filter.transaction_type {
            None => Some(TransactionType::Expense),
            Some(TransactionType::Expense) => Some(TransactionType::Revenue),
            Some(TransactionType::Revenue) => None,
        };
        self.recompute();
    }

    fn clear_filters(&mut self) {
        if self.filter.is_empty() {
            return;
        }
        self.filter = TransactionFilter::default();
        self.status = Some("Filters cleared".to_string());
        self.recompute();
    }

    fn start_input(&mut self, kind: InputKind) {
        self.input_error = None;
        self.input_buffer = match kind {
            InputKind::Category => self
                .filter
                .category
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            InputKind::DateRange => {
                let from = self.filter.from.map(|d| d.to_string()).unwrap_or_default();
                let to = self.filter.to.map(|d| d.to_string()).unwrap_or_default();
                if from.is_empty() && to.is_empty() {
                    String::new()
                } else {
                    format!("{}..{}", from, to)
                }
            }
        };
        self.mode = Mode::Input(kind);
    }

    fn cancel_input(&mut self) {
        self.input_error = None;
        self.mode = Mode::List;
    }

    fn commit_input(&mut self, kind: InputKind) {
        let raw = self.input_buffer.trim();
        let applied = match kind {
            InputKind::Category if raw.is_empty() => {
                self.filter.category = None;
                Ok(())
            }
            InputKind::Category => Category::from_str(raw)
                .map(|c| self.filter.category = Some(c))
                .map_err(|e| e.to_string()),
            InputKind::DateRange if raw.is_empty() => {
                self.filter.from = None;
                self.filter.to = None;
                Ok(())
            }
            InputKind::DateRange => parse_date_range(raw).map(|(from, to)| {
                self.filter.from = from;
                self.filter.to = to;
            }),
        };

        match applied {
            Ok(()) => {
                self.input_error = None;
                self.mode = Mode::List;
                self.recompute();
            }
            Err(e) => self.input_error = Some(e),
        }
    }

    fn request_delete(&mut self, session: &mut Session) {
        if let Some(id) = self.selected_transaction().map(|t| t.id) {
            session.request_delete(id);
            self.mode = Mode::ConfirmDelete;
        }
    }

    fn confirm_delete(&mut self, session: &mut Session) {
        self.status = Some(match session.confirm_delete() {
            Ok(DeleteOutcome::Removed(tx)) => format!("Deleted {} {} on {}", tx.category, tx.amount, tx.date),
            Ok(DeleteOutcome::Missing(id)) => format!("Transaction {} was already gone", id),
            Ok(DeleteOutcome::NothingPending) => "Nothing to delete".to_string(),
            Err(e) => format!("Delete failed, press y to retry: {}", e),
        });
        if session.pending_delete().is_none() {
            self.mode = Mode::List;
        }
        self.sync(session);
    }

    fn cancel_delete(&mut self, session: &mut Session) {
        session.cancel_delete();
        self.status = Some("Delete cancelled".to_string());
        self.mode = Mode::List;
    }
}

pub fn run_browse(session: &mut Session) -> Result<()> {
    enable_raw_mode().map_err(|e| Error::Terminal(format!("Failed to enable raw mode: {}", e)))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)
        .map_err(|e| Error::Terminal(format!("Failed to enter alternate screen: {}", e)))?;

    let result = (|| -> Result<()> {
        let backend = ratatui::backend::CrosstermBackend::new(stdout);
        let mut terminal = ratatui::Terminal::new(backend)
            .map_err(|e| Error::Terminal(format!("Failed to initialize terminal: {}", e)))?;

        let mut state = BrowseState::new(session.snapshot().to_vec());

        loop {
            terminal
                .draw(|frame| {
                    let size = frame.area();
                    let layout = Layout::default()
                        .direction(Direction::Vertical)
                        .constraints([
                            Constraint::Length(3),
                            Constraint::Min(5),
                            Constraint::Length(3),
                        ])
                        .split(size);

                    render_header(frame, layout[0], &state);
                    render_table(frame, layout[1], &mut state);
                    render_footer(frame, layout[2], &state);

                    match state.mode {
                        Mode::Input(kind) => render_input_modal(frame, size, &state, kind),
                        Mode::Details => render_details_modal(frame, size, &state),
                        Mode::ConfirmDelete => render_confirm_modal(frame, size, session),
                        Mode::List => {}
                    }
                })
                .map_err(|e| Error::Terminal(format!("Failed to draw terminal UI: {}", e)))?;

            if event::poll(std::time::Duration::from_millis(200))
                .map_err(|e| Error::Terminal(format!("Failed to poll input: {}", e)))?
            {
                let event = event::read().map_err(|e| Error::Terminal(format!("Failed to read input: {}", e)))?;
                if let Event::Key(key) = event {
                    if handle_key(session, &mut state, key)? {
                        break;
                    }
                }
            }
        }

        Ok(())
    })();

    // Leaving the browser never leaves a delete pending.
    session.cancel_delete();

    disable_raw_mode().map_err(|e| Error::Terminal(format!("Failed to disable raw mode: {}", e)))?;
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen)
        .map_err(|e| Error::Terminal(format!("Failed to leave alternate screen: {}", e)))?;

    result
}

fn handle_key(session: &mut Session, state: &mut BrowseState, key: KeyEvent) -> Result<bool> {
    // Many terminals emit both a Press and a Release event. Only act on Press/Repeat.
    if key.kind == KeyEventKind::Release {
        return Ok(false);
    }

    match state.mode {
        Mode::List => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Up => state.move_selection(-1),
            KeyCode::Down => state.move_selection(1),
            KeyCode::PageUp => state.page_up(),
            KeyCode::PageDown => state.page_down(),
            KeyCode::Home => state.move_selection(i32::MIN / 2),
            KeyCode::End => state.move_selection(i32::MAX / 2),
            KeyCode::Enter => {
                if state.selected_transaction().is_some() {
                    state.mode = Mode::Details;
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => state.request_delete(session),
            KeyCode::Char('r') => {
                session.refresh()?;
                state.sync(session);
                state.status = Some("Reloaded from disk".to_string());
            }
            KeyCode::Char('c') => state.start_input(InputKind::Category),
            KeyCode::Char('f') => state.start_input(InputKind::DateRange),
            KeyCode::Char('t') => state.cycle_type_filter(),
            KeyCode::Char('s') => {
                state.sort_order = state.sort_order.toggle();
                state.recompute();
            }
            KeyCode::Char('x') => state.clear_filters(),
            _ => {}
        },
        Mode::Details => match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('b') => state.mode = Mode::List,
            KeyCode::Char('d') => state.request_delete(session),
            _ => {}
        },
        Mode::ConfirmDelete => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => state.confirm_delete(session),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => state.cancel_delete(session),
            _ => {}
        },
        Mode::Input(kind) => {
            // Allow Ctrl+C / Ctrl+Q to cancel
            if key.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
            {
                state.cancel_input();
                return Ok(false);
            }

            match key.code {
                KeyCode::Esc => state.cancel_input(),
                KeyCode::Enter => state.commit_input(kind),
                KeyCode::Backspace => {
                    state.input_buffer.pop();
                }
                KeyCode::Char(ch) => state.input_buffer.push(ch),
                _ => {}
            }
        }
    }

    Ok(false)
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn render_header(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState) {
    let category = state.filter.category.map(|c| c.name()).unwrap_or("(any)");
    let ttype = state
        .filter
        .transaction_type
        .map(|t| t.name())
        .unwrap_or("(any)");
    let from = state
        .filter
        .from
        .map(|d| d.to_string())
        .unwrap_or_else(|| "(any)".to_string());
    let to = state
        .filter
        .to
        .map(|d| d.to_string())
        .unwrap_or_else(|| "(any)".to_string());

    let line = Line::from(vec![
        Span::styled("Transactions", bold().fg(Color::Cyan)),
        Span::raw("  "),
        Span::raw(format!("Sort: {}", state.sort_order.label())),
        Span::raw("  |  "),
        Span::raw(format!("Category: {}", category)),
        Span::raw("  |  "),
        Span::raw(format!("Type: {}", ttype)),
        Span::raw("  |  "),
        Span::raw(format!("Date: {}..{}", from, to)),
        Span::raw("  |  "),
        Span::raw(format!("Rows: {}/{}", state.visible.len(), state.transactions.len())),
    ]);

    let block = Block::default().borders(Borders::ALL);
    frame.render_widget(Paragraph::new(line).block(block).alignment(Alignment::Left), area);
}

fn render_footer(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState) {
    let hint = match state.mode {
        Mode::List => "↑/↓ move  PgUp/PgDn page  Enter details  d delete  c category  f dates  t type  s sort  r reload  x clear  q/Esc exit",
        Mode::Details => "d delete  Esc/q/b back",
        Mode::Input(_) => "Type, Enter apply, Esc cancel",
        Mode::ConfirmDelete => "y confirm  n/Esc cancel",
    };

    let mut spans = vec![Span::raw(hint)];
    if let Some(ref status) = state.status {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Yellow)));
    }

    let block = Block::default().borders(Borders::ALL);
    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .block(block)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_table(frame: &mut ratatui::Frame, area: Rect, state: &mut BrowseState) {
    let block = Block::default().title("Transactions").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let header = Row::new([
        Cell::from("Date").style(bold()),
        Cell::from("Amount").style(bold()),
        Cell::from("Type").style(bold()),
        Cell::from("Category").style(bold()),
        Cell::from("Details").style(bold()),
        Cell::from("Id").style(bold()),
    ])
    .style(Style::default().fg(Color::White));

    let rows = state
        .visible
        .iter()
        .map(|&idx| &state.transactions[idx])
        .map(|tx| {
            let color = match tx.transaction_type {
                TransactionType::Revenue => Color::Green,
                TransactionType::Expense => Color::Red,
            };
            let mut details = tx.details.clone();
            if details.chars().count() > 42 {
                details = details.chars().take(39).collect::<String>() + "...";
            }
            let mut id_short = tx.id.to_string();
            id_short.truncate(8);

            Row::new([
                Cell::from(tx.date.to_string()),
                Cell::from(tx.amount.to_string()).style(Style::default().fg(color)),
                Cell::from(tx.transaction_type.name()),
                Cell::from(tx.category.name()),
                Cell::from(details),
                Cell::from(id_short),
            ])
        });

    // Leave room for the header row.
    state.last_page_size = max(1, inner.height.saturating_sub(2) as usize);

    let widths = [
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(14),
        Constraint::Percentage(40),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(bold().bg(Color::DarkGray).fg(Color::White))
        .highlight_symbol("➤ ")
        .column_spacing(1);

    frame.render_stateful_widget(table, inner, &mut state.table_state);

    if state.visible.is_empty() {
        let empty = Paragraph::new(if state.transactions.is_empty() {
            "No transactions recorded yet. Use `add` in the shell to create one."
        } else {
            "No transactions match the current filters"
        })
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
    }
}

fn render_input_modal(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState, kind: InputKind) {
    let popup_area = centered_rect(80, 30, area);
    frame.render_widget(Clear, popup_area);

    let (title, help) = match kind {
        InputKind::Category => ("Filter Category", "Enter category name (empty clears)"),
        InputKind::DateRange => (
            "Filter Date Range",
            "Enter range like 2025-01-01..2025-01-31 (empty clears)",
        ),
    };

    let mut lines = vec![
        Line::from(Span::styled(title, bold())),
        Line::from(help),
        Line::from(""),
        Line::from(Span::styled(
            format!("> {}", state.input_buffer),
            Style::default().fg(Color::Yellow),
        )),
    ];

    if let Some(ref err) = state.input_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
    }

    let block = Block::default().borders(Borders::ALL).title("Input");
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true }),
        popup_area,
    );
}

fn transaction_lines(tx: &Transaction) -> Vec<Line<'static>> {
    vec![
        Line::from(format!("Id: {}", tx.id)),
        Line::from(format!("Date: {}", tx.date)),
        Line::from(format!("Type: {}", tx.transaction_type)),
        Line::from(format!("Category: {}", tx.category)),
        Line::from(format!("Amount: {}", tx.amount)),
        Line::from(""),
        Line::from("Details:"),
        Line::from(if tx.details.is_empty() {
            "(none)".to_string()
        } else {
            tx.details.clone()
        }),
    ]
}

fn render_details_modal(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState) {
    let popup_area = centered_rect(90, 60, area);
    frame.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled("Transaction Details", bold().fg(Color::Cyan))),
        Line::from(""),
    ];
    match state.selected_transaction() {
        Some(tx) => lines.extend(transaction_lines(tx)),
        None => lines.push(Line::from("No selection")),
    }

    let block = Block::default().borders(Borders::ALL).title("Details");
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false }),
        popup_area,
    );
}

fn render_confirm_modal(frame: &mut ratatui::Frame, area: Rect, session: &Session) {
    let popup_area = centered_rect(70, 50, area);
    frame.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled("Delete this transaction?", bold().fg(Color::Red))),
        Line::from(""),
    ];
    match session.pending_transaction() {
        Some(tx) => lines.extend(transaction_lines(tx)),
        None => lines.push(Line::from("The transaction no longer exists.")),
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "This cannot be undone. y to delete, n to keep.",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default().borders(Borders::ALL).title("Confirm delete");
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false }),
        popup_area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
