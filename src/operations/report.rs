use crate::error::{Error, Result};
use crate::models::transaction::{Category, TransactionType};
use crate::operations::aggregate::{MonthTotals, Summary, TimePoint, YearMonth};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::widgets::canvas::{Canvas, Points};
use ratatui::{
    prelude::{Alignment, Color, Constraint, Direction, Layout, Modifier, Rect, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::io;

const REVENUE_COLOR: Color = Color::Green;
const EXPENSE_COLOR: Color = Color::Red;

struct ReportData {
    summary: Summary,
    months: Vec<(YearMonth, MonthTotals)>,
    balance: Vec<(f64, f64)>,
    category_colors: HashMap<Category, Color>,
}

fn build_report(summary: Summary) -> ReportData {
    let months = summary.monthly.iter().map(|(k, v)| (*k, *v)).collect();
    let balance = balance_points(&summary.series);

    let mut categories: Vec<Category> = summary
        .expenses_by_category
        .keys()
        .chain(summary.revenue_by_category.keys())
        .copied()
        .collect();
    categories.sort();
    categories.dedup();
    let category_colors = assign_colors(&categories);

    ReportData {
        summary,
        months,
        balance,
        category_colors,
    }
}

/// Running net balance after each day that has transactions.
///
/// x is the number of days since the first transaction.
fn balance_points(series: &[TimePoint]) -> Vec<(f64, f64)> {
    let Some(first) = series.first() else {
        return Vec::new();
    };

    let mut points: Vec<(f64, f64)> = Vec::new();
    let mut balance = Decimal::ZERO;
    for point in series {
        match point.transaction_type {
            TransactionType::Revenue => balance = balance.saturating_add(point.amount),
            TransactionType::Expense => balance = balance.saturating_sub(point.amount),
        }
        let x = (point.date - first.date).num_days() as f64;
        let y = balance.to_f64().unwrap_or(0.0);
        match points.last_mut() {
            Some(last) if last.0 == x => last.1 = y,
            _ => points.push((x, y)),
        }
    }
    points
}

fn assign_colors(categories: &[Category]) -> HashMap<Category, Color> {
    let palette = [
        Color::Cyan,
        Color::Magenta,
        Color::Yellow,
        Color::Green,
        Color::Blue,
        Color::Red,
        Color::LightCyan,
    ];

    categories
        .iter()
        .enumerate()
        .map(|(idx, category)| (*category, palette[idx % palette.len()]))
        .collect()
}

fn scaled_height(value: Decimal, max_value: f64, bar_height: usize) -> usize {
    let value = value.to_f64().unwrap_or(0.0);
    if value <= 0.0 || max_value <= 0.0 {
        return 0;
    }
    ((value / max_value * bar_height as f64).ceil() as usize).min(bar_height)
}

pub fn run_report(summary: Summary) -> Result<()> {
    let data = build_report(summary);

    enable_raw_mode().map_err(|e| Error::Terminal(format!("Failed to enable raw mode: {}", e)))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)
        .map_err(|e| Error::Terminal(format!("Failed to enter alternate screen: {}", e)))?;

    let result = (|| -> Result<()> {
        let backend = ratatui::backend::CrosstermBackend::new(stdout);
        let mut terminal = ratatui::Terminal::new(backend)
            .map_err(|e| Error::Terminal(format!("Failed to initialize terminal: {}", e)))?;

        loop {
            terminal
                .draw(|frame| {
                    let size = frame.area();
                    let layout = Layout::default()
                        .direction(Direction::Vertical)
                        .constraints([
                            Constraint::Length(3),
                            Constraint::Percentage(50),
                            Constraint::Min(6),
                        ])
                        .split(size);

                    render_metrics(frame, layout[0], &data);

                    let middle = Layout::default()
                        .direction(Direction::Horizontal)
                        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                        .split(layout[1]);
                    render_monthly_bars(frame, middle[0], &data);
                    render_balance_chart(frame, middle[1], &data);

                    let bottom = Layout::default()
                        .direction(Direction::Horizontal)
                        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                        .split(layout[2]);
                    render_pie_chart(frame, bottom[0], &data);
                    render_category_table(frame, bottom[1], &data);
                })
                .map_err(|e| Error::Terminal(format!("Failed to draw terminal UI: {}", e)))?;

            if event::poll(std::time::Duration::from_millis(250))
                .map_err(|e| Error::Terminal(format!("Failed to poll input: {}", e)))?
            {
                match event::read().map_err(|e| Error::Terminal(format!("Failed to read input: {}", e)))? {
                    Event::Key(key) if key.kind == KeyEventKind::Release => {}
                    Event::Key(key) if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) => break,
                    _ => {}
                }
            }
        }

        Ok(())
    })();

    disable_raw_mode().map_err(|e| Error::Terminal(format!("Failed to disable raw mode: {}", e)))?;
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen)
        .map_err(|e| Error::Terminal(format!("Failed to leave alternate screen: {}", e)))?;

    result
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn empty_notice(frame: &mut ratatui::Frame, area: Rect) {
    frame.render_widget(
        Paragraph::new("No transactions recorded yet").alignment(Alignment::Center),
        area,
    );
}

fn render_metrics(frame: &mut ratatui::Frame, area: Rect, data: &ReportData) {
    let summary = &data.summary;
    let net_color = if summary.net_income < Decimal::ZERO {
        EXPENSE_COLOR
    } else {
        REVENUE_COLOR
    };
    let line = Line::from(vec![
        Span::styled("Overview", bold().fg(Color::Cyan)),
        Span::raw("  "),
        Span::styled(format!("Revenue {:.2}", summary.total_revenue), Style::default().fg(REVENUE_COLOR)),
        Span::raw("  |  "),
        Span::styled(format!("Expenses {:.2}", summary.total_expenses), Style::default().fg(EXPENSE_COLOR)),
        Span::raw("  |  "),
        Span::styled(format!("Net {:.2}", summary.net_income), bold().fg(net_color)),
        Span::raw("  |  "),
        Span::raw(format!("{} transactions", summary.transactions)),
        Span::raw("  (press q to exit)"),
    ]);
    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn render_monthly_bars(frame: &mut ratatui::Frame, area: Rect, data: &ReportData) {
    let block = Block::default()
        .title(Line::from(vec![
            Span::raw("Monthly "),
            Span::styled("revenue", Style::default().fg(REVENUE_COLOR)),
            Span::raw(" / "),
            Span::styled("expenses", Style::default().fg(EXPENSE_COLOR)),
        ]))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if data.months.is_empty() {
        empty_notice(frame, inner);
        return;
    }

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);
    let bar_height = parts[0].height as usize;
    if bar_height == 0 {
        return;
    }

    // Most recent months win when there is not enough room for all of them.
    let slot_width = 8usize;
    let max_slots = (parts[0].width as usize / slot_width).max(1);
    let shown = &data.months[data.months.len().saturating_sub(max_slots)..];

    let max_value = shown
        .iter()
        .flat_map(|(_, totals)| [totals.revenue, totals.expense])
        .map(|v| v.to_f64().unwrap_or(0.0))
        .fold(0.0_f64, f64::max);

    let bar_width = (slot_width - 2) / 2;
    let mut lines: Vec<Line> = Vec::new();
    for row in 0..bar_height {
        let level = bar_height - row;
        let mut spans = Vec::new();
        for (_, totals) in shown {
            for (value, color) in [(totals.revenue, REVENUE_COLOR), (totals.expense, EXPENSE_COLOR)] {
                if scaled_height(value, max_value, bar_height) >= level {
                    spans.push(Span::styled("█".repeat(bar_width), Style::default().fg(color)));
                } else {
                    spans.push(Span::raw(" ".repeat(bar_width)));
                }
            }
            spans.push(Span::raw(" ".repeat(slot_width - 2 * bar_width)));
        }
        lines.push(Line::from(spans));
    }
    frame.render_widget(Paragraph::new(lines), parts[0]);

    let labels: Vec<Span> = shown
        .iter()
        .map(|(month, _)| {
            let mut label = month.to_string();
            label.truncate(slot_width - 1);
            Span::raw(format!("{:width$}", label, width = slot_width))
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(labels)), parts[1]);
}

fn render_balance_chart(frame: &mut ratatui::Frame, area: Rect, data: &ReportData) {
    let block = Block::default().title("Net balance over time").borders(Borders::ALL);
    if data.balance.is_empty() {
        let inner = block.inner(area);
        frame.render_widget(block, area);
        empty_notice(frame, inner);
        return;
    }

    let x_max = data.balance.last().map(|p| p.0).unwrap_or(0.0).max(1.0);
    let (y_min, y_max) = data
        .balance
        .iter()
        .fold((0.0_f64, 0.0_f64), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
    let (y_min, y_max) = if y_min == y_max { (y_min - 1.0, y_max + 1.0) } else { (y_min, y_max) };

    let first_date = data.summary.series.first().map(|p| p.date.to_string()).unwrap_or_default();
    let last_date = data.summary.series.last().map(|p| p.date.to_string()).unwrap_or_default();

    let dataset = Dataset::default()
        .name("net")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data.balance);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels(vec![Span::raw(first_date), Span::raw(last_date)]),
        )
        .y_axis(
            Axis::default()
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{:.0}", y_min)),
                    Span::raw(format!("{:.0}", y_max)),
                ]),
        );
    frame.render_widget(chart, area);
}

fn render_pie_chart(frame: &mut ratatui::Frame, area: Rect, data: &ReportData) {
    let block = Block::default().title("Expense share").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let total = data.summary.total_expenses.to_f64().unwrap_or(0.0);
    if total <= 0.0 {
        frame.render_widget(
            Paragraph::new("No expenses recorded").alignment(Alignment::Center),
            inner,
        );
        return;
    }

    let mut slices = Vec::new();
    let mut start_angle = 0.0_f64;
    for (category, amount) in &data.summary.expenses_by_category {
        let ratio = amount.to_f64().unwrap_or(0.0) / total;
        let sweep = ratio * std::f64::consts::TAU;
        slices.push((start_angle, start_angle + sweep, *category));
        start_angle += sweep;
    }

    let canvas = Canvas::default()
        .x_bounds([-1.0, 1.0])
        .y_bounds([-1.0, 1.0])
        .paint(|ctx| {
            let step = 0.04;
            for (start, end, category) in &slices {
                let color = data
                    .category_colors
                    .get(category)
                    .copied()
                    .unwrap_or(Color::White);
                let mut points = Vec::new();
                let mut r = 0.0; // 0 is the center, 1 the edge
                while r <= 1.0 {
                    let mut angle = *start;
                    while angle <= *end {
                        points.push((r * angle.cos(), r * angle.sin()));
                        angle += 0.05;
                    }
                    r += step;
                }
                if !points.is_empty() {
                    ctx.draw(&Points { coords: &points, color });
                }
            }
        });

    frame.render_widget(canvas, inner);
}

fn render_category_table(frame: &mut ratatui::Frame, area: Rect, data: &ReportData) {
    let block = Block::default().title("By category").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let summary = &data.summary;
    if summary.revenue_by_category.is_empty() && summary.expenses_by_category.is_empty() {
        empty_notice(frame, inner);
        return;
    }

    let mut lines = Vec::new();
    for (title, groups, title_color) in [
        ("Revenue", &summary.revenue_by_category, REVENUE_COLOR),
        ("Expenses", &summary.expenses_by_category, EXPENSE_COLOR),
    ] {
        if groups.is_empty() {
            continue;
        }
        lines.push(Line::from(Span::styled(title, bold().fg(title_color))));
        for (category, amount) in groups {
            let color = data
                .category_colors
                .get(category)
                .copied()
                .unwrap_or(Color::White);
            lines.push(Line::from(vec![
                Span::styled(format!("  {:15}", category.name()), Style::default().fg(color)),
                Span::styled(format!("{:>12.2}", amount), Style::default().fg(color)),
            ]));
        }
    }

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Left), inner);
}
