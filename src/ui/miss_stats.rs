use chrono::{DateTime, Utc};
use handdrill::session::MissSummary;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::App;

const MIN_CATEGORY_WIDTH: u16 = 8;

/// Pure presenter for a single most-missed row
pub fn present_row(data: &MissSummary, now: DateTime<Utc>) -> Row<'static> {
    let miss_color = if data.misses >= 5 {
        Color::Red
    } else if data.misses >= 3 {
        Color::Yellow
    } else {
        Color::Green
    };

    Row::new(vec![
        Cell::from(data.key.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(data.label.clone()),
        Cell::from(data.category.clone()),
        Cell::from(
            data.target
                .map_or_else(|| "-".to_string(), |t| t.to_string()),
        ),
        Cell::from(data.misses.to_string()).style(Style::default().fg(miss_color)),
        Cell::from(
            data.last_missed_at
                .as_deref()
                .map_or_else(|| "-".to_string(), |ts| format_ago(ts, now)),
        ),
    ])
}

/// Human-friendly age of an RFC 3339 timestamp. Unparseable input is shown
/// as-is.
pub fn format_ago(timestamp: &str, now: DateTime<Utc>) -> String {
    let Ok(then) = DateTime::parse_from_rfc3339(timestamp) else {
        return timestamp.to_string();
    };
    let elapsed = now.signed_duration_since(then.with_timezone(&Utc));

    if elapsed.num_seconds() < 60 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else {
        format!("{}d ago", elapsed.num_days())
    }
}

/// Display width of the widest category, so CJK color names line up.
pub fn category_width(rows: &[MissSummary]) -> u16 {
    rows.iter()
        .map(|r| r.category.width() as u16)
        .max()
        .unwrap_or(0)
        .max(MIN_CATEGORY_WIDTH)
}

/// Render the most-missed hands screen
pub fn render_miss_stats(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Table
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let (summary, total) = match app.drill.as_ref() {
        Some(drill) => (drill.most_missed(usize::MAX), drill.progress().total_misses()),
        None => (Vec::new(), 0),
    };

    let title = Paragraph::new(format!("Most Missed Hands ({total} misses recorded)"))
        .block(Block::default().borders(Borders::ALL).title("Stats"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if summary.is_empty() {
        let no_data = Paragraph::new("No misses recorded yet.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let table_height = chunks[1].height.saturating_sub(3) as usize; // borders + header
        let max_scroll = summary.len().saturating_sub(table_height);
        if app.stats_state.scroll_offset > max_scroll {
            app.stats_state.scroll_offset = max_scroll;
        }

        let header = Row::new(vec![
            Cell::from("Hand"),
            Cell::from("Label"),
            Cell::from("Color"),
            Cell::from("Players"),
            Cell::from("Misses"),
            Cell::from("Last Missed"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let now = Utc::now();
        let visible_rows: Vec<Row> = summary
            .iter()
            .skip(app.stats_state.scroll_offset)
            .take(table_height)
            .map(|row| present_row(row, now))
            .collect();

        let widths = [
            Constraint::Length(6),
            Constraint::Length(14),
            Constraint::Length(category_width(&summary)),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Min(10),
        ];

        let table = Table::new(visible_rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Misses"))
            .column_spacing(2);
        f.render_widget(table, chunks[1]);
    }

    let instructions = Paragraph::new(
        "(↑/↓) scroll  (PgUp/PgDn) page  (Home) top  (x) erase progress  (b/backspace) back",
    )
    .alignment(Alignment::Center)
    .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}
