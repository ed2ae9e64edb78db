pub mod miss_stats;
pub mod screen;

use handdrill::session::AnswerStatus;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame,
};

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// Draw whichever screen the app is on
pub fn draw(app: &mut App, f: &mut Frame) {
    screen::current_screen(&app.state).render(app, f);
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::LoadFailed => render_load_failed(self, area, buf),
            AppState::Quiz | AppState::Stats => render_quiz(self, area, buf),
        }
    }
}

fn render_load_failed(app: &App, area: Rect, buf: &mut Buffer) {
    let bold_red = Style::default().fg(Color::Red).add_modifier(Modifier::BOLD);
    let italic = Style::default().add_modifier(Modifier::ITALIC);

    let lines = vec![
        Line::from(Span::styled("Could not load the hand table", bold_red)),
        Line::from(""),
        Line::from(app.load_error.clone().unwrap_or_default()),
        Line::from(""),
        Line::from(Span::styled("(r)eload / (esc)ape", italic)),
    ];

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Min(5),
            Constraint::Percentage(35),
        ])
        .split(area);

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);
}

fn render_quiz(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(drill) = app.drill.as_ref() else {
        return;
    };

    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
    let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let underlined_bold_style = Style::default()
        .patch(bold_style)
        .add_modifier(Modifier::UNDERLINED);
    let italic_style = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // tally
            Constraint::Min(0),
            Constraint::Length(3), // hand
            Constraint::Length(1), // weight
            Constraint::Length(1), // question
            Constraint::Length(1),
            Constraint::Length(1), // candidates
            Constraint::Length(1),
            Constraint::Length(1), // feedback
            Constraint::Length(1), // persistence warning
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let tally = drill.tally();
    let accuracy = tally
        .accuracy()
        .map_or_else(|| "-".to_string(), |a| format!("{a}%"));
    Paragraph::new(Span::styled(
        format!(
            "answered {}   {} correct   {} misses on record",
            tally.answered,
            accuracy,
            drill.progress().total_misses()
        ),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    let Some(item) = drill.current_item() else {
        Paragraph::new("No hands to drill. Check the hand table.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray))
            .render(chunks[2], buf);
        return;
    };

    Paragraph::new(Span::styled(item.label.clone(), bold_style))
        .block(Block::default().borders(Borders::ALL).title(item.key.clone()))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    if app.settings.show_weights {
        let last = item
            .last_missed_at
            .as_deref()
            .map(|ts| {
                let ago = miss_stats::format_ago(ts, chrono::Utc::now());
                format!("   last missed {ago}")
            })
            .unwrap_or_default();
        Paragraph::new(Span::styled(format!("weight {}{last}", item.weight), dim_style))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    }

    Paragraph::new("How many players?")
        .alignment(Alignment::Center)
        .render(chunks[4], buf);

    let session = drill.session();
    let answered = session.status != AnswerStatus::Awaiting;
    let mut candidates = Vec::with_capacity(app.domain.len() * 2);
    for (idx, value) in app.domain.iter().enumerate() {
        let style = if answered {
            if *value == item.target {
                green_bold_style
            } else if session.selected == Some(*value) {
                red_bold_style
            } else {
                dim_style
            }
        } else if idx == app.cursor {
            underlined_bold_style
        } else {
            Style::default()
        };
        if idx > 0 {
            candidates.push(Span::raw("   "));
        }
        candidates.push(Span::styled(format!("{}:{}", idx + 1, value), style));
    }
    Paragraph::new(Line::from(candidates))
        .alignment(Alignment::Center)
        .render(chunks[6], buf);

    let feedback = match session.status {
        AnswerStatus::Awaiting => Span::raw(""),
        AnswerStatus::Correct => Span::styled(
            format!("correct: {} ({})", item.target, item.category),
            green_bold_style,
        ),
        AnswerStatus::Incorrect => Span::styled(
            format!("missed: the answer is {} ({})", item.target, item.category),
            red_bold_style,
        ),
    };
    Paragraph::new(feedback)
        .alignment(Alignment::Center)
        .render(chunks[8], buf);

    if let Some(err) = drill
        .last_persist_error()
        .or(app.storage_warning.as_deref())
    {
        Paragraph::new(Span::styled(
            format!("progress not saved: {err}"),
            Style::default().fg(Color::Yellow),
        ))
        .alignment(Alignment::Center)
        .render(chunks[9], buf);
    }

    let legend = if answered {
        "(enter/n) next / (s)tats / (esc)ape"
    } else {
        "(1-9) answer / (←/→) move / (enter) submit / (s)tats / (esc)ape"
    };
    Paragraph::new(Span::styled(legend, italic_style))
        .alignment(Alignment::Center)
        .render(chunks[11], buf);
}
