use charla_core::Role;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, InputMode, Screen};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Connect => render_connect_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let endpoint = app
        .session
        .as_ref()
        .map(|s| format!(" {} ", s.endpoint().url()))
        .unwrap_or_default();

    let title = Line::from(vec![
        Span::styled(" charla ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(endpoint, Style::default().fg(Color::White)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Connect => " CONNECT ",
        Screen::Chat => " CHAT ",
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match (app.screen, app.input_mode) {
        (Screen::Connect, InputMode::Editing) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" connect ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" normal ", label_style),
        ],
        (Screen::Connect, InputMode::Normal) => vec![
            Span::styled(" i ", key_style),
            Span::styled(" edit URL ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        (Screen::Chat, InputMode::Editing) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" normal ", label_style),
        ],
        (Screen::Chat, InputMode::Normal) => vec![
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" disconnect ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    spans.extend(hints);

    let footer = Paragraph::new(Line::from(spans));
    frame.render_widget(footer, area);
}

fn render_connect_screen(app: &App, frame: &mut Frame, area: Rect) {
    // A short centered column: label, input box, status line
    let [_, label_area, input_area, status_area, _] = Layout::vertical([
        Constraint::Percentage(30),
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Length(2),
        Constraint::Min(0),
    ])
    .areas(area);

    let [_, label_area] = pad_horizontal(label_area);
    let [_, input_area] = pad_horizontal(input_area);
    let [_, status_area] = pad_horizontal(status_area);

    frame.render_widget(Paragraph::new("Enter Server URL:"), label_area);

    let input_border_color = if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color));

    let inner_width = input_area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_col) = visible_slice(&app.url_input, app.url_cursor, inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, input_area);

    if app.input_mode == InputMode::Editing && !app.is_connecting() {
        frame.set_cursor(input_area.x + 1 + cursor_col as u16, input_area.y + 1);
    }

    let status = if app.is_connecting() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        Line::from(Span::styled(
            format!("Connecting{}", dots),
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        ))
    } else if let Some(error) = &app.connect_error {
        Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Red),
        ))
    } else {
        Line::from(Span::styled(
            "Enter to connect",
            Style::default().fg(Color::Gray),
        ))
    };
    frame.render_widget(Paragraph::new(status), status_area);
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    // Store transcript dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let turns = app.session.as_ref().map(|s| s.turns()).unwrap_or_default();

    let chat_text = if turns.is_empty() && !app.is_sending() {
        Text::from(Span::styled(
            "Type a message...",
            Style::default().fg(Color::Gray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for turn in &turns {
            let (label, style) = match turn.role {
                Role::User => (
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
                Role::Server => (
                    "Server:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ),
                Role::Error => (
                    "Error:",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
            };
            lines.push(Line::from(Span::styled(label, style)));
            let turn_style = if turn.role == Role::Error {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            for line in turn.text.lines() {
                lines.push(Line::from(Span::styled(line.to_string(), turn_style)));
            }
            lines.push(Line::default());
        }

        if app.is_sending() {
            lines.push(Line::from(Span::styled(
                "Server:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    // Message input at the bottom
    let input_border_color = if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" Message ");

    let inner_width = input_area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_col) =
        visible_slice(&app.message_input, app.message_cursor, inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, input_area);

    if app.input_mode == InputMode::Editing {
        frame.set_cursor(input_area.x + 1 + cursor_col as u16, input_area.y + 1);
    }
}

/// Narrow columns on wide terminals so the connect form doesn't stretch
/// edge to edge.
fn pad_horizontal(area: Rect) -> [Rect; 2] {
    let width = area.width.min(72);
    let [pad, body, _] = Layout::horizontal([
        Constraint::Length((area.width.saturating_sub(width)) / 2),
        Constraint::Length(width),
        Constraint::Min(0),
    ])
    .areas(area);
    [pad, body]
}

/// Visible portion of a single-line input, scrolled horizontally so the
/// cursor stays inside the box. Returns the slice and the cursor column
/// within it.
fn visible_slice(input: &str, cursor: usize, inner_width: usize) -> (String, usize) {
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor >= inner_width {
        cursor - inner_width + 1
    } else {
        0
    };

    let visible: String = input.chars().skip(scroll_offset).take(inner_width).collect();
    (visible, cursor - scroll_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_slice_scrolls_to_keep_the_cursor_in_view() {
        let input = "0123456789";

        let (text, col) = visible_slice(input, 3, 10);
        assert_eq!(text, "0123456789");
        assert_eq!(col, 3);

        let (text, col) = visible_slice(input, 10, 5);
        assert_eq!(text, "6789");
        assert_eq!(col, 4);

        let (text, col) = visible_slice("", 0, 5);
        assert_eq!(text, "");
        assert_eq!(col, 0);
    }
}
