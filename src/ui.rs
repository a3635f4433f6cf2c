use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::app::{App, InputMode, LocationState, QUICK_FILLS};
use crate::render::render_message;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.notice.is_some() {
        render_notice(app, frame, area);
    }
}

fn location_indicator(app: &App) -> Span<'static> {
    match app.location {
        LocationState::Present(_) => Span::styled(
            " ◉ Live Location Enabled ",
            Style::default().fg(Color::LightBlue).bold(),
        ),
        LocationState::Loading => {
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            Span::styled(
                format!(" Determining location{} ", dots),
                Style::default().fg(Color::Gray),
            )
        }
        LocationState::Absent => Span::styled(
            " Enable Location (l) ",
            Style::default().fg(Color::Yellow),
        ),
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" GeoGuide AI ", Style::default().fg(Color::Green).bold()),
        Span::styled("Map Expert System ", Style::default().fg(Color::Gray)),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("│"),
        location_indicator(app),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", app.model_name));

    let mut lines: Vec<Line> = app
        .conversation
        .messages()
        .iter()
        .flat_map(render_message)
        .collect();

    if app.pending {
        lines.push(Line::from(Span::styled(
            "GeoGuide",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if app.pending {
        Color::DarkGray
    } else if editing {
        Color::Yellow
    } else {
        Color::Gray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ask about a place, restaurant, or geographical fact ");

    // Horizontal scrolling keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || app.cursor < inner_width {
        0
    } else {
        app.cursor - inner_width + 1
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if editing && app.notice.is_none() {
        let cursor_x = (app.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" VIEW ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" ASK ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        InputMode::Normal => {
            let mut hints = vec![
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
            ];
            for (i, (label, _)) in QUICK_FILLS.iter().enumerate() {
                hints.push(Span::styled(format!(" {} ", i + 1), key_style));
                hints.push(Span::styled(format!(" {} ", label), label_style));
            }
            if app.location == LocationState::Absent {
                hints.push(Span::styled(" l ", key_style));
                hints.push(Span::styled(" locate ", label_style));
            }
            hints.push(Span::styled(" q ", key_style));
            hints.push(Span::styled(" quit ", label_style));
            hints
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)];
    spans.append(&mut hints);

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    let Some(notice) = app.notice.as_deref() else {
        return;
    };

    // Centered popup
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 6.min(area.height);
    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Location unavailable ");

    let text = Text::from(vec![
        Line::from(notice.to_string()),
        Line::default(),
        Line::from(Span::styled(
            "Press Enter to dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    let popup = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(popup, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::FakeAnswers;
    use crate::app::LOCATION_NOTICE;
    use crate::location::NoLocation;
    use crate::state::UserLocation;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn new_app() -> App {
        App::new(
            Arc::new(FakeAnswers::replying("ok")),
            Arc::new(NoLocation),
            "gemini-2.5-flash",
        )
    }

    #[test]
    fn test_screen_shows_greeting_and_location_action() {
        let mut app = new_app();
        let screen = draw(&mut app);
        assert!(screen.contains("GeoGuide AI"));
        assert!(screen.contains("Enable Location (l)"));
        assert!(screen.contains("gemini-2.5-flash"));
        assert!(screen.contains("Hello! I'm GeoGuide AI"));
        assert_eq!(app.chat_width, 98);
    }

    #[test]
    fn test_header_reflects_location_state() {
        let mut app = new_app();
        app.location = LocationState::Loading;
        assert!(draw(&mut app).contains("Determining location"));

        app.location = LocationState::Present(UserLocation::new(1.0, 2.0));
        assert!(draw(&mut app).contains("Live Location Enabled"));
    }

    #[test]
    fn test_pending_shows_thinking_indicator() {
        let mut app = new_app();
        app.begin_submission("Where is Lisbon?").unwrap();
        let screen = draw(&mut app);
        assert!(screen.contains("Where is Lisbon?"));
        assert!(screen.contains("Thinking."));
    }

    #[test]
    fn test_notice_popup_is_drawn() {
        let mut app = new_app();
        app.notice = Some(LOCATION_NOTICE.to_string());
        let screen = draw(&mut app);
        assert!(screen.contains("Location unavailable"));
        assert!(screen.contains("Press Enter to dismiss"));
    }
}
