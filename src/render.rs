//! Message renderer
//!
//! Turns one [`Message`] into styled terminal lines. Rendering is pure: the
//! same message always yields the same lines and is never modified.

use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::state::{Citation, MapCitation, Message, WebCitation};

pub const SEARCHING_PLACEHOLDER: &str = "Searching for location data...";
pub const MAP_GROUP_LABEL: &str = "Verified Map Data";
pub const WEB_GROUP_LABEL: &str = "Research Sources";
pub const MAP_TITLE_FALLBACK: &str = "Explore on Google Maps";
pub const WEB_TITLE_FALLBACK: &str = "View Source";

const USER_LABEL: &str = "You";
const MODEL_LABEL: &str = "GeoGuide";

/// Split citations into map and web groups, keeping input order within each
pub fn partition_citations(citations: &[Citation]) -> (Vec<&MapCitation>, Vec<&WebCitation>) {
    let mut maps = Vec::new();
    let mut webs = Vec::new();
    for citation in citations {
        match citation {
            Citation::Map(map) => maps.push(map),
            Citation::Web(web) => webs.push(web),
        }
    }
    (maps, webs)
}

fn header_line(message: &Message) -> Line<'static> {
    let (label, color) = if message.is_user() {
        (USER_LABEL, Color::Cyan)
    } else {
        (MODEL_LABEL, Color::Green)
    };
    let line = Line::from(vec![
        Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", message.timestamp.format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    if message.is_user() {
        line.alignment(Alignment::Right)
    } else {
        line
    }
}

fn group_label(label: &'static str, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled("● ", Style::default().fg(color)),
        Span::styled(
            label.to_uppercase(),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        ),
    ])
}

fn link_line(uri: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!("    {}", uri),
        Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::UNDERLINED),
    ))
}

fn render_map_citation(map: &MapCitation, lines: &mut Vec<Line<'static>>) {
    let title = map.title.as_deref().unwrap_or(MAP_TITLE_FALLBACK);
    lines.push(Line::from(vec![
        Span::styled("  ◆ ", Style::default().fg(Color::Green)),
        Span::styled(
            title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]));
    lines.push(link_line(&map.uri));
    if let Some(snippet) = map.review_snippets.first() {
        lines.push(Line::from(Span::styled(
            format!("    \"{}\"", snippet),
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        )));
    }
}

fn render_web_citation(web: &WebCitation, lines: &mut Vec<Line<'static>>) {
    let title = web.title.as_deref().unwrap_or(WEB_TITLE_FALLBACK);
    lines.push(Line::from(vec![
        Span::styled("  ↗ ", Style::default().fg(Color::Magenta)),
        Span::raw(title.to_string()),
    ]));
    lines.push(link_line(&web.uri));
}

/// Render one message: header, content, then grounding groups for answers
pub fn render_message(message: &Message) -> Vec<Line<'static>> {
    let mut lines = vec![header_line(message)];

    if message.is_user() {
        for line in message.content.split('\n') {
            lines.push(Line::from(line.to_string()).alignment(Alignment::Right));
        }
    } else if message.content.is_empty() {
        lines.push(Line::from(Span::styled(
            SEARCHING_PLACEHOLDER,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    } else {
        // Verbatim: no markup, trailing empty lines kept
        for line in message.content.split('\n') {
            lines.push(Line::from(line.to_string()));
        }
    }

    if !message.is_user() {
        let (maps, webs) = partition_citations(message.citations());

        if !maps.is_empty() {
            lines.push(Line::default());
            lines.push(group_label(MAP_GROUP_LABEL, Color::Green));
            for map in maps {
                render_map_citation(map, &mut lines);
            }
        }

        if !webs.is_empty() {
            lines.push(Line::default());
            lines.push(group_label(WEB_GROUP_LABEL, Color::Magenta));
            for web in webs {
                render_web_citation(web, &mut lines);
            }
        }
    }

    lines.push(Line::default());
    lines
}

/// Flatten rendered lines to plain text, one line per row
pub fn render_plain(lines: &[Line<'_>]) -> String {
    lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(uri: &str, title: Option<&str>, reviews: &[&str]) -> Citation {
        Citation::Map(MapCitation {
            uri: uri.to_string(),
            title: title.map(String::from),
            review_snippets: reviews.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn web(uri: &str, title: Option<&str>) -> Citation {
        Citation::Web(WebCitation {
            uri: uri.to_string(),
            title: title.map(String::from),
        })
    }

    fn plain(message: &Message) -> String {
        render_plain(&render_message(message))
    }

    #[test]
    fn test_partition_keeps_relative_order() {
        let citations = vec![
            web("w1", None),
            map("m1", None, &[]),
            web("w2", None),
            map("m2", None, &[]),
        ];
        let (maps, webs) = partition_citations(&citations);
        let map_uris: Vec<&str> = maps.iter().map(|m| m.uri.as_str()).collect();
        let web_uris: Vec<&str> = webs.iter().map(|w| w.uri.as_str()).collect();
        assert_eq!(map_uris, vec!["m1", "m2"]);
        assert_eq!(web_uris, vec!["w1", "w2"]);
        assert_eq!(maps.len() + webs.len(), citations.len());
    }

    #[test]
    fn test_groups_omitted_without_citations() {
        let none = plain(&Message::model("Plain answer", None));
        let empty = plain(&Message::model("Plain answer", Some(Vec::new())));
        for text in [none, empty] {
            assert!(text.contains("Plain answer"));
            assert!(!text.contains(&MAP_GROUP_LABEL.to_uppercase()));
            assert!(!text.contains(&WEB_GROUP_LABEL.to_uppercase()));
        }
    }

    #[test]
    fn test_only_populated_group_is_rendered() {
        let text = plain(&Message::model(
            "See:",
            Some(vec![web("https://example.com", Some("Example"))]),
        ));
        assert!(text.contains(&WEB_GROUP_LABEL.to_uppercase()));
        assert!(!text.contains(&MAP_GROUP_LABEL.to_uppercase()));
        assert!(text.contains("Example"));
        assert!(text.contains("https://example.com"));
    }

    #[test]
    fn test_map_card_shows_first_review_quoted() {
        let text = plain(&Message::model(
            "Try these",
            Some(vec![map(
                "https://maps.google.com/?cid=7",
                None,
                &["Best carbonara in town", "Too loud"],
            )]),
        ));
        assert!(text.contains(MAP_TITLE_FALLBACK));
        assert!(text.contains("https://maps.google.com/?cid=7"));
        assert!(text.contains("\"Best carbonara in town\""));
        assert!(!text.contains("Too loud"));
    }

    #[test]
    fn test_web_title_fallback() {
        let text = plain(&Message::model("x", Some(vec![web("https://a.example", None)])));
        assert!(text.contains(WEB_TITLE_FALLBACK));
    }

    #[test]
    fn test_map_group_precedes_web_group() {
        let text = plain(&Message::model(
            "x",
            Some(vec![web("https://w.example", None), map("https://m.example", None, &[])]),
        ));
        let map_pos = text.find(&MAP_GROUP_LABEL.to_uppercase()).unwrap();
        let web_pos = text.find(&WEB_GROUP_LABEL.to_uppercase()).unwrap();
        assert!(map_pos < web_pos);
    }

    #[test]
    fn test_empty_answer_shows_placeholder() {
        let text = plain(&Message::model("", None));
        assert!(text.contains(SEARCHING_PLACEHOLDER));

        let user = plain(&Message::user(""));
        assert!(!user.contains(SEARCHING_PLACEHOLDER));
    }

    #[test]
    fn test_line_breaks_preserved() {
        let lines = render_message(&Message::model("first\n\nthird", None));
        let text = render_plain(&lines);
        assert!(text.contains("first\n\nthird"));
    }

    #[test]
    fn test_user_and_model_are_labelled_differently() {
        let user = render_message(&Message::user("hi"));
        let model = render_message(&Message::model("hello", None));
        assert!(render_plain(&user[..1]).starts_with(USER_LABEL));
        assert!(render_plain(&model[..1]).starts_with(MODEL_LABEL));
        assert_eq!(user[0].alignment, Some(Alignment::Right));
        assert_eq!(model[0].alignment, None);
    }

    #[test]
    fn test_user_messages_never_show_citations() {
        let mut message = Message::user("hi");
        message.grounding_chunks = Some(vec![web("https://a.example", None)]);
        assert!(!plain(&message).contains("https://a.example"));
    }

    #[test]
    fn test_render_does_not_mutate_message() {
        let message = Message::model("x", Some(vec![map("m", Some("M"), &["r"])]));
        let before = message.clone();
        let _ = render_message(&message);
        assert_eq!(message, before);
    }

    #[test]
    fn test_content_is_not_interpreted() {
        let lines = render_message(&Message::model("Try **Roscioli**\n\n", None));
        assert_eq!(lines.len(), 5);
        assert_eq!(render_plain(&lines[1..2]), "Try **Roscioli**");
        assert_eq!(lines[1].spans.len(), 1);
        assert_eq!(lines[1].spans[0].style, Style::default());
        assert!(render_plain(&lines[2..4]).trim().is_empty());

        let user = render_message(&Message::user("a\n"));
        assert_eq!(render_plain(&user[1..3]), "a\n");
    }
}
