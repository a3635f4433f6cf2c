use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, InputMode, LocationRequest, LocationState};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.scroll_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // A notice blocks everything else until dismissed
    if app.notice.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.dismiss_notice();
        }
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('l') => {
            if app.location == LocationState::Absent {
                app.request_location(LocationRequest::Manual);
            }
        }
        KeyCode::Char(c @ '1'..='3') => app.quick_fill(c as usize - '1' as usize),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::PageDown => {
            for _ in 0..app.chat_height.max(1) / 2 {
                app.scroll_down();
            }
        }
        KeyCode::PageUp => {
            for _ in 0..app.chat_height.max(1) / 2 {
                app.scroll_up();
            }
        }
        KeyCode::Char('G') | KeyCode::End => app.scroll_to_bottom(),
        KeyCode::Char('g') | KeyCode::Home => app.chat_scroll = 0,
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            // Dropped silently when blank or while an answer is pending
            app.submit_input();
        }
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => {
            for _ in 0..3 {
                app.scroll_down();
            }
        }
        MouseEventKind::ScrollUp => {
            for _ in 0..3 {
                app.scroll_up();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::FakeAnswers;
    use crate::app::LOCATION_NOTICE;
    use crate::location::NoLocation;
    use std::sync::Arc;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn new_app() -> App {
        App::new(
            Arc::new(FakeAnswers::replying("ok")),
            Arc::new(NoLocation),
            "test-model",
        )
    }

    #[test]
    fn test_typing_edits_at_cursor() {
        let mut app = new_app();
        for c in "Tokio".chars() {
            handle_event(&mut app, key(KeyCode::Char(c)));
        }
        handle_event(&mut app, key(KeyCode::Home));
        handle_event(&mut app, key(KeyCode::Delete));
        handle_event(&mut app, key(KeyCode::Char('K')));
        handle_event(&mut app, key(KeyCode::End));
        handle_event(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.input, "Koki");
        assert_eq!(app.cursor, 4);
    }

    #[test]
    fn test_multibyte_input_is_safe() {
        let mut app = new_app();
        for c in "東京".chars() {
            handle_event(&mut app, key(KeyCode::Char(c)));
        }
        handle_event(&mut app, key(KeyCode::Left));
        handle_event(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.input, "京");
    }

    #[test]
    fn test_quick_fill_keys_in_normal_mode() {
        let mut app = new_app();
        handle_event(&mut app, key(KeyCode::Esc));
        assert_eq!(app.input_mode, InputMode::Normal);

        handle_event(&mut app, key(KeyCode::Char('2')));
        assert_eq!(app.input, "Tell me about the geography of Japan.");
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[test]
    fn test_enter_on_blank_input_does_nothing() {
        let mut app = new_app();
        handle_event(&mut app, key(KeyCode::Char(' ')));
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.conversation.len(), 1);
        assert!(!app.pending);
    }

    #[test]
    fn test_notice_blocks_input_until_dismissed() {
        let mut app = new_app();
        app.notice = Some(LOCATION_NOTICE.to_string());

        handle_event(&mut app, key(KeyCode::Char('x')));
        assert!(app.input.is_empty());
        assert!(app.notice.is_some());

        handle_event(&mut app, key(KeyCode::Enter));
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = new_app();
        handle_event(
            &mut app,
            AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_location_key_ignored_while_location_known() {
        let mut app = new_app();
        let here = crate::state::UserLocation::new(35.0116, 135.7681);
        app.location = LocationState::Present(here);
        handle_event(&mut app, key(KeyCode::Esc));
        handle_event(&mut app, key(KeyCode::Char('l')));

        assert!(app.location_task.is_none());
        app.poll_tasks().await;
        assert_eq!(app.location, LocationState::Present(here));
        assert!(app.notice.is_none());
    }

    #[tokio::test]
    async fn test_location_key_starts_manual_read() {
        let mut app = new_app();
        handle_event(&mut app, key(KeyCode::Esc));
        handle_event(&mut app, key(KeyCode::Char('l')));
        assert_eq!(app.location, LocationState::Loading);
        assert!(matches!(app.location_task, Some((LocationRequest::Manual, _))));

        for _ in 0..200 {
            app.poll_tasks().await;
            if app.location != LocationState::Loading {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(app.location, LocationState::Absent);
        assert_eq!(app.notice.as_deref(), Some(LOCATION_NOTICE));
    }
}
