use anyhow::Result;
use charla_core::{Config, ConnectError, ConversationSession};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tracing::warn;

use crate::app::{App, InputMode, Screen};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            poll_connect_task(app).await;
            app.refresh_chat_scroll();
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match app.screen {
        Screen::Connect => match key.code {
            KeyCode::Char('q') => app.should_quit = true,
            KeyCode::Char('i') | KeyCode::Char('a') | KeyCode::Enter => {
                app.input_mode = InputMode::Editing;
            }
            _ => {}
        },
        Screen::Chat => match key.code {
            KeyCode::Char('q') => app.should_quit = true,
            KeyCode::Char('i') | KeyCode::Char('a') => {
                app.input_mode = InputMode::Editing;
            }
            KeyCode::Char('j') | KeyCode::Down => {
                app.chat_scroll = app.chat_scroll.saturating_add(1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                app.chat_scroll = app.chat_scroll.saturating_sub(1);
            }
            KeyCode::Char('g') => app.chat_scroll = 0,
            KeyCode::Char('G') => app.scroll_chat_to_bottom(),
            // Back to the connect form; the conversation is gone for good
            KeyCode::Esc => app.disconnect(),
            _ => {}
        },
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.input_mode = InputMode::Normal;
        return;
    }

    match app.screen {
        Screen::Connect => {
            if key.code == KeyCode::Enter {
                submit_probe(app);
            } else if !app.is_connecting() {
                let mut cursor = app.url_cursor;
                edit_input(&mut app.url_input, &mut cursor, key.code);
                app.url_cursor = cursor;
            }
        }
        Screen::Chat => {
            if key.code == KeyCode::Enter {
                submit_message(app);
            } else {
                let mut cursor = app.message_cursor;
                edit_input(&mut app.message_input, &mut cursor, key.code);
                app.message_cursor = cursor;
            }
        }
    }
}

/// Cursor-aware line editing shared by the URL and message inputs
fn edit_input(input: &mut String, cursor: &mut usize, code: KeyCode) {
    match code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < input.chars().count() {
                let byte_pos = char_to_byte_index(input, *cursor);
                input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            *cursor = (*cursor + 1).min(input.chars().count());
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(input, *cursor);
            input.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

/// Kick off a probe of the typed URL on a background task. One probe at a
/// time; the URL itself is validated by the network step, not here.
fn submit_probe(app: &mut App) {
    let url = app.url_input.trim().to_string();
    if url.is_empty() || app.is_connecting() {
        return;
    }

    app.connect_error = None;
    let validator = app.validator.clone();
    app.connect_task = Some(tokio::spawn(async move { validator.probe(&url).await }));
}

/// Hand the typed message to the session on a background task. The session
/// itself rejects empty input and enforces single-flight; the guards here
/// only keep the typed text around instead of discarding it.
fn submit_message(app: &mut App) {
    let Some(session) = &app.session else {
        return;
    };
    if session.is_pending() || app.message_input.trim().is_empty() {
        return;
    }

    let text = std::mem::take(&mut app.message_input);
    app.message_cursor = 0;

    let session = Arc::clone(session);
    tokio::spawn(async move { session.send(&text).await });

    app.scroll_chat_to_bottom();
}

/// Collect a finished probe: build the session and switch screens, or show
/// the connect failure.
async fn poll_connect_task(app: &mut App) {
    let finished = app.connect_task.as_ref().is_some_and(|t| t.is_finished());
    if !finished {
        return;
    }
    let Some(task) = app.connect_task.take() else {
        return;
    };

    match task.await {
        Ok(Ok(endpoint)) => {
            if let Err(err) = Config::save_server_url(endpoint.url()) {
                warn!("could not save server url: {:#}", err);
            }
            app.connect_error = None;
            app.session = Some(Arc::new(ConversationSession::new(endpoint)));
            app.screen = Screen::Chat;
            app.input_mode = InputMode::Editing;
            app.seen_turns = 0;
            app.chat_scroll = 0;
        }
        Ok(Err(err)) => {
            app.connect_error = Some(err.to_string());
        }
        Err(join_err) => {
            warn!("connect task failed: {}", join_err);
            app.connect_error = Some(ConnectError.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_to_byte_index_handles_multibyte_chars() {
        let s = "héllo";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 1), 1);
        assert_eq!(char_to_byte_index(s, 2), 3); // é is two bytes
        assert_eq!(char_to_byte_index(s, 99), s.len());
    }

    #[test]
    fn edit_input_inserts_and_deletes_at_the_cursor() {
        let mut input = "ab".to_string();
        let mut cursor = 1;

        edit_input(&mut input, &mut cursor, KeyCode::Char('x'));
        assert_eq!(input, "axb");
        assert_eq!(cursor, 2);

        edit_input(&mut input, &mut cursor, KeyCode::Backspace);
        assert_eq!(input, "ab");
        assert_eq!(cursor, 1);

        edit_input(&mut input, &mut cursor, KeyCode::Delete);
        assert_eq!(input, "a");
        assert_eq!(cursor, 1);

        edit_input(&mut input, &mut cursor, KeyCode::Home);
        assert_eq!(cursor, 0);
        edit_input(&mut input, &mut cursor, KeyCode::End);
        assert_eq!(cursor, 1);
    }

    #[test]
    fn blank_url_does_not_start_a_probe() {
        let mut app = App::new(Some("   ".to_string()));
        submit_probe(&mut app);
        assert!(app.connect_task.is_none());
    }

    #[test]
    fn message_without_a_session_is_ignored() {
        let mut app = App::new(None);
        app.message_input = "hello".to_string();
        submit_message(&mut app);
        // Nothing to send it to; the text stays put
        assert_eq!(app.message_input, "hello");
    }
}
