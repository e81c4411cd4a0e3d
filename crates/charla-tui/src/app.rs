use std::sync::Arc;

use charla_core::{ConversationSession, EndpointValidator, ValidatedEndpoint, ConnectError};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Connect,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Connect screen state
    pub url_input: String,
    pub url_cursor: usize,
    pub connect_error: Option<String>,
    pub connect_task: Option<JoinHandle<Result<ValidatedEndpoint, ConnectError>>>,

    // Chat screen state
    pub session: Option<Arc<ConversationSession>>,
    pub message_input: String,
    pub message_cursor: usize,
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the transcript area, set during render
    pub chat_width: u16,  // Inner width, for wrap calculations
    pub seen_turns: usize,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub validator: EndpointValidator,
}

impl App {
    pub fn new(initial_url: Option<String>) -> Self {
        let url_input = initial_url.unwrap_or_default();
        let url_cursor = url_input.chars().count();

        Self {
            should_quit: false,
            screen: Screen::Connect,
            input_mode: InputMode::Editing,

            url_input,
            url_cursor,
            connect_error: None,
            connect_task: None,

            session: None,
            message_input: String::new(),
            message_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            seen_turns: 0,

            animation_frame: 0,

            validator: EndpointValidator::new(),
        }
    }

    /// A probe is running and the connect form is locked.
    pub fn is_connecting(&self) -> bool {
        self.connect_task.is_some()
    }

    /// A conversation turn is waiting for its reply.
    pub fn is_sending(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_pending())
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_connecting() || self.is_sending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Drop the session and return to the connect form. The conversation
    /// log goes with it.
    pub fn disconnect(&mut self) {
        self.session = None;
        self.message_input.clear();
        self.message_cursor = 0;
        self.chat_scroll = 0;
        self.seen_turns = 0;
        self.screen = Screen::Connect;
        self.input_mode = InputMode::Editing;
        self.connect_error = None;
    }

    /// Scroll the transcript so the newest turn (or the "Thinking..."
    /// indicator) is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        let Some(session) = &self.session else {
            return;
        };

        // Use actual transcript width for wrap calculation, default if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for turn in session.turns() {
            total_lines += 1; // Role line ("You:", "Server:", "Error:")
            for line in turn.text.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after turn
        }

        if session.is_pending() {
            total_lines += 2; // "Server:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }

    /// Follow new turns as they land while a reply is in flight.
    pub fn refresh_chat_scroll(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let turn_count = session.turns().len();
        if turn_count != self.seen_turns {
            self.seen_turns = turn_count;
            self.scroll_chat_to_bottom();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_url_prefills_the_connect_form() {
        let app = App::new(Some("http://example.test/chat".to_string()));
        assert_eq!(app.url_input, "http://example.test/chat");
        assert_eq!(app.url_cursor, "http://example.test/chat".chars().count());
        assert_eq!(app.screen, Screen::Connect);
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[test]
    fn disconnect_returns_to_an_empty_connect_form() {
        let mut app = App::new(None);
        app.screen = Screen::Chat;
        app.message_input = "half-typed".to_string();
        app.message_cursor = 5;

        app.disconnect();

        assert_eq!(app.screen, Screen::Connect);
        assert!(app.session.is_none());
        assert!(app.message_input.is_empty());
        assert_eq!(app.input_mode, InputMode::Editing);
    }
}
