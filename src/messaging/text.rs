//! Static text message.

use super::message::{message_handle, Message, MessageKind};

pub(crate) struct TextState {
    text: String,
}

impl TextState {
    pub(crate) fn render(&self) -> Option<String> {
        Some(self.text.clone())
    }
}

/// A message showing a fixed string until it is changed or hidden.
#[derive(Clone, Debug)]
pub struct TextMessage {
    message: Message,
}

message_handle!(TextMessage, Text, TextState);

impl TextMessage {
    /// Create a detached text message.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            message: Message::new(MessageKind::Text(TextState { text: text.into() })),
        }
    }

    /// Current text.
    pub fn get(&self) -> String {
        self.with(|state| state.text.clone()).unwrap_or_default()
    }

    /// Replace the text. Writing the current value is a no-op.
    pub fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        let changed = self
            .with(|state| {
                if state.text == text {
                    return false;
                }
                state.text = text;
                true
            })
            .unwrap_or(false);
        if changed {
            self.message.update();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_renders_as_is() {
        let message = TextMessage::new("Battery low");
        assert_eq!(message.text().as_deref(), Some("Battery low"));
        assert!(!message.requires_cleanup());
        assert!(!message.is_shown());
    }

    #[test]
    fn test_set_text_changes_value() {
        let message = TextMessage::new("a");
        message.set_text("b");
        assert_eq!(message.get(), "b");
    }

    #[test]
    #[should_panic(expected = "not shown")]
    fn test_hide_before_show_panics() {
        TextMessage::new("detached").hide();
    }
}
