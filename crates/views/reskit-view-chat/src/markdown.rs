//! Markdown to HTML for assistant replies

use pulldown_cmark::{html, Options, Parser};
use reskit_core::{Message, Role};

/// Render CommonMark (tables, strikethrough, task lists) to HTML
pub fn render_markdown(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() + source.len() / 2);
    html::push_html(&mut out, parser);
    out
}

/// Assistant messages whose first part is text are shown as rendered HTML
pub fn is_rendered(message: &Message) -> bool {
    message.role == Role::Assistant && message.text().is_some()
}

/// Replace the text of an assistant message with its rendering
///
/// User and peer messages pass through unchanged.
pub fn prepare(mut message: Message) -> Message {
    if message.role == Role::Assistant {
        if let Some(text) = message.text_mut() {
            *text = render_markdown(text);
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use reskit_core::{ContentPart, TextBody};

    fn message(role: Role, text: &str) -> Message {
        Message {
            id: None,
            chat_id: None,
            role,
            user_id: "u1".into(),
            username: None,
            content: vec![ContentPart::Text {
                text: TextBody::Plain(text.into()),
            }],
            timestamp: None,
            tool_calls: None,
        }
    }

    #[test]
    fn test_render_basic() {
        assert_eq!(render_markdown("**bold**"), "<p><strong>bold</strong></p>\n");
        assert!(render_markdown("| a |\n|---|\n| 1 |").contains("<table>"));
    }

    #[test]
    fn test_assistant_rendered_user_verbatim() {
        let assistant = prepare(message(Role::Assistant, "# Title"));
        assert_eq!(assistant.text(), Some("<h1>Title</h1>\n"));

        let user = prepare(message(Role::User, "# Title"));
        assert_eq!(user.text(), Some("# Title"));
    }

    #[test]
    fn test_cards_untouched() {
        let card = Message::card(Default::default());
        assert!(!is_rendered(&card));
        assert_eq!(prepare(card.clone()), card);
    }
}
