//! Prompt assembly shared by every adapter.

use sentia_core::analysis::TextAnalysis;
use sentia_core::message::{Message, SelfView};

/// Conversation turns carried into a request.
pub const HISTORY_TURNS: usize = 10;

/// The personality prompt plus whatever the analysis says about this input.
pub fn system_prompt(personality: &str, context: &TextAnalysis) -> String {
    let mut prompt = personality.to_string();

    if context.is_question {
        prompt.push_str(" The user is asking a question.");
    }

    if !context.topics.is_empty() {
        prompt.push_str(&format!(
            " The user seems to be talking about: {}.",
            context.topics.join(", ")
        ));
    }

    prompt
}

/// `[system] + last turns + current user input`, oldest first.
pub fn build_messages(view: &SelfView, input: &str, context: &TextAnalysis) -> Vec<Message> {
    let skip = view.history.len().saturating_sub(HISTORY_TURNS);

    let mut messages = Vec::with_capacity(view.history.len() - skip + 2);
    messages.push(Message::system(system_prompt(&view.personality, context)));
    messages.extend(view.history.iter().skip(skip).map(Message::from));
    messages.push(Message::user(input));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentia_core::message::{ConversationTurn, Role};

    #[test]
    fn plain_prompt_is_personality() {
        let prompt = system_prompt("You are kind.", &TextAnalysis::default());
        assert_eq!(prompt, "You are kind.");
    }

    #[test]
    fn question_and_topics_are_appended() {
        let context = TextAnalysis {
            is_question: true,
            topics: vec!["weather".into(), "rain".into(), "london".into()],
        };
        let prompt = system_prompt("P.", &context);
        assert_eq!(
            prompt,
            "P. The user is asking a question. The user seems to be talking about: weather, rain, london."
        );
    }

    #[test]
    fn history_is_windowed() {
        let history: Vec<ConversationTurn> = (0..14)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationTurn::user(format!("u{i}"))
                } else {
                    ConversationTurn::agent(format!("a{i}"))
                }
            })
            .collect();
        let view = SelfView {
            personality: "P".into(),
            history,
        };

        let messages = build_messages(&view, "now", &TextAnalysis::default());
        assert_eq!(messages.len(), 1 + HISTORY_TURNS + 1);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "u4");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages.last().unwrap().content, "now");
        assert_eq!(messages.last().unwrap().role, Role::User);
    }

    #[test]
    fn empty_history() {
        let view = SelfView {
            personality: "P".into(),
            history: vec![],
        };
        let messages = build_messages(&view, "hello", &TextAnalysis::default());
        assert_eq!(messages.len(), 2);
    }
}
