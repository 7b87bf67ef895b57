//! Prompt builders for the three experiment stages.

use crate::client::ChatMessage;

pub fn build_review_prompt(title: &str, abstract_text: &str) -> Vec<ChatMessage> {
    let system = "You are a rigorous ICLR reviewer. Provide concise, concrete feedback. \
        Respond in JSON with keys: score (1-10 integer), strengths (list), \
        weaknesses (list), suggestions (list), summary (string).";
    let user = format!(
        "Title: {}\n\nAbstract: {}\n\nReturn only JSON.",
        title, abstract_text
    );
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Stricter re-prompt when a review came back without the required keys.
/// Reuses the original user message.
pub fn build_strict_review_prompt(user_content: &str) -> Vec<ChatMessage> {
    let system = "Return only JSON with keys score (1-10 integer), strengths \
        (list), weaknesses (list), suggestions (list), summary (string).";
    vec![
        ChatMessage::system(system),
        ChatMessage::user(user_content.to_string()),
    ]
}

pub fn build_revision_prompt(title: &str, abstract_text: &str, feedback: &str) -> Vec<ChatMessage> {
    let system = "You are the paper's author revising the abstract. \
        Improve clarity, novelty framing, and technical precision while staying \
        faithful to the original claims. Keep length similar (150-250 words). \
        Respond in JSON with keys: revised_abstract (string), change_log (list).";
    let user = format!(
        "Title: {}\n\nOriginal Abstract: {}\n\nReviewer Feedback:\n{}\n\nReturn only JSON.",
        title, abstract_text, feedback
    );
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

pub fn build_strict_revision_prompt(user_content: &str) -> Vec<ChatMessage> {
    let system = "Return only JSON with keys revised_abstract (string) and \
        change_log (list). No extra text.";
    vec![
        ChatMessage::system(system),
        ChatMessage::user(user_content.to_string()),
    ]
}

pub fn build_judge_prompt(title: &str, abstract_text: &str) -> Vec<ChatMessage> {
    let system = "You are a meta-reviewer scoring paper abstracts. \
        Rate the abstract on clarity, novelty, and overall quality, each 1-10. \
        Provide a brief justification. Respond in JSON with keys: clarity, \
        novelty, overall, justification.";
    let user = format!(
        "Title: {}\n\nAbstract: {}\n\nReturn only JSON.",
        title, abstract_text
    );
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Role;

    #[test]
    fn test_review_prompt_shape() {
        let messages = build_review_prompt("A Title", "An abstract.");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.contains("A Title"));
        assert!(messages[1].content.ends_with("Return only JSON."));
    }

    #[test]
    fn test_strict_prompt_reuses_user_content() {
        let messages = build_review_prompt("T", "A");
        let strict = build_strict_review_prompt(&messages[1].content);
        assert_eq!(strict[1].content, messages[1].content);
        assert!(strict[0].content.starts_with("Return only JSON"));
    }

    #[test]
    fn test_revision_prompt_includes_feedback() {
        let messages = build_revision_prompt("T", "A", "Reviewer (m) suggestions:\n- tighten");
        assert!(messages[1].content.contains("Reviewer Feedback:"));
        assert!(messages[1].content.contains("- tighten"));
    }
}
