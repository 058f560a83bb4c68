/// Longest slice of user text that is quoted into a prompt.
pub const MAX_PROMPT_CONTEXT_CHARS: usize = 2_000;

const HEIGHTENED_PREFIX: &str =
    "Be bold and opinionated. It is fine to challenge the writer and to give longer, more specific answers.";

/// The three ways an ideation request can come about. They never share a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdeationKind {
    /// The user asked for ideas.
    Manual,
    /// The first nudge after the user went quiet.
    FirstInactivity,
    /// A later nudge, picking up from the last scanned text.
    Continuation,
}

impl IdeationKind {
    pub fn select(is_manual: bool, previous_auto_ideations: usize) -> Self {
        if is_manual {
            IdeationKind::Manual
        } else if previous_auto_ideations == 0 {
            IdeationKind::FirstInactivity
        } else {
            IdeationKind::Continuation
        }
    }
}

/// Keeps the tail of `text`, where the writer currently is.
pub fn tail_chars(text: &str, max: usize) -> &str {
    let count = text.chars().count();
    if count <= max {
        return text;
    }
    let skip = count - max;
    let offset = text.char_indices().nth(skip).map(|(i, _)| i).unwrap_or(0);
    &text[offset..]
}

pub fn build_ideation_prompt(kind: IdeationKind, page_text: &str, last_scanned: Option<&str>, heightened: bool) -> String {
    let body = match kind {
        IdeationKind::Manual => format!(
            "The writer asked for help brainstorming. Based on their writing below, suggest two or three concrete directions they could take next.\n\nWriting:\n{}",
            tail_chars(page_text, MAX_PROMPT_CONTEXT_CHARS)
        ),
        IdeationKind::FirstInactivity => format!(
            "The writer has paused for a while. Ask one short, friendly question that could help them get unstuck, based on their writing below.\n\nWriting:\n{}",
            tail_chars(page_text, MAX_PROMPT_CONTEXT_CHARS)
        ),
        IdeationKind::Continuation => format!(
            "The writer has paused again. The last passage they worked on was:\n\n{}\n\nSuggest one fresh idea that continues from where they left off.",
            tail_chars(last_scanned.unwrap_or(page_text), MAX_PROMPT_CONTEXT_CHARS)
        ),
    };
    shape(body, heightened)
}

pub fn build_chat_prompt(message: &str, heightened: bool) -> String {
    shape(message.to_string(), heightened)
}

fn shape(body: String, heightened: bool) -> String {
    if heightened {
        format!("{}\n\n{}", HEIGHTENED_PREFIX, body)
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_selection() {
        assert_eq!(IdeationKind::select(true, 3), IdeationKind::Manual);
        assert_eq!(IdeationKind::select(false, 0), IdeationKind::FirstInactivity);
        assert_eq!(IdeationKind::select(false, 1), IdeationKind::Continuation);
    }

    #[test]
    fn templates_are_distinct() {
        let manual = build_ideation_prompt(IdeationKind::Manual, "page", Some("scan"), false);
        let first = build_ideation_prompt(IdeationKind::FirstInactivity, "page", Some("scan"), false);
        let cont = build_ideation_prompt(IdeationKind::Continuation, "page", Some("scan"), false);
        assert_ne!(manual, first);
        assert_ne!(first, cont);
        assert!(manual.contains("page"));
        assert!(cont.contains("scan"));
        assert!(!cont.contains("page"));
    }

    #[test]
    fn continuation_without_scan_uses_page() {
        let cont = build_ideation_prompt(IdeationKind::Continuation, "page text", None, false);
        assert!(cont.contains("page text"));
    }

    #[test]
    fn heightened_mode_prefixes() {
        assert!(build_chat_prompt("hi", true).starts_with(HEIGHTENED_PREFIX));
        assert_eq!(build_chat_prompt("hi", false), "hi");
    }

    #[test]
    fn tail_is_char_safe() {
        assert_eq!(tail_chars("héllo", 3), "llo");
        assert_eq!(tail_chars("short", 10), "short");
    }
}
