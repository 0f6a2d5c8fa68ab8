//! Message parser - splits chat text into a command trigger and its arguments

/// A chat line that looks like a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// First word, trigger character still attached
    pub trigger: String,
    /// Everything after the first word, trimmed
    pub args: String,
}

/// Recognizes command invocations by their leading trigger character
pub struct MessageParser {
    trigger: char,
}

impl MessageParser {
    pub fn new(trigger: char) -> Self {
        Self { trigger }
    }

    pub fn trigger(&self) -> char {
        self.trigger
    }

    /// `None` for regular chat text
    pub fn parse(&self, text: &str) -> Option<ParsedCommand> {
        let text = text.trim();
        if !text.starts_with(self.trigger) {
            return None;
        }

        let (first, rest) = match text.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim()),
            None => (text, ""),
        };

        // A lone trigger character is not a command
        if first.chars().count() <= 1 {
            return None;
        }

        Some(ParsedCommand {
            trigger: first.to_string(),
            args: rest.to_string(),
        })
    }
}

impl Default for MessageParser {
    fn default() -> Self {
        Self::new('!')
    }
}
