//! Interactive session commands

use std::str::FromStr;

use thiserror::Error;

/// A line typed into the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Capture,
    Manual,
    /// Submit the given text, or the current form contents
    Submit(Option<String>),
    /// List demo addresses, or pre-fill the form with the n-th one (1-based)
    Demo(Option<usize>),
    Edit,
    Send,
    Preview,
    Restart,
    Help,
    Quit,
    /// Anything else; submitted as an address while the manual form is open
    Text(String),
}

/// Errors when parsing a session line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Empty input")]
    Empty,

    #[error("Invalid demo number '{0}'. Use a number from the list shown by 'demo'")]
    InvalidDemoIndex(String),
}

impl FromStr for SessionCommand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let word = word.to_lowercase();

        let command = match (word.as_str(), rest.is_empty()) {
            ("submit", true) => Self::Submit(None),
            ("submit", false) => Self::Submit(Some(rest.to_string())),
            ("demo", true) => Self::Demo(None),
            ("demo", false) => match rest.parse::<usize>() {
                Ok(n) if n > 0 => Self::Demo(Some(n)),
                _ => return Err(CommandError::InvalidDemoIndex(rest.to_string())),
            },
            ("capture" | "c", true) => Self::Capture,
            ("manual" | "m", true) => Self::Manual,
            ("edit" | "e", true) => Self::Edit,
            ("send" | "s", true) => Self::Send,
            ("preview" | "p", true) => Self::Preview,
            ("restart" | "r", true) => Self::Restart,
            ("help" | "h" | "?", true) => Self::Help,
            ("quit" | "q" | "exit", true) => Self::Quit,
            _ => Self::Text(line.to_string()),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> SessionCommand {
        line.parse().unwrap()
    }

    #[test]
    fn keywords_and_aliases() {
        assert_eq!(parse("capture"), SessionCommand::Capture);
        assert_eq!(parse("C"), SessionCommand::Capture);
        assert_eq!(parse("m"), SessionCommand::Manual);
        assert_eq!(parse(" send "), SessionCommand::Send);
        assert_eq!(parse("r"), SessionCommand::Restart);
        assert_eq!(parse("q"), SessionCommand::Quit);
    }

    #[test]
    fn submit_with_and_without_text() {
        assert_eq!(parse("submit"), SessionCommand::Submit(None));
        assert_eq!(
            parse("submit  123 Main St "),
            SessionCommand::Submit(Some("123 Main St".to_string()))
        );
    }

    #[test]
    fn demo_index() {
        assert_eq!(parse("demo"), SessionCommand::Demo(None));
        assert_eq!(parse("demo 2"), SessionCommand::Demo(Some(2)));
        assert_eq!(
            "demo 0".parse::<SessionCommand>(),
            Err(CommandError::InvalidDemoIndex("0".to_string()))
        );
    }

    #[test]
    fn addresses_fall_through_as_text() {
        assert_eq!(
            parse("123 Main St"),
            SessionCommand::Text("123 Main St".to_string())
        );
        // A keyword followed by more words is an address, not a command
        assert_eq!(parse("c street 4"), SessionCommand::Text("c street 4".to_string()));
    }

    #[test]
    fn empty_line() {
        assert_eq!("   ".parse::<SessionCommand>(), Err(CommandError::Empty));
    }
}
