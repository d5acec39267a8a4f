//! Chat command parser
//!
//! `parse` is total: anything that is not a recognized command gets the help text.

use std::sync::LazyLock;

use regex::Regex;

pub const HELP: &str = "usage: radalert: <command> [<args>]

Available commands:
   '<check>' +1    vote that an alert on <check> was useful
   '<check>' -1    vote that an alert on <check> was noise
   help            show this message";

static VOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*radalert:\s*(?:'([^']+)'|"([^"]+)")\s*([+-]1)\s*$"#)
        .expect("vote pattern is valid")
});

/// A recognized chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Vote { target: String, magnitude: i8 },
    Help,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let Some(captures) = VOTE.captures(text) else {
            return Command::Help;
        };

        let target = captures
            .get(1)
            .or_else(|| captures.get(2))
            .map(|m| m.as_str().trim().to_string());
        let magnitude = match captures.get(3).map(|m| m.as_str()) {
            Some("+1") => 1,
            Some("-1") => -1,
            _ => return Command::Help,
        };

        match target {
            Some(target) if !target.is_empty() => Command::Vote { target, magnitude },
            _ => Command::Help,
        }
    }

    pub fn reply(&self) -> String {
        match self {
            Command::Vote { target, magnitude } => {
                format!("You voted {magnitude:+} on '{target}'")
            }
            Command::Help => HELP.to_string(),
        }
    }
}

/// Reply text for a raw chat command
pub fn parse(text: &str) -> String {
    Command::parse(text).reply()
}
