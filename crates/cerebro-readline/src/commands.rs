//! REPL input parsing and session target resolution.

use cerebro_core::session::{SessionId, SessionSummary};

/// Slash commands offered by the completer and hinter.
pub const SLASH_COMMANDS: &[&str] = &["/new", "/list", "/select", "/delete", "/show", "/help", "/quit"];

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text for the active session.
    Send(String),
    /// `/new [text]`
    New(Option<String>),
    List,
    /// `/select <n|id>`
    Select(String),
    /// `/delete <n|id>`
    Delete(String),
    Show,
    Help,
    Quit,
    /// An unrecognized slash command, or one missing its argument.
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        if !line.starts_with('/') {
            return Command::Send(line.to_string());
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let arg = (!rest.is_empty()).then(|| rest.to_string());

        match (name, arg) {
            ("/new", arg) => Command::New(arg),
            ("/list", _) => Command::List,
            ("/select", Some(target)) => Command::Select(target),
            ("/delete", Some(target)) => Command::Delete(target),
            ("/select" | "/delete", None) => Command::Invalid(format!("Usage: {} <number|id>", name)),
            ("/show", _) => Command::Show,
            ("/help", _) => Command::Help,
            ("/quit" | "/exit", _) => Command::Quit,
            _ => Command::Invalid(format!("Unknown command: {}", name)),
        }
    }
}

/// Resolves a `/select` or `/delete` target against the listed sessions.
///
/// Accepts a 1-based list position, a full session id, or an unambiguous id
/// prefix.
pub fn resolve_target(target: &str, sessions: &[SessionSummary]) -> Option<SessionId> {
    let target = target.trim();

    if let Ok(position) = target.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| sessions.get(index))
            .map(|summary| summary.id);
    }

    if let Ok(id) = target.parse::<SessionId>() {
        return Some(id);
    }

    let lowered = target.to_ascii_lowercase();
    let mut matches = sessions
        .iter()
        .filter(|summary| summary.id.to_string().starts_with(&lowered));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only.id),
        _ => None,
    }
}
