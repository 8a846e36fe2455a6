use crate::app::{App, Mode};
use crate::models::ResourceKind;

const HELP: &str = "Commands: ns <namespace>, kind <Kind>, filter [text], retry, quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Namespace(String),
    Kind(ResourceKind),
    Filter(String),
    Retry,
    Help,
    Quit,
}

/// Parses one line typed on stdin. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "ns" | "namespace" => {
            if !rest.is_empty() && !is_valid_k8s_name(rest) {
                return Err(format!("Invalid namespace name: {rest}"));
            }
            Command::Namespace(rest.to_string())
        }
        "kind" => match rest.parse::<ResourceKind>() {
            Ok(kind) => Command::Kind(kind),
            Err(e) => return Err(e.to_string()),
        },
        "filter" | "/" => Command::Filter(rest.to_string()),
        "retry" | "r" => Command::Retry,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command: {other}")),
    };
    Ok(Some(command))
}

fn is_valid_k8s_name(s: &str) -> bool {
    s.len() <= 63
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && s.starts_with(|c: char| c.is_ascii_alphanumeric())
        && s.ends_with(|c: char| c.is_ascii_alphanumeric())
}

pub fn handle_input(app: &mut App, line: &str) {
    let command = match parse_command(line) {
        Ok(Some(command)) => command,
        Ok(None) => return,
        Err(msg) => {
            app.set_notice(msg);
            return;
        }
    };
    tracing::debug!(?command, "input");

    match command {
        Command::Namespace(ns) => app.set_namespace(&ns),
        Command::Kind(kind) => app.set_kind(kind),
        Command::Filter(query) => {
            if app.mode == Mode::Logs {
                app.set_notice("Filtering only applies while listing resources".to_string());
            } else {
                app.set_filter(&query);
            }
        }
        Command::Retry => app.retry(),
        Command::Help => app.set_notice(HELP.to_string()),
        Command::Quit => app.should_quit = true,
    }
}
