//! Turning a command line into a [`Pipeline`].
//!
//! The grammar is deliberately small:
//!
//! ```text
//! line     := stage ( '|' stage )* [ '&' ] [ '?' ]
//! stage    := name ( argument | redirect | '&' )*
//! redirect := '<'path | '>'path | '>>'path     (no space after the operator)
//! ```
//!
//! Parsing never fails. Odd input (a bare redirect operator, a trailing pipe,
//! an unterminated quote) is resolved by fixed rules instead of an error.

use crate::command::{Command, Pipeline, RedirectKind};
use crate::lexer::{is_splitter, split_into_tokens};
use tracing::debug;

/// Markers recognised at the very end of a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LineFlags {
    background: bool,
    auto_complete: bool,
}

/// Parse one line into a pipeline.
///
/// An effectively empty line yields [`Pipeline::empty`].
pub fn parse(line: &str) -> Pipeline {
    let mut text = line.trim_matches(is_splitter);
    let mut flags = LineFlags::default();

    if let Some(rest) = text.strip_suffix('?') {
        flags.auto_complete = true;
        text = rest;
    }
    if let Some(rest) = text.strip_suffix('&') {
        flags.background = true;
        text = rest;
    }

    match parse_stage(text, flags) {
        Some(head) => {
            debug!(
                name = %head.name,
                args = head.arg_count(),
                background = flags.background,
                "parsed line"
            );
            Pipeline { head }
        }
        None => Pipeline::empty(),
    }
}

fn parse_stage(text: &str, flags: LineFlags) -> Option<Command> {
    let tokens = split_into_tokens(text);
    let mut tokens = tokens.iter();
    let first = tokens.next()?;

    let mut command = Command {
        name: unquote(first.text).to_string(),
        background: flags.background,
        auto_complete_requested: flags.auto_complete,
        ..Default::default()
    };

    for token in tokens {
        match token.text {
            "" => continue,
            "|" => {
                command.next = parse_stage(&text[token.end..], flags).map(Box::new);
                if command.next.is_none() {
                    debug!(name = %command.name, "trailing pipe without a command");
                }
                break;
            }
            // Already consumed from the end of the line.
            "&" => continue,
            raw => match split_redirect(raw) {
                Some((kind, "")) => {
                    debug!(?kind, name = %command.name, "redirect operator without a path");
                }
                Some((kind, target)) => command.redirects.set(kind, target.to_string()),
                None => command.arguments.push(unquote(raw).to_string()),
            },
        }
    }
    Some(command)
}

/// Recognise `<path`, `>>path` and `>path`. `>>` is checked before `>`.
fn split_redirect(token: &str) -> Option<(RedirectKind, &str)> {
    if let Some(target) = token.strip_prefix(">>") {
        Some((RedirectKind::Append, target))
    } else if let Some(target) = token.strip_prefix('>') {
        Some((RedirectKind::Output, target))
    } else {
        token
            .strip_prefix('<')
            .map(|target| (RedirectKind::Input, target))
    }
}

/// Strip exactly one layer of matching quotes.
///
/// Only tokens longer than two characters are unquoted, so `""` and `''`
/// are kept literally.
pub fn unquote(token: &str) -> &str {
    let bytes = token.as_bytes();
    let len = bytes.len();
    if len > 2 && matches!(bytes[0], b'"' | b'\'') && bytes[len - 1] == bytes[0] {
        &token[1..len - 1]
    } else {
        token
    }
}
