use super::{BuiltinCommand, BuiltinContext};
use crate::command::ExitCode;
use anyhow::{Context, Result, bail};
use argh::FromArgs;
use regex::{Captures, Regex, RegexBuilder};
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Blue,
}

impl Color {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "r" => Some(Self::Red),
            "g" => Some(Self::Green),
            "b" => Some(Self::Blue),
            _ => None,
        }
    }

    fn escape(self) -> &'static str {
        match self {
            Self::Red => "\x1b[1m\x1b[31m",
            Self::Green => "\x1b[1m\x1b[32m",
            Self::Blue => "\x1b[1m\x1b[34m",
        }
    }
}

#[derive(FromArgs)]
/// Print the lines of a file that contain a word, with the word colored.
pub struct Highlight {
    #[argh(positional)]
    /// word to look for, matched case-insensitively as a whole word.
    pub word: String,

    #[argh(positional)]
    /// color: r, g or b.
    pub color: String,

    #[argh(positional)]
    /// file to search.
    pub file: String,
}

/// Whole-word, case-insensitive matcher for `word`.
///
/// An edge of `word` that is punctuation, as in `c++`, must sit next to
/// punctuation, whitespace or the end of the line.
pub fn word_matcher(word: &str) -> Result<Regex> {
    let pattern = format!(
        "{}{}{}",
        boundary(word.chars().next()),
        regex::escape(word),
        boundary(word.chars().next_back())
    );
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid word: {word}"))
}

fn boundary(edge: Option<char>) -> &'static str {
    match edge {
        Some(c) if !(c.is_alphanumeric() || c == '_') => r"\B",
        _ => r"\b",
    }
}

/// Lines of `text` containing a match, every occurrence wrapped in `color`.
pub fn highlight_lines(text: &str, re: &Regex, color: Color) -> Vec<String> {
    text.lines()
        .filter(|line| re.is_match(line))
        .map(|line| {
            re.replace_all(line, |caps: &Captures| {
                format!("{}{}{}", color.escape(), &caps[0], RESET)
            })
            .into_owned()
        })
        .collect()
}

impl BuiltinCommand for Highlight {
    fn name() -> &'static str {
        "highlight"
    }

    fn arity() -> RangeInclusive<usize> {
        3..=3
    }

    fn usage() -> &'static str {
        "Argument count should be exactly equal to the 3."
    }

    fn execute(self, ctx: &mut BuiltinContext<'_>) -> Result<ExitCode> {
        let Some(color) = Color::parse(&self.color) else {
            bail!("Second argument should be r, g or b.");
        };
        if !Path::new(&self.file).is_file() {
            bail!("Please input a legit path.");
        }

        let re = word_matcher(&self.word)?;
        let bytes = fs::read(&self.file).with_context(|| format!("{}: read failed", self.file))?;
        for line in highlight_lines(&String::from_utf8_lossy(&bytes), &re, color) {
            writeln!(ctx.out(), "{line}")?;
        }
        Ok(0)
    }
}
