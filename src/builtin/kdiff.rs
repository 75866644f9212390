use super::{BuiltinCommand, BuiltinContext};
use crate::command::ExitCode;
use anyhow::{Context, Result, bail};
use argh::FromArgs;
use std::fs;
use std::io::Write;
use std::ops::RangeInclusive;
use std::path::Path;

const INVALID: &str =
    "Please use valid paths or flags. (Use .txt extension only for the non-binary mode.)";

#[derive(FromArgs)]
/// Compare two files line by line or byte by byte.
pub struct Kdiff {
    #[argh(switch, short = 'a')]
    /// compare line by line (the default). Both files need a .txt extension.
    pub lines: bool,

    #[argh(switch, short = 'b')]
    /// compare byte by byte. Any file is accepted.
    pub bytes: bool,

    #[argh(positional)]
    /// first file.
    pub first: String,

    #[argh(positional)]
    /// second file.
    pub second: String,
}

/// One line number at which the files disagree. A missing side means that
/// file has fewer lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDifference<'a> {
    pub number: usize,
    pub first: Option<&'a str>,
    pub second: Option<&'a str>,
}

pub fn line_differences<'a>(first: &'a str, second: &'a str) -> Vec<LineDifference<'a>> {
    let mut left = first.lines();
    let mut right = second.lines();
    let mut out = Vec::new();
    let mut number = 0;
    loop {
        let (a, b) = (left.next(), right.next());
        if a.is_none() && b.is_none() {
            return out;
        }
        number += 1;
        if a != b {
            out.push(LineDifference {
                number,
                first: a,
                second: b,
            });
        }
    }
}

/// Mismatched byte positions plus the length difference.
pub fn byte_difference(first: &[u8], second: &[u8]) -> usize {
    let mismatched = first.iter().zip(second).filter(|(a, b)| a != b).count();
    mismatched + first.len().abs_diff(second.len())
}

fn has_txt_extension(path: &str) -> bool {
    Path::new(path).extension().is_some_and(|ext| ext == "txt")
}

impl Kdiff {
    fn validate(&self) -> Result<()> {
        if self.lines && self.bytes {
            bail!(INVALID);
        }
        for path in [&self.first, &self.second] {
            if !Path::new(path).exists() {
                bail!(INVALID);
            }
            if !self.bytes && !has_txt_extension(path) {
                bail!(INVALID);
            }
        }
        Ok(())
    }

    fn compare_lines(&self, out: &mut dyn Write) -> Result<()> {
        let first = read_lossy(&self.first)?;
        let second = read_lossy(&self.second)?;
        let differences = line_differences(&first, &second);
        for diff in &differences {
            writeln!(
                out,
                "Difference spotted: Line {}: {} {}",
                diff.number,
                self.first,
                diff.first.unwrap_or_default()
            )?;
            writeln!(
                out,
                "Difference spotted: Line {}: {} {}",
                diff.number,
                self.second,
                diff.second.unwrap_or_default()
            )?;
        }
        if differences.is_empty() {
            writeln!(out, "Given files are identical.")?;
        } else {
            writeln!(out, "Total different line count is {}", differences.len())?;
        }
        Ok(())
    }

    fn compare_bytes(&self, out: &mut dyn Write) -> Result<()> {
        let first = fs::read(&self.first).with_context(|| format!("{}: read failed", self.first))?;
        let second =
            fs::read(&self.second).with_context(|| format!("{}: read failed", self.second))?;
        match byte_difference(&first, &second) {
            0 => writeln!(out, "Given files are identical.")?,
            n => writeln!(out, "Total byte difference between two file is {n}")?,
        }
        Ok(())
    }
}

fn read_lossy(path: &str) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("{path}: read failed"))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl BuiltinCommand for Kdiff {
    fn name() -> &'static str {
        "kdiff"
    }

    fn arity() -> RangeInclusive<usize> {
        2..=3
    }

    fn usage() -> &'static str {
        "Please use minimum 2 and maximum 3 parameters as an input."
    }

    fn execute(self, ctx: &mut BuiltinContext<'_>) -> Result<ExitCode> {
        self.validate()?;
        if self.bytes {
            self.compare_bytes(ctx.out())?;
        } else {
            self.compare_lines(ctx.out())?;
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{STATUS_USAGE, run_builtin};
    use crate::config::Config;
    use crate::env::Session;
    use std::path::PathBuf;

    fn write(dir: &Path, name: &str, content: &str) -> String {
        let path: PathBuf = dir.join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn line_differences_include_unpaired_lines() {
        let diffs = line_differences("a\nb\nc\n", "a\nB\n");
        assert_eq!(
            diffs,
            [
                LineDifference {
                    number: 2,
                    first: Some("b"),
                    second: Some("B"),
                },
                LineDifference {
                    number: 3,
                    first: Some("c"),
                    second: None,
                },
            ]
        );
    }

    #[test]
    fn byte_difference_counts_length_gap() {
        assert_eq!(byte_difference(b"abcd", b"abcd"), 0);
        assert_eq!(byte_difference(b"abcd", b"abXd"), 1);
        assert_eq!(byte_difference(b"abcd", b"ab"), 2);
        assert_eq!(byte_difference(b"", b"xyz"), 3);
    }

    #[test]
    fn reports_each_differing_line_and_total() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "one.txt", "same\nleft\n");
        let b = write(dir.path(), "two.txt", "same\nright\n");
        let mut session = Session::new(Config::default());

        let (code, out) = run_builtin(&mut session, "kdiff", &[a.as_str(), b.as_str()]);

        assert_eq!(code, 0);
        assert_eq!(
            out,
            format!(
                "Difference spotted: Line 2: {a} left\n\
                 Difference spotted: Line 2: {b} right\n\
                 Total different line count is 1\n"
            )
        );
    }

    #[test]
    fn identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "one.txt", "x\ny\n");
        let b = write(dir.path(), "two.txt", "x\ny\n");
        let mut session = Session::new(Config::default());

        let (_, out) = run_builtin(&mut session, "kdiff", &["-a", a.as_str(), b.as_str()]);
        assert_eq!(out, "Given files are identical.\n");
    }

    #[test]
    fn byte_mode_accepts_any_extension() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "one.bin", "hello");
        let b = write(dir.path(), "two.bin", "hallo!!");
        let mut session = Session::new(Config::default());

        let (code, out) = run_builtin(&mut session, "kdiff", &["-b", a.as_str(), b.as_str()]);
        assert_eq!(code, 0);
        assert_eq!(out, "Total byte difference between two file is 3\n");
    }

    #[test]
    fn line_mode_requires_txt_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "one.bin", "x");
        let b = write(dir.path(), "two.txt", "x");
        let mut session = Session::new(Config::default());

        let (code, out) = run_builtin(&mut session, "kdiff", &[a.as_str(), b.as_str()]);
        assert_eq!(code, 1);
        assert_eq!(out, format!("-seashell: kdiff: {INVALID}\n"));
    }

    #[test]
    fn missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "one.txt", "x");
        let missing = dir.path().join("missing.txt");
        let mut session = Session::new(Config::default());

        let (code, _) =
            run_builtin(&mut session, "kdiff", &["-b", a.as_str(), missing.to_str().unwrap()]);
        assert_eq!(code, 1);
    }

    #[test]
    fn argument_count_is_checked_first() {
        let mut session = Session::new(Config::default());
        let (code, out) = run_builtin(&mut session, "kdiff", &["only-one"]);
        assert_eq!(code, STATUS_USAGE);
        assert_eq!(
            out,
            "-seashell: kdiff: Please use minimum 2 and maximum 3 parameters as an input.\n"
        );
    }
}
