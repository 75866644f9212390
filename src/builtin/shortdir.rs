use super::{BuiltinCommand, BuiltinContext, change_dir};
use crate::command::ExitCode;
use anyhow::{Context, Result, bail};
use argh::FromArgs;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(FromArgs)]
/// Bookmark directories under short names.
///
/// Actions: set <name>, jump <name>, del <name>, clear, list.
pub struct Shortdir {
    #[argh(positional)]
    /// one of set, jump, del, clear or list.
    pub action: String,

    #[argh(positional)]
    /// bookmark name.
    pub name: Option<String>,
}

/// Bookmarks persisted as `name<TAB>path` lines.
#[derive(Debug, Clone)]
pub struct ShortdirStore {
    path: PathBuf,
}

impl ShortdirStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// All bookmarks; a missing store file means none.
    pub fn load(&self) -> Result<BTreeMap<String, PathBuf>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("{}: read failed", self.path.display()));
            }
        };

        let mut entries = BTreeMap::new();
        for (number, line) in text.lines().enumerate() {
            match line.split_once('\t') {
                Some((name, dir)) if !name.is_empty() => {
                    entries.insert(name.to_string(), PathBuf::from(dir));
                }
                _ => warn!(
                    file = %self.path.display(),
                    line = number + 1,
                    "skipping malformed bookmark"
                ),
            }
        }
        Ok(entries)
    }

    pub fn save(&self, entries: &BTreeMap<String, PathBuf>) -> Result<()> {
        let mut text = String::new();
        for (name, dir) in entries {
            text.push_str(name);
            text.push('\t');
            text.push_str(&dir.to_string_lossy());
            text.push('\n');
        }
        fs::write(&self.path, text)
            .with_context(|| format!("{}: write failed", self.path.display()))
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['\t', '\n']) {
        bail!("invalid bookmark name: {name:?}");
    }
    Ok(())
}

impl Shortdir {
    fn required_name(&self) -> Result<&str> {
        match &self.name {
            Some(name) => {
                check_name(name)?;
                Ok(name.as_str())
            }
            None => bail!("{} needs a bookmark name", self.action),
        }
    }

    fn run(&self, store: &ShortdirStore, cwd: &Path, out: &mut dyn Write) -> Result<()> {
        match self.action.as_str() {
            "set" => {
                let name = self.required_name()?;
                let mut entries = store.load()?;
                entries.insert(name.to_string(), cwd.to_path_buf());
                store.save(&entries)?;
                writeln!(out, "{name} is set as an alias for {}", cwd.display())?;
            }
            "jump" => {
                let name = self.required_name()?;
                let entries = store.load()?;
                let Some(dir) = entries.get(name) else {
                    bail!("no such bookmark: {name}");
                };
                change_dir(&dir.to_string_lossy())
                    .with_context(|| format!("{}", dir.display()))?;
            }
            "del" => {
                let name = self.required_name()?;
                let mut entries = store.load()?;
                if entries.remove(name).is_none() {
                    bail!("no such bookmark: {name}");
                }
                store.save(&entries)?;
            }
            "clear" => store.save(&BTreeMap::new())?,
            "list" => {
                for (name, dir) in store.load()? {
                    writeln!(out, "{name}\t{}", dir.display())?;
                }
            }
            other => bail!("unknown action: {other}. Use set, jump, del, clear or list."),
        }
        debug!(action = %self.action, "shortdir done");
        Ok(())
    }
}

impl BuiltinCommand for Shortdir {
    fn name() -> &'static str {
        "shortdir"
    }

    fn arity() -> RangeInclusive<usize> {
        1..=2
    }

    fn usage() -> &'static str {
        "Usage: shortdir set|jump|del <name>, shortdir clear, shortdir list"
    }

    fn execute(self, ctx: &mut BuiltinContext<'_>) -> Result<ExitCode> {
        let store = ShortdirStore::new(&ctx.session.config().shortdir_file);
        let cwd = ctx.session.current_dir();
        self.run(&store, &cwd, ctx.out())?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{lock_current_dir, run_builtin};
    use crate::config::Config;
    use crate::env::Session;
    use std::env as stdenv;

    fn session_with_store(dir: &Path) -> Session {
        Session::new(Config {
            shortdir_file: dir.join("shortdirs"),
            ..Config::default()
        })
    }

    #[test]
    fn store_round_trips_and_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");
        fs::write(&path, "home\t/home/u\ngarbage\nsrc\t/src\n").unwrap();
        let store = ShortdirStore::new(&path);

        let entries = store.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries["home"], PathBuf::from("/home/u"));

        store.save(&entries).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "home\t/home/u\nsrc\t/src\n");
    }

    #[test]
    fn missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ShortdirStore::new(dir.path().join("absent"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn set_list_del_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = ShortdirStore::new(dir.path().join("store"));
        let cwd = Path::new("/projects/sea");
        let cmd = |action: &str, name: Option<&str>| Shortdir {
            action: action.to_string(),
            name: name.map(str::to_string),
        };

        let mut out = Vec::new();
        cmd("set", Some("sea")).run(&store, cwd, &mut out).unwrap();
        cmd("set", Some("root")).run(&store, Path::new("/"), &mut out).unwrap();
        out.clear();
        cmd("list", None).run(&store, cwd, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "root\t/\nsea\t/projects/sea\n");

        cmd("del", Some("root")).run(&store, cwd, &mut Vec::new()).unwrap();
        assert!(cmd("del", Some("root")).run(&store, cwd, &mut Vec::new()).is_err());
        assert_eq!(store.load().unwrap().len(), 1);

        cmd("clear", None).run(&store, cwd, &mut Vec::new()).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn jump_changes_directory() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = fs::canonicalize(dir.path()).unwrap();
        let mut session = session_with_store(&target);

        stdenv::set_current_dir(&target).unwrap();
        let (code, _) = run_builtin(&mut session, "shortdir", &["set", "tmp"]);
        assert_eq!(code, 0);
        stdenv::set_current_dir(&orig).unwrap();

        let (code, out) = run_builtin(&mut session, "shortdir", &["jump", "tmp"]);
        assert_eq!(code, 0, "{out}");
        assert_eq!(fs::canonicalize(stdenv::current_dir().unwrap()).unwrap(), target);
        stdenv::set_current_dir(orig).expect("failed to restore cwd");
    }

    #[test]
    fn unknown_bookmark_and_action_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_with_store(dir.path());

        let (code, out) = run_builtin(&mut session, "shortdir", &["jump", "nowhere"]);
        assert_eq!(code, 1);
        assert_eq!(out, "-seashell: shortdir: no such bookmark: nowhere\n");

        let (code, _) = run_builtin(&mut session, "shortdir", &["fly"]);
        assert_eq!(code, 1);
        let (code, _) = run_builtin(&mut session, "shortdir", &["set"]);
        assert_eq!(code, 1);
    }
}
