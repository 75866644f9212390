use nix::errno::Errno;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// Finds executables for bare command names.
///
/// Candidates are the current directory followed by every `PATH` entry, in
/// order. Relative and empty entries are taken relative to the current
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    current_dir: PathBuf,
    search_paths: OsString,
}

impl PathResolver {
    pub fn new(current_dir: PathBuf, search_paths: impl Into<OsString>) -> Self {
        Self {
            current_dir,
            search_paths: search_paths.into(),
        }
    }

    /// Every path the command might live at, in the order they are tried.
    ///
    /// An empty name has no candidates.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        if name.is_empty() {
            return Vec::new();
        }
        let mut out = vec![self.current_dir.join(name)];
        if !self.search_paths.is_empty() {
            out.extend(
                std::env::split_paths(&self.search_paths)
                    .map(|dir| self.current_dir.join(dir).join(name)),
            );
        }
        out
    }

    /// The first candidate that is an executable file.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.candidates(name)
            .into_iter()
            .find(|path| is_executable(path))
    }
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match path.metadata() {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

/// Whether a failed spawn means "this candidate cannot be executed, try the
/// next one" rather than a genuine failure to create a process.
pub fn is_exec_failure(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error().map(Errno::from_raw),
        Some(
            Errno::ENOENT
                | Errno::EACCES
                | Errno::ENOEXEC
                | Errno::ENOTDIR
                | Errno::ELOOP
                | Errno::ENAMETOOLONG
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn touch(path: &Path, mode: u32) {
        fs::write(path, "#!/bin/sh\n").expect("write file");
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).expect("chmod");
    }

    #[test]
    fn current_dir_comes_first_then_path_in_order() {
        let resolver = PathResolver::new(PathBuf::from("/work"), "/usr/bin:/bin");
        assert_eq!(
            resolver.candidates("ls"),
            [
                PathBuf::from("/work/ls"),
                PathBuf::from("/usr/bin/ls"),
                PathBuf::from("/bin/ls"),
            ]
        );
    }

    #[test]
    fn relative_and_empty_entries_use_current_dir() {
        let resolver = PathResolver::new(PathBuf::from("/work"), "bin::/opt");
        assert_eq!(
            resolver.candidates("tool"),
            [
                PathBuf::from("/work/tool"),
                PathBuf::from("/work/bin/tool"),
                PathBuf::from("/work/tool"),
                PathBuf::from("/opt/tool"),
            ]
        );
    }

    #[test]
    fn empty_path_checks_current_dir_only() {
        let resolver = PathResolver::new(PathBuf::from("/work"), "");
        assert_eq!(resolver.candidates("tool"), [PathBuf::from("/work/tool")]);
    }

    #[test]
    fn empty_name_has_no_candidates() {
        let resolver = PathResolver::new(PathBuf::from("/work"), "/bin");
        assert!(resolver.candidates("").is_empty());
        assert!(resolver.resolve("").is_none());
    }

    #[test]
    fn resolve_prefers_current_dir_and_skips_non_executables() {
        let cwd = tempfile::tempdir().unwrap();
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(&first.path().join("tool"), 0o644);
        touch(&second.path().join("tool"), 0o755);

        let search = std::env::join_paths([first.path(), second.path()]).unwrap();
        let resolver = PathResolver::new(cwd.path().to_path_buf(), search);
        assert_eq!(resolver.resolve("tool"), Some(second.path().join("tool")));

        touch(&cwd.path().join("tool"), 0o700);
        assert_eq!(resolver.resolve("tool"), Some(cwd.path().join("tool")));
    }

    #[test]
    fn resolution_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("tool"), 0o755);
        let resolver = PathResolver::new(PathBuf::from("/nonexistent"), dir.path());

        assert_eq!(resolver.candidates("tool"), resolver.candidates("tool"));
        assert_eq!(resolver.resolve("tool"), resolver.resolve("tool"));
        assert!(resolver.resolve("tool").is_some());
    }

    #[test]
    fn absolute_name_resolves_to_itself() {
        let resolver = PathResolver::new(PathBuf::from("/work"), "/usr/bin");
        assert_eq!(resolver.candidates("/bin/sh")[0], PathBuf::from("/bin/sh"));
        assert_eq!(resolver.resolve("/bin/sh"), Some(PathBuf::from("/bin/sh")));
    }

    #[test]
    fn missing_file_and_permission_errors_advance() {
        assert!(is_exec_failure(&io::Error::from_raw_os_error(Errno::ENOENT as i32)));
        assert!(is_exec_failure(&io::Error::from_raw_os_error(Errno::EACCES as i32)));
        assert!(!is_exec_failure(&io::Error::from_raw_os_error(Errno::EAGAIN as i32)));
        assert!(!is_exec_failure(&io::Error::other("no os code")));
    }
}
