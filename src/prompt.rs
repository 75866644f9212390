use crate::env::Session;
use std::path::Path;

const BOLD: &str = "\x1b[1m";
const BLUE: &str = "\x1b[34m";
const WHITE: &str = "\x1b[37m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";

/// `<user>@<host>:<cwd> <sysname>$ ` with bold colored fields.
pub fn format_prompt(user: &str, host: &str, cwd: &Path, sysname: &str) -> String {
    format!(
        "{BOLD}{BLUE}{user}@{host}{BOLD}{WHITE}:\
         {BOLD}{GREEN}{cwd} {BOLD}{CYAN}{sysname}{BOLD}{WHITE}$ ",
        cwd = cwd.display()
    )
}

/// Render the prompt for the session. User, host and directory are looked up
/// afresh on every call.
pub fn render(session: &Session) -> String {
    let host = nix::unistd::gethostname()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_default();
    let user = session.get_var("USER").unwrap_or_default();
    format_prompt(&user, &host, &session.current_dir(), session.sysname())
}
