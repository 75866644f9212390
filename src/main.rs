use argh::FromArgs;
use seashell::config::{DEFAULT_LOG_FILTER, DEFAULT_SYSNAME, default_shortdir_file};
use seashell::{Config, Interpreter, logging};
use std::path::PathBuf;

#[derive(FromArgs)]
/// An interactive shell with pipes, redirects and background jobs.
struct Args {
    #[argh(option, default = "DEFAULT_SYSNAME.to_string()")]
    /// name shown in the prompt and in diagnostics.
    name: String,

    #[argh(option, default = "DEFAULT_LOG_FILTER.to_string()")]
    /// log filter used when SEASHELL_LOG is unset, e.g. debug.
    log: String,

    #[argh(option)]
    /// file holding shortdir bookmarks. Defaults to ~/.seashell_shortdirs.
    shortdir_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    let config = Config {
        sysname: args.name,
        shortdir_file: args.shortdir_file.unwrap_or_else(default_shortdir_file),
        log_filter: args.log,
    };
    logging::init(&config)?;

    Interpreter::new(config).repl()
}
