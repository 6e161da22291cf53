use std::path::PathBuf;

use clap::Parser;

/// Flags of the wrapping process: daemonisation, logging sink and
/// verbosity, and an explicit config path. These govern process-level
/// concerns only — they never reach into the RPC or modem logic directly.
#[derive(Parser, Debug)]
#[command(name = "landiallerd", version, about = "Shares a dial-up link across a LAN over an RPC API")]
pub struct Cli {
    /// Run in the foreground instead of daemonising.
    #[arg(short = 'f', long = "foreground")]
    pub foreground: bool,

    /// Log to the given file instead of stderr.
    #[arg(short = 'l', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log to syslog instead of stderr (Unix only).
    #[arg(short = 's', long = "syslog")]
    pub syslog: bool,

    /// Verbose (debug-level) logging, overriding the config file's log_level.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Explicit configuration file, overriding the documented search path.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}
