//! CLI definition using clap derive.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Debug, Parser)]
#[command(
    name = "ircdenoise",
    version,
    about = "IRC relay that hides join/part/quit/nick churn from idle users"
)]
pub struct Cli {
    /// More logging (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Less logging (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub quiet: u8,

    /// Accept the next client when a session ends instead of exiting
    #[arg(short, long)]
    pub respawn: bool,

    /// Local address to listen on [default: 0.0.0.0]
    #[arg(short, long, value_name = "ADDR")]
    pub listen: Option<IpAddr>,

    /// Local port to listen on [default: 7777]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Hard connect timeout in seconds, also bounding registration [default: 30]
    #[arg(short = 't', long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Per-address connect timeout in seconds
    #[arg(short = 'T', long = "soft-timeout", value_name = "SECS")]
    pub soft_timeout: Option<u64>,

    /// Seconds a message keeps its author's churn visible [default: 600]
    #[arg(short = 'a', long = "arm-window", value_name = "SECS")]
    pub arm_window: Option<u64>,

    /// Nickname that announces forwarded churn [default: denoise]
    #[arg(long = "announce-as", value_name = "NICK")]
    pub announce_as: Option<String>,

    /// TOML file with the same settings; flags take precedence
    #[arg(short, long, value_name = "FILE", env = "IRCDENOISE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Upstream server as host[:port] (port defaults to 6667)
    #[arg(value_name = "SERVER")]
    pub server: Option<String>,
}

impl Cli {
    /// Net verbosity: each `-v` adds one, each `-q` removes one.
    pub fn verbosity(&self) -> i8 {
        let up = i8::try_from(self.verbose).unwrap_or(i8::MAX);
        let down = i8::try_from(self.quiet).unwrap_or(i8::MAX);
        up.saturating_sub(down)
    }
}
