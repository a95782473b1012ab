use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mailprobe")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Option<Commands>,

    /// reads addresses from stdin (one per line) instead of a subcommand
    #[arg(long)]
    pub stdin: bool,

    /// output format: human|json
    #[arg(long, default_value = "human")]
    pub format: String,

    /// write the report to a file instead of stdout
    #[arg(long)]
    pub out: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe a single address and print its Verdict.
    Probe {
        email: String,
        /// name used for EHLO/HELO
        #[arg(long)]
        helo: Option<String>,
        /// MAIL FROM envelope (defaults to postmaster@<domain>)
        #[arg(long = "from")]
        mail_from: Option<String>,
        /// per-socket timeout in milliseconds
        #[arg(long = "timeout", default_value_t = 15_000)]
        timeout_ms: u64,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }
}
