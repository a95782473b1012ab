#[path = "mailprobe/args.rs"]
mod args;
#[path = "mailprobe/output.rs"]
mod output;

use std::io::{self, BufRead};
use std::sync::Arc;

use anyhow::{Context, Result};
use args::{Cli, Commands};
use mailprobe::{DomainLists, ProbeConfig, ProbeOrchestrator, Verdict, build_resolver};
use output::{any_unreachable, write_reports};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = ProbeConfig::from_env().context("loading configuration")?;

    let mut verdicts = Vec::new();
    if cli.stdin {
        collect_from_stdin(&config, &mut verdicts)?;
    } else if let Some(Commands::Probe {
        email,
        helo,
        mail_from,
        timeout_ms,
    }) = &cli.cmd
    {
        if let Some(helo) = helo {
            config.helo_name = helo.clone();
        }
        if let Some(mail_from) = mail_from {
            config.mail_from = mail_from.clone();
        }
        config.smtp_timeout_ms = *timeout_ms;

        let orchestrator = build_orchestrator(&config)?;
        verdicts.push(orchestrator.categorize(email));
    } else {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    }

    write_reports(&verdicts, &cli)?;

    if any_unreachable(&verdicts) {
        std::process::exit(2);
    }

    Ok(())
}

fn collect_from_stdin(config: &ProbeConfig, verdicts: &mut Vec<Verdict>) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;
    for line in io::stdin().lock().lines() {
        let email = line.context("read stdin")?;
        if email.trim().is_empty() {
            continue;
        }
        verdicts.push(orchestrator.categorize(&email));
    }
    Ok(())
}

fn build_orchestrator(config: &ProbeConfig) -> Result<ProbeOrchestrator> {
    let resolver = build_resolver().context("initializing DNS resolver")?;
    let domain_lists = Arc::new(DomainLists::new(
        config.whitelist_domains.clone(),
        config.disposable_domains.clone(),
        config.blacklist_domains.clone(),
    ));
    let orchestrator = ProbeOrchestrator::new(resolver, domain_lists, config.session_options())
        .context("initializing TLS connector")?
        .with_ports(config.ports.clone());
    Ok(orchestrator)
}
