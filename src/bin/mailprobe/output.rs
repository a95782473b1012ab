use anyhow::{Context, Result, bail};

use mailprobe::Verdict;

use crate::args::Cli;

pub fn write_reports(verdicts: &[Verdict], cli: &Cli) -> Result<()> {
    match cli.format.as_str() {
        "human" => write_human(verdicts, cli),
        "json" => write_json(verdicts, cli),
        other => bail!("unknown --format '{other}', use: human|json"),
    }
}

pub fn any_unreachable(verdicts: &[Verdict]) -> bool {
    verdicts.iter().any(|v| !v.connection_successful && v.port_opened)
}

fn write_human(verdicts: &[Verdict], _cli: &Cli) -> Result<()> {
    for verdict in verdicts {
        println!(
            "{:<32} {:<12} catch_all={} code={}",
            verdict.address, verdict.category, verdict.catch_all, verdict.smtp_code
        );
        if let Some(host) = &verdict.mail_host {
            println!("        mx: {host}");
        }
        for error in &verdict.errors {
            println!("        error: {error}");
        }
    }
    Ok(())
}

fn write_json(verdicts: &[Verdict], cli: &Cli) -> Result<()> {
    let rendered = serde_json::to_string_pretty(verdicts)?;
    if let Some(path) = &cli.out {
        write_all_atomically(path, rendered.as_bytes())?;
    } else {
        println!("{rendered}");
    }
    Ok(())
}

fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}
