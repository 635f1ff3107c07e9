//! Report delivery for poll results.
//!
//! The protocol engine never prints anything itself; one formatted message
//! per poll cycle ends up here and is routed to the configured destination.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;

/// Severity of a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Where reports are delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    /// Info to stdout, warnings and errors to stderr.
    Console,
    /// All severities to the local syslog daemon.
    Syslog,
    /// Info-level telemetry appended to the file; warnings and errors
    /// still go to stderr so failures never end up in the telemetry log.
    File(PathBuf),
}

pub struct Reporter {
    destination: Destination,
}

impl Reporter {
    pub fn new(destination: Destination) -> Self {
        Reporter { destination }
    }

    /// Delivers one formatted message at the given severity.
    pub fn deliver(&mut self, severity: Severity, message: &str) -> Result<()> {
        match &self.destination {
            Destination::Console => {
                console(severity, message);
                Ok(())
            }
            Destination::Syslog => syslog_deliver(severity, message),
            Destination::File(path) => {
                if severity == Severity::Info {
                    append_line(path, message)
                } else {
                    console(severity, message);
                    Ok(())
                }
            }
        }
    }
}

fn console(severity: Severity, message: &str) {
    if severity == Severity::Info {
        println!("{message}");
    } else {
        eprintln!("{message}");
    }
}

fn syslog_deliver(severity: Severity, message: &str) -> Result<()> {
    let formatter = syslog::Formatter3164 {
        facility: syslog::Facility::LOG_USER,
        hostname: None,
        process: String::from("solarmon"),
        pid: std::process::id(),
    };
    let mut logger =
        syslog::unix(formatter).map_err(|error| anyhow::anyhow!("cannot open syslog: {error}"))?;
    match severity {
        Severity::Info => logger.info(message),
        Severity::Warning => logger.warning(message),
        Severity::Error => logger.err(message),
    }
    .map_err(|error| anyhow::anyhow!("cannot write to syslog: {error}"))
}

fn append_line(path: &PathBuf, message: &str) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Cannot open report file {}", path.display()))?;
    writeln!(file, "{message}")
        .with_context(|| format!("Cannot append to report file {}", path.display()))
}
