//! solarmon - JFY solar inverter poller
//!
//! A command-line tool that polls a JFY grid-connect solar inverter over an
//! RS-485/serial link and reports one telemetry block as JSON.
//!
//! One invocation runs exactly one poll cycle:
//! - open the serial port,
//! - walk the reset/identify/register handshake,
//! - poll the telemetry block and decode it for the configured variant,
//! - deliver the JSON report to the console, syslog or a file.
//!
//! There is no retry at any layer; every failure is terminal and mapped to
//! a distinct exit code (1 transport open, 2 registration handshake,
//! 3 telemetry read).

use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use jfy_inverter_lib::client::JfyInverter;
use jfy_inverter_lib::protocol as proto;
use jfy_inverter_lib::transport::{SerialTransport, Transport};
use log::*;
use std::panic;
use std::process::ExitCode;

mod commandline;
mod report;

use report::{Destination, Reporter, Severity};

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0)); // Provide defaults

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic", // Optional target for filtering
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    log_handle
}

fn deliver_failure(reporter: &mut Reporter, message: &str) {
    if let Err(error) = reporter.deliver(Severity::Error, message) {
        error!("Cannot deliver failure report: {error:?}");
    }
}

/// Runs one complete poll cycle (handshake, poll, report) and returns the
/// process exit code.
fn poll_once<T: Transport>(
    inverter: &mut JfyInverter<T>,
    variant: proto::DeviceVariant,
    reporter: &mut Reporter,
) -> u8 {
    if let Err(error) = inverter.register() {
        deliver_failure(reporter, &format!("Failed to register inverter: {error}"));
        return 2;
    }

    let record = match inverter.poll_telemetry(variant) {
        Ok(record) => record,
        Err(error) => {
            deliver_failure(reporter, &format!("Failed to read inverter data: {error}"));
            return 3;
        }
    };

    let json = match serde_json::to_string(&record) {
        Ok(json) => json,
        Err(error) => {
            deliver_failure(reporter, &format!("Cannot serialize telemetry: {error}"));
            return 3;
        }
    };
    if let Err(error) = reporter.deliver(Severity::Info, &json) {
        error!("Cannot deliver telemetry report: {error:?}");
        return 3;
    }
    0
}

fn main() -> ExitCode {
    let args = commandline::CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter());
    info!(
        "solarmon started, device {}, variant {}",
        args.device, args.variant
    );

    let destination = match args.output {
        None | Some(commandline::CliOutput::Console) => Destination::Console,
        Some(commandline::CliOutput::Syslog) => Destination::Syslog,
        Some(commandline::CliOutput::File { path }) => Destination::File(path),
    };
    let mut reporter = Reporter::new(destination);

    let port = match SerialTransport::open(&args.device) {
        Ok(port) => port,
        Err(error) => {
            deliver_failure(
                &mut reporter,
                &format!("Failed to open serial port {}: {error}", args.device),
            );
            return ExitCode::from(1);
        }
    };

    let mut inverter = JfyInverter::new(port);
    ExitCode::from(poll_once(&mut inverter, args.variant, &mut reporter))
}
