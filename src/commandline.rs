use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use jfy_inverter_lib::protocol as proto;
use std::path::PathBuf;

fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1") // Common default for Windows, though may vary.
    } else {
        String::from("/dev/ttyS0") // Inverters usually hang off an on-board RS-232/RS-485 port.
    }
}

fn parse_variant(s: &str) -> Result<proto::DeviceVariant, String> {
    s.parse()
}

/// Where the telemetry report is delivered.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliOutput {
    /// Print the telemetry report to standard output.
    Console,
    /// Send the telemetry report to the local syslog daemon.
    Syslog,
    /// Append the telemetry report to a file.
    /// Diagnostics and failure messages still go to standard error.
    #[clap(verbatim_doc_comment)]
    File {
        /// Path of the file the report is appended to; created if missing.
        path: PathBuf,
    },
}

const fn about_text() -> &'static str {
    "solarmon - Poll a JFY grid-connect solar inverter over RS-485 and report its telemetry."
}

#[derive(Parser, Debug)]
#[command(name="solarmon", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug (hex-dumps every frame sent and received),
    /// -vvv for trace. Default is off.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// Serial port the inverter is connected to.
    /// Examples: "/dev/ttyS0" (Linux), "COM1" (Windows).
    #[arg(short = 'p', long, default_value_t = default_device_name())]
    pub device: String,

    /// Inverter model family, which selects the telemetry field layout.
    /// Use "twin" for dual-string Suntwin inverters, "single" otherwise.
    #[arg(long, default_value_t = proto::DeviceVariant::SingleString, value_parser = parse_variant, verbatim_doc_comment)]
    pub variant: proto::DeviceVariant,

    /// Report destination; defaults to the console.
    #[command(subcommand)]
    pub output: Option<CliOutput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = CliArgs::parse_from(["solarmon"]);
        assert_eq!(args.variant, proto::DeviceVariant::SingleString);
        assert_eq!(args.device, default_device_name());
        assert_eq!(args.output, None);
    }

    #[test]
    fn twin_variant_and_file_output() {
        let args = CliArgs::parse_from([
            "solarmon",
            "--variant",
            "twin",
            "-p",
            "/dev/ttyUSB1",
            "file",
            "/var/log/solarmon.json",
        ]);
        assert_eq!(args.variant, proto::DeviceVariant::Twin);
        assert_eq!(args.device, "/dev/ttyUSB1");
        assert_eq!(
            args.output,
            Some(CliOutput::File {
                path: PathBuf::from("/var/log/solarmon.json")
            })
        );
    }

    #[test]
    fn rejects_unknown_variant() {
        assert!(CliArgs::try_parse_from(["solarmon", "--variant", "tripple"]).is_err());
    }
}
