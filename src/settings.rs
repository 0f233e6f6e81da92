//! CLI surface and settings validation, following
//! `original_source/worker/include/Settings.hpp` for the flag set and
//! validation rules, using `clap`'s derive API.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::FatalError;
use crate::logger::LogTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Warn,
    Error,
    None,
}

/// Command-line surface : `--logLevel`, repeatable `--logTags`,
/// the RTC port range, optional DTLS certificate/key pair,
/// `--libwebrtcFieldTrials` and `--disableLiburing`.
#[derive(Debug, Parser)]
#[command(name = "mediasoup-worker", version)]
pub struct Cli {
    #[arg(long = "logLevel", value_enum, default_value = "error")]
    pub log_level: LogLevel,

    #[arg(long = "logTags")]
    pub log_tags: Vec<String>,

    #[arg(long = "rtcMinPort", default_value_t = 10_000)]
    pub rtc_min_port: u16,

    #[arg(long = "rtcMaxPort", default_value_t = 59_999)]
    pub rtc_max_port: u16,

    #[arg(long = "dtlsCertificateFile")]
    pub dtls_certificate_file: Option<PathBuf>,

    #[arg(long = "dtlsPrivateKeyFile")]
    pub dtls_private_key_file: Option<PathBuf>,

    #[arg(long = "libwebrtcFieldTrials")]
    pub libwebrtc_field_trials: Option<String>,

    #[arg(long = "disableLiburing", default_value_t = false)]
    pub disable_liburing: bool,
}

/// Validated settings the rest of the worker is built from. Construction
/// is the single place settings validation happens; a validation failure
/// maps to exit code 42.
pub struct Settings {
    pub log_level: LogLevel,
    pub log_tags: Vec<LogTag>,
    pub rtc_min_port: u16,
    pub rtc_max_port: u16,
    pub dtls_certificate_file: Option<PathBuf>,
    pub dtls_private_key_file: Option<PathBuf>,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Result<Self, FatalError> {
        if cli.rtc_min_port > cli.rtc_max_port {
            return Err(FatalError::SettingsValidation(format!(
                "--rtcMinPort ({}) must not exceed --rtcMaxPort ({})",
                cli.rtc_min_port, cli.rtc_max_port
            )));
        }
        match (&cli.dtls_certificate_file, &cli.dtls_private_key_file) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(FatalError::SettingsValidation(
                    "--dtlsCertificateFile and --dtlsPrivateKeyFile must be given together".to_string(),
                ))
            }
            _ => {}
        }
        let log_tags = cli
            .log_tags
            .iter()
            .map(|t| LogTag::parse(t))
            .collect::<Result<Vec<_>, _>>()
            .map_err(FatalError::SettingsValidation)?;

        if std::env::var("MEDIASOUP_VERSION").is_err() {
            return Err(FatalError::SettingsValidation("MEDIASOUP_VERSION environment variable is not set".to_string()));
        }

        Ok(Self {
            log_level: cli.log_level,
            log_tags,
            rtc_min_port: cli.rtc_min_port,
            rtc_max_port: cli.rtc_max_port,
            dtls_certificate_file: cli.dtls_certificate_file,
            dtls_private_key_file: cli.dtls_private_key_file,
        })
    }
}

/// Used by bind addresses that default to "any" when the controller
/// doesn't pin a specific listen IP.
pub fn any_ip(v6: bool) -> IpAddr {
    if v6 {
        IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
    } else {
        IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
    }
}
