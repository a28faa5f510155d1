//! Command-line interface support for hookway applications
//!
//! Optional parsing of the flags every server binary wants:
//! - `--config <path>` - configuration file location
//! - `--port <port>` - override the configured listening port
//! - `--help`
//!
//! Uses clap when the `cli` feature is enabled, a small manual parser otherwise.

use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

#[cfg(feature = "cli")]
use clap::{Arg, Command};

/// CLI arguments parsed from command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub config_file: Option<PathBuf>,
    pub port: Option<u16>,
    pub help: bool,
}

impl CliArgs {
    /// Parse process arguments
    pub fn parse() -> Result<Self> {
        Self::parse_from(env::args())
    }

    #[cfg(feature = "cli")]
    pub fn parse_from<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let app = Command::new("hookway-app")
            .version(env!("CARGO_PKG_VERSION"))
            .about("hookway HTTP server")
            .arg(
                Arg::new("config")
                    .long("config")
                    .short('c')
                    .value_name("FILE")
                    .help("Configuration file path")
                    .value_parser(clap::value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("port")
                    .long("port")
                    .short('p')
                    .value_name("PORT")
                    .help("Listening port")
                    .value_parser(clap::value_parser!(u16)),
            );

        let matches = app.try_get_matches_from(args).map_err(|e| {
            Error::config(format!("Failed to parse command line arguments: {}", e))
        })?;

        Ok(CliArgs {
            config_file: matches.get_one::<PathBuf>("config").cloned(),
            port: matches.get_one::<u16>("port").copied(),
            help: false,
        })
    }

    #[cfg(not(feature = "cli"))]
    pub fn parse_from<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::parse_simple(args)
    }

    /// Manual parser used when clap is not compiled in
    pub fn parse_simple<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = CliArgs::default();
        // Skip program name
        let mut iter = args.into_iter().map(Into::into).skip(1);

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| Error::config("--config flag requires a value"))?;
                    parsed.config_file = Some(PathBuf::from(value));
                }
                "--port" | "-p" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| Error::config("--port flag requires a value"))?;
                    parsed.port = Some(Self::parse_port(&value)?);
                }
                "--help" | "-h" => parsed.help = true,
                other => {
                    if let Some(path) = other.strip_prefix("--config=") {
                        parsed.config_file = Some(PathBuf::from(path));
                    } else if let Some(port) = other.strip_prefix("--port=") {
                        parsed.port = Some(Self::parse_port(port)?);
                    } else {
                        log::debug!("Ignoring unknown argument '{}'", other);
                    }
                }
            }
        }

        Ok(parsed)
    }

    fn parse_port(value: &str) -> Result<u16> {
        value
            .parse()
            .map_err(|_| Error::config(format!("Invalid port '{}'", value)))
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_file.as_ref()
    }

    pub fn is_help(&self) -> bool {
        self.help
    }
}
