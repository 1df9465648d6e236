//! A Debug Adapter Protocol server hosting the simulated script engine.
//!
//! The scripts given on the command line are compiled into one global of
//! the simulated engine and run once the client sends `configurationDone`.
//! The protocol is served over TCP (default `127.0.0.1:9229`) or, with
//! `--stdio`, over standard input and output.

mod debug;

use clap::{Parser, ValueHint};
use color_eyre::eyre::{Result, WrapErr};
use dapbridge::{DebuggerConfig, LogLevel};
use debug::dap::{DapTransportMode, run_dap_server};
use simple_logger::SimpleLogger;
use std::{fs, path::PathBuf};

/// CLI configuration for `dapbridge`.
#[derive(Debug, Parser)]
#[command(author, version, about, name = "dapbridge")]
struct Opt {
    /// The script file(s) to debug.
    #[arg(name = "FILE", value_hint = ValueHint::FilePath)]
    files: Vec<PathBuf>,

    /// Address to listen on in TCP mode.
    #[arg(long, default_value = "127.0.0.1")]
    address: String,

    /// Port to listen on in TCP mode.
    #[arg(long, short, default_value_t = 9229)]
    port: u16,

    /// Serve the protocol over stdin/stdout instead of TCP.
    #[arg(long)]
    stdio: bool,

    /// Log verbosity, one of trace, debug, info, warn or error.
    #[arg(long, env = "DAPBRIDGE_LOG")]
    log_level: Option<LogLevel>,

    /// A TOML file holding the debugger configuration.
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> Result<DebuggerConfig> {
    let Some(path) = path else {
        return Ok(DebuggerConfig::default());
    };
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("could not read config file {}", path.display()))?;
    toml::from_str(&text).wrap_err_with(|| format!("invalid config file {}", path.display()))
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Opt::parse();

    let mut config = load_config(args.config.as_ref())?;
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    SimpleLogger::new()
        .with_level(config.log_level.to_level_filter())
        .init()
        .wrap_err("could not install the logger")?;

    let mode = if args.stdio {
        DapTransportMode::Stdio
    } else {
        DapTransportMode::Tcp(format!("{}:{}", args.address, args.port))
    };
    run_dap_server(&mode, config, &args.files)
}
