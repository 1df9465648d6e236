//! DAP server for the `dapbridge` CLI
//!
//! The engine state is single threaded, so the server splits into two
//! threads joined by a [`MessagePump`]:
//!
//! - a transport thread reads framed requests from the client, hands each
//!   one to the pump and writes the response back;
//! - the main thread owns the debugger and the simulated engine, services
//!   requests between and during script runs, and writes queued events.
//!
//! Both threads write through one shared, locked writer, so frames never
//! interleave.

use color_eyre::eyre::{Result, WrapErr};
use dapbridge::{
    Debugger, DebuggerConfig, MessagePump, PumpClient, ScriptId,
    dap::transport::{read_message, write_message},
    hub::names,
    sim::SimHost,
};
use std::{
    cell::Cell,
    fs,
    io::{self, BufRead, BufReader, Write},
    net::TcpListener,
    path::PathBuf,
    rc::Rc,
    sync::{Arc, Mutex, PoisonError},
    thread,
    time::Duration,
};

const LOG_TARGET: &str = "dapbridge_cli::dap";

/// How long the main thread waits for a request before checking its state.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Transport mode for the DAP server
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DapTransportMode {
    /// Standard input/output.
    Stdio,
    /// A TCP server on the given address.
    Tcp(String),
}

/// Runs the DAP server with the specified transport mode.
pub(crate) fn run_dap_server(mode: &DapTransportMode, config: DebuggerConfig, files: &[PathBuf]) -> Result<()> {
    match mode {
        DapTransportMode::Stdio => {
            log::info!(target: LOG_TARGET, "Starting debug adapter on stdio");
            let reader = BufReader::new(io::stdin());
            let writer: Box<dyn Write + Send> = Box::new(io::stdout());
            serve(reader, writer, config, files)?;
        }
        DapTransportMode::Tcp(address) => run_tcp_server(address, config, files)?,
    }

    log::info!(target: LOG_TARGET, "Server stopped");
    Ok(())
}

/// Accepts one client and serves it.
fn run_tcp_server(address: &str, config: DebuggerConfig, files: &[PathBuf]) -> Result<()> {
    let listener = TcpListener::bind(address).wrap_err_with(|| format!("could not listen on {address}"))?;
    log::info!(target: LOG_TARGET, "Listening on {address}");

    loop {
        let (stream, peer) = listener.accept().wrap_err("could not accept a connection")?;
        log::info!(target: LOG_TARGET, "Client connected from {peer}");

        let reader = match stream.try_clone() {
            Ok(reader) => BufReader::new(reader),
            Err(err) => {
                log::error!(target: LOG_TARGET, "Could not set up connection from {peer}: {err}");
                continue;
            }
        };
        // One session per process: the engine state does not outlive its client.
        return serve(reader, Box::new(stream), config, files);
    }
}

/// Serves one client until it disconnects.
fn serve<R>(reader: R, writer: Box<dyn Write + Send>, config: DebuggerConfig, files: &[PathBuf]) -> Result<()>
where
    R: BufRead + Send + 'static,
{
    let writer: SharedWriter = Arc::new(Mutex::new(writer));

    let sink = Arc::clone(&writer);
    let pump = Rc::new(MessagePump::new(move |event| {
        if let Err(err) = send(&sink, event) {
            log::error!(target: LOG_TARGET, "Failed to send event: {err}");
        }
    }));

    let client = pump.client();
    let transport = thread::Builder::new()
        .name("dap-transport".to_string())
        .spawn(move || {
            forward(reader, &client, &writer);
            client.close();
        })
        .wrap_err("could not start the transport thread")?;

    let host = Rc::new(SimHost::new());
    let debugger = Debugger::with_config(host.clone(), pump.clone(), config);

    let configured = Rc::new(Cell::new(false));
    let flag = Rc::clone(&configured);
    debugger.on(names::ON_CONFIGURATION_DONE, "dapbridge_cli", move |_, _| {
        flag.set(true);
        Ok(())
    });

    let scripts = load_scripts(&host, &debugger, files)?;

    while !configured.get() {
        if !pump.poll(&debugger, POLL_INTERVAL) {
            return join(transport);
        }
    }

    for script in scripts {
        host.run_script(&debugger, script, None);
        pump.try_handle_message(&debugger);
    }
    log::info!(target: LOG_TARGET, "All scripts finished");
    debugger.session().push_event("terminated", None);

    while pump.poll(&debugger, POLL_INTERVAL) {}
    join(transport)
}

/// Compiles every file into a fresh global.
fn load_scripts(host: &SimHost, debugger: &Debugger, files: &[PathBuf]) -> Result<Vec<ScriptId>> {
    let global = host.new_global(debugger);
    files
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path)
                .wrap_err_with(|| format!("could not read script {}", path.display()))?;
            let url = path.display().to_string();
            log::debug!(target: LOG_TARGET, "Loading {url}");
            Ok(host.load_script(debugger, global, &url, &text))
        })
        .collect()
}

/// Forwards framed requests to the pump and writes back the responses.
fn forward<R: BufRead>(mut reader: R, client: &PumpClient, writer: &SharedWriter) {
    loop {
        match read_message(&mut reader) {
            Ok(Some(request)) => {
                log::trace!(target: LOG_TARGET, "Request: {request}");
                let Some(response) = client.send_request(request) else {
                    log::debug!(target: LOG_TARGET, "Pump closed, dropping request");
                    return;
                };
                if response.is_empty() {
                    continue;
                }
                if let Err(err) = send(writer, &response) {
                    log::error!(target: LOG_TARGET, "Failed to send response: {err}");
                    return;
                }
            }
            Ok(None) => {
                log::info!(target: LOG_TARGET, "Client disconnected");
                return;
            }
            Err(err) => {
                log::error!(target: LOG_TARGET, "Failed to read message: {err}");
                return;
            }
        }
    }
}

fn send(writer: &SharedWriter, message: &str) -> io::Result<()> {
    let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
    write_message(&mut *writer, message)
}

fn join(transport: thread::JoinHandle<()>) -> Result<()> {
    transport
        .join()
        .map_err(|_| color_eyre::eyre::eyre!("the transport thread panicked"))
}
