#![forbid(unsafe_code)]

//! `repl-uplink` — interactive REPL into a remote embedded script engine.
//!
//! Connects to the engine's TCP evaluation server, bootstraps its module
//! loader, then reads forms from stdin, evaluates them remotely, and prints
//! results — including translated stack traces on exceptions and inline
//! console output as the remote host emits it.

use std::io::Write as _;
use std::path::PathBuf;
use std::pin::pin;

use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use repl_uplink::driver::{ReplDriver, UplinkDriver};
use repl_uplink::models::eval::{EvalResponse, EvalStatus};
use repl_uplink::volume::LocalVolume;
use repl_uplink::{AppError, Result, SessionConfig};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "repl-uplink", about = "REPL into a remote embedded script engine", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Remote host running the engine server (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Engine server port (overrides config).
    #[arg(long)]
    port: Option<u16>,

    /// Compiled-output directory shared through the bulk volume
    /// (overrides config).
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Dependency manifest path relative to the output directory
    /// (overrides config).
    #[arg(long)]
    manifest: Option<String>,

    /// Core runtime module loaded during bootstrap (overrides config).
    #[arg(long)]
    core_module: Option<String>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let config = build_config(&args)?;
    info!(addr = config.addr(), "configuration loaded");

    // Inline console output from the remote host goes straight to stdout,
    // independent of whichever evaluation is pending.
    let (inline_tx, inline_rx) = mpsc::channel(64);
    let printer = spawn_inline_printer(inline_rx);

    let volume = LocalVolume::new(config.output_dir.clone());
    let mut driver = UplinkDriver::new(config, Box::new(volume), inline_tx);

    let session = driver.setup().await?;
    info!(output_root = %session.output_root.display(), "session ready");

    let result = repl_loop(&mut driver).await;

    if let Err(err) = driver.teardown().await {
        error!(%err, "teardown failed");
    }
    drop(driver);
    let _ = printer.await;

    info!("repl-uplink shut down");
    result
}

/// Merge the config file (when given) with CLI overrides.
fn build_config(args: &Cli) -> Result<SessionConfig> {
    let mut config = if let Some(path) = &args.config {
        SessionConfig::load_from_path(path)?
    } else {
        let host = args.host.clone().ok_or_else(|| {
            AppError::Config("either --config or --host and --out-dir are required".into())
        })?;
        let out_dir = args.out_dir.clone().ok_or_else(|| {
            AppError::Config("either --config or --host and --out-dir are required".into())
        })?;
        SessionConfig::new(host, out_dir)
    };

    if let Some(host) = &args.host {
        config.host.clone_from(host);
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(out_dir) = &args.out_dir {
        config.output_dir.clone_from(out_dir);
    }
    if let Some(manifest) = &args.manifest {
        config.manifest_path.clone_from(manifest);
    }
    if let Some(core_module) = &args.core_module {
        config.core_module.clone_from(core_module);
    }

    config.validate()?;
    Ok(config)
}

/// Drain the inline-output channel to stdout until all senders are gone.
fn spawn_inline_printer(mut inline_rx: mpsc::Receiver<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(text) = inline_rx.recv().await {
            print!("{text}");
            if std::io::stdout().flush().is_err() {
                break;
            }
        }
    })
}

async fn repl_loop(driver: &mut dyn ReplDriver) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shutdown = pin!(shutdown_signal());

    loop {
        print_prompt()?;

        tokio::select! {
            () = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }

            line = lines.next_line() => {
                let line = line
                    .map_err(|err| AppError::Io(format!("stdin read failed: {err}")))?;
                let Some(line) = line else {
                    // stdin EOF.
                    break;
                };

                let form = line.trim();
                if form.is_empty() {
                    continue;
                }
                if form == ":quit" {
                    break;
                }

                let response = driver.evaluate("repl-input", 1, form).await?;
                render_response(&*driver, &response);
                if response.status == EvalStatus::Error {
                    error!("connection lost");
                    break;
                }
            }
        }
    }

    Ok(())
}

fn render_response(driver: &dyn ReplDriver, response: &EvalResponse) {
    match response.status {
        EvalStatus::Success => println!("{}", response.value),
        EvalStatus::Exception => {
            eprintln!("{}", response.value);
            if let Some(raw) = &response.stacktrace {
                let frames = driver.parse_stacktrace(raw);
                if !frames.is_empty() {
                    driver.print_stacktrace(&frames);
                }
            }
        }
        EvalStatus::Error => eprintln!("{}", response.value),
    }
}

fn print_prompt() -> Result<()> {
    print!("uplink=> ");
    std::io::stdout()
        .flush()
        .map_err(|err| AppError::Io(format!("stdout flush failed: {err}")))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
