mod api;
mod cli;
mod config;
mod modem;
mod proxy;
mod rpc;
mod sweeper;
mod timer;
#[cfg(test)]
mod testutil;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpSocket;
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use api::Api;
use config::Config;
use modem::{Modem, ShellCommandRunner};
use proxy::ModemProxy;

/// Detach from the controlling terminal (POSIX only), matching the
/// fork/setpgrp/close-streams dance the original daemon performed before
/// doing anything else. Must run before the tokio runtime is created —
/// forking a multi-threaded process loses every thread but the one that
/// called fork.
#[cfg(unix)]
fn daemonise() -> anyhow::Result<()> {
    // SAFETY: fork() is called before any tokio runtime or extra threads
    // exist, so there is exactly one thread to duplicate.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        anyhow::bail!("fork() failed");
    }
    if pid > 0 {
        // Parent exits immediately; the child carries on as the daemon.
        std::process::exit(0);
    }

    // SAFETY: setsid() detaches the child from the parent's session/terminal.
    unsafe { libc::setsid() };

    // SAFETY: redirect std{in,out,err} to /dev/null. The daemon logs via
    // tracing to a file or syslog instead of inheriting a terminal.
    unsafe {
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_RDWR);
        if devnull >= 0 {
            libc::dup2(devnull, 0);
            libc::dup2(devnull, 1);
            libc::dup2(devnull, 2);
            if devnull > 2 {
                libc::close(devnull);
            }
        }
    }

    Ok(())
}

#[cfg(not(unix))]
fn daemonise() -> anyhow::Result<()> {
    anyhow::bail!("daemonising is only supported on POSIX systems; pass --foreground");
}

fn init_logging(cli: &cli::Cli, config: &Config) {
    let level = if cli.debug { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_ansi(false);

    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .unwrap_or_else(|e| panic!("failed to open log file {}: {e}", path.display()));
            builder.with_writer(move || file.try_clone().expect("clone log file handle")).init();
        }
        None => {
            if cli.syslog {
                // No syslog crate in the dependency stack (out of scope); fall
                // back to stderr with a note rather than silently dropping logs.
                builder.with_writer(std::io::stderr).init();
                eprintln!("--syslog is not supported on this build, logging to stderr instead");
            } else {
                builder.with_writer(std::io::stderr).init();
            }
        }
    }
}

async fn run(cli: cli::Cli, config: Config) -> anyhow::Result<()> {
    info!(port = config.port, "landiallerd starting");

    let runner = Arc::new(ShellCommandRunner::new(config.command_timeout));
    let modem = Modem::new(
        runner,
        config.connect_cmd.clone(),
        config.disconnect_cmd.clone(),
        config.is_connected_cmd.clone(),
    );
    let proxy = Arc::new(ModemProxy::new(modem, config.client_timeout));
    let api = Arc::new(Api::new(Arc::clone(&proxy)));

    let shutdown = Arc::new(Notify::new());

    let sweeper_handle = tokio::spawn(sweeper::run(
        Arc::clone(&proxy),
        config.sweep_interval,
        Arc::clone(&shutdown),
    ));

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let socket = TcpSocket::new_v4()?;
    // Address reuse so a restarted daemon can rebind immediately without
    // waiting out TIME_WAIT on the old listener.
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    let listener = socket.listen(1024)?;

    info!(addr = %addr, "RPC listener bound");

    let app = rpc::router(Arc::clone(&api));
    let shutdown_for_server = Arc::clone(&shutdown);

    let serve_result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            shutdown_for_server.notify_waiters();
        })
        .await;

    if let Err(e) = serve_result {
        error!(error = %e, "RPC listener exited with error");
    }

    shutdown.notify_waiters();
    sweeper_handle.await.ok();

    info!("landiallerd stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to install SIGTERM handler");
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received Ctrl-C");
}

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let config_path = Config::find_file(cli.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("Terminating - error reading config file: {e}");
        std::process::exit(1);
    });
    let config = Config::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Terminating - error reading config file: {e}");
        std::process::exit(1);
    });

    if !cli.foreground {
        daemonise()?;
    }

    init_logging(&cli, &config);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(cli, config))
}
