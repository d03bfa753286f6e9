//! The foreground half of `blink`.
//!
//! Starts the server (a detached copy of this executable, or a task in this
//! process), waits for it to report its URL, prints the URL, and then stays
//! around to turn an interrupt into the server's termination.

use blink_lib::rendezvous::{self, LineReceiver, RendezvousReceiver};
use blink_lib::{BlinkError, ContentSource, MARKER_VAR};
use blinkd::config::Config;
use std::ffi::OsString;
use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use tokio::process::{Child, ChildStdout, Command};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::report::RunError;

type Rendezvous = Pin<Box<dyn Future<Output = io::Result<String>> + Send>>;

/// How the supervisor starts the server.
#[derive(Debug)]
pub enum Launch {
    /// Re-execute a program with the server marker set.
    Process(ServerCommand),
    /// Serve already-consumed content from a task in this process.
    InProcess(ContentSource),
}

/// How a supervised run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The URL was printed and the server left to its idle timeout.
    Detached,
    /// An interrupt arrived and the server was terminated.
    Interrupted,
    /// The server stopped on its own after its idle window.
    ServerExited,
}

/// The command that starts a server process.
#[derive(Debug, Clone)]
pub struct ServerCommand {
    program: PathBuf,
    args: Vec<OsString>,
    debug: bool,
    release_stdin: bool,
}

impl ServerCommand {
    /// Run `program` with `args`.
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            debug: false,
            release_stdin: false,
        }
    }

    /// Re-run the current executable with the current arguments.
    ///
    /// The server shares this process's stdin, so the supervisor closes its
    /// own copy when interrupted.
    pub fn current(debug: bool) -> Self {
        let mut argv = std::env::args_os();
        let argv0 = argv.next().map(PathBuf::from);
        let program = match std::env::current_exe() {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!(error = %e, "Falling back to argv[0]");
                argv0.unwrap_or_else(|| PathBuf::from("blink"))
            }
        };
        Self {
            program,
            args: argv.collect(),
            debug,
            release_stdin: true,
        }
    }

    fn spawn(&self) -> Result<(Child, ChildStdout), BlinkError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env(MARKER_VAR, "1")
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(if self.debug {
                Stdio::inherit()
            } else {
                Stdio::null()
            });
        // SAFETY: `setsid` is async-signal-safe and touches no shared state.
        unsafe {
            cmd.pre_exec(|| {
                nix::unistd::setsid()?;
                Ok(())
            });
        }
        let mut child = cmd.spawn().map_err(BlinkError::SpawnFailure)?;
        let stdout = child.stdout.take().ok_or_else(|| {
            BlinkError::SpawnFailure(io::Error::other("server stdout was not captured"))
        })?;
        tracing::debug!(pid = child.id(), program = %self.program.display(), "Spawned server");
        Ok((child, stdout))
    }
}

/// The supervisor's handle on a running server.
#[derive(Debug)]
pub enum Background {
    /// A separate server process.
    Process(Child),
    /// A server task in this process.
    Task(JoinHandle<Result<(), BlinkError>>),
}

impl Background {
    /// Start the server described by `launch`.
    ///
    /// Returns the handle and the pending URL.
    fn start(launch: Launch, config: &Config) -> Result<(Self, Rendezvous), BlinkError> {
        match launch {
            Launch::Process(command) => {
                let (child, stdout) = command.spawn()?;
                Ok((Self::Process(child), Box::pin(LineReceiver::new(stdout).recv())))
            }
            Launch::InProcess(source) => {
                let (tx, rx) = rendezvous::channel();
                let config = config.clone();
                let handle =
                    tokio::spawn(async move { blinkd::serve(source, &config, tx).await });
                Ok((Self::Task(handle), Box::pin(rx.recv())))
            }
        }
    }

    /// Wait for the server to stop by itself.
    async fn wait(&mut self) -> Result<(), RunError> {
        match self {
            Self::Process(child) => {
                let status = child.wait().await.map_err(RunError::Wait)?;
                tracing::debug!(%status, "Server exited");
                if status.success() {
                    Ok(())
                } else {
                    Err(RunError::ServerExit(status))
                }
            }
            Self::Task(handle) => Ok(handle.await??),
        }
    }

    /// Stop the server and reap it.
    ///
    /// Returns the task's own error when an in-process server has already
    /// failed.
    async fn terminate(self) -> Result<(), RunError> {
        match self {
            Self::Process(mut child) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "Failed to kill server");
                }
                Ok(())
            }
            Self::Task(handle) => {
                handle.abort();
                match handle.await {
                    Ok(res) => Ok(res?),
                    Err(e) if e.is_cancelled() => Ok(()),
                    Err(e) => Err(e.into()),
                }
            }
        }
    }
}

/// Turn SIGINT and SIGTERM into a trigger of the returned token.
///
/// Must be called from within the runtime.
///
/// # Errors
/// Returns [`RunError::Signal`] when a handler cannot be installed.
pub fn interrupt_token() -> Result<watch::Receiver<()>, RunError> {
    let mut sigint = signal(SignalKind::interrupt()).map_err(|source| RunError::Signal {
        signal: "SIGINT",
        source,
    })?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(|source| RunError::Signal {
        signal: "SIGTERM",
        source,
    })?;
    let (tx, rx) = watch::channel(());
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => tracing::debug!("Received SIGINT"),
            _ = sigterm.recv() => tracing::debug!("Received SIGTERM"),
        }
        let _ = tx.send(());
        // Keep the sender alive so the token never reads as dropped.
        std::future::pending::<()>().await;
    });
    Ok(rx)
}

/// Resolve when `shutdown` fires. A dropped sender never fires.
async fn interrupted(shutdown: &mut watch::Receiver<()>) {
    if shutdown.changed().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Start the server, print its URL to `out`, and supervise it.
///
/// An interrupt at any point (including before the URL arrives) terminates
/// the server and counts as a clean exit.
///
/// # Errors
/// Fails when the server cannot be started, never reports a URL, the URL
/// cannot be printed, or the server fails.
pub async fn spawn_and_supervise<W: Write>(
    launch: Launch,
    config: &Config,
    mut shutdown: watch::Receiver<()>,
    mut out: W,
) -> Result<Outcome, RunError> {
    let release_stdin = matches!(&launch, Launch::Process(cmd) if cmd.release_stdin);
    let detach = config.detach && matches!(launch, Launch::Process(_));
    let (mut background, rendezvous) = Background::start(launch, config)?;

    let url = tokio::select! {
        res = rendezvous => match res {
            Ok(url) => url,
            Err(e) => {
                background.terminate().await?;
                return Err(BlinkError::RendezvousFailure(e).into());
            }
        },
        () = interrupted(&mut shutdown) => {
            tracing::debug!("Interrupted before the server reported");
            background.terminate().await?;
            return Ok(Outcome::Interrupted);
        }
    };

    let printed = writeln!(out, "{url}").and_then(|()| out.flush());
    if let Err(e) = printed {
        tracing::debug!(error = %e, "Failed to print the URL");
        background.terminate().await?;
        return Err(RunError::Output(e));
    }
    if detach {
        tracing::debug!(%url, "Detaching");
        return Ok(Outcome::Detached);
    }

    tokio::select! {
        res = background.wait() => {
            res?;
            Ok(Outcome::ServerExited)
        }
        () = interrupted(&mut shutdown) => {
            if release_stdin {
                close_stdin();
            }
            background.terminate().await?;
            Ok(Outcome::Interrupted)
        }
    }
}

fn close_stdin() {
    if let Err(e) = nix::unistd::close(nix::libc::STDIN_FILENO) {
        tracing::debug!(error = %e, "Failed to close stdin");
    }
}
