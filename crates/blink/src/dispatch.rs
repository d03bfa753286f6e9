//! Role dispatch: one executable, two behaviours.

use blink_lib::{EnvSource, InvocationTarget, Role, debug_enabled, resolve};
use blinkd::config::{Config, LaunchMode};
use std::io;
use tokio::runtime::Runtime;

use crate::Args;
use crate::channel::StdoutChannel;
use crate::report::RunError;
use crate::supervisor::{Launch, ServerCommand, interrupt_token, spawn_and_supervise};

/// Run `blink` with `args` in the role `env` selects.
///
/// The target is checked once without reading any input before either role
/// starts, so a bad path fails before anything is spawned.
///
/// # Errors
/// Any [`RunError`]; all of them are fatal.
pub fn run(args: &Args, env: &impl EnvSource) -> Result<(), RunError> {
    let config = Config::load()?;
    let target = args.target();
    resolve(&target, false)?;

    let role = Role::detect(env);
    tracing::debug!(?role, %target, launch = ?config.launch, "Dispatching");
    match role {
        Role::Server => run_server(&target, &config),
        Role::Supervisor => run_supervisor(&target, &config, debug_enabled(env)),
    }
}

fn runtime() -> Result<Runtime, RunError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(RunError::Runtime)
}

fn run_server(target: &InvocationTarget, config: &Config) -> Result<(), RunError> {
    let source = resolve(target, true)?;
    runtime()?.block_on(blinkd::serve(source, config, StdoutChannel))?;
    Ok(())
}

fn run_supervisor(target: &InvocationTarget, config: &Config, debug: bool) -> Result<(), RunError> {
    let launch = match config.launch {
        LaunchMode::Process => Launch::Process(ServerCommand::current(debug)),
        LaunchMode::InProcess => Launch::InProcess(resolve(target, true)?),
    };
    let outcome = runtime()?.block_on(async {
        let shutdown = interrupt_token()?;
        spawn_and_supervise(launch, config, shutdown, io::stdout()).await
    })?;
    tracing::debug!(?outcome, "Supervisor finished");
    Ok(())
}
