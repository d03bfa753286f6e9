//! Entry point for `blink`.
//!
//! Parses arguments, sets up error presentation and logging, then hands over
//! to the role dispatcher.

use blink::{Args, report};
use blink_lib::{ProcessEnv, debug_enabled};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    let debug = debug_enabled(&ProcessEnv);
    report::install_panic_hook(debug);
    blinkd::logging::init(debug);

    match blink::run(&args, &ProcessEnv) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report::emit(e, debug);
            ExitCode::FAILURE
        }
    }
}
