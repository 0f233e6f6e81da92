//! Worker process entrypoint : parses the CLI surface,
//! validates settings, installs the logger, and runs the control channel
//! loop over stdin/stdout — the same "inherited fd pair" contract
//! `original_source/worker/src/Settings.cpp` documents for the channel.

use std::sync::Arc;

use clap::Parser;
use mediasoup_worker::control::{ChannelReader, ChannelWriter, Dispatcher};
use mediasoup_worker::logger;
use mediasoup_worker::settings::{Cli, Settings};
use mediasoup_worker::worker::{register_worker_handlers, run_channel_loop, WorkerState};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let settings = match Settings::from_cli(cli) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("settings validation error: {err}");
            std::process::exit(err.exit_code());
        }
    };

    logger::init(settings.log_level, &settings.log_tags);

    let state = match WorkerState::new(&settings) {
        Ok(state) => Arc::new(tokio::sync::Mutex::new(state)),
        Err(err) => {
            log::error!("fatal error during bring-up: {err}");
            std::process::exit(err.exit_code());
        }
    };

    let mut dispatcher = Dispatcher::new();
    register_worker_handlers(&mut dispatcher, state);

    let reader = ChannelReader::new(tokio::io::stdin());
    let writer = ChannelWriter::new(tokio::io::stdout());

    if let Err(err) = run_channel_loop(reader, writer, dispatcher).await {
        log::error!("fatal error: {err}");
        std::process::exit(err.exit_code());
    }
}
