use clap::Parser;
use log::{info, warn};
use rssi_scanner::app::{self, Options, RunError};
use rssi_scanner::{Controller, SerialTransport};
use std::io;
use std::panic::{self, PanicHookInfo};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Stop the running console scan on Ctrl-C so the history can still be exported.
fn stop_on_signal(cancel: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        info!("signal received, stopping scan...");
        cancel.store(true, Ordering::SeqCst);
    });
    if let Err(e) = result {
        warn!("failed to set up signal handler: {}", e);
    }
}

fn run_headless(options: &Options) -> Result<(), RunError> {
    let mut controller = Controller::new(SerialTransport::default());
    let mut out = io::stdout().lock();
    let mut err = io::stderr().lock();
    app::run_with_io(options, &mut controller, stop_on_signal, &mut out, &mut err)
}

#[cfg(feature = "gui")]
fn run_gui(options: Options) -> Result<(), RunError> {
    rssi_scanner::gui::run(options.port)
}

#[cfg(not(feature = "gui"))]
fn run_gui(options: Options) -> Result<(), RunError> {
    info!("built without the gui feature, running in console mode");
    run_headless(&options)
}

fn run(options: Options) -> Result<(), RunError> {
    if options.headless {
        run_headless(&options)
    } else {
        run_gui(options)
    }
}

fn main() {
    // Set up panic hook to ensure clean exit codes for process managers
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    let options = Options::parse();
    init_logging(options.verbose);

    match run(options) {
        Ok(_) => std::process::exit(EXIT_SUCCESS),
        Err(why) => {
            eprintln!("error: {}", why);
            std::process::exit(EXIT_ERROR);
        }
    }
}
