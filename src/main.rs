use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use stress_launcher::cli::Args;
use stress_launcher::launcher::{parse_request, Launcher};
use stress_launcher::memory_stress::{check_memory_usage, warn_if_oversubscribed};
use stress_launcher::worker::{body_for, WorkerKind};

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version land here too and are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    setup_logging(args.verbose, args.quiet);

    let (count, kind) = match parse_request(&args.count, &args.kind) {
        Ok(request) => request,
        Err(e) => {
            error!("{e}");
            eprintln!("Usage: launcher <count> <cpu|mem|io>");
            return ExitCode::FAILURE;
        }
    };

    let workload = args.workload();
    if kind == WorkerKind::Mem {
        warn_if_oversubscribed(count, workload.memory.buffer_bytes());
    }
    check_memory_usage();

    let mut launcher = Launcher::new(args.strategy.build());
    let result = launcher.launch(count, kind, body_for(workload));
    check_memory_usage();

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
