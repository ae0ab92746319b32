use std::io::{self, Write};
use std::process;

use qrun::arguments::{self, Cmdline};
use qrun::config::Environment;
use qrun::error::{Halt, HELP_HINT};
use qrun::launch::LaunchPlan;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_env("QRUN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Parses the command line, or reports why the program should stop.
fn cmdline(argv: &[String], env: &Environment) -> Cmdline {
    let halt = match arguments::parse_args(argv, &mut io::stderr()) {
        Ok(cmdline) => return cmdline,
        Err(halt) => halt,
    };
    match &halt {
        Halt::Show(page) => {
            let mut out = io::stdout().lock();
            if let Err(e) = page.render(env, &mut out).and_then(|()| out.flush()) {
                eprintln!("qrun: {}", e);
                process::exit(1);
            }
        }
        Halt::Fatal(e) => eprintln!("qrun: {}", e),
        Halt::Usage { .. } => eprintln!("{}", HELP_HINT),
    }
    process::exit(halt.exit_code());
}

fn main() {
    init_logging();

    let argv = match arguments::collect_args(std::env::args_os()) {
        Ok(argv) => argv,
        Err(e) => {
            eprintln!("qrun: {}", e);
            process::exit(1);
        }
    };
    let env = Environment::from_env();
    tracing::debug!(?env, "environment");

    let cmdline = cmdline(&argv, &env);
    let plan = match LaunchPlan::resolve(cmdline, &env) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("qrun: {}", e);
            process::exit(e.exit_code());
        }
    };
    tracing::info!(source = ?plan.source, modules = plan.options.modules.len(), "launching");

    let mut out = io::stdout().lock();
    if let Err(e) = write!(out, "{}", plan).and_then(|()| out.flush()) {
        eprintln!("qrun: {}", e);
        process::exit(1);
    }
}
