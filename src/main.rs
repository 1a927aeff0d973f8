//! powershell-out binary entry point.

use std::process::ExitCode;

use powershell_out::cli::{self, Args};
use powershell_out::config::Config;
use powershell_out::{logging, ExecutionOptions, PowershellOut, ShellOutError};
use tracing::{debug, error};

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'powershell-out --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let Some(script) = args.script.clone() else {
        eprintln!("error: missing <SCRIPT>");
        eprintln!("Try 'powershell-out --help' for more information.");
        return ExitCode::from(2);
    };

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    // Ignore the error: a subscriber may already be installed.
    let _ = logging::try_init_with(config.log_filter());
    debug!("powershell-out v{}", env!("CARGO_PKG_VERSION"));

    let options = build_options(&config, &args);
    let ps = PowershellOut::new().executable(config.powershell.executable.clone());

    let outcome = if args.checked {
        ps.execute_checked(&script, options)
    } else {
        ps.execute(&script, options)
    };

    match outcome {
        Ok(result) => {
            print!("{}", result.stdout);
            eprint!("{}", result.stderr);
            exit_code(result.exit_code)
        }
        Err(ShellOutError::CommandFailed {
            exit_code: code,
            stdout,
            stderr,
            ..
        }) => {
            print!("{}", stdout);
            eprint!("{}", stderr);
            error!(exit_code = ?code, "script failed");
            exit_code(code)
        }
        Err(e) => {
            error!(error = %e, "script could not be run");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_options(config: &Config, args: &Args) -> ExecutionOptions {
    let mut options = config.execution_options();
    if let Some(ref dir) = args.working_dir {
        options = options.working_dir(dir);
    }
    for (key, value) in &args.env {
        options = options.env(key, value);
    }
    options
}

fn exit_code(code: Option<i32>) -> ExitCode {
    match code.map(u8::try_from) {
        Some(Ok(code)) => ExitCode::from(code),
        _ => ExitCode::FAILURE,
    }
}
