//! Command-line interface for powershell-out.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::arch::Architecture;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Script to run.
    pub script: Option<String>,
    /// Architecture override.
    pub architecture: Option<Architecture>,
    /// Working directory for the script.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
    /// Timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// PowerShell executable (overrides config file).
    pub executable: Option<String>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Fail when the script exits non-zero.
    pub checked: bool,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('a') | Long("arch") => {
                let value: String = parser.value()?.parse()?;
                result.architecture = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("arch", value))?,
                );
            }
            Short('C') | Long("cwd") => {
                result.working_dir = Some(parser.value()?.parse()?);
            }
            Short('e') | Long("env") => {
                let value: String = parser.value()?.parse()?;
                let (key, val) = value
                    .split_once('=')
                    .filter(|(key, _)| !key.is_empty())
                    .ok_or_else(|| ArgsError::InvalidValue("env", value.clone()))?;
                result.env.push((key.to_string(), val.to_string()));
            }
            Short('t') | Long("timeout") => {
                let value: String = parser.value()?.parse()?;
                result.timeout_secs = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("timeout", value))?,
                );
            }
            Short('x') | Long("executable") => {
                result.executable = Some(parser.value()?.parse()?);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Long("checked") => {
                result.checked = true;
            }
            Value(val) if result.script.is_none() => {
                result.script = Some(val.string()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"powershell-out {version}
Run a PowerShell script for a target architecture

USAGE:
    powershell-out [OPTIONS] <SCRIPT>

OPTIONS:
    -a, --arch <ARCH>         Target architecture (i386, x86_64)
    -C, --cwd <DIR>           Working directory for the script
    -e, --env <KEY=VALUE>     Set an environment variable (repeatable)
    -t, --timeout <SECS>      Kill the script after this many seconds
    -x, --executable <EXE>    PowerShell executable [default: powershell.exe]
    -c, --config <FILE>       Path to configuration file (JSON)
    -l, --log-level <LVL>     Log level (error, warn, info, debug, trace)
        --checked             Report a non-zero exit as an error
    -h, --help                Print help
    -V, --version             Print version

ENVIRONMENT VARIABLES:
    POWERSHELL_OUT_EXECUTABLE   PowerShell executable (overrides config)
    POWERSHELL_OUT_ARCH         Target architecture (overrides config)
    POWERSHELL_OUT_TIMEOUT      Timeout in seconds (overrides config)
    POWERSHELL_OUT_LOG_LEVEL    Log level (overrides config)
    RUST_LOG                    Alternative log level setting

EXAMPLES:
    # Run against the 64-bit System32 from a 32-bit build
    powershell-out -a x86_64 "Get-ChildItem C:\Windows\System32\drivers"

    # Use PowerShell 7 with a timeout
    powershell-out -x pwsh -t 30 "Get-Process | Select-Object -First 5"
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("powershell-out {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("powershell-out")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.script.is_none());
        assert!(result.architecture.is_none());
        assert!(!result.checked);
    }

    #[test]
    fn test_script_positional() {
        let result = parse_args_from(args(&["Get-Date"])).unwrap();
        assert_eq!(result.script.as_deref(), Some("Get-Date"));
    }

    #[test]
    fn test_script_after_double_dash() {
        let result = parse_args_from(args(&["--", "-not-a-flag"])).unwrap();
        assert_eq!(result.script.as_deref(), Some("-not-a-flag"));
    }

    #[test]
    fn test_second_positional_rejected() {
        let result = parse_args_from(args(&["one", "two"]));
        assert!(matches!(result, Err(ArgsError::UnexpectedArgument(_))));
    }

    #[test]
    fn test_arch() {
        let result = parse_args_from(args(&["-a", "i386", "x"])).unwrap();
        assert_eq!(result.architecture, Some(Architecture::I386));

        let result = parse_args_from(args(&["--arch", "amd64", "x"])).unwrap();
        assert_eq!(result.architecture, Some(Architecture::X86_64));
    }

    #[test]
    fn test_invalid_arch() {
        let result = parse_args_from(args(&["-a", "sparc", "x"]));
        assert!(matches!(result, Err(ArgsError::InvalidValue("arch", _))));
    }

    #[test]
    fn test_env_pairs() {
        let result = parse_args_from(args(&["-e", "A=1", "--env", "B=x=y", "x"])).unwrap();
        assert_eq!(
            result.env,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "x=y".to_string())
            ]
        );
    }

    #[test]
    fn test_invalid_env() {
        assert!(parse_args_from(args(&["-e", "novalue", "x"])).is_err());
        assert!(parse_args_from(args(&["-e", "=1", "x"])).is_err());
    }

    #[test]
    fn test_timeout() {
        let result = parse_args_from(args(&["-t", "30", "x"])).unwrap();
        assert_eq!(result.timeout_secs, Some(30));
        assert!(parse_args_from(args(&["-t", "soon", "x"])).is_err());
    }

    #[test]
    fn test_flags() {
        let result = parse_args_from(args(&[
            "--checked",
            "-x",
            "pwsh",
            "-C",
            "/tmp",
            "-l",
            "debug",
            "-c",
            "/etc/powershell-out.json",
            "x",
        ]))
        .unwrap();
        assert!(result.checked);
        assert_eq!(result.executable.as_deref(), Some("pwsh"));
        assert_eq!(result.working_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(result.log_level.as_deref(), Some("debug"));
        assert_eq!(
            result.config,
            Some(PathBuf::from("/etc/powershell-out.json"))
        );
    }

    #[test]
    fn test_help_and_version() {
        assert!(parse_args_from(args(&["-h"])).unwrap().help);
        assert!(parse_args_from(args(&["--help"])).unwrap().help);
        assert!(parse_args_from(args(&["-V"])).unwrap().version);
    }
}
