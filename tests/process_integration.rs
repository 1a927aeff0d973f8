//! Real subprocess tests.
//!
//! PowerShell is not available on the CI hosts, so these swap in ordinary
//! Unix programs as the executable. `echo` prints the argument vector it
//! received, which shows exactly what PowerShell would be handed.

#![cfg(unix)]

use std::time::{Duration, Instant};

use powershell_out::{
    Architecture, CommandLine, CommandRunner, ExecutionOptions, PowershellOut, ProcessRunner,
    ShellOutError, SpawnOptions,
};

const FLAGS: &str = "-NoLogo -NonInteractive -NoProfile -ExecutionPolicy RemoteSigned \
                     -InputFormat None -Command";

#[test]
fn test_argv_reaches_process_unchanged() {
    let ps = PowershellOut::new().executable("echo");
    let script = r#"Write-Output "$HOME" 'it''s'; exit 1"#;

    let result = ps.execute_checked(script, ExecutionOptions::new()).unwrap();
    assert_eq!(result.stdout, format!("{} {}\n", FLAGS, script));
}

#[test]
fn test_architecture_option_not_in_argv() {
    let ps = PowershellOut::new().executable("echo");
    let result = ps
        .execute(
            "Get-Date",
            ExecutionOptions::new().architecture(Architecture::I386),
        )
        .unwrap();
    assert!(!result.stdout.contains("i386"));
    assert_eq!(result.stdout, format!("{} Get-Date\n", FLAGS));
}

#[test]
fn test_execute_nonzero_returns_result() {
    let ps = PowershellOut::new().executable("false");
    let result = ps.execute("ignored", ExecutionOptions::new()).unwrap();
    assert_eq!(result.exit_code, Some(1));
    assert!(result.failed());
}

#[test]
fn test_execute_checked_nonzero_raises() {
    let ps = PowershellOut::new().executable("false");
    let err = ps
        .execute_checked("ignored", ExecutionOptions::new())
        .unwrap_err();
    assert!(matches!(
        err,
        ShellOutError::CommandFailed {
            exit_code: Some(1),
            ..
        }
    ));
}

#[test]
fn test_working_dir_and_env() {
    let dir = tempfile::tempdir().unwrap();
    let cmd = CommandLine::new("sh")
        .arg("-c")
        .arg("pwd; printf '%s\\n' \"$PSOUT_TEST\"");
    let opts = SpawnOptions::new()
        .working_dir(dir.path())
        .env("PSOUT_TEST", "hello");

    let result = ProcessRunner::new().run_checked(&cmd, &opts).unwrap();
    let lines: Vec<_> = result.stdout_lines().collect();
    let expected = dir.path().canonicalize().unwrap();
    assert_eq!(
        std::path::Path::new(lines[0]).canonicalize().unwrap(),
        expected
    );
    assert_eq!(lines[1], "hello");
}

#[test]
fn test_timeout_is_forwarded() {
    let cmd = CommandLine::new("sleep").arg("5");
    let opts = SpawnOptions::new().timeout(Duration::from_millis(100));

    let err = ProcessRunner::new().run_checked(&cmd, &opts).unwrap_err();
    match err {
        ShellOutError::Timeout { timeout, .. } => {
            assert_eq!(timeout, Duration::from_millis(100));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_timeout_kills_process_tree() {
    // The shell's child keeps the output pipes open after the shell dies.
    let cmd = CommandLine::new("sh").arg("-c").arg("sleep 4; echo done");
    let opts = SpawnOptions::new().timeout(Duration::from_millis(200));

    let start = Instant::now();
    let result = ProcessRunner::new().run(&cmd, &opts).unwrap();
    let wall = start.elapsed();

    assert!(result.timed_out);
    assert!(wall < Duration::from_secs(2), "returned after {:?}", wall);
    assert_eq!(result.timeout, Some(Duration::from_millis(200)));

    match result.ensure_success() {
        Err(ShellOutError::Timeout { timeout, .. }) => {
            assert_eq!(timeout, Duration::from_millis(200));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_large_output_is_drained() {
    let cmd = CommandLine::new("sh")
        .arg("-c")
        .arg("i=0; while [ $i -lt 20000 ]; do echo line-$i; echo err-$i >&2; i=$((i+1)); done");
    let result = ProcessRunner::new()
        .run(&cmd, &SpawnOptions::default())
        .unwrap();
    assert!(result.success());
    assert_eq!(result.stdout_lines().count(), 20000);
    assert_eq!(result.stderr.lines().count(), 20000);
}

#[tokio::test]
async fn test_execute_async_real_process() {
    let ps = PowershellOut::new().executable("echo");
    let result = ps
        .execute_async("Get-Date", ExecutionOptions::new())
        .await
        .unwrap();
    assert!(result.stdout.ends_with("-Command Get-Date\n"));
}
