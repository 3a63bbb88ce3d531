use quickpack::commands::{CommandRunner, ProgramInvocation, ShellCommandRunner};
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_command_execution_with_long_output() {
    let runner = ShellCommandRunner::new("/bin/sh", Duration::from_secs(5));

    let command = "for i in $(seq 1 1000); do echo \"Line $i\"; done";

    let output = runner.execute(command).unwrap();

    assert_eq!(output.stdout_str().lines().count(), 1000);
}

#[test]
fn test_stdout_and_stderr_are_captured_separately() {
    let runner = ShellCommandRunner::new("/bin/sh", Duration::from_secs(5));

    let output = runner.execute("echo out; echo err >&2; exit 3").unwrap();

    assert!(!output.is_success());
    assert_eq!(output.exit_code(), 3);
    assert_eq!(output.stdout_str().trim(), "out");
    assert_eq!(output.stderr_str().trim(), "err");
}

#[test]
fn test_program_invocation_environment_and_directory() {
    let dir = tempdir().unwrap();
    let runner = ShellCommandRunner::new("/bin/sh", Duration::from_secs(5));
    let invocation = ProgramInvocation::new("/bin/sh")
        .args(["-c", "printf '%s:%s' \"$QUICKPACK_TEST_VALUE\" \"$(basename \"$(pwd)\")\""])
        .env("QUICKPACK_TEST_VALUE", "from-env")
        .current_dir(dir.path());

    let output = runner.execute_program(&invocation).unwrap();

    let expected_dir = dir
        .path()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    assert_eq!(output.stdout_str(), format!("from-env:{expected_dir}"));
}
