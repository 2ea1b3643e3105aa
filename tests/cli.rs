//! CLI smoke tests (spec §6.5): `agency-osd --help` and `admin --help`
//! resolve without touching a database.

use assert_cmd::Command;

fn stdout_of(mut cmd: Command) -> String {
    let output = cmd.output().expect("binary should run");
    assert!(output.status.success());
    String::from_utf8(output.stdout).expect("stdout should be valid utf-8")
}

#[test]
fn help_lists_serve_and_admin_subcommands() {
    let mut cmd = Command::cargo_bin("agency-osd").expect("binary should build");
    cmd.arg("--help");
    let stdout = stdout_of(cmd);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("admin"));
}

#[test]
fn admin_help_lists_operator_actions() {
    let mut cmd = Command::cargo_bin("agency-osd").expect("binary should build");
    cmd.args(["admin", "--help"]);
    let stdout = stdout_of(cmd);
    assert!(stdout.contains("pause-scheduler"));
    assert!(stdout.contains("reset-rate-ledger"));
}
