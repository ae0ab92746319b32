use std::fs;
use std::process::{Command, Stdio};
use std::sync::Once;
use test_driver::{SessionOutput, TestSession};

static BUILD_INIT: Once = Once::new();

fn target_dir() -> String {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    format!("{manifest_dir}/../target/debug")
}

fn qrun_binary() -> String {
    format!("{}/qrun", target_dir())
}

/// Build the qrun binary if not already done.
fn ensure_binaries() {
    BUILD_INIT.call_once(|| {
        let manifest_dir = env!("CARGO_MANIFEST_DIR");
        let workspace_root = format!("{manifest_dir}/..");
        let status = Command::new("cargo")
            .args(["build", "-p", "qrun"])
            .current_dir(&workspace_root)
            .status()
            .expect("failed to run cargo build");
        assert!(status.success(), "cargo build -p qrun failed");
    });
}

fn run_with_env(args: &[&str], env: &[(&str, &str)], code: i32) -> SessionOutput {
    ensure_binaries();
    TestSession::spawn(&qrun_binary(), args, env)
        .expect("failed to spawn qrun")
        .wait_exit(code)
}

fn run(args: &[&str], code: i32) -> SessionOutput {
    run_with_env(args, &[], code)
}

// ---------------------------------------------------------------------------
// Successful runs print the launch plan
// ---------------------------------------------------------------------------

#[test]
fn loads_modules_in_order() {
    let out = run(&["--load=foo", "--load=bar", "script.q"], 0);
    assert_eq!(out.plan_values("load"), vec!["foo", "bar"]);
    assert_eq!(out.plan_value("file"), Some("script.q"));
    assert!(out.stderr.is_empty(), "stderr: {}", out.stderr);
}

#[test]
fn clustered_short_options() {
    let out = run(&["-rWe", "print(1);"], 0);
    assert_eq!(out.plan_value("exec"), Some("print(1);"));
    assert_eq!(out.plan_value("warnings"), Some("all"));
    assert_eq!(out.plan_value("warnings-are-errors"), Some("true"));
    assert_eq!(out.plan_value("file"), None);
}

#[test]
fn program_text_leaves_trailing_args_to_program() {
    let out = run(&["-e", "print(ARGV);", "one", "two"], 0);
    assert_eq!(out.plan_value("file"), None);
    assert_eq!(out.plan_value("argv"), Some("one two"));
}

#[test]
fn options_after_script_belong_to_program() {
    let out = run(&["script.q", "--no-network", "-W"], 0);
    assert_eq!(out.plan_value("parse-options"), Some(""));
    assert_eq!(out.plan_value("argv"), Some("--no-network -W"));
}

#[test]
fn parse_options_and_defines() {
    let out = run(
        &[
            "--no-network",
            "-p",
            "no-filesystem",
            "-DDEBUG",
            "--define=LEVEL=2",
            "-",
        ],
        0,
    );
    assert_eq!(out.plan_value("parse-options"), Some("no-network,no-filesystem"));
    assert_eq!(out.plan_values("define"), vec!["DEBUG", "LEVEL=2"]);
    assert_eq!(out.plan_value("file"), Some("-"));
}

#[test]
fn environment_supplies_defaults() {
    let out = run_with_env(
        &["-e", "1;"],
        &[("QRUN_CHARSET", "latin1"), ("TZ", "Europe/Prague")],
        0,
    );
    assert_eq!(out.plan_value("charset"), Some("latin1"));
    assert_eq!(out.plan_value("time-zone"), Some("Europe/Prague"));

    let out = run_with_env(&["-c", "latin1", "-e", "1;"], &[("QRUN_CHARSET", "UTF-8")], 0);
    assert_eq!(out.plan_value("charset"), Some("ISO-8859-1"));
}

#[test]
fn exec_class_from_script_name() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let script = dir.path().join("Greeter.q");
    fs::write(&script, "class Greeter { constructor() { print(\"hi\\n\"); } }\n")
        .expect("failed to write script");

    ensure_binaries();
    let out = TestSession::spawn_in(
        &qrun_binary(),
        &["-x", "Greeter.q"],
        &[],
        Some(dir.path().to_str().unwrap()),
    )
    .expect("failed to spawn qrun")
    .wait_exit(0);
    assert_eq!(out.plan_value("class"), Some("Greeter"));
    assert_eq!(out.plan_value("file"), Some("Greeter.q"));
}

#[test]
fn debug_logging_goes_to_stderr() {
    let out = run_with_env(&["-W", "-e", "1;"], &[("QRUN_LOG", "debug")], 0);
    assert!(out.stderr.contains("dispatching option"), "stderr: {}", out.stderr);
    assert_eq!(out.plan_value("exec"), Some("1;"));
}

// ---------------------------------------------------------------------------
// Informational options
// ---------------------------------------------------------------------------

#[test]
fn help_exits_zero() {
    let out = run(&["-W", "--help", "--bogus"], 0);
    assert!(out.stdout.starts_with("usage: qrun"));
    assert!(out.stderr.is_empty(), "stderr: {}", out.stderr);
}

#[test]
fn parse_option_help() {
    let out = run(&["-H"], 0);
    assert!(out.stdout.contains("--no-network"));
}

#[test]
fn short_version() {
    let out = run(&["--short-version"], 0);
    let version = out.stdout.trim();
    assert!(!version.is_empty());
    assert!(
        version.chars().all(|c| c.is_ascii_digit() || c == '.'),
        "unexpected version '{version}'"
    );
}

#[test]
fn module_dir_from_environment() {
    let out = run_with_env(&["-M"], &[("QRUN_MODULE_DIR", "/opt/qrun/mods")], 0);
    assert_eq!(out.stdout, "/opt/qrun/mods\n");
}

#[test]
fn list_warnings() {
    let out = run(&["--list-warnings"], 0);
    assert!(out.stdout.contains("   deprecated\n"));
}

#[test]
fn show_charsets_and_aliases() {
    let out = run(&["-s"], 0);
    assert!(out.stdout.contains("UTF-8"));
    let out = run(&["--show-aliases"], 0);
    assert!(out.stdout.contains("LATIN1"));
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn scan_errors_reported_together() {
    let out = run(&["--bogus", "-q", "--load"], 1);
    assert!(out.stdout.is_empty());
    let lines: Vec<&str> = out.stderr.lines().collect();
    assert_eq!(
        lines,
        vec![
            "qrun: unrecognized option '--bogus'",
            "qrun: invalid option -- 'q'",
            "qrun: option '--load' requires an argument",
            "try 'qrun -h' or 'qrun --help' for more information.",
        ]
    );
}

#[test]
fn unknown_parse_option_is_fatal() {
    let out = run(&["--set-parse-option=no-such-option", "-e", "1;"], 1);
    assert!(out.stdout.is_empty());
    assert!(out.stderr.contains("unknown parse option 'no-such-option'"));
    assert!(!out.stderr.contains("try 'qrun -h'"));
}

#[test]
fn unknown_warning_is_fatal() {
    let out = run(&["-w", "nope"], 1);
    assert!(out.stderr.contains("unknown warning 'nope'"));
}

#[test]
fn duplicate_define_is_fatal() {
    let out = run(&["-DX", "-DX=1"], 1);
    assert!(out.stderr.contains("parse define 'X' given more than once"));
}

#[test]
fn exec_class_needs_a_name() {
    let out = run(&["-x", "-e", "1;"], 1);
    assert!(out.stderr.contains("--exec-class needs a class name"));
}

#[cfg(unix)]
#[test]
fn non_utf8_argument_is_reported() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    ensure_binaries();
    let script = OsStr::from_bytes(b"\xffscript.q");
    let out = TestSession::spawn_os(&qrun_binary(), &[OsStr::new("-W"), script], &[], None)
        .expect("failed to spawn qrun")
        .wait_exit(1);
    assert!(out.stdout.is_empty());
    assert_eq!(
        out.stderr.trim_end(),
        "qrun: invalid argument encoding in '\u{fffd}script.q'"
    );
}

#[cfg(target_os = "linux")]
#[test]
fn plan_write_failure_is_reported() {
    ensure_binaries();
    let full = fs::OpenOptions::new()
        .write(true)
        .open("/dev/full")
        .expect("failed to open /dev/full");
    let output = Command::new(qrun_binary())
        .args(["-e", "1;"])
        .env_remove("QRUN_LOG")
        .stdin(Stdio::null())
        .stdout(full)
        .stderr(Stdio::piped())
        .output()
        .expect("failed to run qrun");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1), "stderr: {stderr}");
    assert!(stderr.starts_with("qrun: "), "stderr: {stderr}");
    assert!(!stderr.contains("panicked"), "stderr: {stderr}");
}
