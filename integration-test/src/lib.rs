//! Test driver for qrun integration tests.
//!
//! Spawns the `qrun` binary with:
//! - a controlled environment (the `QRUN_*` variables and `TZ` are cleared
//!   unless the test sets them)
//! - stdout and stderr piped, captured for assertions

use std::ffi::OsStr;
use std::process::{Child, Command, Stdio};

/// Environment variables read by qrun; removed before each run.
const QRUN_VARS: &[&str] = &[
    "QRUN_MODULE_DIR",
    "QRUN_USER_MODULE_DIR",
    "QRUN_MODULE_PATH",
    "QRUN_CHARSET",
    "QRUN_LOG",
    "TZ",
];

/// A running qrun process.
pub struct TestSession {
    child: Child,
}

impl TestSession {
    /// Spawn qrun with the given arguments.
    ///
    /// `binary` is the path to the qrun binary.
    /// `args` are the command-line arguments.
    /// `env` are additional environment variables to set.
    pub fn spawn(
        binary: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> std::io::Result<TestSession> {
        Self::spawn_in(binary, args, env, None)
    }

    /// Like `spawn`, but with an optional working directory.
    pub fn spawn_in(
        binary: &str,
        args: &[&str],
        env: &[(&str, &str)],
        cwd: Option<&str>,
    ) -> std::io::Result<TestSession> {
        let args: Vec<&OsStr> = args.iter().map(OsStr::new).collect();
        Self::spawn_os(binary, &args, env, cwd)
    }

    /// Like `spawn_in`, for arguments that need not be valid UTF-8.
    pub fn spawn_os(
        binary: &str,
        args: &[&OsStr],
        env: &[(&str, &str)],
        cwd: Option<&str>,
    ) -> std::io::Result<TestSession> {
        let mut cmd = Command::new(binary);
        cmd.args(args);
        for var in QRUN_VARS {
            cmd.env_remove(var);
        }
        for (k, v) in env {
            cmd.env(k, v);
        }

        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd.spawn()?;
        Ok(TestSession { child })
    }

    /// Wait for the child to exit and assert the exit code.
    pub fn wait_exit(self, expected_code: i32) -> SessionOutput {
        let output = self
            .child
            .wait_with_output()
            .expect("failed to wait for child");
        let code = output.status.code().unwrap_or(-1);

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        assert_eq!(
            code, expected_code,
            "expected exit code {expected_code}, got {code}\nstdout:\n{stdout}\nstderr:\n{stderr}"
        );

        SessionOutput { stdout, stderr }
    }
}

/// Output captured from a completed session.
pub struct SessionOutput {
    pub stdout: String,
    pub stderr: String,
}

impl SessionOutput {
    /// Value of a `key: value` line in the launch plan printed by qrun.
    pub fn plan_value(&self, key: &str) -> Option<&str> {
        let prefix = format!("{key}: ");
        self.stdout
            .lines()
            .find_map(|line| line.strip_prefix(prefix.as_str()))
    }

    /// All values of a repeated `key: value` line, in order.
    pub fn plan_values(&self, key: &str) -> Vec<&str> {
        let prefix = format!("{key}: ");
        self.stdout
            .lines()
            .filter_map(|line| line.strip_prefix(prefix.as_str()))
            .collect()
    }
}
