use std::io::Write;
use std::process::{Command, Stdio};
use std::str;

fn comtunnel() -> Command {
    Command::new(env!("CARGO_BIN_EXE_comtunnel"))
}

/// CLI interface tests
#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn test_cli_help() {
        let output = comtunnel().arg("--help").output().expect("Failed to execute command");
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");

        assert!(output.status.success());
        assert!(stdout.contains("Usage:"));
        assert!(stdout.contains("--listen"));
        assert!(stdout.contains("--connect"));
        assert!(stdout.contains("--file"));
    }

    #[test]
    fn test_cli_version() {
        let output = comtunnel().arg("--version").output().expect("Failed to execute command");
        let stdout = str::from_utf8(&output.stdout).expect("Invalid UTF-8");
        assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_cli_requires_a_role() {
        let output = comtunnel().output().expect("Failed to execute command");
        assert!(!output.status.success());
    }

    #[test]
    fn test_cli_rejects_bad_stop_bits_before_listening() {
        let mut child = comtunnel()
            .args(["-l", "127.0.0.1:0", "-f", "-", "-q"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to spawn");

        child
            .stdin
            .take()
            .expect("stdin")
            .write_all(b"address: /dev/ttyUSB0\nstopbits: 3\n")
            .expect("write config");

        let output = child.wait_with_output().expect("wait");
        let stderr = str::from_utf8(&output.stderr).expect("Invalid UTF-8");
        assert_eq!(output.status.code(), Some(1));
        assert!(stderr.contains("unsupported stop bits: 3"), "stderr: {}", stderr);
    }

    #[test]
    fn test_cli_reports_missing_config_file() {
        let output = comtunnel()
            .args(["-c", "127.0.0.1:1", "-f", "/nonexistent/serial.yml", "-q"])
            .output()
            .expect("Failed to execute command");
        let stderr = str::from_utf8(&output.stderr).expect("Invalid UTF-8");
        assert_eq!(output.status.code(), Some(1));
        assert!(stderr.contains("Failed to read config file"), "stderr: {}", stderr);
    }
}
