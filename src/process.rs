//! Running system commands.
//!
//! Plugins never spawn processes directly: they go through a
//! [`ProcessRunner`], which lets tests record commands instead of running
//! them.
//!
//! Commands run with stdin, stdout and stderr detached from the terminal,
//! since the kiosk owns the screen. Privileged commands are prefixed with
//! `sudo -n`, which fails instead of prompting for a password.

// Rust guideline compliant 2026-02

use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

/// Runs a command to completion.
pub trait ProcessRunner {
    /// Run `args` (program first). Fails if the program cannot be started or
    /// exits unsuccessfully.
    fn run(&self, args: &[String], sudo: bool) -> Result<()>;
}

/// Build the full argument list, prefixing `sudo -n` when requested.
#[must_use]
pub fn command_line(args: &[String], sudo: bool) -> Vec<String> {
    let mut full = Vec::with_capacity(args.len() + 2);
    if sudo {
        full.push("sudo".to_string());
        full.push("-n".to_string());
    }
    full.extend(args.iter().cloned());
    full
}

/// [`ProcessRunner`] backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, args: &[String], sudo: bool) -> Result<()> {
        let full = command_line(args, sudo);
        let Some((program, rest)) = full.split_first() else {
            bail!("Empty command");
        };

        log::debug!("Running {full:?}");
        let status = Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to start '{program}'"))?;

        if !status.success() {
            bail!("Command {full:?} failed with {status}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_command_line_sudo_prefix() {
        assert_eq!(command_line(&args(&["reboot"]), true), args(&["sudo", "-n", "reboot"]));
        assert_eq!(command_line(&args(&["chvt", "1"]), false), args(&["chvt", "1"]));
    }

    #[test]
    fn test_system_runner_reports_failures() {
        let runner = SystemRunner;
        assert!(runner.run(&[], false).is_err());
        assert!(runner
            .run(&args(&["/nonexistent/kiosk-test-binary"]), false)
            .is_err());
        assert!(runner.run(&args(&["true"]), false).is_ok());
        assert!(runner.run(&args(&["false"]), false).is_err());
    }
}
