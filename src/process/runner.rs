//! Command runners: real execution and dry-run logging.

use super::{CommandError, CommandLine, CommandOutput, CommandRunner};
use log::{debug, info};
use std::io::Write;
use std::process::{Command, Stdio};

/// Runs commands on the host, blocking until each one exits
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput, CommandError> {
        info!("$ {}", command);

        let spawn_err = |source| CommandError::Spawn {
            command: command.to_string(),
            source,
        };

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        if let Some(input) = &command.stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.as_bytes()).map_err(spawn_err)?;
            }
        }

        let output = child.wait_with_output().map_err(spawn_err)?;
        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.stdout.trim().is_empty() {
            debug!("stdout: {}", result.stdout.trim_end());
        }
        if !result.stderr.trim().is_empty() {
            debug!("stderr: {}", result.stderr.trim_end());
        }

        if !output.status.success() {
            return Err(CommandError::Failed {
                command: command.to_string(),
                status: output.status.to_string(),
                stderr: result.stderr.trim().to_string(),
            });
        }

        Ok(result)
    }
}

/// Logs commands without executing them
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput, CommandError> {
        info!("[dry-run] $ {}", command);
        if let Some(input) = &command.stdin {
            debug!("[dry-run] stdin: {}", input.trim_end());
        }
        Ok(CommandOutput {
            status: Some(0),
            ..CommandOutput::default()
        })
    }

    fn is_simulated(&self) -> bool {
        true
    }
}
