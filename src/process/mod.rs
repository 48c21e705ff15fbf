//! External process invocation.
//!
//! Every external tool (docker, docker-compose, the Fabric generators and the
//! peer CLI) is described as a [`CommandLine`] and executed through a
//! [`CommandRunner`]. A non-zero exit status is an error, so a failing step
//! stops the operation instead of being silently skipped.

pub mod docker;
pub mod fabric;
pub mod runner;

pub use runner::{DryRunRunner, ShellRunner};

use std::borrow::Cow;
use std::fmt;

/// Program, arguments, extra environment and optional stdin for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub stdin: Option<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// Value following `flag`, e.g. `arg_after("-c")` on `peer channel create -c common`
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

/// Quote a word for display so the logged line can be pasted into a shell
pub fn shell_quote(word: &str) -> Cow<'_, str> {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,{}".contains(c));
    if safe {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', r"'\''")))
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{}={} ", key, shell_quote(value))?;
        }
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        if self.stdin.is_some() {
            write!(f, " <<stdin")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout followed by stderr; many tools log to stderr
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// External command failures
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Command `{command}` failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Executes command lines synchronously
pub trait CommandRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput, CommandError>;

    /// True when commands are only logged, never executed
    fn is_simulated(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let cmd = CommandLine::new("docker")
            .arg("exec")
            .args(["-e", "A=1"])
            .arg("cli.example.com")
            .env("COMPOSE_PROJECT_NAME", "net");

        assert_eq!(cmd.args, vec!["exec", "-e", "A=1", "cli.example.com"]);
        assert!(cmd.has_arg("exec"));
        assert_eq!(cmd.arg_after("-e"), Some("A=1"));
        assert_eq!(cmd.arg_after("cli.example.com"), None);
        assert_eq!(cmd.arg_after("-x"), None);
    }

    #[test]
    fn test_display_quotes_only_when_needed() {
        let cmd = CommandLine::new("peer")
            .args(["chaincode", "instantiate", "-P", r#"OR("org1MSP.peer")"#])
            .args(["-c", r#"{"Args":[]}"#, "-n", "it's"])
            .env("CORE_PEER_ADDRESS", "peer0.org1.example.com:7051");

        assert_eq!(
            cmd.to_string(),
            r#"CORE_PEER_ADDRESS=peer0.org1.example.com:7051 peer chaincode instantiate -P 'OR("org1MSP.peer")' -c '{"Args":[]}' -n 'it'\''s'"#
        );
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("{{.Names}}"), "{{.Names}}");
    }

    #[test]
    fn test_output_helpers() {
        let output = CommandOutput {
            status: Some(0),
            stdout: "a\n\n  b \n".to_string(),
            stderr: "warn\n".to_string(),
        };
        assert_eq!(output.combined(), "a\n\n  b \nwarn\n");
    }
}
