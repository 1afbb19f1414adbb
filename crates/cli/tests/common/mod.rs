//! CLI command execution helpers

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Builder for one `mgit` invocation
pub struct MgitCommand {
    working_dir: PathBuf,
    args: Vec<String>,
}

impl MgitCommand {
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            args: Vec::new(),
        }
    }

    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn execute(&self) -> Result<CommandResult> {
        let output = Command::new(env!("CARGO_BIN_EXE_mgit"))
            .args(&self.args)
            .current_dir(&self.working_dir)
            .env("MGIT_LOG", "off")
            .output()
            .context("Failed to execute mgit")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;
        if result.exit_code != 0 {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }
        Ok(result)
    }
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    /// First 64-character hex run in stdout
    pub fn digest(&self) -> Option<String> {
        self.stdout
            .split(|c: char| !c.is_ascii_hexdigit())
            .find(|word| word.len() == 64)
            .map(str::to_string)
    }
}

/// Run `mgit <args>` in `dir`, requiring success
pub fn mgit(dir: &Path, args: &[&str]) -> Result<CommandResult> {
    MgitCommand::new(dir).args(args).assert_success()
}
