// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Invocation of the external command-line tools

use crate::error::{MeshboxError, Result};
use std::env;
use std::fmt;
use std::future::Future;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// One external command with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
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
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured output of a successful command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external commands to completion
pub trait Toolchain {
    /// Run the command; a non-zero exit is a `CommandFailed` error
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<CommandOutput>> + Send;
}

/// Toolchain backed by the binaries on this host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolchain;

impl Toolchain for SystemToolchain {
    #[instrument(skip(self), fields(command = %invocation))]
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        debug!("Running command");

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(MeshboxError::CommandFailed {
                command: invocation.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Locate an executable on PATH
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Fail with `MissingTool` for the first program that is not on PATH
pub fn ensure_installed(programs: &[&str]) -> Result<()> {
    for program in programs {
        match find_on_path(program) {
            Some(location) => debug!("Found {} at {}", program, location.display()),
            None => return Err(MeshboxError::MissingTool(program.to_string())),
        }
    }
    Ok(())
}
