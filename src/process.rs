// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Background helper process tracked through a pid marker file

use crate::error::{MeshboxError, Result};
use crate::tools::Invocation;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{info, instrument, warn};

/// File holding the decimal pid of a background process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMarker {
    path: PathBuf,
}

impl ProcessMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the pid, or None when there is no marker
    pub fn read(&self) -> Result<Option<u32>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let pid: u32 = content.trim().parse().map_err(|_| self.invalid(&content))?;
        // 0 and 1 would address our own process group and init
        if pid <= 1 {
            return Err(self.invalid(&content));
        }
        Ok(Some(pid))
    }

    pub fn write(&self, pid: u32) -> Result<()> {
        fs::write(&self.path, format!("{}\n", pid))?;
        Ok(())
    }

    /// Remove the marker; a missing file is not an error
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn invalid(&self, content: &str) -> MeshboxError {
        MeshboxError::ProcessMarker {
            path: self.path.clone(),
            message: format!("expected a process id, found '{}'", content.trim()),
        }
    }
}

/// A detached helper process owned through its marker.
///
/// Created by [`ManagedProcess::launch`] or [`ManagedProcess::adopt`] and
/// consumed by [`ManagedProcess::stop`].
#[derive(Debug)]
pub struct ManagedProcess {
    pid: u32,
    marker: ProcessMarker,
}

impl ManagedProcess {
    /// Spawn the command in its own process group, append its output to
    /// `log` and record its pid in `marker`
    #[instrument(skip(marker), fields(command = %invocation, marker = %marker.path().display()))]
    pub fn launch(invocation: &Invocation, marker: ProcessMarker, log: &Path) -> Result<Self> {
        let log_file = OpenOptions::new().create(true).append(true).open(log)?;

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(log_file.try_clone()?)
            .stderr(log_file)
            .process_group(0)
            .spawn()?;
        let pid = child.id();

        if let Err(e) = marker.write(pid) {
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            return Err(e);
        }

        info!(pid, "Started {} (output in {})", invocation.program, log.display());
        Ok(Self { pid, marker })
    }

    /// Take ownership of the process recorded in an existing marker
    pub fn adopt(marker: ProcessMarker) -> Result<Option<Self>> {
        Ok(marker.read()?.map(|pid| Self { pid, marker }))
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn marker(&self) -> &ProcessMarker {
        &self.marker
    }

    /// Whether a process with this pid exists (it may belong to another user)
    pub fn is_running(&self) -> bool {
        match self.signal(None) {
            Ok(()) | Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    /// Terminate the process and remove its marker
    #[instrument(skip(self), fields(pid = self.pid))]
    pub fn stop(self) -> Result<()> {
        match self.signal(Some(Signal::SIGTERM)) {
            Ok(()) => info!("Sent SIGTERM to process {}", self.pid),
            Err(Errno::ESRCH) => warn!(
                "Process {} from {} is no longer running, removing stale marker",
                self.pid,
                self.marker.path().display()
            ),
            Err(e) => return Err(e.into()),
        }

        self.marker.remove()
    }

    fn signal(&self, signal: Option<Signal>) -> std::result::Result<(), Errno> {
        let pid = i32::try_from(self.pid).map_err(|_| Errno::ESRCH)?;
        kill(Pid::from_raw(pid), signal)
    }
}
