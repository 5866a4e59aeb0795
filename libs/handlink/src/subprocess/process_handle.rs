// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Consumer process launch and wait.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus};

use crate::core::{HandlinkError, Result};

/// Handle to a running consumer process.
pub struct ProcessHandle {
    child: Child,
    name: String,
}

impl ProcessHandle {
    /// Spawn a subprocess from a command.
    pub fn spawn(mut command: Command, name: &str) -> Result<Self> {
        let child = command.spawn().map_err(|e| {
            HandlinkError::ChildSpawnFailed(format!("'{}': {}", name, e))
        })?;

        tracing::info!("Spawned subprocess '{}' with PID {}", name, child.id());

        Ok(Self {
            child,
            name: name.to_string(),
        })
    }

    /// Check if the process is still running.
    pub fn is_running(&mut self) -> bool {
        self.child.try_wait().ok().flatten().is_none()
    }

    /// Block until the process exits. No timeout.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        let status = self.child.wait().map_err(|e| {
            HandlinkError::ChildSpawnFailed(format!(
                "failed to wait for subprocess '{}': {}",
                self.name, e
            ))
        })?;
        tracing::info!("Subprocess '{}' exited with {}", self.name, status);
        Ok(status)
    }

    /// Block until exit and require a zero status.
    pub fn wait_for_success(&mut self) -> Result<()> {
        let status = self.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(HandlinkError::ChildProcessFailed { status })
        }
    }

    /// Force kill the process.
    pub fn kill(&mut self) -> Result<()> {
        tracing::warn!("Force killing subprocess '{}'", self.name);
        self.child.kill().map_err(|e| {
            HandlinkError::ChildSpawnFailed(format!("failed to kill subprocess '{}': {}", self.name, e))
        })
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if self.is_running() {
            tracing::warn!(
                "ProcessHandle for '{}' dropped while still running, killing",
                self.name
            );
            self.kill().ok();
            self.child.wait().ok();
        }
    }
}

/// How to launch the consumer role.
#[derive(Debug, Clone)]
pub struct ConsumerCommand {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments, role marker included.
    pub args: Vec<OsString>,
    /// Environment variables to set.
    pub env: HashMap<String, String>,
}

impl ConsumerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    /// This executable again, with `args` followed by the role `marker`.
    pub fn relaunch_current_exe<I, S>(args: I, marker: &str) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let program = std::env::current_exe().map_err(|e| {
            HandlinkError::ChildSpawnFailed(format!("cannot locate current executable: {}", e))
        })?;
        Ok(Self::new(program).with_args(args).with_arg(marker))
    }

    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Short name for logs.
    pub fn display_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).envs(&self.env);
        command
    }

    pub fn spawn(&self) -> Result<ProcessHandle> {
        ProcessHandle::spawn(self.to_command(), &self.display_name())
    }
}
