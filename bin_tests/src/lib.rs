// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helpers to run the crashing binary in a child process and look at what it left behind.
//!
//! The binary is the only way to exercise the crash handler for real: once a fatal signal has
//! been handled, the process is gone.

pub mod test_types;

use anyhow::Context;
use std::path::Path;
use std::process::{self, ExitStatus};

pub use test_types::TestMode;

#[derive(Debug)]
pub struct AppOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl AppOutput {
    /// The signal that killed the child, if any.
    #[cfg(unix)]
    pub fn signal(&self) -> Option<i32> {
        use std::os::unix::process::ExitStatusExt;
        self.status.signal()
    }

    /// Lines of stderr that hold one raw frame each.
    pub fn raw_frames(&self) -> Vec<&str> {
        self.stderr
            .lines()
            .filter(|line| line.starts_with(" [0x") && line.ends_with(']'))
            .collect()
    }
}

/// Runs `binary` in `mode` and waits for it to exit (or die).
pub fn run_app(binary: &Path, mode: TestMode) -> anyhow::Result<AppOutput> {
    let output = process::Command::new(binary)
        .arg(mode.as_str())
        .stdin(process::Stdio::null())
        .output()
        .with_context(|| format!("Failed to run {} in mode {mode}", binary.display()))?;
    Ok(AppOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
