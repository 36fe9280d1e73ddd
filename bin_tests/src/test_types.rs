// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

/// Represents the different behaviors of the crashing binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestMode {
    /// Null-page read, with the default configuration.
    Segv,
    /// Same crash, stack dumping turned off after installation.
    SegvNoDump,
    /// Same crash, handler running on an alternate signal stack.
    SegvAltStack,
    /// `abort()`.
    Abort,
    /// `raise(SIGSEGV)`, i.e. a user-sent fatal signal.
    RaiseSegv,
    /// A seccomp filter traps `getppid` with SIGSYS. Linux only.
    SigsysSeccomp,
    /// No crash: print the current stack to stdout and exit cleanly.
    OnDemand,
}

impl TestMode {
    /// Returns the string representation used in command-line arguments.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Segv => "segv",
            Self::SegvNoDump => "segv_no_dump",
            Self::SegvAltStack => "segv_altstack",
            Self::Abort => "abort",
            Self::RaiseSegv => "raise_segv",
            Self::SigsysSeccomp => "sigsys_seccomp",
            Self::OnDemand => "on_demand",
        }
    }

    pub const fn all() -> &'static [Self] {
        &[
            Self::Segv,
            Self::SegvNoDump,
            Self::SegvAltStack,
            Self::Abort,
            Self::RaiseSegv,
            Self::SigsysSeccomp,
            Self::OnDemand,
        ]
    }
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown test mode: {s}"))
    }
}
