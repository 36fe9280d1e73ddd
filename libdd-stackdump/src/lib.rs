// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-process stack dumping for fatal signals.
//!
//! Architecturally, it consists of two paths that share one formatting pipeline:
//! 1. A signal handler, which catches the fatal UNIX signals (SIGILL, SIGABRT, SIGFPE, SIGBUS,
//!    SIGSEGV, SIGSYS), and writes a human readable backtrace to stderr before the process dies.
//!    The signal handler runs under a constrained environment where many standard operations are
//!    illegal.
//!    <https://man7.org/linux/man-pages/man7/signal-safety.7.html>
//!    In particular, memory allocation and synchronization such as mutexes are potentially UB.
//!    The handler therefore only captures raw return addresses, formats integers into fixed
//!    stack buffers, and pushes bytes out with `write(2)`.
//!    Once done, the handler restores the default disposition and returns, so the OS can
//!    terminate the process (and produce a core dump) exactly as it would have without us.
//! 2. On-demand capture, usable from any normal code path (logging, assertion failures).
//!    Here it is safe to allocate, so addresses are resolved to symbol names and C++/Rust names
//!    are demangled before being written to any `std::io::Write` destination.
//!
//! The only state shared between the two paths is a pair of atomic flags: whether we are
//! currently inside the handler, and whether the handler should dump the stack at all.
#![cfg(unix)]
#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

mod collector;
mod shared;

pub use collector::*;
pub use shared::configuration::StackDumpConfiguration;
#[cfg(feature = "benchmarking")]
pub use shared::constants;
pub use shared::constants::{MAX_FRAMES, POINTER_HEX_PADDING};

/// The fatal signals hooked by default.
pub fn default_signals() -> Vec<libc::c_int> {
    vec![
        libc::SIGILL,
        libc::SIGABRT,
        libc::SIGFPE,
        libc::SIGBUS,
        libc::SIGSEGV,
        libc::SIGSYS,
    ]
}

pub fn signal_from_signum(value: libc::c_int) -> anyhow::Result<nix::sys::signal::Signal> {
    nix::sys::signal::Signal::try_from(value)
        .map_err(|_| anyhow::anyhow!("Unexpected signal number {value}"))
}
