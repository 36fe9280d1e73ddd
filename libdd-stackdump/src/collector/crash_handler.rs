// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::formatter::{format_backtrace, output_pointer};
use super::itoa::format_integer;
use super::siginfo_strings::{get_code_name, has_fault_address};
use super::signal_handler_manager::restore_default_disposition;
use super::sink::{DiagnosticSink, RawSink};
use super::stacktrace::StackTrace;
use crate::shared::constants::{INTEGER_BUFFER_LEN, STACKDUMP_SIGNAL_PREFIX};
use libc::{c_void, siginfo_t};
use std::sync::atomic::Ordering::SeqCst;
use std::sync::atomic::{AtomicBool, AtomicU8};

// Note that this file only uses the following async-signal safe functions in a signal handler.
// <https://man7.org/linux/man-pages/man7/signal-safety.7.html>
// - write
// - sigaction
// - raise
// - _exit
// Unwinding goes through `backtrace::trace_unsynchronized`, which has been warmed up before any
// handler was installed.

// Write-once: set on entry to the handler and never cleared.
static IN_SIGNAL_HANDLER: AtomicBool = AtomicBool::new(false);
static DUMP_STACK_ON_SIGNAL: AtomicBool = AtomicBool::new(true);
static STATE: AtomicU8 = AtomicU8::new(HandlerState::Uninstalled as u8);

/// Lifecycle of the process-wide crash handler.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerState {
    /// No handler has been installed by this crate.
    Uninstalled = 0,
    /// Handlers are in place for the configured signals.
    Installed = 1,
    /// A fatal signal was delivered and diagnostics are being written.
    Handling = 2,
    /// The default disposition is being restored so the OS can terminate the process.
    Terminating = 3,
}

impl HandlerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Installed,
            2 => Self::Handling,
            3 => Self::Terminating,
            _ => Self::Uninstalled,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrashHandlerError {
    #[error("A fatal signal is already being handled")]
    AlreadyHandling,
    #[error("Signal {0} cannot be handled")]
    InvalidSignal(i32),
    #[error("Unable to register handler for signal {signum}: {source}")]
    SignalRegistration {
        signum: i32,
        #[source]
        source: nix::Error,
    },
    #[error("Failed to set up the alternate signal stack: {0}")]
    AltStack(#[source] std::io::Error),
}

pub fn handler_state() -> HandlerState {
    HandlerState::from_u8(STATE.load(SeqCst))
}

pub(crate) fn set_handler_state(state: HandlerState) {
    STATE.store(state as u8, SeqCst);
}

/// True once a fatal signal has been delivered to the handler. Never goes back to false.
///
/// Every component that could allocate, lock or otherwise be unsafe in signal context checks
/// this first.
pub fn in_signal_handler() -> bool {
    signal_context_simulated() || IN_SIGNAL_HANDLER.load(SeqCst)
}

#[cfg(not(test))]
#[inline(always)]
fn signal_context_simulated() -> bool {
    false
}

#[cfg(test)]
fn signal_context_simulated() -> bool {
    test_utils::signal_context_simulated()
}


/// Turns on stack dumping from the crash handler.
///
/// # Preconditions
///   None
/// # Safety
///   None
/// # Atomicity
///   This function is atomic and idempotent.  Calling it multiple times is allowed.
pub fn enable_signal_stack_dump() {
    DUMP_STACK_ON_SIGNAL.store(true, SeqCst);
}

/// Turns off stack dumping from the crash handler.
/// The handler still prints which signal was received, and the installation state is unchanged.
///
/// # Preconditions
///   None
/// # Safety
///   None
/// # Atomicity
///   This function is atomic and idempotent.  Calling it multiple times is allowed.
pub fn disable_signal_stack_dump() {
    DUMP_STACK_ON_SIGNAL.store(false, SeqCst);
}

pub fn is_signal_stack_dump_enabled() -> bool {
    DUMP_STACK_ON_SIGNAL.load(SeqCst)
}

/// Writes `Received signal <signum>`, followed by the sub-code label and the faulting address for
/// signals that carry them, and a newline.
///
/// SIGNAL SAFETY:
///     Only stack buffers and `sink.emit()`.
pub fn emit_signal_preamble<S: DiagnosticSink + ?Sized>(
    sink: &mut S,
    signum: i32,
    si_code: i32,
    si_addr: usize,
) {
    let mut buf = [0u8; INTEGER_BUFFER_LEN];
    sink.emit_str(STACKDUMP_SIGNAL_PREFIX);
    if let Ok(digits) = format_integer(signum as isize, &mut buf, 10, 0) {
        sink.emit(digits);
    }

    if has_fault_address(signum) {
        if let Some(label) = get_code_name(signum, si_code) {
            sink.emit_str(" ");
            sink.emit_str(label);
        }
        sink.emit_str(" ");
        output_pointer(si_addr, sink);
    }
    sink.emit_str("\n");
}

pub(crate) extern "C" fn handle_posix_sigaction(
    signum: i32,
    sig_info: *mut siginfo_t,
    _ucontext: *mut c_void,
) {
    IN_SIGNAL_HANDLER.store(true, SeqCst);
    set_handler_state(HandlerState::Handling);

    let (si_code, si_addr) = if sig_info.is_null() {
        (0, 0)
    } else {
        // SAFETY: the kernel hands us a valid siginfo_t, as SA_SIGINFO was requested.
        unsafe { ((*sig_info).si_code, (*sig_info).si_addr() as usize) }
    };

    let mut sink = RawSink::stderr();
    emit_signal_preamble(&mut sink, signum, si_code, si_addr);

    if DUMP_STACK_ON_SIGNAL.load(SeqCst) {
        let trace = StackTrace::capture();
        format_backtrace(trace.addresses(), &mut sink, None);
    }

    set_handler_state(HandlerState::Terminating);
    restore_default_disposition(signum, needs_reraise(signum, si_code));
}

/// Whether returning from the handler would fail to deliver the signal again.
///
/// Only a hardware fault (SIGSEGV, SIGBUS, SIGILL, SIGFPE with a kernel sub-code) re-executes
/// the faulting instruction on return. Everything else has to be raised again: signals sent with
/// kill/raise (si_code <= 0), SIGABRT, and SIGSYS from seccomp, where the syscall is skipped.
pub(crate) fn needs_reraise(signum: i32, si_code: i32) -> bool {
    !(has_fault_address(signum) && si_code > 0)
}
