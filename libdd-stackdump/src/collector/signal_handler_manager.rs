// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
use super::crash_handler::{
    disable_signal_stack_dump, enable_signal_stack_dump, handle_posix_sigaction, handler_state,
    set_handler_state, CrashHandlerError, HandlerState,
};
use super::stacktrace::warm_up_backtrace;
use crate::shared::configuration::StackDumpConfiguration;
use libc::{
    mmap, munmap, sigaltstack, MAP_ANON, MAP_FAILED, MAP_PRIVATE, PROT_NONE, PROT_READ,
    PROT_WRITE, SIGSTKSZ,
};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::io;
use std::ptr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::SeqCst;
use tracing::{debug, warn};

static ALT_STACK_CREATED: AtomicBool = AtomicBool::new(false);

/// Installs the crash handler for every signal in `config`.
///
/// In order: SIGPIPE is ignored (if configured), the unwinder is warmed up, the alternate stack
/// is created (if configured, at most once per process), the dump flag is set from the
/// configuration, then each signal gets the handler with `SA_RESETHAND | SA_SIGINFO`.
/// Calling this again while installed re-applies all of the above.
///
/// PRECONDITIONS:
///     None
/// SAFETY:
///     Not reentrant. No other installation function should be called concurrently.
/// ATOMICITY:
///     Installing handlers for several signals is not atomic. A fatal signal arriving halfway
///     through is handled if its own handler was already registered, and gets the previous
///     disposition otherwise.
pub fn register_crash_handlers(config: &StackDumpConfiguration) -> Result<(), CrashHandlerError> {
    if matches!(
        handler_state(),
        HandlerState::Handling | HandlerState::Terminating
    ) {
        return Err(CrashHandlerError::AlreadyHandling);
    }

    if config.ignore_sigpipe() {
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        // SAFETY: SigIgn does not run any code.
        unsafe { signal::sigaction(Signal::SIGPIPE, &ignore) }.map_err(|source| {
            CrashHandlerError::SignalRegistration {
                signum: libc::SIGPIPE,
                source,
            }
        })?;
        debug!("Ignoring SIGPIPE");
    }

    // Must happen before the first handler is in place.
    warm_up_backtrace();

    if config.create_alt_stack()
        && ALT_STACK_CREATED
            .compare_exchange(false, true, SeqCst, SeqCst)
            .is_ok()
    {
        // SAFETY: This function has no documented preconditions.
        if let Err(e) = unsafe { create_alt_stack() } {
            ALT_STACK_CREATED.store(false, SeqCst);
            return Err(e);
        }
        debug!("Created alternate signal stack");
    }

    if config.dump_stack_on_signal() {
        enable_signal_stack_dump();
    } else {
        disable_signal_stack_dump();
    }

    let mut first_error = None;
    let mut registered = 0;
    for &signum in config.signals() {
        // SAFETY: This function has no documented preconditions.
        match unsafe { register_signal_handler(signum, config) } {
            Ok(()) => registered += 1,
            Err(e) => {
                warn!(signum, error = %e, "Failed to register crash handler");
                first_error.get_or_insert(e);
            }
        }
    }
    if registered > 0 {
        set_handler_state(HandlerState::Installed);
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            debug!(signals = ?config.signals(), "Installed crash handlers");
            Ok(())
        }
    }
}

unsafe fn register_signal_handler(
    signum: i32,
    config: &StackDumpConfiguration,
) -> Result<(), CrashHandlerError> {
    let signal_type =
        Signal::try_from(signum).map_err(|_| CrashHandlerError::InvalidSignal(signum))?;

    // Only use the altstack if asked to. Some runtimes install their own, and check the stack
    // pointer in their handlers.
    let extra_saflags = if config.use_alt_stack() {
        SaFlags::SA_ONSTACK
    } else {
        SaFlags::empty()
    };

    // The default disposition comes back on delivery, so a crash inside the handler goes
    // straight to the OS. SA_SIGINFO is added by nix for SigHandler::SigAction.
    let sig_action = SigAction::new(
        SigHandler::SigAction(handle_posix_sigaction),
        SaFlags::SA_RESETHAND | extra_saflags,
        SigSet::empty(),
    );

    signal::sigaction(signal_type, &sig_action)
        .map(|_| ())
        .map_err(|source| CrashHandlerError::SignalRegistration { signum, source })
}

/// Puts the default disposition back for `signum`. If `reraise`, the signal is raised again so
/// that the default action runs once the handler returns.
///
/// SIGNAL SAFETY:
///     Only `sigaction`, `raise` and `_exit`. If the disposition can't be restored the process
///     exits immediately, since returning could re-enter the handler forever.
pub(crate) fn restore_default_disposition(signum: i32, reraise: bool) {
    let Ok(signal_type) = Signal::try_from(signum) else {
        terminate()
    };
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    // SAFETY: SigDfl does not run any code.
    if unsafe { signal::sigaction(signal_type, &default) }.is_err() {
        terminate()
    }
    if reraise {
        // SAFETY: No preconditions.
        unsafe { libc::raise(signum) };
    }
}

/// Exits without running atexit handlers or flushing stdio.
pub(crate) fn terminate() -> ! {
    // SAFETY: No preconditions.
    unsafe { libc::_exit(1) }
}

/// Allocates a signal altstack, and puts a guard page at the end.
/// Inspired by https://github.com/rust-lang/rust/pull/69969/files
unsafe fn create_alt_stack() -> Result<(), CrashHandlerError> {
    // The greater of 16 pages or SIGSTKSZ. The default SIGSTKSZ is only 8KB.
    let page_size = page_size::get();
    let sigaltstack_base_size = std::cmp::max(SIGSTKSZ, 16 * page_size);
    let mapping_size = sigaltstack_base_size + page_size;
    let stackp = mmap(
        ptr::null_mut(),
        mapping_size,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANON,
        -1,
        0,
    );
    if stackp == MAP_FAILED {
        return Err(CrashHandlerError::AltStack(io::Error::last_os_error()));
    }
    if libc::mprotect(stackp, page_size, PROT_NONE) != 0 {
        let e = io::Error::last_os_error();
        munmap(stackp, mapping_size);
        return Err(CrashHandlerError::AltStack(e));
    }

    let stack = libc::stack_t {
        ss_sp: stackp.add(page_size),
        ss_flags: 0,
        ss_size: sigaltstack_base_size,
    };
    if sigaltstack(&stack, ptr::null_mut()) != 0 {
        let e = io::Error::last_os_error();
        munmap(stackp, mapping_size);
        return Err(CrashHandlerError::AltStack(e));
    }
    Ok(())
}
