// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::signal_handler_manager::register_crash_handlers;
use crate::shared::configuration::StackDumpConfiguration;

/// Initialize in-process stack dumping.
///
/// Installs the crash handler for `config.signals()`. Once a fatal signal is delivered, the
/// signal number (and fault details, when the signal has them) are written to stderr, followed
/// by the raw backtrace unless stack dumping was disabled. The process then terminates the way
/// it would have without the handler.
///
/// Calling this again while already installed re-applies the configuration.
///
/// PRECONDITIONS:
///     None.
/// SAFETY:
///     Stack dumping functions are not reentrant.
///     No other installation function should be called concurrently.
/// ATOMICITY:
///     This function is not atomic. A crash during its execution may lead to
///     unexpected crash-handling behaviour.
pub fn init(config: StackDumpConfiguration) -> anyhow::Result<()> {
    register_crash_handlers(&config)?;
    Ok(())
}

/// Installs the crash handler with the default configuration.
///
/// Returns false if any handler could not be installed. The caller decides whether to carry on
/// without crash diagnostics.
pub fn enable_in_process_stack_dumping() -> bool {
    match init(StackDumpConfiguration::default()) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Failed to enable in-process stack dumping: {e:#}");
            false
        }
    }
}
