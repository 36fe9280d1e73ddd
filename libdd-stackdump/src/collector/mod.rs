// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod api;
mod crash_handler;
mod demangler;
mod formatter;
mod itoa;
mod signal_handler_manager;
mod siginfo_strings;
mod sink;
mod stacktrace;
mod symbolizer;

pub use api::*;
pub use crash_handler::{
    disable_signal_stack_dump, enable_signal_stack_dump, handler_state, in_signal_handler,
    is_signal_stack_dump_enabled, CrashHandlerError, HandlerState,
};
pub use demangler::demangle_symbols;
pub use formatter::process_backtrace;
pub use itoa::{format_integer, IntegerFormatError};
pub use siginfo_strings::{get_code_name, siginfo_code};
pub use sink::{DiagnosticSink, RawSink, StreamSink};
pub use stacktrace::{warm_up_backtrace, StackTrace};
pub use symbolizer::{BacktraceResolver, SymbolDemangler, SymbolResolver, SymbolicDemangler};

#[cfg(feature = "benchmarking")]
pub use crash_handler::emit_signal_preamble;
