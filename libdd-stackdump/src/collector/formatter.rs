// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::crash_handler::in_signal_handler;
use super::demangler::demangle_symbols;
use super::itoa::format_integer;
use super::sink::DiagnosticSink;
use super::symbolizer::{SymbolDemangler, SymbolResolver};
use crate::shared::constants::*;

/// Collaborators used to embellish a backtrace outside of signal context.
pub(crate) type Symbolizer<'a> = (&'a dyn SymbolResolver, &'a dyn SymbolDemangler);

/// Formats `trace` onto `sink`.
///
/// When called from the crash handler, only raw addresses are printed. Otherwise the whole trace
/// is resolved in a single call to `resolver`, and every resolved line is demangled; if resolution
/// is unavailable this falls back to raw addresses.
pub fn process_backtrace<S: DiagnosticSink + ?Sized>(
    trace: &[usize],
    sink: &mut S,
    resolver: &dyn SymbolResolver,
    demangler: &dyn SymbolDemangler,
) {
    let symbolizer = if in_signal_handler() {
        None
    } else {
        Some((resolver, demangler))
    };
    format_backtrace(trace, sink, symbolizer);
}

/// SIGNAL SAFETY:
///     With `symbolizer == None` this only formats integers into stack buffers and calls
///     `sink.emit()`, so it is exactly as signal safe as the sink. With `Some`, it allocates.
pub(crate) fn format_backtrace<S: DiagnosticSink + ?Sized>(
    trace: &[usize],
    sink: &mut S,
    symbolizer: Option<Symbolizer<'_>>,
) {
    sink.emit_str(STACKDUMP_BANNER);

    let mut printed = false;
    if let Some((resolver, demangler)) = symbolizer {
        printed = emit_resolved_frames(trace, sink, resolver, demangler);
    }

    if !printed {
        for &ip in trace {
            sink.emit_str(" [");
            output_pointer(ip, sink);
            sink.emit_str("]\n");
        }
    }
    sink.emit_str(STACKDUMP_END);
}

fn emit_resolved_frames<S: DiagnosticSink + ?Sized>(
    trace: &[usize],
    sink: &mut S,
    resolver: &dyn SymbolResolver,
    demangler: &dyn SymbolDemangler,
) -> bool {
    if trace.is_empty() {
        return false;
    }
    match resolver.resolve_symbols(trace) {
        Some(lines) if lines.len() == trace.len() => {
            for mut line in lines {
                demangle_symbols(&mut line, demangler);
                sink.emit_str("    ");
                sink.emit_str(&line);
                sink.emit_str("\n");
            }
            true
        }
        Some(lines) => {
            tracing::debug!(
                frames = trace.len(),
                resolved = lines.len(),
                "Symbol resolution returned a partial result, printing raw addresses"
            );
            false
        }
        None => {
            tracing::debug!(
                frames = trace.len(),
                "Symbol resolution unavailable, printing raw addresses"
            );
            false
        }
    }
}

/// Emits `0x` followed by at least `POINTER_HEX_PADDING` hex digits.
pub(crate) fn output_pointer<S: DiagnosticSink + ?Sized>(pointer: usize, sink: &mut S) {
    let mut buf = [0u8; POINTER_BUFFER_LEN];
    sink.emit_str("0x");
    if let Ok(digits) = format_integer(pointer as isize, &mut buf, 16, POINTER_HEX_PADDING) {
        sink.emit(digits);
    }
}
