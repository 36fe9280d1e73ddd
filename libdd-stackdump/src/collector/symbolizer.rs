// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Symbol resolution and demangling collaborators.
//!
//! Neither of these is async-signal safe, and neither is ever called from the crash handler.

use std::ffi::c_void;
use std::fmt::Write;
use symbolic_common::Name;
use symbolic_demangle::{Demangle, DemangleOptions};

/// Maps a batch of return addresses to one line of text per address.
///
/// Returns `None` if resolution is unavailable. A returned vector must have exactly one entry per
/// address, otherwise the caller treats it as a failure.
pub trait SymbolResolver {
    fn resolve_symbols(&self, addresses: &[usize]) -> Option<Vec<String>>;
}

/// Turns a single mangled name into its human readable form, or `None` if it can't.
pub trait SymbolDemangler {
    fn demangle(&self, mangled: &str) -> Option<String>;
}

impl<F> SymbolResolver for F
where
    F: Fn(&[usize]) -> Option<Vec<String>>,
{
    fn resolve_symbols(&self, addresses: &[usize]) -> Option<Vec<String>> {
        self(addresses)
    }
}

impl<F> SymbolDemangler for F
where
    F: Fn(&str) -> Option<String>,
{
    fn demangle(&self, mangled: &str) -> Option<String> {
        self(mangled)
    }
}

/// In-process resolution through the `backtrace` crate.
///
/// Each line has the form `<raw symbol>+0x<offset> [0x<address>]`, followed by
/// ` at <file>:<line>` when debug info is available. The symbol is left mangled on purpose: the
/// formatter runs every line through the demangler afterwards.
#[derive(Debug, Default, Clone, Copy)]
pub struct BacktraceResolver;

impl BacktraceResolver {
    fn resolve_one(address: usize) -> Option<String> {
        // Return addresses point one past the call, which may already be the next function.
        let lookup = address.saturating_sub(1);
        let mut line = None;
        backtrace::resolve(lookup as *mut c_void, |symbol| {
            if line.is_some() {
                // Inlined frames resolve to several symbols, the first is the outermost.
                return;
            }
            let Some(name) = symbol.name() else {
                return;
            };
            let mut text = String::from_utf8_lossy(name.as_bytes()).into_owned();
            if let Some(symbol_address) = symbol.addr() {
                let offset = address.wrapping_sub(symbol_address as usize);
                let _ = write!(text, "+{offset:#x}");
            }
            let _ = write!(text, " [{address:#014x}]");
            if let (Some(file), Some(lineno)) = (symbol.filename(), symbol.lineno()) {
                let _ = write!(text, " at {}:{lineno}", file.display());
            }
            line = Some(text);
        });
        line
    }
}

impl SymbolResolver for BacktraceResolver {
    fn resolve_symbols(&self, addresses: &[usize]) -> Option<Vec<String>> {
        let mut resolved_any = false;
        let lines = addresses
            .iter()
            .map(|&address| match Self::resolve_one(address) {
                Some(line) => {
                    resolved_any = true;
                    line
                }
                None => format!("[{address:#014x}]"),
            })
            .collect();
        // If nothing at all resolved, the raw address listing is strictly more useful.
        resolved_any.then_some(lines)
    }
}

/// Demangles C++ (Itanium), Rust and MSVC names with `symbolic-demangle`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymbolicDemangler;

impl SymbolDemangler for SymbolicDemangler {
    fn demangle(&self, mangled: &str) -> Option<String> {
        match Name::from(mangled).demangle(DemangleOptions::complete()) {
            Some(demangled) if !demangled.is_empty() && demangled != mangled => Some(demangled),
            _ => None,
        }
    }
}
