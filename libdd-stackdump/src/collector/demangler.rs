// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::symbolizer::SymbolDemangler;
use crate::shared::constants::MANGLED_SYMBOL_PREFIX;

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Demangles every mangled symbol found in `text`, in place. Example:
///
/// `out/Debug/base_unittests(_ZN10StackTraceC1Ev+0x20) [0x817778c]`
/// =>
/// `out/Debug/base_unittests(StackTrace::StackTrace()+0x20) [0x817778c]`
///
/// A candidate is the mangled prefix followed by the longest run of identifier characters.
/// Scanning is linear: after a successful replacement it resumes right after the inserted text,
/// after a failure it resumes right after the prefix. Either way the cursor moves forward, so
/// this terminates on any input.
///
/// SIGNAL SAFETY:
///     NOT async-signal safe, `String` allocates. Never called from the crash handler.
pub fn demangle_symbols<D: SymbolDemangler + ?Sized>(text: &mut String, demangler: &D) {
    let mut search_from = 0;
    while search_from < text.len() {
        // Look for the start of a mangled symbol, from search_from.
        let Some(offset) = text[search_from..].find(MANGLED_SYMBOL_PREFIX) else {
            break;
        };
        let mangled_start = search_from + offset;

        // The run only contains ASCII, so its end is always a char boundary.
        let mangled_end = text[mangled_start..]
            .find(|c: char| !is_symbol_char(c))
            .map_or(text.len(), |len| mangled_start + len);

        match demangler.demangle(&text[mangled_start..mangled_end]) {
            // An empty replacement would leave the cursor in place.
            Some(demangled) if !demangled.is_empty() => {
                text.replace_range(mangled_start..mangled_end, &demangled);
                search_from = mangled_start + demangled.len();
            }
            _ => search_from = mangled_start + MANGLED_SYMBOL_PREFIX.len(),
        }
    }
}
