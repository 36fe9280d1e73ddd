// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Maximum number of return addresses kept by a single capture.
///
/// This bounds the stack usage of the handler: a `StackTrace` lives on the (possibly alternate)
/// signal stack while it is being formatted.
pub const MAX_FRAMES: usize = 32;

/// Minimum number of hex digits used when printing an address.
pub const POINTER_HEX_PADDING: usize = 12;

/// Enough room for every hex digit of a pointer on this target, plus the terminator.
pub const POINTER_BUFFER_LEN: usize = 2 * std::mem::size_of::<usize>() + 1;

/// Worst case for any integer on this target: one digit per bit (base 2), a sign, a terminator.
pub const INTEGER_BUFFER_LEN: usize = usize::BITS as usize + 2;

pub const STACKDUMP_BANNER: &str = "\n==== C stack trace ===============================\n\n";
pub const STACKDUMP_END: &str = "[end of stack trace]\n";
pub const STACKDUMP_SIGNAL_PREFIX: &str = "Received signal ";
pub const STACKDUMP_UNKNOWN_CODE: &str = "<unknown>";

/// Prefix of every symbol mangled per the Itanium C++ ABI (also used by legacy Rust mangling).
pub const MANGLED_SYMBOL_PREFIX: &str = "_Z";
