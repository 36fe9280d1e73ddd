// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! POSIX doesn't define any async-signal safe function for converting an integer to ASCII, and
//! `core::fmt` gives no guarantee that it won't allocate or panic. This is our own version.

use thiserror::Error;

const DIGITS: &[u8; 16] = b"0123456789abcdef";

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IntegerFormatError {
    #[error("Base {0} is outside of the supported range 2..=16")]
    InvalidBase(u32),
    #[error("Destination buffer is too small")]
    BufferTooSmall,
}

/// Converts `value` to ASCII in the given `base`, writing into `buf`.
///
/// Returns the formatted digits (without the terminator) on success. It never writes more than
/// `buf.len()` bytes, and always appends a NUL byte after the digits. On failure, the output is an
/// empty NUL terminated string (if there is room for one).
///
/// Negative values are only rendered with a sign in base 10. In any other base the two's
/// complement bit pattern is printed, which is what you want for addresses.
///
/// The digit sequence is padded with leading zeros to at least `min_digits` digits, not counting
/// the sign.
///
/// SIGNAL SAFETY:
///     No allocation, no locks, no panics: every index is checked against `buf.len()` first.
pub fn format_integer(
    value: isize,
    buf: &mut [u8],
    base: u32,
    mut min_digits: usize,
) -> Result<&[u8], IntegerFormatError> {
    // Make sure we can write at least one NUL byte.
    let mut needed = 1;
    if needed > buf.len() {
        return Err(IntegerFormatError::BufferTooSmall);
    }

    if !(2..=16).contains(&base) {
        buf[0] = 0;
        return Err(IntegerFormatError::InvalidBase(base));
    }
    let base = base as usize;

    let mut start = 0;
    let mut magnitude = value as usize;
    if value < 0 && base == 10 {
        // `-value` overflows on isize::MIN, compute the magnitude on the unsigned side.
        magnitude = value.unsigned_abs();
        needed += 1;
        if needed > buf.len() {
            buf[0] = 0;
            return Err(IntegerFormatError::BufferTooSmall);
        }
        buf[0] = b'-';
        start = 1;
    }

    // Output at least one digit (i.e. '0').
    let mut end = start;
    loop {
        needed += 1;
        if needed > buf.len() {
            buf[0] = 0;
            return Err(IntegerFormatError::BufferTooSmall);
        }
        buf[end] = DIGITS[magnitude % base];
        magnitude /= base;
        end += 1;
        min_digits = min_digits.saturating_sub(1);
        if magnitude == 0 && min_digits == 0 {
            break;
        }
    }
    buf[end] = 0;

    // Digits come out least significant first. We can't easily generate them in forward order,
    // as we can't tell the number of characters needed until we are done converting.
    buf[start..end].reverse();
    Ok(&buf[..end])
}
