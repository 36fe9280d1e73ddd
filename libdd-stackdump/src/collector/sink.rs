// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::os::fd::RawFd;

/// Destination for the text produced while formatting a backtrace.
///
/// There are exactly two implementations: [`RawSink`], which is async-signal safe, and
/// [`StreamSink`], which is not. The formatting pipeline is generic over this trait so the same
/// code serves the crash handler and on-demand logging.
pub trait DiagnosticSink {
    fn emit(&mut self, text: &[u8]);

    fn emit_str(&mut self, text: &str) {
        self.emit(text.as_bytes())
    }
}

/// Unbuffered, unsynchronized writer to a file descriptor.
///
/// Does not own the descriptor: it is never closed here.
///
/// SIGNAL SAFETY:
///     `write(2)` is on the list of async-signal safe functions. Nothing else is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSink {
    fd: RawFd,
}

impl RawSink {
    pub const fn stderr() -> Self {
        Self {
            fd: libc::STDERR_FILENO,
        }
    }

    pub const fn from_raw_fd(fd: RawFd) -> Self {
        Self { fd }
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

impl DiagnosticSink for RawSink {
    fn emit(&mut self, text: &[u8]) {
        // There is nothing safe to do about a short write while crashing. Best effort only.
        // SAFETY: the pointer and length come from a valid slice.
        let _ = unsafe { libc::write(self.fd, text.as_ptr().cast(), text.len()) };
    }
}

/// Appends to a caller-owned stream.
///
/// Not signal safe: `W` may allocate or lock. Write errors are dropped, the same way they are
/// for [`RawSink`], so that both sinks degrade identically.
pub struct StreamSink<'a, W: Write + ?Sized> {
    stream: &'a mut W,
}

impl<'a, W: Write + ?Sized> StreamSink<'a, W> {
    pub fn new(stream: &'a mut W) -> Self {
        Self { stream }
    }
}

impl<W: Write + ?Sized> DiagnosticSink for StreamSink<'_, W> {
    fn emit(&mut self, text: &[u8]) {
        let _ = self.stream.write_all(text);
    }
}
