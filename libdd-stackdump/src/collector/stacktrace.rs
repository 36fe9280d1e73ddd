// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::formatter::process_backtrace;
use super::sink::{DiagnosticSink, RawSink, StreamSink};
use super::symbolizer::{BacktraceResolver, SymbolDemangler, SymbolResolver, SymbolicDemangler};
use crate::shared::constants::MAX_FRAMES;
use std::fmt;
use std::io::Write;

/// A snapshot of the current thread's return addresses, innermost first.
///
/// Lives entirely on the stack so that it can be captured from the crash handler.
#[derive(Clone, Copy)]
pub struct StackTrace {
    trace: [usize; MAX_FRAMES],
    count: usize,
}

impl StackTrace {
    /// Captures up to `MAX_FRAMES` return addresses of the calling thread.
    ///
    /// SIGNAL SAFETY:
    ///     Uses the unsynchronized unwinder, which neither allocates nor locks once
    ///     [`warm_up_backtrace`] has run. The first call in a process may lazily load the unwinder,
    ///     which is why the crash handler installation performs that warm-up.
    #[inline(never)]
    pub fn capture() -> Self {
        let mut trace = [0usize; MAX_FRAMES];
        let mut count = 0;
        // SAFETY: the callback does not re-enter the unwinder. Taking the crate's global lock
        // here could deadlock inside the crash handler.
        unsafe {
            backtrace::trace_unsynchronized(|frame| {
                if count >= MAX_FRAMES {
                    return false;
                }
                trace[count] = frame.ip() as usize;
                count += 1;
                count < MAX_FRAMES
            });
        }
        Self { trace, count }
    }

    /// Builds a trace from already known addresses. Anything past `MAX_FRAMES` is dropped.
    pub fn from_addresses(addresses: &[usize]) -> Self {
        let count = addresses.len().min(MAX_FRAMES);
        let mut trace = [0usize; MAX_FRAMES];
        trace[..count].copy_from_slice(&addresses[..count]);
        Self { trace, count }
    }

    pub fn addresses(&self) -> &[usize] {
        &self.trace[..self.count]
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Writes the trace to stderr, unbuffered.
    ///
    /// Inside the crash handler only raw addresses are written. Outside of it, symbols are
    /// resolved and demangled in-process.
    pub fn print(&self) {
        self.output_with(&mut RawSink::stderr(), &BacktraceResolver, &SymbolicDemangler)
    }

    /// Appends the symbolized trace to `stream`, using the in-process resolver and demangler.
    ///
    /// Inside the crash handler the collaborators are never called and raw addresses are written
    /// instead. The stream itself may still allocate.
    pub fn output_to_stream<W: Write + ?Sized>(&self, stream: &mut W) {
        self.output_to_stream_with(stream, &BacktraceResolver, &SymbolicDemangler)
    }

    /// Same as [`StackTrace::output_to_stream`] with caller provided collaborators.
    pub fn output_to_stream_with<W: Write + ?Sized>(
        &self,
        stream: &mut W,
        resolver: &dyn SymbolResolver,
        demangler: &dyn SymbolDemangler,
    ) {
        self.output_with(&mut StreamSink::new(stream), resolver, demangler)
    }

    fn output_with<S: DiagnosticSink + ?Sized>(
        &self,
        sink: &mut S,
        resolver: &dyn SymbolResolver,
        demangler: &dyn SymbolDemangler,
    ) {
        process_backtrace(self.addresses(), sink, resolver, demangler)
    }
}

impl fmt::Debug for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.addresses().iter().map(|ip| format!("{ip:#x}")))
            .finish()
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.output_to_stream(&mut buf);
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

/// Captures and discards one trace.
///
/// The first unwind in a process may allocate or take loader locks while the unwinder sets
/// itself up, so this must run before any crash handler is installed.
#[inline(never)]
pub fn warm_up_backtrace() {
    std::hint::black_box(StackTrace::capture());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::crash_handler::test_utils::SimulatedSignalContext;
    use crate::shared::constants::{STACKDUMP_BANNER, STACKDUMP_END};
    use std::cell::Cell;
    use std::io::{Read, Seek, SeekFrom};
    use std::os::fd::AsRawFd;

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_capture_is_bounded() {
        warm_up_backtrace();
        let trace = StackTrace::capture();
        assert!(!trace.is_empty());
        assert!(trace.len() <= MAX_FRAMES);
        assert_eq!(trace.addresses().len(), trace.len());
    }

    #[inline(never)]
    fn recurse(depth: usize) -> StackTrace {
        if depth == 0 {
            StackTrace::capture()
        } else {
            std::hint::black_box(recurse(depth - 1))
        }
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_deep_stack_is_truncated() {
        let trace = recurse(MAX_FRAMES * 2);
        assert_eq!(trace.len(), MAX_FRAMES);
    }

    #[test]
    fn test_from_addresses() {
        let trace = StackTrace::from_addresses(&[3, 2, 1]);
        assert_eq!(trace.addresses(), &[3, 2, 1]);
        assert_eq!(trace.len(), 3);

        let many: Vec<usize> = (0..MAX_FRAMES + 10).collect();
        let trace = StackTrace::from_addresses(&many);
        assert_eq!(trace.addresses(), &many[..MAX_FRAMES]);

        assert!(StackTrace::from_addresses(&[]).is_empty());
    }

    #[test]
    fn test_output_to_stream_with() {
        let trace = StackTrace::from_addresses(&[0x10, 0x20]);
        let resolver = |addresses: &[usize]| -> Option<Vec<String>> {
            Some(addresses.iter().map(|a| format!("frame_{a:x}")).collect())
        };
        let demangler = |_: &str| -> Option<String> { None };
        let mut out = Vec::new();
        trace.output_to_stream_with(&mut out, &resolver, &demangler);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("{STACKDUMP_BANNER}    frame_10\n    frame_20\n{STACKDUMP_END}")
        );
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_display_is_framed() {
        let text = StackTrace::capture().to_string();
        assert!(text.starts_with(STACKDUMP_BANNER), "{text}");
        assert!(text.ends_with(STACKDUMP_END), "{text}");
    }

    #[test]
    fn test_debug_lists_addresses() {
        let trace = StackTrace::from_addresses(&[0x10, 0xff]);
        assert_eq!(format!("{trace:?}"), r#"["0x10", "0xff"]"#);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_signal_context_never_symbolizes() {
        let trace = StackTrace::from_addresses(&[0x10, 0x20]);
        let expected =
            format!("{STACKDUMP_BANNER} [0x000000000010]\n [0x000000000020]\n{STACKDUMP_END}");
        let calls = Cell::new(0);
        let resolver = |addresses: &[usize]| -> Option<Vec<String>> {
            calls.set(calls.get() + 1);
            Some(addresses.iter().map(|a| format!("frame_{a:x}")).collect())
        };
        let demangler = |_: &str| -> Option<String> {
            calls.set(calls.get() + 1);
            Some("demangled".to_string())
        };

        let _context = SimulatedSignalContext::enter();

        let mut out = Vec::new();
        trace.output_to_stream_with(&mut out, &resolver, &demangler);
        assert_eq!(String::from_utf8(out).unwrap(), expected);

        let mut file = tempfile::tempfile().unwrap();
        trace.output_with(&mut RawSink::from_raw_fd(file.as_raw_fd()), &resolver, &demangler);
        file.seek(SeekFrom::Start(0)).unwrap();
        let mut written = String::new();
        file.read_to_string(&mut written).unwrap();
        assert_eq!(written, expected);

        assert_eq!(trace.to_string(), expected);

        // Goes to stderr; only checks that the raw path is taken without panicking.
        trace.print();

        assert_eq!(calls.get(), 0);
    }
}
