// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::shared::constants::STACKDUMP_UNKNOWN_CODE;

// These are defined in siginfo.h
// They are only derived here because the libc crate doesn't export them for every target.
// The numbering differs between Linux and Apple platforms for SIGILL and SIGFPE.
pub mod siginfo_code {
    #[cfg(not(any(target_os = "macos", target_os = "ios")))]
    pub mod ill {
        pub const ILLOPC: i32 = 1;
        pub const ILLOPN: i32 = 2;
        pub const ILLADR: i32 = 3;
        pub const ILLTRP: i32 = 4;
        pub const PRVOPC: i32 = 5;
        pub const PRVREG: i32 = 6;
        pub const COPROC: i32 = 7;
        pub const BADSTK: i32 = 8;
    }

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    pub mod ill {
        pub const ILLOPC: i32 = 1;
        pub const ILLTRP: i32 = 2;
        pub const PRVOPC: i32 = 3;
        pub const ILLOPN: i32 = 4;
        pub const ILLADR: i32 = 5;
        pub const PRVREG: i32 = 6;
        pub const COPROC: i32 = 7;
        pub const BADSTK: i32 = 8;
    }

    #[cfg(not(any(target_os = "macos", target_os = "ios")))]
    pub mod fpe {
        pub const INTDIV: i32 = 1;
        pub const INTOVF: i32 = 2;
        pub const FLTDIV: i32 = 3;
        pub const FLTOVF: i32 = 4;
        pub const FLTUND: i32 = 5;
        pub const FLTRES: i32 = 6;
        pub const FLTINV: i32 = 7;
        pub const FLTSUB: i32 = 8;
    }

    #[cfg(any(target_os = "macos", target_os = "ios"))]
    pub mod fpe {
        pub const FLTDIV: i32 = 1;
        pub const FLTOVF: i32 = 2;
        pub const FLTUND: i32 = 3;
        pub const FLTRES: i32 = 4;
        pub const FLTINV: i32 = 5;
        pub const FLTSUB: i32 = 6;
        pub const INTDIV: i32 = 7;
        pub const INTOVF: i32 = 8;
    }

    pub mod segv {
        pub const MAPERR: i32 = 1;
        pub const ACCERR: i32 = 2;
    }

    pub mod bus {
        pub const ADRALN: i32 = 1;
        pub const ADRERR: i32 = 2;
        pub const OBJERR: i32 = 3;
    }
}

/// Returns the label of `code` for the four signals that carry a fault sub-code and address.
///
/// `None` means the signal has no meaningful sub-code and nothing should be printed for it.
/// An unrecognized sub-code of one of those four signals maps to `"<unknown>"`.
///
/// SIGNAL SAFETY:
///     Only returns static strings.
pub fn get_code_name(signo: i32, code: i32) -> Option<&'static str> {
    use siginfo_code::*;
    let name = match signo {
        libc::SIGBUS => match code {
            bus::ADRALN => "BUS_ADRALN",
            bus::ADRERR => "BUS_ADRERR",
            bus::OBJERR => "BUS_OBJERR",
            _ => STACKDUMP_UNKNOWN_CODE,
        },
        libc::SIGFPE => match code {
            fpe::FLTDIV => "FPE_FLTDIV",
            fpe::FLTINV => "FPE_FLTINV",
            fpe::FLTOVF => "FPE_FLTOVF",
            fpe::FLTRES => "FPE_FLTRES",
            fpe::FLTSUB => "FPE_FLTSUB",
            fpe::FLTUND => "FPE_FLTUND",
            fpe::INTDIV => "FPE_INTDIV",
            fpe::INTOVF => "FPE_INTOVF",
            _ => STACKDUMP_UNKNOWN_CODE,
        },
        // ILL_ILLOPC has no label of its own.
        libc::SIGILL => match code {
            ill::BADSTK => "ILL_BADSTK",
            ill::COPROC => "ILL_COPROC",
            ill::ILLOPN => "ILL_ILLOPN",
            ill::ILLADR => "ILL_ILLADR",
            ill::ILLTRP => "ILL_ILLTRP",
            ill::PRVOPC => "ILL_PRVOPC",
            ill::PRVREG => "ILL_PRVREG",
            _ => STACKDUMP_UNKNOWN_CODE,
        },
        libc::SIGSEGV => match code {
            segv::MAPERR => "SEGV_MAPERR",
            segv::ACCERR => "SEGV_ACCERR",
            _ => STACKDUMP_UNKNOWN_CODE,
        },
        _ => return None,
    };
    Some(name)
}

/// True for the signals whose preamble carries a sub-code and a faulting address.
pub(crate) fn has_fault_address(signo: i32) -> bool {
    matches!(
        signo,
        libc::SIGBUS | libc::SIGFPE | libc::SIGILL | libc::SIGSEGV
    )
}
