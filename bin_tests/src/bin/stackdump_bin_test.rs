// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#[cfg(not(unix))]
fn main() {}

#[cfg(unix)]
fn main() -> anyhow::Result<()> {
    unix::main()
}

#[cfg(unix)]
mod unix {
    use anyhow::Context;
    use bin_tests::TestMode;
    use libdd_stackdump::{self as stackdump, StackDumpConfiguration, StackTrace};
    use std::env;
    use std::io::Write;

    #[inline(never)]
    unsafe fn fn3() {
        // Read from an unmapped address in the null page, so the fault address is known.
        #[cfg(target_arch = "x86_64")]
        {
            std::arch::asm!(
                "mov {out}, qword ptr [{addr}]",
                addr = in(reg) 0x10usize,
                out = out(reg) _,
                options(nostack)
            );
        }

        #[cfg(target_arch = "aarch64")]
        {
            std::arch::asm!(
                "ldr {out}, [{addr}]",
                addr = in(reg) 0x10usize,
                out = out(reg) _,
                options(nostack)
            );
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            std::ptr::read_volatile(0x10 as *const usize);
        }
    }

    #[inline(never)]
    fn fn2() {
        unsafe { fn3() }
    }

    #[inline(never)]
    fn fn1() {
        fn2()
    }

    /// Classic BPF and seccomp values from `linux/filter.h` and `linux/seccomp.h`.
    #[cfg(target_os = "linux")]
    mod seccomp {
        pub const BPF_LD: u16 = 0x00;
        pub const BPF_W: u16 = 0x00;
        pub const BPF_ABS: u16 = 0x20;
        pub const BPF_JMP: u16 = 0x05;
        pub const BPF_JEQ: u16 = 0x10;
        pub const BPF_K: u16 = 0x00;
        pub const BPF_RET: u16 = 0x06;

        pub const SECCOMP_MODE_FILTER: libc::c_ulong = 2;
        pub const SECCOMP_RET_TRAP: u32 = 0x0003_0000;
        pub const SECCOMP_RET_ALLOW: u32 = 0x7fff_0000;
        /// `offsetof(struct seccomp_data, nr)`
        pub const SECCOMP_DATA_NR_OFFSET: u32 = 0;
    }

    /// Makes the kernel answer `getppid` with SIGSYS (`si_code == SYS_SECCOMP`), then calls it.
    /// The kernel skips the syscall, so nothing re-delivers the signal on return.
    #[cfg(target_os = "linux")]
    fn trap_getppid() -> anyhow::Result<()> {
        use seccomp::*;

        let stmt = |code: u16, k: u32| libc::sock_filter {
            code,
            jt: 0,
            jf: 0,
            k,
        };
        let mut filter = [
            stmt(BPF_LD | BPF_W | BPF_ABS, SECCOMP_DATA_NR_OFFSET),
            libc::sock_filter {
                code: BPF_JMP | BPF_JEQ | BPF_K,
                jt: 0,
                jf: 1,
                k: libc::SYS_getppid as u32,
            },
            stmt(BPF_RET | BPF_K, SECCOMP_RET_TRAP),
            stmt(BPF_RET | BPF_K, SECCOMP_RET_ALLOW),
        ];
        let prog = libc::sock_fprog {
            len: filter.len() as libc::c_ushort,
            filter: filter.as_mut_ptr(),
        };

        const ONE: libc::c_ulong = 1;
        const ZERO: libc::c_ulong = 0;
        // SAFETY: plain prctl calls, `prog` outlives them.
        unsafe {
            anyhow::ensure!(
                libc::prctl(libc::PR_SET_NO_NEW_PRIVS, ONE, ZERO, ZERO, ZERO) == 0,
                "PR_SET_NO_NEW_PRIVS failed: {}",
                std::io::Error::last_os_error()
            );
            anyhow::ensure!(
                libc::prctl(
                    libc::PR_SET_SECCOMP,
                    SECCOMP_MODE_FILTER,
                    &prog as *const libc::sock_fprog
                ) == 0,
                "PR_SET_SECCOMP failed: {}",
                std::io::Error::last_os_error()
            );
            libc::syscall(libc::SYS_getppid);
        }
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn trap_getppid() -> anyhow::Result<()> {
        anyhow::bail!("seccomp filters are only available on Linux")
    }

    #[inline(never)]
    fn capture_here() -> StackTrace {
        StackTrace::capture()
    }

    #[inline(never)]
    pub fn main() -> anyhow::Result<()> {
        let mut args = env::args().skip(1);
        let mode: TestMode = args
            .next()
            .context("Unexpected number of arguments")?
            .parse()?;
        anyhow::ensure!(args.next().is_none(), "unexpected extra arguments");

        match mode {
            TestMode::Segv => {
                anyhow::ensure!(
                    stackdump::enable_in_process_stack_dumping(),
                    "failed to install the crash handler"
                );
                fn1();
            }
            TestMode::SegvNoDump => {
                stackdump::init(StackDumpConfiguration::default())?;
                stackdump::disable_signal_stack_dump();
                fn1();
            }
            TestMode::SegvAltStack => {
                let config = StackDumpConfiguration::new(
                    stackdump::default_signals(),
                    true, // ignore_sigpipe
                    true, // dump_stack_on_signal
                    true, // create_alt_stack
                    true, // use_alt_stack
                )?;
                stackdump::init(config)?;
                fn1();
            }
            TestMode::Abort => {
                stackdump::init(StackDumpConfiguration::default())?;
                std::process::abort();
            }
            TestMode::RaiseSegv => {
                stackdump::init(StackDumpConfiguration::default())?;
                // SAFETY: No preconditions.
                unsafe { libc::raise(libc::SIGSEGV) };
            }
            TestMode::SigsysSeccomp => {
                stackdump::init(StackDumpConfiguration::default())?;
                trap_getppid()?;
            }
            TestMode::OnDemand => {
                stackdump::init(StackDumpConfiguration::default())?;
                let trace = capture_here();
                let mut stdout = std::io::stdout().lock();
                trace.output_to_stream(&mut stdout);
                stdout.flush()?;
                return Ok(());
            }
        }
        anyhow::bail!("{mode} should not have returned")
    }
}
