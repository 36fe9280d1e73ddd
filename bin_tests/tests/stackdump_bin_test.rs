// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg(unix)]

use bin_tests::{run_app, AppOutput, TestMode};
use std::path::Path;

const BANNER: &str = "\n==== C stack trace ===============================\n\n";
const END_MARKER: &str = "[end of stack trace]\n";

fn run(mode: TestMode) -> AppOutput {
    run_app(Path::new(env!("CARGO_BIN_EXE_stackdump_bin_test")), mode).unwrap()
}

fn assert_killed_by(output: &AppOutput, signum: i32) {
    assert_eq!(
        output.signal(),
        Some(signum),
        "unexpected exit {:?}, stderr:\n{}",
        output.status,
        output.stderr
    );
}

fn assert_full_dump(output: &AppOutput) {
    let banner_at = output.stderr.find(BANNER).expect("banner missing");
    let end_at = output.stderr.find(END_MARKER).expect("end marker missing");
    assert!(banner_at < end_at, "{}", output.stderr);
    assert!(output.stderr.ends_with(END_MARKER), "{}", output.stderr);
    let frames = output.raw_frames();
    assert!(!frames.is_empty(), "{}", output.stderr);
    assert!(frames.len() <= libdd_stackdump::MAX_FRAMES);
    // Nothing is symbolized from inside the handler.
    assert!(
        !output.stderr.lines().any(|line| line.starts_with("    ")),
        "{}",
        output.stderr
    );
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_segv_dumps_stack() {
    let output = run(TestMode::Segv);
    assert_killed_by(&output, libc::SIGSEGV);
    assert!(
        output.stderr.starts_with("Received signal 11"),
        "{}",
        output.stderr
    );
    #[cfg(target_os = "linux")]
    assert!(
        output
            .stderr
            .contains("Received signal 11 SEGV_MAPERR 0x000000000010\n"),
        "{}",
        output.stderr
    );
    assert_full_dump(&output);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_segv_without_dump_keeps_preamble() {
    let output = run(TestMode::SegvNoDump);
    assert_killed_by(&output, libc::SIGSEGV);
    assert!(output.stderr.contains("Received signal 11"));
    assert!(!output.stderr.contains(BANNER), "{}", output.stderr);
    assert!(!output.stderr.contains(END_MARKER), "{}", output.stderr);
    assert!(output.raw_frames().is_empty());
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_segv_on_alt_stack() {
    let output = run(TestMode::SegvAltStack);
    assert_killed_by(&output, libc::SIGSEGV);
    assert!(output.stderr.contains("Received signal 11"));
    assert_full_dump(&output);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_abort() {
    let output = run(TestMode::Abort);
    assert_killed_by(&output, libc::SIGABRT);
    // No sub-code or address for SIGABRT.
    assert!(
        output.stderr.contains("Received signal 6\n"),
        "{}",
        output.stderr
    );
    assert_full_dump(&output);
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_raised_signal_still_terminates() {
    let output = run(TestMode::RaiseSegv);
    assert_killed_by(&output, libc::SIGSEGV);
    assert!(output.stderr.contains("Received signal 11"));
    assert_full_dump(&output);
}

#[test]
#[cfg_attr(miri, ignore)]
#[cfg(target_os = "linux")]
fn test_seccomp_sigsys_terminates() {
    // Returning from the handler would resume after the skipped syscall.
    let output = run(TestMode::SigsysSeccomp);
    assert_killed_by(&output, libc::SIGSYS);
    assert!(
        output
            .stderr
            .contains(&format!("Received signal {}\n", libc::SIGSYS)),
        "{}",
        output.stderr
    );
    assert_full_dump(&output);
    assert!(
        !output.stderr.contains("should not have returned"),
        "{}",
        output.stderr
    );
}

#[test]
#[cfg_attr(miri, ignore)]
fn test_on_demand_dump() {
    let output = run(TestMode::OnDemand);
    assert!(output.status.success(), "{}", output.stderr);
    assert!(output.stdout.starts_with(BANNER), "{}", output.stdout);
    assert!(output.stdout.ends_with(END_MARKER), "{}", output.stdout);
    assert!(output.stderr.is_empty(), "{}", output.stderr);
    // Debug builds carry symbols, so the frames are resolved rather than raw.
    #[cfg(debug_assertions)]
    assert!(output.stdout.contains("capture_here"), "{}", output.stdout);
}
