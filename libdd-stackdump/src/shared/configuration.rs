// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
use crate::{default_signals, signal_from_signum};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDumpConfiguration {
    create_alt_stack: bool,
    // Initial value of the dump-on-signal toggle
    dump_stack_on_signal: bool,
    // Writes to a closed stderr must not raise a second, unrelated signal
    ignore_sigpipe: bool,
    signals: Vec<i32>,
    use_alt_stack: bool,
}

impl Default for StackDumpConfiguration {
    fn default() -> Self {
        Self {
            create_alt_stack: false,
            dump_stack_on_signal: true,
            ignore_sigpipe: true,
            signals: default_signals(),
            use_alt_stack: false,
        }
    }
}

impl StackDumpConfiguration {
    pub fn new(
        mut signals: Vec<i32>,
        ignore_sigpipe: bool,
        dump_stack_on_signal: bool,
        create_alt_stack: bool,
        use_alt_stack: bool,
    ) -> anyhow::Result<Self> {
        // Requesting to create, but not use, the altstack is considered paradoxical.
        anyhow::ensure!(
            !create_alt_stack || use_alt_stack,
            "Cannot create an altstack without using it"
        );
        if signals.is_empty() {
            signals = default_signals();
        } else {
            // Ensure we don't have double elements in the signals list.
            let before_len = signals.len();
            signals.sort();
            signals.dedup();
            anyhow::ensure!(
                before_len == signals.len(),
                "Signals contained duplicate elements"
            );
            // SIGKILL and SIGSTOP cannot be caught, sigaction would reject them later anyway.
            anyhow::ensure!(
                !signals.contains(&libc::SIGKILL) && !signals.contains(&libc::SIGSTOP),
                "SIGKILL and SIGSTOP cannot be handled"
            );
            signals
                .iter()
                .try_for_each(|x| signal_from_signum(*x).map(|_| ()))?;
        }

        Ok(Self {
            create_alt_stack,
            dump_stack_on_signal,
            ignore_sigpipe,
            signals,
            use_alt_stack,
        })
    }

    pub fn create_alt_stack(&self) -> bool {
        self.create_alt_stack
    }

    pub fn dump_stack_on_signal(&self) -> bool {
        self.dump_stack_on_signal
    }

    pub fn ignore_sigpipe(&self) -> bool {
        self.ignore_sigpipe
    }

    pub fn signals(&self) -> &Vec<i32> {
        &self.signals
    }

    pub fn use_alt_stack(&self) -> bool {
        self.use_alt_stack
    }

    pub fn set_create_alt_stack(&mut self, create_alt_stack: bool) -> anyhow::Result<()> {
        anyhow::ensure!(
            !create_alt_stack || self.use_alt_stack,
            "Cannot create an altstack without using it"
        );
        self.create_alt_stack = create_alt_stack;
        Ok(())
    }

    pub fn set_use_alt_stack(&mut self, use_alt_stack: bool) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.create_alt_stack || use_alt_stack,
            "Cannot create an altstack without using it"
        );
        self.use_alt_stack = use_alt_stack;
        Ok(())
    }
}
